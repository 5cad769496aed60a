use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp;
use tokio::time::Instant;

const MS_PER_MINUTE: u64 = 60_000;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    #[default]
    Idle,
    Running,
    Paused,
    /// Finished (expired or ended); kept until the next start or cancel.
    Stopped,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TimerMode {
    /// Pomodoro countdown; credits its minutes to the bound category.
    #[default]
    Focus,
    /// Open-ended; credits elapsed minutes when ended.
    Stopwatch,
    /// Countdown that never earns XP.
    Break,
}

impl TimerMode {
    pub fn credits_xp(&self) -> bool {
        !matches!(self, TimerMode::Break)
    }

    pub fn is_countdown(&self) -> bool {
        !matches!(self, TimerMode::Stopwatch)
    }
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub status: TimerStatus,
    pub mode: TimerMode,
    pub session_id: Option<String>,
    pub category_id: Option<String>,
    pub target_ms: u64,
    pub active_ms: u64,
    pub started_at: Option<DateTime<Utc>>,
    /// Time accumulated from earlier running windows; combines with `running_anchor`
    /// to compute the true active duration.
    #[serde(skip)]
    pub active_ms_baseline: u64,
    #[serde(skip)]
    pub running_anchor: Option<Instant>,
}

impl TimerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, TimerStatus::Running | TimerStatus::Paused)
    }

    /// Countdowns report time left; the stopwatch reports time elapsed.
    pub fn remaining_ms(&self) -> i64 {
        if !self.is_active() {
            return 0;
        }
        let active = i64::try_from(self.current_active_ms()).unwrap_or(i64::MAX);
        if self.mode.is_countdown() {
            let target = i64::try_from(self.target_ms).unwrap_or(i64::MAX);
            cmp::max(target - active, 0)
        } else {
            active
        }
    }

    pub fn current_active_ms(&self) -> u64 {
        if let (TimerStatus::Running, Some(anchor)) = (self.status, self.running_anchor) {
            self.active_ms_baseline
                .saturating_add(anchor.elapsed().as_millis() as u64)
        } else {
            self.active_ms
        }
    }

    pub fn sync_active_from_anchor(&mut self) {
        if let (TimerStatus::Running, Some(anchor)) = (self.status, self.running_anchor) {
            self.active_ms = self
                .active_ms_baseline
                .saturating_add(anchor.elapsed().as_millis() as u64);
        }
    }

    /// Whole minutes this session is worth in XP.
    pub fn earned_minutes(&self) -> u64 {
        if self.mode.credits_xp() {
            self.current_active_ms() / MS_PER_MINUTE
        } else {
            0
        }
    }

    pub fn begin_session(
        &mut self,
        session_id: String,
        mode: TimerMode,
        target_ms: u64,
        category_id: Option<String>,
        start_at: DateTime<Utc>,
        now: Instant,
    ) {
        *self = Self {
            status: TimerStatus::Running,
            mode,
            session_id: Some(session_id),
            category_id,
            target_ms,
            active_ms: 0,
            started_at: Some(start_at),
            active_ms_baseline: 0,
            running_anchor: Some(now),
        };
    }

    pub fn pause(&mut self) {
        self.sync_active_from_anchor();
        self.status = TimerStatus::Paused;
        self.running_anchor = None;
        self.active_ms_baseline = self.active_ms;
    }

    pub fn resume(&mut self, now: Instant) {
        self.status = TimerStatus::Running;
        self.active_ms_baseline = self.active_ms;
        self.running_anchor = Some(now);
    }

    pub fn stop(&mut self) {
        self.sync_active_from_anchor();
        if self.mode.is_countdown() {
            self.active_ms = self.active_ms.min(self.target_ms);
        }
        self.status = TimerStatus::Stopped;
        self.running_anchor = None;
        self.active_ms_baseline = self.active_ms;
    }

    pub fn cancel(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn running(mode: TimerMode, target_ms: u64) -> TimerState {
        let mut state = TimerState::new();
        state.begin_session(
            "session".into(),
            mode,
            target_ms,
            Some("category".into()),
            Utc::now(),
            Instant::now(),
        );
        state
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_reports_time_left() {
        let state = running(TimerMode::Focus, 60_000);
        tokio::time::advance(Duration::from_secs(20)).await;
        assert_eq!(state.remaining_ms(), 40_000);

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(state.remaining_ms(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_freezes_active_time() {
        let mut state = running(TimerMode::Focus, 600_000);
        tokio::time::advance(Duration::from_secs(90)).await;
        state.pause();
        tokio::time::advance(Duration::from_secs(300)).await;
        assert_eq!(state.current_active_ms(), 90_000);

        state.resume(Instant::now());
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(state.current_active_ms(), 120_000);
        assert_eq!(state.earned_minutes(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_clamps_countdown_to_target() {
        let mut state = running(TimerMode::Focus, 60_000);
        tokio::time::advance(Duration::from_secs(65)).await;
        state.stop();
        assert_eq!(state.active_ms, 60_000);
        assert_eq!(state.status, TimerStatus::Stopped);
        assert_eq!(state.remaining_ms(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stopwatch_counts_up_and_break_earns_nothing() {
        let stopwatch = running(TimerMode::Stopwatch, u64::MAX);
        let rest = running(TimerMode::Break, 300_000);
        tokio::time::advance(Duration::from_secs(180)).await;

        assert_eq!(stopwatch.remaining_ms(), 180_000);
        assert_eq!(stopwatch.earned_minutes(), 3);
        assert_eq!(rest.earned_minutes(), 0);
    }
}
