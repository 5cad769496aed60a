use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use serde::Serialize;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, Instant},
};
use uuid::Uuid;

use crate::{
    db::XpSource,
    events::ProgressEvent,
    log_error, log_info,
    tracker::{LogOutcome, ProgressTracker},
};

use super::{TimerMode, TimerState, TimerStatus};

const ENABLE_LOGS: bool = true;
const MS_PER_MINUTE: u64 = 60_000;

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub state: TimerState,
    pub remaining_ms: i64,
}

/// How a session ended and what it earned.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    pub state: TimerState,
    pub outcome: Option<LogOutcome>,
}

/// Pomodoro-style timer that ticks once per second and credits finished
/// focus time through the [`ProgressTracker`].
#[derive(Clone)]
pub struct TimerController {
    state: Arc<Mutex<TimerState>>,
    tracker: ProgressTracker,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
    heartbeat_every_ticks: u32,
}

impl TimerController {
    pub fn new(tracker: ProgressTracker) -> Self {
        let debug_mode = std::env::var("PIXEL_PAGES_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            state: Arc::new(Mutex::new(TimerState::new())),
            tracker,
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: Duration::from_secs(1),
            heartbeat_every_ticks: if debug_mode { 1 } else { 10 },
        }
    }

    pub async fn get_snapshot(&self) -> TimerSnapshot {
        let mut guard = self.state.lock().await;
        guard.sync_active_from_anchor();
        TimerSnapshot {
            remaining_ms: guard.remaining_ms(),
            state: guard.clone(),
        }
    }

    /// Start a session. Crediting modes need a category; countdowns default
    /// to the configured focus or break length.
    pub async fn start(
        &self,
        mode: TimerMode,
        target_minutes: Option<u64>,
        category_key: Option<&str>,
    ) -> Result<TimerState> {
        let timer_settings = self.tracker.settings().timer();
        let target_ms = match mode {
            TimerMode::Focus => target_minutes.unwrap_or(timer_settings.focus_minutes),
            TimerMode::Break => target_minutes.unwrap_or(timer_settings.break_minutes),
            TimerMode::Stopwatch => u64::MAX / MS_PER_MINUTE,
        }
        .saturating_mul(MS_PER_MINUTE);
        if target_ms == 0 {
            bail!("target must be at least one minute for countdown modes");
        }

        let category_id = match (mode.credits_xp(), category_key) {
            (true, Some(key)) => Some(self.tracker.resolve_category(key).await?.id),
            (true, None) => bail!("a category is required to earn XP"),
            (false, _) => None,
        };

        {
            let mut state = self.state.lock().await;
            if state.is_active() {
                bail!("timer already active");
            }
            state.begin_session(
                Uuid::new_v4().to_string(),
                mode,
                target_ms,
                category_id,
                Utc::now(),
                Instant::now(),
            );
        }

        self.spawn_ticker().await;
        self.emit_state_changed().await;

        log_info!("Timer started in {:?} mode", mode);
        Ok(self.get_snapshot().await.state)
    }

    pub async fn pause(&self) -> Result<TimerState> {
        {
            let mut state = self.state.lock().await;
            if state.status != TimerStatus::Running {
                bail!("timer is not running");
            }
            state.pause();
        }
        self.cancel_ticker().await;
        self.emit_state_changed().await;
        Ok(self.get_snapshot().await.state)
    }

    pub async fn resume(&self) -> Result<TimerState> {
        {
            let mut state = self.state.lock().await;
            if state.status != TimerStatus::Paused {
                bail!("timer is not paused");
            }
            state.resume(Instant::now());
        }
        self.spawn_ticker().await;
        self.emit_state_changed().await;
        Ok(self.get_snapshot().await.state)
    }

    /// End the session early and credit the whole minutes it ran.
    pub async fn end(&self) -> Result<SessionResult> {
        self.finish(false)
            .await?
            .ok_or_else(|| anyhow!("no active session to end"))
    }

    /// Like [`TimerController::end`], but a countdown that already expired is
    /// not an error: `None` is returned and the ticker's `SessionFinished`
    /// event reports the credit.
    pub async fn interrupt(&self) -> Result<Option<SessionResult>> {
        self.finish(true).await
    }

    async fn finish(&self, allow_expired: bool) -> Result<Option<SessionResult>> {
        let final_state = {
            let mut state = self.state.lock().await;
            if !state.is_active() {
                if allow_expired && state.status == TimerStatus::Stopped {
                    return Ok(None);
                }
                bail!("no active session to end");
            }
            state.stop();
            state.clone()
        };
        self.cancel_ticker().await;
        self.emit_state_changed().await;

        let outcome = credit_session(&self.tracker, &final_state).await?;
        self.tracker.events().emit(ProgressEvent::SessionFinished {
            state: final_state.clone(),
            credited_minutes: outcome.as_ref().map_or(0, |o| o.entry.minutes),
        });
        Ok(Some(SessionResult {
            state: final_state,
            outcome,
        }))
    }

    /// Drop the session without crediting anything.
    pub async fn cancel(&self) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            if state.status == TimerStatus::Idle {
                return Ok(());
            }
            state.cancel();
        }
        self.cancel_ticker().await;
        self.emit_state_changed().await;
        log_info!("Timer cancelled");
        Ok(())
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let state = self.state.clone();
        let tracker = self.tracker.clone();
        let tick_interval = self.tick_interval;
        let heartbeat_every = self.heartbeat_every_ticks;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            let mut ticks: u32 = 0;
            loop {
                interval.tick().await;

                let (snapshot, expired) = {
                    let mut guard = state.lock().await;
                    if guard.status != TimerStatus::Running {
                        break;
                    }
                    guard.sync_active_from_anchor();
                    // Stop under the same lock so `end` cannot finish it twice.
                    let expired = guard.mode.is_countdown() && guard.remaining_ms() <= 0;
                    if expired {
                        guard.stop();
                    }
                    (guard.clone(), expired)
                };

                if expired {
                    let final_state = snapshot;
                    tracker.events().emit(ProgressEvent::TimerStateChanged {
                        remaining_ms: final_state.remaining_ms(),
                        state: final_state.clone(),
                    });

                    let credited_minutes = match credit_session(&tracker, &final_state).await {
                        Ok(outcome) => outcome.map_or(0, |o| o.entry.minutes),
                        Err(e) => {
                            log_error!("Failed to credit finished session: {}", e);
                            0
                        }
                    };
                    tracker.events().emit(ProgressEvent::SessionFinished {
                        state: final_state,
                        credited_minutes,
                    });
                    break;
                }

                ticks = ticks.wrapping_add(1);
                if ticks % heartbeat_every == 0 {
                    tracker.events().emit(ProgressEvent::TimerHeartbeat {
                        active_ms: snapshot.active_ms,
                        remaining_ms: snapshot.remaining_ms(),
                        state: snapshot,
                    });
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }

    async fn emit_state_changed(&self) {
        let snapshot = self.get_snapshot().await;
        self.tracker.events().emit(ProgressEvent::TimerStateChanged {
            state: snapshot.state,
            remaining_ms: snapshot.remaining_ms,
        });
    }
}

async fn credit_session(
    tracker: &ProgressTracker,
    final_state: &TimerState,
) -> Result<Option<LogOutcome>> {
    let minutes = final_state.earned_minutes();
    if minutes == 0 {
        log_info!("Session finished without whole minutes to credit");
        return Ok(None);
    }

    let category_id = final_state
        .category_id
        .as_deref()
        .ok_or_else(|| anyhow!("session has no category to credit"))?;

    let outcome = tracker
        .log_minutes(category_id, minutes, XpSource::Timer)
        .await?;
    log_info!(
        "Credited {} minutes to {} (level {})",
        minutes,
        outcome.category.name,
        outcome.after.level
    );
    Ok(Some(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{CategoryInput, Database},
        events::EventBus,
        settings::SettingsStore,
    };
    use tempfile::TempDir;
    use tokio::sync::broadcast::error::RecvError;

    async fn controller() -> (TempDir, TimerController) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("test.sqlite3")).unwrap();
        db.create_category(CategoryInput {
            name: "Programming".into(),
            color: "#00FFAA".into(),
            icon_name: None,
        })
        .await
        .unwrap();
        let settings = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        let tracker = ProgressTracker::new(db, Arc::new(settings), EventBus::new());
        (dir, TimerController::new(tracker))
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_expiry_credits_the_category() {
        let (_dir, timer) = controller().await;
        let mut events = timer.tracker.events().subscribe();

        timer
            .start(TimerMode::Focus, Some(2), Some("programming"))
            .await
            .unwrap();

        let logged = loop {
            match events.recv().await {
                Ok(ProgressEvent::SessionLogged { minutes, level_state, .. }) => {
                    break (minutes, level_state)
                }
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => panic!("event bus closed"),
            }
        };
        assert_eq!(logged.0, 2);
        assert_eq!(logged.1.current_level_xp, 2);

        let credited = loop {
            match events.recv().await {
                Ok(ProgressEvent::SessionFinished { credited_minutes, .. }) => break credited_minutes,
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => panic!("event bus closed"),
            }
        };
        assert_eq!(credited, 2);

        let snapshot = timer.get_snapshot().await;
        assert_eq!(snapshot.state.status, TimerStatus::Stopped);
        assert_eq!(snapshot.state.active_ms, 120_000);
    }

    #[tokio::test(start_paused = true)]
    async fn paused_time_is_not_credited() {
        let (_dir, timer) = controller().await;
        timer
            .start(TimerMode::Focus, Some(25), Some("programming"))
            .await
            .unwrap();

        time::advance(Duration::from_secs(60)).await;
        let paused = timer.pause().await.unwrap();
        assert_eq!(paused.status, TimerStatus::Paused);

        time::advance(Duration::from_secs(600)).await;
        timer.resume().await.unwrap();
        time::advance(Duration::from_secs(90)).await;

        let result = timer.end().await.unwrap();
        let outcome = result.outcome.unwrap();
        assert_eq!(outcome.entry.minutes, 2);
        assert_eq!(outcome.entry.source, XpSource::Timer);
        assert_eq!(result.state.status, TimerStatus::Stopped);

        assert!(timer.end().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn break_and_cancel_credit_nothing() {
        let (_dir, timer) = controller().await;

        timer.start(TimerMode::Break, None, None).await.unwrap();
        time::advance(Duration::from_secs(120)).await;
        let result = timer.end().await.unwrap();
        assert!(result.outcome.is_none());

        timer
            .start(TimerMode::Stopwatch, None, Some("programming"))
            .await
            .unwrap();
        time::advance(Duration::from_secs(300)).await;
        timer.cancel().await.unwrap();

        assert_eq!(timer.get_snapshot().await.state.status, TimerStatus::Idle);
        assert_eq!(timer.tracker.db().total_logged_minutes().await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rejects_invalid_starts() {
        let (_dir, timer) = controller().await;

        assert!(timer.start(TimerMode::Focus, None, None).await.is_err());
        assert!(timer
            .start(TimerMode::Focus, Some(0), Some("programming"))
            .await
            .is_err());
        assert!(timer
            .start(TimerMode::Focus, None, Some("unknown"))
            .await
            .is_err());

        timer
            .start(TimerMode::Focus, None, Some("programming"))
            .await
            .unwrap();
        assert!(timer
            .start(TimerMode::Break, None, None)
            .await
            .is_err());
        assert!(timer.resume().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_after_expiry_leaves_credit_to_ticker() {
        let (_dir, timer) = controller().await;
        let mut events = timer.tracker.events().subscribe();
        timer
            .start(TimerMode::Focus, Some(1), Some("programming"))
            .await
            .unwrap();

        let credited = loop {
            match events.recv().await {
                Ok(ProgressEvent::SessionFinished { credited_minutes, .. }) => break credited_minutes,
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => panic!("event bus closed"),
            }
        };
        assert_eq!(credited, 1);

        assert!(timer.interrupt().await.unwrap().is_none());
        assert!(timer.end().await.is_err());
        assert_eq!(timer.tracker.db().total_logged_minutes().await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_ends_a_running_session() {
        let (_dir, timer) = controller().await;
        timer
            .start(TimerMode::Stopwatch, None, Some("programming"))
            .await
            .unwrap();
        time::advance(Duration::from_secs(185)).await;

        let result = timer.interrupt().await.unwrap().unwrap();
        assert_eq!(result.outcome.unwrap().entry.minutes, 3);

        timer.cancel().await.unwrap();
        assert!(timer.interrupt().await.is_err());
    }
}
