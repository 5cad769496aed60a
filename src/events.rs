use log::debug;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::{
    db::{UnlockedAchievement, XpSource},
    progression::LevelState,
    timer::TimerState,
};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ProgressEvent {
    #[serde(rename_all = "camelCase")]
    TimerStateChanged { state: TimerState, remaining_ms: i64 },
    #[serde(rename_all = "camelCase")]
    TimerHeartbeat {
        state: TimerState,
        active_ms: u64,
        remaining_ms: i64,
    },
    /// A timer session is over and any XP it earned has been credited.
    #[serde(rename_all = "camelCase")]
    SessionFinished {
        state: TimerState,
        credited_minutes: u64,
    },
    #[serde(rename_all = "camelCase")]
    SessionLogged {
        category_id: String,
        minutes: u64,
        source: XpSource,
        level_state: LevelState,
    },
    #[serde(rename_all = "camelCase")]
    LevelUp {
        category_id: String,
        category_name: String,
        from_level: u32,
        to_level: u32,
        title: String,
    },
    #[serde(rename_all = "camelCase")]
    AchievementUnlocked { achievement: UnlockedAchievement },
}

/// Fan-out of progress changes to every view that subscribed.
///
/// Sending never blocks; with no subscribers an event is simply dropped.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ProgressEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: ProgressEvent) {
        if self.sender.send(event).is_err() {
            debug!("No subscribers for progress event");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
