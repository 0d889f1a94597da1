use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
        MutexGuard,
    },
    time::{
        Duration,
        Instant,
    },
};

pub const MAX_RESPONSES: u32 = 3;
pub const RESPONSE_WINDOW: Duration = Duration::from_secs(45);

/// Throttles table talk per player. Best effort: losing this state only means
/// the dealer talks a little more.
pub trait ResponseTracker: Send + Sync {
    /// Claims a reply slot for `player` at `now`. `false` means stay silent.
    fn try_acquire(&self, player: &str, now: Instant) -> bool;

    fn reset(&self, player: &str);
}

#[derive(Clone, Copy, Debug)]
struct Entry {
    count: u32,
    /// First reply of the current burst.
    window_start: Instant,
}

/// Counts replies per player. A player's entry is dropped once the window
/// has passed since the first reply of their burst.
#[derive(Clone, Debug)]
pub struct InMemoryResponseTracker {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    limit: u32,
    window: Duration,
}

impl Default for InMemoryResponseTracker {
    fn default() -> Self {
        Self::new(MAX_RESPONSES, RESPONSE_WINDOW)
    }
}

impl InMemoryResponseTracker {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            entries: Arc::default(),
            limit,
            window,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Players currently holding a count.
    pub fn tracked_players(&self) -> usize {
        self.entries().len()
    }
}

fn key(player: &str) -> String {
    player.trim().to_ascii_lowercase()
}

impl ResponseTracker for InMemoryResponseTracker {
    fn try_acquire(&self, player: &str, now: Instant) -> bool {
        let mut entries = self.entries();
        entries.retain(|_, e| now.saturating_duration_since(e.window_start) < self.window);
        let entry = entries.entry(key(player)).or_insert(Entry {
            count: 0,
            window_start: now,
        });
        if entry.count >= self.limit {
            return false;
        }
        entry.count += 1;
        true
    }

    fn reset(&self, player: &str) {
        self.entries().remove(&key(player));
    }
}
