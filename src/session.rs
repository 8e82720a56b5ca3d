use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::debug;

use crate::Transcript;

/// Platform-assigned user identity
pub type UserId = i64;

pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug)]
struct Entry {
    transcript: Transcript,
    stored_at: Instant,
    last_used: u64,
}

/// Most recent transcript per user.
///
/// Holds at most `capacity` users; inserting past that evicts the least
/// recently used one. With a TTL set, entries older than the TTL read as absent.
#[derive(Debug)]
pub struct SessionStore {
    entries: HashMap<UserId, Entry>,
    capacity: usize,
    ttl: Option<Duration>,
    tick: u64,
}

impl SessionStore {
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            ttl,
            tick: 0,
        }
    }

    /// Replace whatever the user had with `transcript`
    pub fn set(&mut self, user: UserId, transcript: Transcript) {
        self.set_at(user, transcript, Instant::now());
    }

    pub fn get(&mut self, user: UserId) -> Option<&Transcript> {
        self.get_at(user, Instant::now())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn set_at(&mut self, user: UserId, transcript: Transcript, now: Instant) {
        if !self.entries.contains_key(&user) && self.entries.len() >= self.capacity {
            self.evict_oldest();
        }
        let last_used = self.next_tick();
        self.entries.insert(
            user,
            Entry {
                transcript,
                stored_at: now,
                last_used,
            },
        );
    }

    fn get_at(&mut self, user: UserId, now: Instant) -> Option<&Transcript> {
        let expired = match (self.entries.get(&user), self.ttl) {
            (None, _) => return None,
            (Some(entry), Some(ttl)) => now.saturating_duration_since(entry.stored_at) > ttl,
            (Some(_), None) => false,
        };
        if expired {
            debug!("Session for user {user} expired");
            self.entries.remove(&user);
            return None;
        }
        let tick = self.next_tick();
        let entry = self.entries.get_mut(&user)?;
        entry.last_used = tick;
        Some(&entry.transcript)
    }

    fn evict_oldest(&mut self) {
        if let Some(&user) = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(user, _)| user)
        {
            debug!("Evicting session for user {user}");
            self.entries.remove(&user);
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, None)
    }
}
