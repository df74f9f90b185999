use crate::ais_interface::ViolationEvent;
use std::collections::HashSet;

/// Insertion-ordered violation notifications, at most one per `vid`.
///
/// The feed is at-least-once, so redelivered events are expected and
/// silently discarded; the first arrival is the one kept.
#[derive(Debug, Default, Clone)]
pub struct NotificationBuffer {
    events: Vec<ViolationEvent>,
    seen: HashSet<String>,
}

impl NotificationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `event` unless one with the same `vid` is held. Returns
    /// whether it was appended.
    pub fn receive(&mut self, event: ViolationEvent) -> bool {
        if !self.seen.insert(event.vid.clone()) {
            return false;
        }
        self.events.push(event);
        true
    }

    /// Removes the entry with `vid`; unknown ids are ignored.
    pub fn dismiss(&mut self, vid: &str) -> Option<ViolationEvent> {
        if !self.seen.remove(vid) {
            return None;
        }
        let index = self.events.iter().position(|event| event.vid == vid)?;
        Some(self.events.remove(index))
    }

    pub fn count(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, vid: &str) -> Option<&ViolationEvent> {
        self.events.iter().find(|event| event.vid == vid)
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ViolationEvent> {
        self.events.iter()
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.seen.clear();
    }
}
