//! Registry of bot actors taking part in a session, keyed by display name

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ahash::AHashSet;
use serde::Serialize;

use crate::engine::EngineClient;

/// Lifecycle of one bot actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BotState {
    Unconnected,
    Connecting,
    Configured,
    Active,
    Failed,
}

/// What a bot reached, as seen after the fact
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BotSummary {
    pub name: String,
    pub force: String,
    pub state: BotState,
    pub units_submitted: usize,
    pub failure: Option<String>,
}

struct BotEntry {
    summary: BotSummary,
    client: Option<Arc<dyn EngineClient>>,
}

#[derive(Default)]
pub struct BotRegistry {
    entries: Vec<BotEntry>,
    taken: AHashSet<String>,
}

impl BotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a name as used by a non-bot client (the local player)
    pub fn claim_name(&mut self, name: &str) {
        self.taken.insert(name.to_string());
    }

    fn is_taken(&self, name: &str) -> bool {
        self.taken.contains(name) || self.entries.iter().any(|e| e.summary.name == name)
    }

    /// Register a bot under `requested`, suffixing 2, 3, ... on collision.
    /// Returns the name actually registered.
    pub fn reserve(&mut self, requested: &str, force: &str) -> String {
        let mut name = requested.to_string();
        let mut suffix = 2;
        while self.is_taken(&name) {
            name = format!("{requested}{suffix}");
            suffix += 1;
        }

        self.entries.push(BotEntry {
            summary: BotSummary {
                name: name.clone(),
                force: force.to_string(),
                state: BotState::Unconnected,
                units_submitted: 0,
                failure: None,
            },
            client: None,
        });
        name
    }

    fn entry_mut(&mut self, name: &str) -> Option<&mut BotEntry> {
        self.entries.iter_mut().find(|e| e.summary.name == name)
    }

    pub fn set_state(&mut self, name: &str, state: BotState) {
        if let Some(entry) = self.entry_mut(name) {
            entry.summary.state = state;
        }
    }

    pub fn attach_client(&mut self, name: &str, client: Arc<dyn EngineClient>) {
        if let Some(entry) = self.entry_mut(name) {
            entry.client = Some(client);
        }
    }

    pub fn record_units(&mut self, name: &str, count: usize) {
        if let Some(entry) = self.entry_mut(name) {
            entry.summary.units_submitted += count;
        }
    }

    pub fn mark_failed(&mut self, name: &str, reason: impl Into<String>) {
        if let Some(entry) = self.entry_mut(name) {
            entry.summary.state = BotState::Failed;
            entry.summary.failure = Some(reason.into());
        }
    }

    pub fn summary(&self, name: &str) -> Option<BotSummary> {
        self.entries
            .iter()
            .find(|e| e.summary.name == name)
            .map(|e| e.summary.clone())
    }

    pub fn summaries(&self) -> Vec<BotSummary> {
        self.entries.iter().map(|e| e.summary.clone()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.summary.name.clone()).collect()
    }

    /// Hand over every held connection, leaving the registry without any
    pub fn take_clients(&mut self) -> Vec<Arc<dyn EngineClient>> {
        self.entries
            .iter_mut()
            .filter_map(|e| e.client.take())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Registry shared between the orchestrator, bot tasks and teardown
#[derive(Clone, Default)]
pub struct SharedRegistry(Arc<Mutex<BotRegistry>>);

impl SharedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Never hold the guard across an await
    pub fn lock(&self) -> MutexGuard<'_, BotRegistry> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collision_suffixes() {
        let mut registry = BotRegistry::new();
        assert_eq!(registry.reserve("Hunters", "Hunters"), "Hunters");
        assert_eq!(registry.reserve("Hunters", "Hunters"), "Hunters2");
        assert_eq!(registry.reserve("Hunters", "Hunters"), "Hunters3");
        assert_eq!(registry.names(), vec!["Hunters", "Hunters2", "Hunters3"]);
    }

    #[test]
    fn test_player_name_is_avoided() {
        let mut registry = BotRegistry::new();
        registry.claim_name("Commander");
        assert_eq!(registry.reserve("Commander", "Rear guard"), "Commander2");
    }

    #[test]
    fn test_failure_recorded() {
        let mut registry = BotRegistry::new();
        let name = registry.reserve("Raiders", "Raiders");
        registry.set_state(&name, BotState::Connecting);
        registry.mark_failed(&name, "refused");

        let summary = registry.summary(&name).unwrap();
        assert_eq!(summary.state, BotState::Failed);
        assert_eq!(summary.failure.as_deref(), Some("refused"));
    }

    #[test]
    fn test_shared_registry_is_shared() {
        let shared = SharedRegistry::new();
        let other = shared.clone();
        shared.lock().reserve("A", "A");
        assert_eq!(other.lock().len(), 1);
    }
}
