use tracing::{debug, warn};

use crate::storage::{KeyValueStore, StorageError};
use crate::types::Plan;

pub const HISTORY_KEY: &str = "trip_history";
pub const HISTORY_LIMIT: usize = 10;

/// Plans, newest first, never longer than [`HISTORY_LIMIT`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct History {
    plans: Vec<Plan>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_plans(mut plans: Vec<Plan>) -> Self {
        plans.truncate(HISTORY_LIMIT);
        Self { plans }
    }

    /// Prepends and evicts whatever falls past the bound.
    pub fn add(&mut self, plan: Plan) {
        self.plans.insert(0, plan);
        self.plans.truncate(HISTORY_LIMIT);
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.plans.len();
        self.plans.retain(|p| p.id != id);
        self.plans.len() != before
    }

    pub fn clear(&mut self) {
        self.plans.clear();
    }

    pub fn get(&self, id: &str) -> Option<&Plan> {
        self.plans.iter().find(|p| p.id == id)
    }

    pub fn latest(&self) -> Option<&Plan> {
        self.plans.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Plan> {
        self.plans.iter()
    }

    pub fn as_slice(&self) -> &[Plan] {
        &self.plans
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

/// History that writes the whole list back to the store after every change.
pub struct HistoryStore {
    store: Box<dyn KeyValueStore>,
    history: History,
}

impl HistoryStore {
    /// Reads the stored list. A missing, unreadable or corrupt value is
    /// logged and treated as an empty history.
    pub fn load(store: Box<dyn KeyValueStore>) -> Self {
        let history = match store.get(HISTORY_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Plan>>(&raw) {
                Ok(plans) => History::from_plans(plans),
                Err(e) => {
                    warn!(error = %e, "stored trip history is corrupt, starting empty");
                    History::new()
                }
            },
            Ok(None) => History::new(),
            Err(e) => {
                warn!(error = %e, "couldn't read trip history, starting empty");
                History::new()
            }
        };
        debug!(plans = history.len(), "trip history loaded");
        Self { store, history }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn get(&self, id: &str) -> Option<&Plan> {
        self.history.get(id)
    }

    pub fn add(&mut self, plan: Plan) -> Result<(), StorageError> {
        self.history.add(plan);
        self.persist()
    }

    /// Returns whether a plan was removed. Nothing is written when the id is
    /// unknown.
    pub fn remove(&mut self, id: &str) -> Result<bool, StorageError> {
        if !self.history.remove(id) {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.history.clear();
        self.persist()
    }

    fn persist(&mut self) -> Result<(), StorageError> {
        let blob = serde_json::to_string(self.history.as_slice())?;
        self.store.set(HISTORY_KEY, &blob)
    }
}
