use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use crate::error::PlanError;
use crate::history::{History, HistoryStore};
use crate::planner::Planner;
use crate::share::{self, ShareError};
use crate::storage::{KeyValueStore, StorageError};
use crate::types::{LatLng, Plan, PlanRequest};

/// At most one generation runs at a time. Holding the guard marks the
/// planner busy; dropping it frees it.
#[derive(Clone, Debug, Default)]
pub struct InFlight(Arc<AtomicBool>);

#[derive(Debug)]
pub struct InFlightGuard(Arc<AtomicBool>);

impl InFlight {
    pub fn try_begin(&self) -> Option<InFlightGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard(Arc::clone(&self.0)))
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Everything the planner front ends mutate: the plan on screen, the saved
/// history, the busy flag and the last error shown to the user.
pub struct AppState {
    planner: Planner,
    history: HistoryStore,
    current: Option<Plan>,
    error: Option<String>,
    location: Option<LatLng>,
    in_flight: InFlight,
}

impl AppState {
    pub fn new(planner: Planner, store: Box<dyn KeyValueStore>) -> Self {
        Self {
            planner,
            history: HistoryStore::load(store),
            current: None,
            error: None,
            location: None,
            in_flight: InFlight::default(),
        }
    }

    /// Hydrates a shared plan if a token is given. A bad token is logged and
    /// ignored; startup carries on with no plan loaded.
    pub fn startup(&mut self, share_token: Option<&str>) {
        let Some(token) = share_token else {
            return;
        };
        if let Err(e) = self.open(token) {
            warn!(error = %e, "couldn't decode shared plan");
        }
    }

    /// Makes the plan carried by a share token current. History is left
    /// alone; see [`AppState::keep`].
    pub fn open(&mut self, token: &str) -> Result<&Plan, ShareError> {
        let plan = share::decode(token)?.into_plan();
        info!(id = %plan.id, "loaded shared plan");
        Ok(self.current.insert(plan))
    }

    pub fn set_location(&mut self, location: Option<LatLng>) {
        self.location = location;
    }

    pub fn location(&self) -> Option<LatLng> {
        self.location
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    pub fn current(&self) -> Option<&Plan> {
        self.current.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn history(&self) -> &History {
        self.history.history()
    }

    /// Generates a plan and records the outcome. Errors never escape: they
    /// become the user-visible `last_error`.
    pub fn submit(&mut self, request: PlanRequest) -> Option<&Plan> {
        let Some(_guard) = self.in_flight.try_begin() else {
            return self.complete(Err(PlanError::Busy));
        };
        let result = self.planner.submit(request, self.location);
        self.complete(result)
    }

    /// Second half of a submission whose generation ran elsewhere.
    pub fn complete(&mut self, result: Result<Plan, PlanError>) -> Option<&Plan> {
        match result {
            Ok(plan) => {
                self.error = None;
                if let Err(e) = self.history.add(plan.clone()) {
                    warn!(error = %e, "couldn't save trip history");
                }
                self.current = Some(plan);
                self.current.as_ref()
            }
            Err(err) => {
                warn!(error = %err, "plan generation failed");
                self.error = Some(err.user_message());
                None
            }
        }
    }

    /// Shows a plan from history.
    pub fn select(&mut self, id: &str) -> Option<&Plan> {
        let plan = self.history.get(id)?.clone();
        self.current = Some(plan);
        self.current.as_ref()
    }

    pub fn delete(&mut self, id: &str) -> Result<bool, StorageError> {
        self.history.remove(id)
    }

    pub fn clear_history(&mut self) -> Result<(), StorageError> {
        self.history.clear()
    }

    /// Adds an imported plan to history, e.g. one opened from a share link.
    pub fn keep(&mut self, plan: Plan) -> Result<(), StorageError> {
        self.history.add(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::testing::FakeGenerator;
    use crate::storage::MemoryStore;
    use crate::types::GroundingLink;

    fn state_with(generator: Arc<FakeGenerator>) -> AppState {
        AppState::new(Planner::new(generator), Box::new(MemoryStore::new()))
    }

    #[test]
    fn submit_stores_plan_and_history() {
        let generator = Arc::new(FakeGenerator::replying("# Brno"));
        let mut state = state_with(generator.clone());
        let id = state.submit(PlanRequest::new("Brno")).unwrap().id.clone();
        assert_eq!(state.current().unwrap().id, id);
        assert_eq!(state.history().latest().unwrap().id, id);
        assert_eq!(state.last_error(), None);
        assert!(!state.in_flight().is_active());
    }

    #[test]
    fn submit_while_in_flight_is_rejected() {
        let generator = Arc::new(FakeGenerator::replying("# Brno"));
        let mut state = state_with(generator.clone());
        let flag = state.in_flight().clone();
        let guard = flag.try_begin().unwrap();

        assert!(state.submit(PlanRequest::new("Brno")).is_none());
        assert_eq!(generator.calls(), 0);
        assert_eq!(state.last_error(), Some(PlanError::Busy.user_message().as_str()));

        drop(guard);
        assert!(state.submit(PlanRequest::new("Brno")).is_some());
        assert_eq!(generator.calls(), 1);
    }

    #[test]
    fn failures_become_a_user_message() {
        let generator = Arc::new(FakeGenerator::unconfigured());
        let mut state = state_with(generator.clone());
        assert!(state.submit(PlanRequest::new("Alps")).is_none());
        assert_eq!(generator.calls(), 0);
        assert!(state.last_error().unwrap().contains("API key"));
        assert!(state.history().is_empty());
        assert!(!state.in_flight().is_active());
    }

    #[test]
    fn startup_hydrates_share_token_or_ignores_garbage() {
        let plan = Plan {
            links: vec![GroundingLink::maps("https://maps.example", "Pálava")],
            ..state_with(Arc::new(FakeGenerator::replying("x")))
                .planner()
                .submit(PlanRequest::new("Pálava"), None)
                .unwrap()
        };
        let token = share::encode(&plan).unwrap();

        let mut state = state_with(Arc::new(FakeGenerator::replying("x")));
        state.startup(Some(&token));
        let current = state.current().unwrap();
        assert_eq!(current.content, plan.content);
        assert_eq!(current.links, plan.links);
        assert!(current.request.is_none());

        let mut state = state_with(Arc::new(FakeGenerator::replying("x")));
        state.startup(Some("definitely not a token!"));
        assert!(state.current().is_none());
        assert_eq!(state.last_error(), None);
    }

    #[test]
    fn opened_plans_are_kept_only_on_request() {
        let mut state = state_with(Arc::new(FakeGenerator::replying("# Olomouc")));
        let generated = state.submit(PlanRequest::new("Olomouc")).unwrap().clone();
        state.clear_history().unwrap();
        let token = share::encode(&generated).unwrap();

        let opened = state.open(&token).unwrap().clone();
        assert!(opened.id.starts_with("shared-"));
        assert_eq!(opened.content, "# Olomouc");
        assert!(state.history().is_empty());

        state.keep(opened.clone()).unwrap();
        assert_eq!(state.history().latest(), Some(&opened));
        assert!(state.open("%%%").is_err());
        assert_eq!(state.current(), Some(&opened));
    }

    #[test]
    fn select_delete_and_clear() {
        let mut state = state_with(Arc::new(FakeGenerator::replying("x")));
        let first = state.submit(PlanRequest::new("A")).unwrap().id.clone();
        let second = state.submit(PlanRequest::new("B")).unwrap().id.clone();
        assert_eq!(state.current().unwrap().id, second);

        assert_eq!(state.select(&first).unwrap().id, first);
        assert!(state.select("missing").is_none());

        assert!(state.delete(&first).unwrap());
        assert!(!state.delete(&first).unwrap());
        assert_eq!(state.history().len(), 1);

        state.clear_history().unwrap();
        assert!(state.history().is_empty());
    }
}
