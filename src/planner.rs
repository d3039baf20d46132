use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use ulid::Ulid;

use crate::client::{Generator, ToolConfig};
use crate::error::PlanError;
use crate::prompts::{DEFAULT_VEHICLE, build_prompt};
use crate::types::{LatLng, Plan, PlanRequest};

/// Turns a trip request into a plan with exactly one generator call.
#[derive(Clone)]
pub struct Planner {
    generator: Arc<dyn Generator>,
    vehicle: String,
}

impl Planner {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            vehicle: DEFAULT_VEHICLE.to_string(),
        }
    }

    pub fn with_vehicle(mut self, vehicle: impl Into<String>) -> Self {
        self.vehicle = vehicle.into();
        self
    }

    pub fn vehicle(&self) -> &str {
        &self.vehicle
    }

    pub fn submit(&self, request: PlanRequest, location: Option<LatLng>) -> Result<Plan, PlanError> {
        request.validate().map_err(PlanError::InvalidRequest)?;
        if !self.generator.credential_configured() {
            return Err(PlanError::Configuration);
        }

        let prompt = build_prompt(&request, &self.vehicle);
        let tools = ToolConfig::grounded(location);
        info!(
            destination = %request.destination,
            days = request.days,
            located = location.is_some(),
            "generating itinerary"
        );
        let generation = self.generator.generate(&prompt, &tools)?;

        let content = generation
            .text
            .filter(|t| !t.trim().is_empty())
            .ok_or(PlanError::EmptyResponse)?;
        let plan = Plan {
            id: Ulid::new().to_string(),
            created_at: Utc::now(),
            request: Some(request),
            content,
            links: generation.links,
        };
        info!(id = %plan.id, links = plan.links.len(), "itinerary generated");
        Ok(plan)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::client::{Generation, Generator, ToolConfig};
    use crate::error::PlanError;

    /// Generator double that records every call it receives. Replies with the
    /// same generation each time unless a one-shot failure is queued.
    pub struct FakeGenerator {
        pub configured: bool,
        pub reply: Generation,
        pub failure: Mutex<Option<PlanError>>,
        pub calls: AtomicUsize,
        pub last_prompt: Mutex<Option<String>>,
        pub last_tools: Mutex<Option<ToolConfig>>,
    }

    impl FakeGenerator {
        pub fn replying(text: &str) -> Self {
            Self::with_reply(Ok(Generation {
                text: Some(text.to_string()),
                links: Vec::new(),
            }))
        }

        pub fn with_reply(reply: Result<Generation, PlanError>) -> Self {
            let (reply, failure) = match reply {
                Ok(generation) => (generation, None),
                Err(e) => (Generation::default(), Some(e)),
            };
            Self {
                configured: true,
                reply,
                failure: Mutex::new(failure),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
                last_tools: Mutex::new(None),
            }
        }

        pub fn unconfigured() -> Self {
            Self {
                configured: false,
                ..Self::replying("unused")
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Generator for FakeGenerator {
        fn credential_configured(&self) -> bool {
            self.configured
        }

        fn generate(&self, prompt: &str, tools: &ToolConfig) -> Result<Generation, PlanError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
            *self.last_tools.lock().unwrap() = Some(*tools);
            match self.failure.lock().unwrap().take() {
                Some(e) => Err(e),
                None => Ok(self.reply.clone()),
            }
        }
    }
}
