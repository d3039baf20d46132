use std::future::ready;
use std::sync::{Arc, Mutex, MutexGuard};

use rmcp::{
    ErrorData,
    handler::server::{ServerHandler, tool::ToolRouter, wrapper::Parameters},
    model::{
        AnnotateAble, CallToolResult, Implementation, ListResourcesResult, PaginatedRequestParam,
        ProtocolVersion, RawResource, ReadResourceRequestParam, ReadResourceResult,
        ResourceContents, ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::app::AppState;
use crate::error::{GENERIC_UPSTREAM_MESSAGE, PlanError};
use crate::links::link_cards;
use crate::metadata::{PKG_NAME, PKG_VERSION};
use crate::render::render_blocks;
use crate::share;
use crate::types::{Plan, PlanRequest};

const HISTORY_URI: &str = "roadtrip://history";
const CURRENT_URI: &str = "roadtrip://current";

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct RenderParams {
    /// Markdown-ish itinerary text
    pub content: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct PlanIdParams {
    pub id: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareParams {
    /// Plan to share, the current one when omitted
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct OpenParams {
    /// Share URL or bare token
    pub input: String,
    /// Also add the plan to history
    #[serde(default)]
    pub save: bool,
}

#[derive(Clone)]
pub struct PlannerHandler {
    state: Arc<Mutex<AppState>>,
    share_base_url: String,
    tool_router: ToolRouter<Self>,
}

impl PlannerHandler {
    pub fn new(state: AppState, share_base_url: impl Into<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            share_base_url: share_base_url.into(),
            tool_router: Self::tool_router(),
        }
    }

    pub fn instructions() -> String {
        "Plans road trips. Call plan_trip with a destination to generate an itinerary \
         grounded in web and map search; generated plans are kept in a history of the ten \
         most recent. Use render_itinerary to turn itinerary text into display blocks and \
         share_plan/open_shared to move plans between users."
            .to_string()
    }

    fn state(&self) -> Result<MutexGuard<'_, AppState>, ErrorData> {
        self.state
            .lock()
            .map_err(|_| ErrorData::internal_error("planner state is unavailable", None))
    }
}

fn plan_json(plan: &Plan) -> Value {
    json!({
        "plan": plan,
        "blocks": render_blocks(&plan.content),
        "links": link_cards(&plan.links),
    })
}

fn summary_json(plan: &Plan) -> Value {
    json!({
        "id": plan.id,
        "title": plan.title(),
        "days": plan.days(),
        "createdAt": plan.created_at.timestamp_millis(),
    })
}

fn history_json(state: &AppState) -> Value {
    let plans: Vec<Value> = state.history().iter().map(summary_json).collect();
    json!({ "plans": plans, "generating": state.in_flight().is_active() })
}

fn not_found(id: &str) -> ErrorData {
    ErrorData::invalid_params(format!("No saved plan with id {id}"), None)
}

#[tool_router]
impl PlannerHandler {
    #[tool(
        name = "plan_trip",
        description = "Generate a road-trip itinerary and save it to history"
    )]
    async fn plan_trip(
        &self,
        Parameters(request): Parameters<PlanRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let (planner, location, guard) = {
            let mut state = self.state()?;
            let guard = state.in_flight().try_begin();
            let Some(guard) = guard else {
                state.complete(Err(PlanError::Busy));
                return Err(ErrorData::internal_error(PlanError::Busy.user_message(), None));
            };
            (state.planner().clone(), state.location(), guard)
        };

        info!(destination = %request.destination, "plan_trip");
        let result = tokio::task::spawn_blocking(move || planner.submit(request, location))
            .await
            .map_err(|e| ErrorData::internal_error(format!("generation task failed: {e}"), None))?;
        let invalid = matches!(result, Err(PlanError::InvalidRequest(_)));

        let mut state = self.state()?;
        let outcome = match state.complete(result) {
            Some(plan) => Ok(CallToolResult::structured(plan_json(plan))),
            None => {
                let message = state
                    .last_error()
                    .unwrap_or(GENERIC_UPSTREAM_MESSAGE)
                    .to_string();
                if invalid {
                    Err(ErrorData::invalid_params(message, None))
                } else {
                    Err(ErrorData::internal_error(message, None))
                }
            }
        };
        drop(guard);
        outcome
    }

    #[tool(
        name = "render_itinerary",
        description = "Split itinerary text into headings, list items, table rows and paragraphs"
    )]
    fn render_itinerary(
        &self,
        Parameters(params): Parameters<RenderParams>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::structured(
            json!({ "blocks": render_blocks(&params.content) }),
        ))
    }

    #[tool(name = "list_history", description = "List saved plans, newest first")]
    fn list_history(&self) -> Result<CallToolResult, ErrorData> {
        let state = self.state()?;
        Ok(CallToolResult::structured(history_json(&state)))
    }

    #[tool(name = "get_plan", description = "Load a saved plan by id")]
    fn get_plan(
        &self,
        Parameters(params): Parameters<PlanIdParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let mut state = self.state()?;
        match state.select(&params.id) {
            Some(plan) => Ok(CallToolResult::structured(plan_json(plan))),
            None => Err(not_found(&params.id)),
        }
    }

    #[tool(name = "delete_plan", description = "Delete a saved plan by id")]
    fn delete_plan(
        &self,
        Parameters(params): Parameters<PlanIdParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let mut state = self.state()?;
        let deleted = state
            .delete(&params.id)
            .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::structured(json!({ "deleted": deleted })))
    }

    #[tool(name = "clear_history", description = "Delete every saved plan")]
    fn clear_history(&self) -> Result<CallToolResult, ErrorData> {
        let mut state = self.state()?;
        state
            .clear_history()
            .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::structured(json!({ "cleared": true })))
    }

    #[tool(
        name = "share_plan",
        description = "Build a share link carrying a plan's text and links"
    )]
    fn share_plan(
        &self,
        Parameters(params): Parameters<ShareParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let state = self.state()?;
        let plan = match params.id.as_deref() {
            Some(id) => state.history().get(id).ok_or_else(|| not_found(id))?,
            None => state
                .current()
                .ok_or_else(|| ErrorData::invalid_params("No plan is open", None))?,
        };
        let base = params.base_url.as_deref().unwrap_or(&self.share_base_url);
        let token =
            share::encode(plan).map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
        let url = share::share_url(base, &token)
            .map_err(|e| ErrorData::invalid_params(e.to_string(), None))?;
        Ok(CallToolResult::structured(
            json!({ "id": plan.id, "token": token, "url": url }),
        ))
    }

    #[tool(
        name = "open_shared",
        description = "Open a plan from a share link or token"
    )]
    fn open_shared(
        &self,
        Parameters(params): Parameters<OpenParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let token = share::token_from_input(&params.input)
            .ok_or_else(|| ErrorData::invalid_params("No share token found", None))?;
        let mut state = self.state()?;
        let plan = state
            .open(&token)
            .map_err(|e| ErrorData::invalid_params(format!("Invalid share token: {e}"), None))?
            .clone();
        if params.save {
            state
                .keep(plan.clone())
                .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
        }
        Ok(CallToolResult::structured(plan_json(&plan)))
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for PlannerHandler {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: PKG_NAME.to_string(),
                version: PKG_VERSION.to_string(),
                ..Implementation::from_build_env()
            },
            instructions: Some(Self::instructions()),
        }
    }

    fn ping(
        &self,
        _ctx: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<(), ErrorData>> + Send {
        ready(Ok(()))
    }

    async fn list_resources(
        &self,
        _req: Option<PaginatedRequestParam>,
        _ctx: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        Ok(ListResourcesResult {
            resources: vec![
                RawResource::new(HISTORY_URI, "Trip history").no_annotation(),
                RawResource::new(CURRENT_URI, "Current plan").no_annotation(),
            ],
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        ReadResourceRequestParam { uri }: ReadResourceRequestParam,
        _ctx: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        let body = {
            let state = self.state()?;
            match uri.as_str() {
                HISTORY_URI => history_json(&state),
                CURRENT_URI => state.current().map(plan_json).unwrap_or(Value::Null),
                _ => {
                    return Err(ErrorData::resource_not_found(
                        "Unknown resource URI",
                        Some(json!({ "uri": uri })),
                    ));
                }
            }
        };
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(body.to_string(), uri)],
        })
    }
}
