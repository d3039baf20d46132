use rmcp::{ServiceExt, transport::stdio};
use tracing::{error, info};

use crate::error::{ServiceError, ServiceResult};
use crate::handler::PlannerHandler;
use crate::metadata::{PKG_NAME, PKG_VERSION};

/// Serves the planner tools over stdio until the client disconnects.
pub async fn start_server(handler: PlannerHandler) -> ServiceResult<()> {
    info!("Starting {PKG_NAME} MCP server v{PKG_VERSION} on stdio");

    let service = handler.serve(stdio()).await.map_err(|e| {
        error!(error = %e, "MCP handshake failed");
        ServiceError::FromString(e.to_string())
    })?;
    let reason = service
        .waiting()
        .await
        .map_err(|e| ServiceError::FromString(e.to_string()))?;
    info!(?reason, "MCP server stopped");
    Ok(())
}
