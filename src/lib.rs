pub mod api;
pub mod commands;
pub mod config;
pub mod logging;
pub mod models;
pub mod workflows;

use std::sync::Arc;

use api::{ApiClient, ApiError};
use config::ClientConfig;
use workflows::Workflow;

/// Builds the HTTP client for `config` and starts a workflow over it. The
/// startup statistics refresh runs in the background.
pub fn connect(config: ClientConfig) -> Result<Workflow, ApiError> {
    let client = ApiClient::new(config)?;
    Ok(Workflow::start(Arc::new(client)))
}
