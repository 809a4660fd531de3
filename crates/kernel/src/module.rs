use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use tandem_store::DocumentStore;

/// Context provided to modules during initialization and startup
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
    pub store: &'a Arc<dyn DocumentStore>,
}

/// Core module trait that all TANDEM modules must implement
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name for this module
    fn name(&self) -> &'static str;

    /// Initialize the module with the provided context
    /// Called during application startup after collections exist
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Return the Axum router for this module's routes
    /// Routes will be mounted under `/api/{module_name}`
    fn routes(&self) -> Router {
        Router::new()
    }

    /// Return OpenAPI specification fragment for this module as JSON
    /// Will be merged with other modules' specs
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Document-store collections this module owns
    /// Ensured in the store before any module is initialized
    fn collections(&self) -> &'static [&'static str] {
        &[]
    }

    /// Start background tasks for this module
    /// Called after every module has initialized
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Stop the module and clean up resources
    /// Called during application shutdown
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
