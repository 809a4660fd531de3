use anyhow::Context;
use std::sync::Arc;

use tandem_store::DocumentStore;

use crate::module::{InitCtx, Module};

/// Module registry for managing module lifecycle
///
/// Modules initialize and start in registration order and stop in reverse
/// order, so a module may rely on anything registered before it.
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn Module>>,
}

impl ModuleRegistry {
    /// Create a new module registry
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    /// Register a module with the registry
    pub fn register(&mut self, module: Arc<dyn Module>) {
        self.modules.push(module);
    }

    /// Get all registered modules in registration order
    pub fn modules(&self) -> &[Arc<dyn Module>] {
        &self.modules
    }

    /// Get a module by name
    pub fn get_module(&self, name: &str) -> Option<&Arc<dyn Module>> {
        self.modules.iter().find(|module| module.name() == name)
    }

    /// Collect every collection declared by a module, tagged with its owner
    pub fn collect_collections(&self) -> Vec<(&'static str, &'static str)> {
        let mut collections = Vec::new();
        for module in &self.modules {
            for &collection in module.collections() {
                collections.push((module.name(), collection));
            }
        }
        collections
    }

    /// Ensure every declared collection exists in the store
    pub async fn ensure_collections(&self, store: &Arc<dyn DocumentStore>) -> anyhow::Result<()> {
        for (module, collection) in self.collect_collections() {
            tracing::info!(module, collection, "ensuring store collection");
            store.ensure_collection(collection).await.with_context(|| {
                format!("failed to ensure collection '{collection}' for module '{module}'")
            })?;
        }
        Ok(())
    }

    /// Initialize all modules in registration order
    pub async fn init_all(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!("initializing {} modules", self.modules.len());

        for module in &self.modules {
            tracing::info!(module = module.name(), "initializing module");

            module
                .init(ctx)
                .await
                .with_context(|| format!("failed to initialize module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Start all modules in registration order
    pub async fn start_all(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!("starting {} modules", self.modules.len());

        for module in &self.modules {
            tracing::info!(module = module.name(), "starting module");

            module
                .start(ctx)
                .await
                .with_context(|| format!("failed to start module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Stop all modules in reverse registration order
    pub async fn stop_all(&self) -> anyhow::Result<()> {
        tracing::info!("stopping {} modules", self.modules.len());

        for module in self.modules.iter().rev() {
            tracing::info!(module = module.name(), "stopping module");

            module
                .stop()
                .await
                .with_context(|| format!("failed to stop module '{}'", module.name()))?;
        }

        Ok(())
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use tandem_store::MemoryStore;

    struct TestModule {
        name: &'static str,
    }

    #[async_trait::async_trait]
    impl Module for TestModule {
        fn name(&self) -> &'static str {
            self.name
        }

        fn collections(&self) -> &'static [&'static str] {
            &["test_records"]
        }
    }

    #[test]
    fn registry_starts_empty() {
        let registry = ModuleRegistry::new();
        assert!(registry.modules().is_empty());
        assert!(registry.collect_collections().is_empty());
    }

    #[test]
    fn collections_are_tagged_with_their_module() {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(TestModule { name: "test" }));

        let collections = registry.collect_collections();
        assert_eq!(collections, vec![("test", "test_records")]);
    }

    #[tokio::test]
    async fn module_lifecycle_runs_clean() {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(TestModule { name: "test" }));

        let settings = Settings::default();
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let ctx = InitCtx {
            settings: &settings,
            store: &store,
        };

        registry.ensure_collections(&store).await.unwrap();
        registry.init_all(&ctx).await.unwrap();
        registry.start_all(&ctx).await.unwrap();
        registry.stop_all().await.unwrap();

        assert!(store.list_all("test_records").await.unwrap().is_empty());
    }
}
