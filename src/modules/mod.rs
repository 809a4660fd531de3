pub mod assignments;
pub mod library;

use std::sync::Arc;

use tandem_kernel::settings::Settings;
use tandem_kernel::ModuleRegistry;
use tandem_lookup::BookLookup;
use tandem_store::DocumentStore;

/// Shared collaborators handed to every module at construction time.
pub struct ModuleDeps {
    pub store: Arc<dyn DocumentStore>,
    pub lookup: Arc<dyn BookLookup>,
    pub settings: Settings,
}

/// Register all project modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, deps: &ModuleDeps) {
    registry.register(library::create_module(deps));
    registry.register(assignments::create_module(deps));
}
