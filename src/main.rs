use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use tandem_app::ModuleDeps;
use tandem_kernel::settings::{Settings, StoreBackend};
use tandem_kernel::{InitCtx, ModuleRegistry};
use tandem_lookup::{BookLookup, GoogleBooksClient};
use tandem_store::{DocumentStore, JsonStore, MemoryStore};

#[derive(Debug, Parser)]
#[command(name = "tandem-app", about = "Two-reader shared book tracker")]
struct Args {
    /// Directory holding base.toml and the environment overlays
    #[arg(long)]
    config_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let settings = Settings::load_from(args.config_dir)
        .with_context(|| "failed to load TANDEM settings")?;
    tandem_telemetry::init(&settings.telemetry);

    tracing::info!(
        env = ?settings.environment,
        store = ?settings.store.backend,
        "tandem-app bootstrap starting"
    );

    let store: Arc<dyn DocumentStore> = match settings.store.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::Json => Arc::new(
            JsonStore::open(&settings.store.data_dir)
                .await
                .with_context(|| {
                    format!("failed to open json store at '{}'", settings.store.data_dir)
                })?,
        ),
    };

    let lookup: Arc<dyn BookLookup> = Arc::new(
        GoogleBooksClient::new(
            settings.lookup.base_url.clone(),
            Duration::from_millis(settings.lookup.request_timeout_ms),
        )
        .with_context(|| "failed to build the book lookup client")?,
    );

    let deps = ModuleDeps {
        store: store.clone(),
        lookup,
        settings: settings.clone(),
    };
    let mut registry = ModuleRegistry::new();
    tandem_app::register_all(&mut registry, &deps);

    registry.ensure_collections(&store).await?;

    let ctx = InitCtx {
        settings: &settings,
        store: &store,
    };
    registry.init_all(&ctx).await?;
    registry.start_all(&ctx).await?;

    tracing::info!("tandem-app bootstrap complete");

    tandem_http::start_server(&registry, &settings).await?;

    registry.stop_all().await?;
    Ok(())
}
