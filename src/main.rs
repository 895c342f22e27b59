//! # IAM Registry Main Entry Point

use iam_registry::config::ConfigLoader;
use iam_registry::coordinator::Coordinator;
use iam_registry::policy::PolicyClient;
use iam_registry::registry::TypeRegistry;
use iam_registry::server::{AppState, run_server};
use iam_registry::store::ResourceStore;
use iam_registry::{db, seeds, telemetry};
use migration::{Migrator, MigratorTrait};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from layered env files and variables
    let config_loader = ConfigLoader::new();
    let config = config_loader.load()?;

    telemetry::init_tracing(&config)?;

    if let Ok(redacted_json) = config.redacted_json() {
        tracing::info!(profile = %config.profile, configuration = %redacted_json, "configuration loaded");
    }

    let db = db::init_pool(&config).await?;
    Migrator::up(&db, None).await?;

    seeds::seed_resource_types(&db).await?;
    seeds::seed_master_catalog(&db).await?;

    let registry = TypeRegistry::load(&db).await?;
    let policy = PolicyClient::new(config.policy_settings()?)?;
    let coordinator = Coordinator::new(db.clone(), ResourceStore::new(registry), policy);

    let state = AppState { db, coordinator };
    run_server(config, state).await
}
