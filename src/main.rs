use classcredits::{
    api::{self, AppState},
    config::{self, database},
    core::user,
    errors::Result,
};
use dotenvy::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load config.toml
    let app_config = config::settings::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;
    info!(
        bind_address = %app_config.server.bind_address,
        plans = app_config.plans.len(),
        "Loaded configuration"
    );

    // 4. Connect and create missing tables
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database schema ready"))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Bootstrap the platform superadmin
    if let Some(bootstrap) = &app_config.bootstrap {
        let admin =
            user::ensure_superadmin(&db, &bootstrap.superadmin_email, &bootstrap.superadmin_name)
                .await
                .inspect_err(|e| error!("Failed to bootstrap superadmin: {}", e))?;
        info!(user_id = admin.id, "Superadmin ready");
    }

    // 6. Serve until Ctrl-C
    let bind_address = app_config.server.bind_address.clone();
    api::serve(AppState::new(db, app_config), &bind_address).await
}
