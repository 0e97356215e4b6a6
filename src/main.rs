use std::sync::Arc;

use labprep::logging;
use labprep::persist::Store;
use labprep::server;
use labprep::service::PreparationService;
use labprep::settings::Settings;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load()?;
    logging::init(&settings.log.level);

    let store = Store::new(settings.database.mode())?;
    let service = PreparationService::new(Arc::new(store))
        .with_max_practices(settings.selection.max_practices);
    let app = server::router(Arc::new(service), &settings.server)?;

    let address = settings.server.address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(%address, database = %settings.database.path, "labprep listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(server::shutdown_on(tokio::signal::ctrl_c()))
        .await?;
    info!("labprep stopped");
    Ok(())
}
