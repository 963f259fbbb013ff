use aspen_guide::auth::Authenticator;
use aspen_guide::config::Config;
use aspen_guide::store::SqliteStore;
use aspen_guide::{AppState, Error, Server, routes, telemetry};

#[tokio::main]
async fn main() -> Result<(), Error> {
    telemetry::setup_tracing();

    let config = Config::load()?;

    let store = SqliteStore::connect(&config.database_url).await?;
    store.ensure_schema().await?;

    let state = AppState::new(store, Authenticator::from_config(&config));

    Server::bind(config.addr).serve(routes::app(state)).await
}
