//! User Service
//!
//! Serves `GET /managing/queries/view-user/{id}` from the `users` collection of
//! the `userService` database. The MongoDB connection string is read from
//! `MONGO_DB_URI` and the port from `SERVER_PORT`.

mod code;
mod managing;
mod user;

use tessera::prelude::*;
use tokio::sync::oneshot;

use crate::code::ERR_CODE_101_DATA_FETCH_FAILED;

const DATABASE: &str = "userService";

#[tokio::main]
async fn main() {
    if let Err(e) = init_logging(&LogConfig::from_env()) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let repository = match Repository::connect_mongodb(DEFAULT_TIMEOUT, DATABASE, None).await {
        Ok(repository) => Arc::new(repository),
        Err(e) => {
            tracing::error!(team = %Team::Ops, error = %e, "Repository unavailable");
            std::process::exit(1);
        }
    };

    let factory = HandlerFactory::new(
        Arc::clone(&repository),
        CodeStatusResponder::new()
            .map(ERR_CODE_101_DATA_FETCH_FAILED, StatusCode::NOT_FOUND)
            .into_responder(),
        // Auth tokens or other security headers would be forwarded here too.
        forward_headers(&[("x-trace-id", "traceId")]),
    );

    let router = Router::new().route(
        "/managing/queries/view-user/",
        factory.query_by_id(managing::view_user),
    );

    let host = match TransportHost::from_env(router) {
        Ok(host) => host,
        Err(e) => {
            tracing::error!(team = %Team::Ops, error = %e, "Invalid server configuration");
            repository.disconnect().await;
            std::process::exit(1);
        }
    };

    let (done_tx, done_rx) = oneshot::channel();
    if let Err(e) = host.start(done_tx).await {
        tracing::error!(team = %Team::Ops, error = %e, "Server failed to start");
        repository.disconnect().await;
        std::process::exit(1);
    }

    let _ = done_rx.await;
    repository.disconnect().await;
}
