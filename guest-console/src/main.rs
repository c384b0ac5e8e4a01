// guest-console/src/main.rs
// Guest Console - main.rs

use actix::Actor;
use actix_web::{web, App, HttpServer};
use common::{setup_tracing, Config};
use guest_console::accounts::{watch_accounts, AccountObserver};
use guest_console::actors::registry_actor::SessionRegistryActor;
use guest_console::exchange::{AccountLedger, CredentialExchange, DevCredentialExchange};
use guest_console::origin::OriginTrust;
use guest_console::routing::routes;
use std::sync::Arc;
use std::time::Duration;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Setup tracing
    setup_tracing();

    // Load configuration
    let config = Config::from_env();
    let server_addr = config.guest_server_addr.clone();

    // One trust store per guest process lifetime, shared by every session.
    let trust = web::Data::new(OriginTrust::new(config.sso.allowed_origins.clone()));

    // Linked-account ledger backs both the dev exchange and the observer.
    let ledger = Arc::new(AccountLedger::new());
    let client: Arc<dyn CredentialExchange> = Arc::new(DevCredentialExchange::new(
        ledger.clone(),
        Duration::from_millis(config.sso.dev_exchange_delay_ms),
    ));

    let registry = SessionRegistryActor::new().start();

    // Independent signal path: announce authentication achieved through
    // any means, not just the SSO request flow.
    let observer: Arc<dyn AccountObserver> = ledger;
    tokio::spawn(watch_accounts(
        observer,
        registry.clone(),
        Duration::from_secs(config.sso.account_poll_secs),
    ));

    tracing::info!("Starting Guest Console on {}", server_addr);

    let config_data = web::Data::new(config);
    let registry_data = web::Data::new(registry);
    let client_data = web::Data::new(client);

    HttpServer::new(move || {
        App::new()
            .app_data(registry_data.clone())
            .app_data(trust.clone())
            .app_data(client_data.clone())
            .app_data(config_data.clone())
            .configure(routes)
    })
    .bind(&server_addr)?
    .run()
    .await
}
