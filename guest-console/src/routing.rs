// Guest Console - routing.rs
// guest-console/src/routing.rs
use actix::Addr;
use actix_web::http::header;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use common::Config;
use std::sync::Arc;
use uuid::Uuid;

use crate::actors::bridge_session_actor::BridgeSessionActor;
use crate::actors::registry_actor::{RegisterSession, RetrySession, SessionRegistryActor};
use crate::exchange::CredentialExchange;
use crate::origin::OriginTrust;

/// Configure routes for the guest console server
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/embed").route(web::get().to(embed_ws_route)))
        .service(
            web::resource("/sessions/{session_id}/retry").route(web::post().to(retry_route)),
        );
}

/// Websocket route for embedding hosts. The Origin header captured here is
/// the transport analog of the message-event origin; a host that sends
/// none is recorded as the opaque origin "null".
async fn embed_ws_route(
    req: HttpRequest,
    stream: web::Payload,
    registry: web::Data<Addr<SessionRegistryActor>>,
    trust: web::Data<OriginTrust>,
    client: web::Data<Arc<dyn CredentialExchange>>,
    config: web::Data<Config>,
) -> Result<HttpResponse, Error> {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("null")
        .to_string();

    let session_id = Uuid::new_v4();
    let url = format!("http://{}/embed", config.guest_server_addr);

    let actor = BridgeSessionActor::new(
        session_id,
        origin,
        url,
        trust.clone().into_inner(),
        client.get_ref().clone(),
        registry.get_ref().clone(),
    );

    ws::start_with_addr(actor, &req, stream).map(|(addr, resp)| {
        registry.do_send(RegisterSession { session_id, addr });
        resp
    })
}

/// The user-facing retry action: resets a failed session to pending.
async fn retry_route(
    path: web::Path<Uuid>,
    registry: web::Data<Addr<SessionRegistryActor>>,
) -> Result<HttpResponse, Error> {
    let session_id = path.into_inner();
    match registry.send(RetrySession { session_id }).await {
        Ok(true) => Ok(HttpResponse::Accepted().finish()),
        Ok(false) => Ok(HttpResponse::NotFound().finish()),
        Err(e) => {
            tracing::error!("Registry unavailable: {}", e);
            Ok(HttpResponse::InternalServerError().finish())
        }
    }
}
