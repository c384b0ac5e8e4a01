// Guest Console - actors/bridge_session_actor.rs
// guest-console/src/actors/bridge_session_actor.rs
use actix::fut::wrap_future;
use actix::{
    Actor, ActorContext, ActorFutureExt, Addr, AsyncContext, Handler, StreamHandler,
};
use actix_web_actors::ws;
use common::envelope::Envelope;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::unbounded_channel;
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

use super::registry_actor::{
    OutboundEnvelope, RetryAuthentication, SessionRegistryActor, UnregisterSession,
};
use crate::exchange::{CredentialExchange, SsoLoginParams};
use crate::origin::OriginTrust;
use crate::session::{BridgeSession, Inbound};

/// Transport adapter for one host connection: a websocket actor that pairs
/// every inbound frame with the connection's origin, feeds it to the
/// protocol session, and forwards the session's outbox as text frames.
/// The listener exists exactly for the actor's lifetime; no leak and no
/// duplicate dispatch across connect/disconnect cycles.
pub struct BridgeSessionActor {
    session: BridgeSession,
    /// Origin captured from the connection upgrade, the transport analog
    /// of the message-event origin.
    origin: String,
    client: Arc<dyn CredentialExchange>,
    registry: Addr<SessionRegistryActor>,
    outbox_rx: Option<UnboundedReceiverStream<Envelope>>,
    last_heartbeat: Instant,
}

impl BridgeSessionActor {
    pub fn new(
        session_id: Uuid,
        origin: String,
        url: String,
        trust: Arc<OriginTrust>,
        client: Arc<dyn CredentialExchange>,
        registry: Addr<SessionRegistryActor>,
    ) -> Self {
        let (outbox_tx, outbox_rx) = unbounded_channel();
        Self {
            session: BridgeSession::new(session_id, url, trust, outbox_tx),
            origin,
            client,
            registry,
            outbox_rx: Some(UnboundedReceiverStream::new(outbox_rx)),
            last_heartbeat: Instant::now(),
        }
    }

    fn heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(Duration::from_secs(5), |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > Duration::from_secs(30) {
                tracing::warn!("Host heartbeat timeout: {}", act.session.id());
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn dispatch(&mut self, text: &str, ctx: &mut ws::WebsocketContext<Self>) {
        match self.session.handle_raw(&self.origin, text) {
            Inbound::Ignored | Inbound::Handled => {}
            Inbound::Login(job) => {
                let client = self.client.clone();
                let exchange = async move {
                    let params = SsoLoginParams::from(&job.credentials);
                    client.login(&job.credentials.email, &params).await
                };
                // The session stays `authenticating` while this is in
                // flight; actor stop simply drops it.
                ctx.spawn(wrap_future(exchange).map(|result, act: &mut Self, _ctx| {
                    act.session.finish_login(result);
                }));
            }
        }
    }
}

impl Actor for BridgeSessionActor {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(
            "Host connected: session {} from origin {}",
            self.session.id(),
            self.origin
        );
        self.last_heartbeat = Instant::now();
        self.heartbeat(ctx);

        if let Some(outbox) = self.outbox_rx.take() {
            ctx.add_stream(outbox);
        }

        // Fire-and-forget load announcement, before any origin is trusted.
        self.session.announce();
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("Host disconnected: session {}", self.session.id());
        self.registry.do_send(UnregisterSession {
            session_id: self.session.id(),
        });
    }
}

/// Inbound side: raw websocket frames from the host.
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for BridgeSessionActor {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.last_heartbeat = Instant::now();
                self.dispatch(&text, ctx);
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::info!("Host closing connection: {:?}", reason);
                ctx.close(reason);
            }
            _ => (),
        }
    }
}

/// Outbound side: envelopes queued by the protocol session.
impl StreamHandler<Envelope> for BridgeSessionActor {
    fn handle(&mut self, envelope: Envelope, ctx: &mut Self::Context) {
        if let Some(json) = envelope.to_json() {
            ctx.text(json);
        }
    }
}

/// Envelopes pushed by the registry (broadcasts). Only delivered when this
/// connection's origin is the trusted one.
impl Handler<OutboundEnvelope> for BridgeSessionActor {
    type Result = ();

    fn handle(&mut self, msg: OutboundEnvelope, ctx: &mut Self::Context) -> Self::Result {
        if !self.session.is_trusted(&self.origin) {
            tracing::debug!(
                "Not delivering {} to untrusted origin {}",
                msg.envelope.type_name(),
                self.origin
            );
            return;
        }
        if let Some(json) = msg.envelope.to_json() {
            ctx.text(json);
        }
    }
}

impl Handler<RetryAuthentication> for BridgeSessionActor {
    type Result = ();

    fn handle(&mut self, _msg: RetryAuthentication, _ctx: &mut Self::Context) -> Self::Result {
        match self.session.retry() {
            Ok(()) => tracing::info!("Session {} reset to pending", self.session.id()),
            Err(e) => tracing::warn!("Retry rejected for session {}: {}", self.session.id(), e),
        }
    }
}
