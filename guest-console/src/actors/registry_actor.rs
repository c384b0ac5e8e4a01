// Guest Console - actors/registry_actor.rs
// guest-console/src/actors/registry_actor.rs
use actix::{Actor, Addr, Context, Handler, Message};
use common::envelope::Envelope;
use dashmap::DashMap;
use uuid::Uuid;

use super::bridge_session_actor::BridgeSessionActor;

/// Message for session registration
#[derive(Message)]
#[rtype(result = "()")]
pub struct RegisterSession {
    pub session_id: Uuid,
    pub addr: Addr<BridgeSessionActor>,
}

/// Message for session unregistration
#[derive(Message)]
#[rtype(result = "()")]
pub struct UnregisterSession {
    pub session_id: Uuid,
}

/// Envelope pushed to a session actor for delivery to its host. Delivery
/// is still origin-gated inside the session actor.
#[derive(Message, Debug, Clone)]
#[rtype(result = "()")]
pub struct OutboundEnvelope {
    pub envelope: Envelope,
}

/// Broadcast an envelope to every live session. Used for signals that do
/// not originate from any single connection, like the account observer.
#[derive(Message)]
#[rtype(result = "()")]
pub struct BroadcastEnvelope {
    pub envelope: Envelope,
}

/// User-initiated retry of a failed authentication on one session.
#[derive(Message)]
#[rtype(result = "bool")]
pub struct RetrySession {
    pub session_id: Uuid,
}

/// Retry forwarded to the owning session actor.
#[derive(Message)]
#[rtype(result = "()")]
pub struct RetryAuthentication;

/// Directory of live host sessions for this guest process.
pub struct SessionRegistryActor {
    sessions: DashMap<Uuid, Addr<BridgeSessionActor>>,
}

impl SessionRegistryActor {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }
}

impl Default for SessionRegistryActor {
    fn default() -> Self {
        Self::new()
    }
}

impl Actor for SessionRegistryActor {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("Session registry started");
    }
}

impl Handler<RegisterSession> for SessionRegistryActor {
    type Result = ();

    fn handle(&mut self, msg: RegisterSession, _ctx: &mut Self::Context) -> Self::Result {
        tracing::info!("Registering session: {}", msg.session_id);
        self.sessions.insert(msg.session_id, msg.addr);
    }
}

impl Handler<UnregisterSession> for SessionRegistryActor {
    type Result = ();

    fn handle(&mut self, msg: UnregisterSession, _ctx: &mut Self::Context) -> Self::Result {
        tracing::info!("Unregistering session: {}", msg.session_id);
        self.sessions.remove(&msg.session_id);
    }
}

impl Handler<BroadcastEnvelope> for SessionRegistryActor {
    type Result = ();

    fn handle(&mut self, msg: BroadcastEnvelope, _ctx: &mut Self::Context) -> Self::Result {
        tracing::debug!(
            "Broadcasting {} to {} session(s)",
            msg.envelope.type_name(),
            self.sessions.len()
        );
        for entry in self.sessions.iter() {
            entry.value().do_send(OutboundEnvelope {
                envelope: msg.envelope.clone(),
            });
        }
    }
}

impl Handler<RetrySession> for SessionRegistryActor {
    type Result = bool;

    fn handle(&mut self, msg: RetrySession, _ctx: &mut Self::Context) -> Self::Result {
        match self.sessions.get(&msg.session_id) {
            Some(entry) => {
                entry.value().do_send(RetryAuthentication);
                true
            }
            None => {
                tracing::warn!("Retry for unknown session: {}", msg.session_id);
                false
            }
        }
    }
}
