// Guest Console - accounts.rs
// guest-console/src/accounts.rs
use actix::Addr;
use std::sync::Arc;
use std::time::Duration;

use crate::actors::registry_actor::{BroadcastEnvelope, SessionRegistryActor};
use crate::exchange::AccountLedger;
use crate::sso::AccountWatch;

/// Read-only view of the externally observed authentication result: the
/// number of currently linked accounts.
pub trait AccountObserver: Send + Sync {
    fn linked_accounts(&self) -> usize;
}

impl AccountObserver for AccountLedger {
    fn linked_accounts(&self) -> usize {
        AccountLedger::linked_accounts(self)
    }
}

/// Poll the observer and broadcast `AUTH_STATUS{authenticated}` to every
/// live session when the linked-account count becomes non-zero. Runs for
/// the guest process lifetime.
pub async fn watch_accounts(
    observer: Arc<dyn AccountObserver>,
    registry: Addr<SessionRegistryActor>,
    poll: Duration,
) {
    let mut watch = AccountWatch::new();
    let mut interval = tokio::time::interval(poll);
    loop {
        interval.tick().await;
        if let Some(envelope) = watch.observe(observer.linked_accounts()) {
            tracing::info!("Linked account detected, notifying hosts");
            registry.do_send(BroadcastEnvelope { envelope });
        }
    }
}
