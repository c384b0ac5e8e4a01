// Guest Console - origin.rs
// guest-console/src/origin.rs
use std::sync::{PoisonError, RwLock};

/// Outcome of checking one inbound message's origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginDecision {
    /// No origin was trusted yet; this one has just been recorded.
    Established,
    /// Origin matches the trusted origin.
    Accepted,
    /// Origin mismatch, or not on the configured allow-list. The message
    /// must be dropped silently.
    Rejected,
}

/// First-observed-origin trust store, shared by every session of one guest
/// process. The trusted origin is written at most once per process lifetime
/// and never reset without a restart.
///
/// An explicit object rather than ambient state: created in `main`, handed
/// to the transport layer by reference.
pub struct OriginTrust {
    /// Origins that may become trusted. Empty means first-sender-wins,
    /// preserving the legacy embed behavior where the host origin is not
    /// known until the first message arrives.
    allowed: Vec<String>,
    trusted: RwLock<Option<String>>,
}

impl OriginTrust {
    pub fn new(allowed: Vec<String>) -> Self {
        Self {
            allowed,
            trusted: RwLock::new(None),
        }
    }

    /// Trust whichever origin sends the first message.
    pub fn first_come() -> Self {
        Self::new(Vec::new())
    }

    /// Check an inbound origin, recording it as trusted if it is the first
    /// acceptable one observed.
    pub fn evaluate(&self, origin: &str) -> OriginDecision {
        {
            let trusted = self.trusted.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(trusted) = trusted.as_deref() {
                return if trusted == origin {
                    OriginDecision::Accepted
                } else {
                    OriginDecision::Rejected
                };
            }
        }

        if !self.allowed.is_empty() && !self.allowed.iter().any(|a| a == origin) {
            tracing::warn!("Origin {} is not on the allow-list, rejecting", origin);
            return OriginDecision::Rejected;
        }

        let mut trusted = self.trusted.write().unwrap_or_else(PoisonError::into_inner);
        match trusted.as_deref() {
            // Lost the establishment race to another session.
            Some(existing) if existing == origin => OriginDecision::Accepted,
            Some(_) => OriginDecision::Rejected,
            None => {
                tracing::info!("Trusted origin established: {}", origin);
                *trusted = Some(origin.to_string());
                OriginDecision::Established
            }
        }
    }

    pub fn trusted_origin(&self) -> Option<String> {
        self.trusted
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether the given origin is the trusted one. False while no origin
    /// has been established.
    pub fn is_trusted(&self, origin: &str) -> bool {
        self.trusted_origin().as_deref() == Some(origin)
    }
}
