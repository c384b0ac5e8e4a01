// Common Crate - envelope.rs
// common/src/envelope.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::user::ParentUser;

/// Every message crossing the host/guest boundary is one of these variants,
/// discriminated by the `type` field on the wire. Parsing happens exactly
/// once, at the transport boundary; anything that does not match a known
/// variant is treated as absent, never as an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Envelope {
    /// Guest -> host: sent unconditionally when the guest session starts.
    #[serde(rename = "CONSOLE_LOADED")]
    ConsoleLoaded { url: String },

    /// Guest -> host: readiness acknowledgment, reply to `IFRAME_INIT`.
    /// Distinct from the load announcement for compatibility with both
    /// host-side integration styles.
    #[serde(rename = "CONSOLE_READY")]
    ConsoleReady { url: String },

    /// Host -> guest: host asks the guest to (re)announce readiness.
    #[serde(rename = "IFRAME_INIT")]
    IframeInit,

    /// Host -> guest: host pushes the identity of the embedding user.
    #[serde(rename = "USER_AUTH")]
    UserAuth { user: ParentUser },

    /// Guest -> host: echo confirming receipt of `USER_AUTH`.
    #[serde(rename = "AUTH_RECEIVED")]
    AuthReceived { user: ParentUser },

    /// Host -> guest: readiness probe for the SSO channel. Answered from
    /// any state, never causes a transition.
    #[serde(rename = "REQUEST_SSO_AUTH")]
    RequestSsoAuth,

    /// Guest -> host: reply to the readiness probe.
    #[serde(rename = "REQUEST_SSO_AUTH_RESPONSE")]
    RequestSsoAuthResponse { status: ReadyStatus },

    /// Host -> guest: SSO credentials to authenticate with. Fields are
    /// individually optional on the wire so an incomplete request still
    /// parses and can be rejected with an error naming the provider.
    #[serde(rename = "SSO_AUTH_REQUEST")]
    SsoAuthRequest(SsoAuthRequest),

    /// Guest -> host: progress updates during authentication, and the
    /// account-observer signal when a session appears through other means.
    #[serde(rename = "AUTH_STATUS")]
    AuthStatus {
        status: AuthStatusKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        email: Option<String>,
    },

    /// Guest -> host: final outcome of one SSO authentication attempt.
    #[serde(rename = "SSO_AUTH_COMPLETE")]
    SsoAuthComplete {
        status: CompletionStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        email: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// Guest -> host: guest asks the host to navigate the outer page.
    #[serde(rename = "REQUEST_NAVIGATION")]
    RequestNavigation { url: String },
}

/// Status value carried by `REQUEST_SSO_AUTH_RESPONSE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadyStatus {
    Ready,
}

/// Status value carried by `AUTH_STATUS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthStatusKind {
    Authenticating,
    Authenticated,
    Failed,
}

/// Status value carried by `SSO_AUTH_COMPLETE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    Success,
    Error,
}

/// Payload of `SSO_AUTH_REQUEST`. Validation is separate from parsing:
/// `credentials()` enforces the all-four-fields rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsoAuthRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// Fully validated SSO credentials, guaranteed to have all four fields.
#[derive(Debug, Clone, PartialEq)]
pub struct SsoCredentials {
    pub provider: String,
    pub email: String,
    pub user_id: String,
    pub session_token: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CredentialError {
    #[error("missing required SSO credentials for provider {provider}")]
    Missing { provider: String },
}

impl SsoAuthRequest {
    /// Validate the request against the all-fields-present rule. A request
    /// missing any of provider/email/userId/sessionToken is rejected with
    /// an error naming the provider (`unknown` when absent).
    pub fn credentials(&self) -> Result<SsoCredentials, CredentialError> {
        let provider_name = || {
            self.provider
                .clone()
                .unwrap_or_else(|| "unknown".to_string())
        };
        match (
            self.provider.as_ref(),
            self.email.as_ref(),
            self.user_id.as_ref(),
            self.session_token.as_ref(),
        ) {
            (Some(provider), Some(email), Some(user_id), Some(session_token))
                if !provider.is_empty()
                    && !email.is_empty()
                    && !user_id.is_empty()
                    && !session_token.is_empty() =>
            {
                Ok(SsoCredentials {
                    provider: provider.clone(),
                    email: email.clone(),
                    user_id: user_id.clone(),
                    session_token: session_token.clone(),
                })
            }
            _ => Err(CredentialError::Missing {
                provider: provider_name(),
            }),
        }
    }
}

impl Envelope {
    /// Parse one raw frame into a typed envelope. Unknown `type` values and
    /// shapes that do not match the table yield `None`; the caller drops the
    /// message without surfacing an error.
    pub fn parse(raw: &str) -> Option<Envelope> {
        match serde_json::from_str(raw) {
            Ok(envelope) => Some(envelope),
            Err(e) => {
                tracing::debug!("Ignoring unparseable envelope: {}", e);
                None
            }
        }
    }

    /// Serialize for the wire. The envelope types are plain data; failure
    /// here would mean a non-string key or similar construction bug, so the
    /// error is logged and the frame dropped rather than propagated.
    pub fn to_json(&self) -> Option<String> {
        match serde_json::to_string(self) {
            Ok(json) => Some(json),
            Err(e) => {
                tracing::error!("Failed to serialize envelope: {}", e);
                None
            }
        }
    }

    /// Wire-level `type` tag, used for logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Envelope::ConsoleLoaded { .. } => "CONSOLE_LOADED",
            Envelope::ConsoleReady { .. } => "CONSOLE_READY",
            Envelope::IframeInit => "IFRAME_INIT",
            Envelope::UserAuth { .. } => "USER_AUTH",
            Envelope::AuthReceived { .. } => "AUTH_RECEIVED",
            Envelope::RequestSsoAuth => "REQUEST_SSO_AUTH",
            Envelope::RequestSsoAuthResponse { .. } => "REQUEST_SSO_AUTH_RESPONSE",
            Envelope::SsoAuthRequest(_) => "SSO_AUTH_REQUEST",
            Envelope::AuthStatus { .. } => "AUTH_STATUS",
            Envelope::SsoAuthComplete { .. } => "SSO_AUTH_COMPLETE",
            Envelope::RequestNavigation { .. } => "REQUEST_NAVIGATION",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_console_loaded() {
        let raw = r#"{"type":"CONSOLE_LOADED","url":"https://console.example/embed"}"#;
        assert_eq!(
            Envelope::parse(raw),
            Some(Envelope::ConsoleLoaded {
                url: "https://console.example/embed".to_string()
            })
        );
    }

    #[test]
    fn parses_unit_variants() {
        assert_eq!(
            Envelope::parse(r#"{"type":"IFRAME_INIT"}"#),
            Some(Envelope::IframeInit)
        );
        assert_eq!(
            Envelope::parse(r#"{"type":"REQUEST_SSO_AUTH"}"#),
            Some(Envelope::RequestSsoAuth)
        );
    }

    #[test]
    fn unknown_type_is_ignored() {
        assert_eq!(Envelope::parse(r#"{"type":"SOMETHING_ELSE","x":1}"#), None);
        assert_eq!(Envelope::parse("not json at all"), None);
        assert_eq!(Envelope::parse(r#"{"no_type":true}"#), None);
    }

    #[test]
    fn extra_fields_are_ignored() {
        let raw = r#"{"type":"IFRAME_INIT","debug":true,"nonce":"abc"}"#;
        assert_eq!(Envelope::parse(raw), Some(Envelope::IframeInit));
    }

    #[test]
    fn sso_request_uses_camel_case_on_the_wire() {
        let raw = r#"{
            "type": "SSO_AUTH_REQUEST",
            "provider": "dmail",
            "email": "a@dmail.ai",
            "userId": "u1",
            "sessionToken": "t1",
            "timestamp": 1724563200000
        }"#;
        let Some(Envelope::SsoAuthRequest(req)) = Envelope::parse(raw) else {
            panic!("expected SSO_AUTH_REQUEST");
        };
        assert_eq!(req.user_id.as_deref(), Some("u1"));
        assert_eq!(req.session_token.as_deref(), Some("t1"));
        let creds = req.credentials().unwrap();
        assert_eq!(creds.provider, "dmail");
        assert_eq!(creds.email, "a@dmail.ai");
    }

    #[test]
    fn incomplete_sso_request_still_parses_but_fails_validation() {
        let raw = r#"{"type":"SSO_AUTH_REQUEST","provider":"dmail","email":"a@dmail.ai","userId":"u1"}"#;
        let Some(Envelope::SsoAuthRequest(req)) = Envelope::parse(raw) else {
            panic!("expected SSO_AUTH_REQUEST");
        };
        let err = req.credentials().unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing required SSO credentials for provider dmail"
        );
    }

    #[test]
    fn missing_provider_renders_as_unknown() {
        let req = SsoAuthRequest {
            email: Some("a@dmail.ai".to_string()),
            ..Default::default()
        };
        let err = req.credentials().unwrap_err();
        assert!(err.to_string().ends_with("for provider unknown"));
    }

    #[test]
    fn auth_status_serializes_lowercase_and_omits_absent_email() {
        let json = Envelope::AuthStatus {
            status: AuthStatusKind::Authenticated,
            email: None,
        }
        .to_json()
        .unwrap();
        assert_eq!(json, r#"{"type":"AUTH_STATUS","status":"authenticated"}"#);
    }

    #[test]
    fn sso_complete_round_trips() {
        let envelope = Envelope::SsoAuthComplete {
            status: CompletionStatus::Error,
            email: Some("a@dmail.ai".to_string()),
            error: Some("Client not initialized".to_string()),
        };
        let json = envelope.to_json().unwrap();
        assert!(json.contains(r#""status":"error""#));
        assert_eq!(Envelope::parse(&json), Some(envelope));
    }
}
