// Host Simulator - driver.rs
// host-sim/src/driver.rs
use common::envelope::{Envelope, SsoAuthRequest};
use common::models::user::ParentUser;
use common::unix_timestamp_ms;
use uuid::Uuid;

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Send `SSO_AUTH_REQUEST` with a placeholder session token.
    Sso {
        provider: String,
        email: String,
        user_id: String,
    },
    /// Push a user identity via `USER_AUTH`.
    User {
        provider: String,
        email: String,
        id: String,
    },
    /// Send the `REQUEST_SSO_AUTH` readiness probe.
    Probe,
    /// Send `IFRAME_INIT` manually.
    Init,
    Quit,
}

pub const HELP: &str = "commands:\n  sso <provider> <email> <userId>   send SSO_AUTH_REQUEST\n  user <provider> <email> <id>      send USER_AUTH\n  probe                             send REQUEST_SSO_AUTH\n  init                              send IFRAME_INIT\n  quit";

pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut parts = line.split_whitespace();
    match parts.next() {
        Some("sso") => match (parts.next(), parts.next(), parts.next()) {
            (Some(provider), Some(email), Some(user_id)) => Ok(Command::Sso {
                provider: provider.to_string(),
                email: email.to_string(),
                user_id: user_id.to_string(),
            }),
            _ => Err("usage: sso <provider> <email> <userId>".to_string()),
        },
        Some("user") => match (parts.next(), parts.next(), parts.next()) {
            (Some(provider), Some(email), Some(id)) => Ok(Command::User {
                provider: provider.to_string(),
                email: email.to_string(),
                id: id.to_string(),
            }),
            _ => Err("usage: user <provider> <email> <id>".to_string()),
        },
        Some("probe") => Ok(Command::Probe),
        Some("init") => Ok(Command::Init),
        Some("quit") | Some("exit") => Ok(Command::Quit),
        Some(other) => Err(format!("unknown command: {}", other)),
        None => Err(HELP.to_string()),
    }
}

/// Placeholder session token for manual testing; real tokens come from the
/// production host's identity provider.
pub fn placeholder_session_token() -> String {
    format!("dev-session-{}", Uuid::new_v4())
}

/// The host side of the wire contract, kept free of I/O so the protocol
/// reactions are testable: which envelope goes out for each command, and
/// which guest messages trigger an automatic reply.
pub struct HostDriver {
    init_sent: bool,
}

impl HostDriver {
    pub fn new() -> Self {
        Self { init_sent: false }
    }

    /// React to a guest envelope. The load announcement is answered with a
    /// single `IFRAME_INIT`; everything else is log-only.
    pub fn on_envelope(&mut self, envelope: &Envelope) -> Option<Envelope> {
        match envelope {
            Envelope::ConsoleLoaded { url } => {
                tracing::info!("Guest console loaded: {}", url);
                if self.init_sent {
                    return None;
                }
                self.init_sent = true;
                Some(Envelope::IframeInit)
            }
            Envelope::ConsoleReady { url } => {
                tracing::info!("Guest console ready: {}", url);
                None
            }
            Envelope::RequestNavigation { url } => {
                tracing::info!("Guest requests navigation to {} (not simulated)", url);
                None
            }
            _ => None,
        }
    }

    /// Build the outbound envelope for a prompt command.
    pub fn build(&self, command: &Command) -> Option<Envelope> {
        match command {
            Command::Sso {
                provider,
                email,
                user_id,
            } => Some(Envelope::SsoAuthRequest(SsoAuthRequest {
                provider: Some(provider.clone()),
                email: Some(email.clone()),
                user_id: Some(user_id.clone()),
                session_token: Some(placeholder_session_token()),
                timestamp: Some(unix_timestamp_ms()),
            })),
            Command::User {
                provider,
                email,
                id,
            } => Some(Envelope::UserAuth {
                user: ParentUser {
                    auth_provider: provider.clone(),
                    email: email.clone(),
                    id: id.clone(),
                    session_token: Some(placeholder_session_token()),
                },
            }),
            Command::Probe => Some(Envelope::RequestSsoAuth),
            Command::Init => Some(Envelope::IframeInit),
            Command::Quit => None,
        }
    }
}

impl Default for HostDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sso_command() {
        assert_eq!(
            parse_command("sso dmail a@dmail.ai u1"),
            Ok(Command::Sso {
                provider: "dmail".to_string(),
                email: "a@dmail.ai".to_string(),
                user_id: "u1".to_string(),
            })
        );
        assert!(parse_command("sso dmail").is_err());
        assert!(parse_command("frobnicate").is_err());
    }

    #[test]
    fn sso_command_builds_a_complete_request() {
        let driver = HostDriver::new();
        let envelope = driver
            .build(&Command::Sso {
                provider: "dmail".to_string(),
                email: "a@dmail.ai".to_string(),
                user_id: "u1".to_string(),
            })
            .unwrap();
        let Envelope::SsoAuthRequest(request) = envelope else {
            panic!("expected SSO_AUTH_REQUEST");
        };
        // The generated request must pass the guest's validation.
        let creds = request.credentials().unwrap();
        assert_eq!(creds.provider, "dmail");
        assert!(creds.session_token.starts_with("dev-session-"));
        assert!(request.timestamp.is_some());
    }

    #[test]
    fn console_loaded_triggers_exactly_one_init() {
        let mut driver = HostDriver::new();
        let loaded = Envelope::ConsoleLoaded {
            url: "http://guest/embed".to_string(),
        };
        assert_eq!(driver.on_envelope(&loaded), Some(Envelope::IframeInit));
        assert_eq!(driver.on_envelope(&loaded), None);
    }

    #[test]
    fn guest_bound_replies_are_log_only() {
        let mut driver = HostDriver::new();
        assert_eq!(
            driver.on_envelope(&Envelope::ConsoleReady {
                url: "http://guest/embed".to_string()
            }),
            None
        );
    }
}
