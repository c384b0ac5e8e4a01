// common/src/models/user.rs
use serde::{Deserialize, Serialize};

/// Identity of the user on the embedding host, pushed to the guest via
/// `USER_AUTH`. Owned by the guest context once received; a new `USER_AUTH`
/// overwrites the previous record wholesale. Consumers only read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentUser {
    /// Name of the identity provider on the host side.
    pub auth_provider: String,
    pub email: String,
    /// Host-side user identifier, opaque to the guest.
    pub id: String,
    /// Host-issued session token; verification happens server-side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}
