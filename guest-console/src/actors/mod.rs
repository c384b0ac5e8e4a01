pub mod bridge_session_actor;
pub mod registry_actor;
