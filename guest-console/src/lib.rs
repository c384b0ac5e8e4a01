pub mod accounts;
pub mod actors;
pub mod exchange;
pub mod handshake;
pub mod origin;
pub mod routing;
pub mod session;
pub mod sso;
