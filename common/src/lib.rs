pub mod config;
pub mod envelope;
pub mod models;
pub mod utils;

pub use config::*;
pub use envelope::*;
pub use models::session::{AuthSession, AuthState, TransitionError};
pub use models::user::ParentUser;
pub use utils::*;
