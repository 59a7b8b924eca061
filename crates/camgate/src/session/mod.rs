//! Camera session lifecycle and serialized device access.

pub mod manager;
pub mod types;

pub use manager::{OperationTicket, SessionManager};
pub use types::{SessionState, SessionStatus, SessionTransition};
