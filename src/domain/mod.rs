pub mod entities;
pub mod errors;
pub mod ports;
pub mod session;

pub use entities::*;
pub use errors::{DomainError, Result};
pub use session::{SessionEvent, SessionPhase};
