pub mod session;

pub use session::{IvySession, Session, SessionGuard};
