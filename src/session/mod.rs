//! Session module - sessions and the services that store them

pub mod file;
pub mod service;
#[allow(clippy::module_inception)]
pub mod session;

pub use file::FileSessionService;
pub use service::{InMemorySessionService, SessionService};
pub use session::{Session, SessionRecord};
