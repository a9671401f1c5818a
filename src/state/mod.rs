//! State module - the shared key/value record of a session

pub mod delta;
pub mod store;

pub use delta::StateDelta;
pub use store::{StateSnapshot, StateStore};
