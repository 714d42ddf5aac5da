//! JSON command processor for the jotter notes store.

pub mod dispatch;
pub mod protocol;

pub use dispatch::{Context, run};
pub use protocol::{Envelope, ProtocolError, Request, Response};
