//! Length-prefixed JSON frame transport for tool calls.

pub mod codec;
pub mod router;
pub mod server;

pub use server::IpcServer;
