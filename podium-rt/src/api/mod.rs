//! HTTP and WebSocket API

pub mod handlers;
pub mod server;
pub mod stream;

pub use server::{build_router, AppContext};
