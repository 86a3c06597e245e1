//! HTTP, WebSocket and SSE surface
//!
//! Control endpoints under `/api`, the delivery channel at `/ws/stream` and
//! the session event stream at `/events`.

pub mod handlers;
pub mod server;
pub mod sse;
pub mod ws;

pub use server::{create_router, run, AppContext};
