//! Tracing setup shared by the keepalive binaries.

mod subscriber;

pub use subscriber::{LogFormat, init, init_with_level};
