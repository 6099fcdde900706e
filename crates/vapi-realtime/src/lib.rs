mod client;

pub use vapi_realtime_types as types;
pub use client::config::{Config, ConfigBuilder};
pub use client::{CallApi, Client, ControlTx, ServerRx, connect};
