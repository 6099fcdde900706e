pub mod config;
pub mod console;
pub mod system_dialer;
pub mod terminal;
pub mod vapi_adapter;

pub use vapi_realtime::types as vapi_types;
