//now people using the types library can use these types
pub mod call;
pub mod messages;

//re-export types for easier access
pub use call::{AudioFormat, Call, CallTransport, CreateCallRequest, TransportRequest};
pub use messages::{ControlMessage, ServerMessage};
