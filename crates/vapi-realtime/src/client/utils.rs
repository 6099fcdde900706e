use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;

use crate::client::config::Config;
use crate::client::consts::CALL_PATH;

pub fn call_url(config: &Config) -> String {
    format!("{}{}", config.base_url(), CALL_PATH)
}

// The transport URL returned by the API is already authorized for this call.
pub fn websocket_request(url: &str) -> tokio_tungstenite::tungstenite::Result<Request> {
    url.into_client_request()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_url_joins_base_and_path() {
        let config = Config::builder().with_base_url("https://api.vapi.ai/").build();
        assert_eq!(call_url(&config), "https://api.vapi.ai/call");
    }

    #[test]
    fn websocket_request_rejects_garbage() {
        assert!(websocket_request("not a url").is_err());
        assert!(websocket_request("wss://api.vapi.ai/call-1/transport").is_ok());
    }
}
