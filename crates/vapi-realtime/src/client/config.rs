use secrecy::SecretString;
use vapi_realtime_types::AudioFormat;

use crate::client::consts::{BASE_URL, DEFAULT_CAPACITY, VAPI_API_KEY};

pub struct Config {
    base_url: String,
    api_key: SecretString,
    audio_format: AudioFormat,
    capacity: usize,
}

pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: SecretString) -> Self {
        self.config.api_key = api_key;
        self
    }

    pub fn with_audio_format(mut self, audio_format: AudioFormat) -> Self {
        self.config.audio_format = audio_format;
        self
    }

    /// Buffer size of the control and server message channels.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity.max(1);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    // Falls back to an empty key when VAPI_API_KEY is unset; the API rejects the call later.
    pub fn new() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            api_key: std::env::var(VAPI_API_KEY).unwrap_or_default().into(),
            audio_format: AudioFormat::default(),
            capacity: DEFAULT_CAPACITY,
        }
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &SecretString {
        &self.api_key
    }

    pub fn audio_format(&self) -> &AudioFormat {
        &self.audio_format
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_trims_trailing_slash() {
        let config = Config::builder()
            .with_base_url("https://example.test/")
            .with_capacity(0)
            .build();

        assert_eq!(config.base_url(), "https://example.test");
        assert_eq!(config.capacity(), 1);
    }
}
