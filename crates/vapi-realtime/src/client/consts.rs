pub const VAPI_API_KEY: &str = "VAPI_API_KEY";

pub const BASE_URL: &str = "https://api.vapi.ai";
pub const CALL_PATH: &str = "/call";

pub const DEFAULT_CAPACITY: usize = 256;
