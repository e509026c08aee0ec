/// Server configuration loaded from environment variables.
///
/// All fields except the secrets have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Graceful shutdown timeout in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Webhook signing secret shared with the chat platform.
    pub signing_secret: String,
    /// API key for the quote-detection model.
    pub detector_api_key: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default     |
    /// |-------------------------|-------------|
    /// | `HOST`                  | `0.0.0.0`   |
    /// | `PORT`                  | `3000`      |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`        |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`        |
    /// | `SIGNING_SECRET`        | (required)  |
    /// | `DETECTOR_API_KEY`      | (required)  |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let signing_secret =
            std::env::var("SIGNING_SECRET").expect("SIGNING_SECRET must be set");

        let detector_api_key =
            std::env::var("DETECTOR_API_KEY").expect("DETECTOR_API_KEY must be set");

        Self {
            host,
            port,
            request_timeout_secs,
            shutdown_timeout_secs,
            signing_secret,
            detector_api_key,
        }
    }
}
