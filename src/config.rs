use std::env;

/// Browser-like User-Agent sent to playlist providers unless overridden.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub is_dev: bool,
    /// Timeout for each outbound playlist request, in seconds
    pub fetch_timeout_secs: u64,
    /// Total attempts per playlist fetch (1 = no retry)
    pub fetch_max_attempts: u32,
    /// User-Agent header sent to playlist providers
    pub user_agent: String,
    /// Skip TLS certificate verification on outbound fetches.
    /// IPTV providers routinely serve broken chains, so this defaults to on.
    pub accept_invalid_certs: bool,
}

impl Config {
    /// Load configuration from environment variables
    /// In DEV mode, provides sensible defaults. In PROD mode, PORT is required.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let is_dev = env::var("DEV_MODE")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        // Port: required in prod, defaults to 7860 in dev
        let port = if is_dev {
            env::var("PORT")
                .unwrap_or_else(|_| "7860".to_string())
                .parse()?
        } else {
            env::var("PORT")
                .map_err(|_| "PORT is required in production")?
                .parse()?
        };

        let fetch_timeout_secs = env::var("FETCH_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        let fetch_max_attempts = env::var("FETCH_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "1".to_string())
            .parse()
            .unwrap_or(1);

        let user_agent =
            env::var("FETCH_USER_AGENT").unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string());

        let accept_invalid_certs = env::var("ACCEPT_INVALID_CERTS")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        Ok(Config {
            port,
            is_dev,
            fetch_timeout_secs,
            fetch_max_attempts,
            user_agent,
            accept_invalid_certs,
        })
    }
}
