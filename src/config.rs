//! Startup configuration.
//!
//! Both binaries load a [`Config`] exactly once in `main`, before any client
//! is constructed. A missing required credential makes the process refuse to
//! start; nothing in the crate validates configuration lazily at first use.

use std::env;

use crate::error::AgentError;

/// Default model served by the hosted completion API.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Process-wide configuration, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Credential for the hosted model service. Required by both apps.
    pub gemini_api_key: String,

    /// Credential for the web-search service. Required by the report
    /// generator; the chat assistant does not search.
    pub tavily_api_key: Option<String>,

    /// Model identifier passed to the completion provider.
    pub model: String,

    /// Socket address the web surface binds to; each binary supplies its
    /// own default when unset.
    pub bind_addr: Option<String>,

    /// Command used to spawn the tool sidecar (assistant only). Without it
    /// the assistant runs with no tools.
    pub mcp_command: Option<String>,

    /// Arguments for the sidecar command, whitespace-split from
    /// `MCP_SERVER_ARGS`.
    pub mcp_args: Vec<String>,
}

impl Config {
    /// Load configuration from the environment (and a local `.env` file if
    /// present). Fails when `GEMINI_API_KEY` is missing or empty.
    pub fn from_env() -> Result<Self, AgentError> {
        let _ = dotenvy::dotenv();

        let gemini_api_key = env::var("GEMINI_API_KEY")
            .map_err(|_| AgentError::Config("GEMINI_API_KEY is not set".to_string()))?;

        let config = Self {
            gemini_api_key,
            tavily_api_key: env::var("TAVILY_API_KEY").ok(),
            model: env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            bind_addr: env::var("BIND_ADDR").ok(),
            mcp_command: env::var("MCP_SERVER_COMMAND").ok(),
            mcp_args: env::var("MCP_SERVER_ARGS")
                .map(|raw| raw.split_whitespace().map(String::from).collect())
                .unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check invariants that hold for every application.
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.gemini_api_key.trim().is_empty() {
            return Err(AgentError::Config("GEMINI_API_KEY is empty".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(AgentError::Config("GEMINI_MODEL is empty".to_string()));
        }
        if let Some(addr) = &self.bind_addr {
            addr.parse::<std::net::SocketAddr>().map_err(|_| {
                AgentError::Config(format!("BIND_ADDR is not a socket address: {addr}"))
            })?;
        }
        Ok(())
    }

    /// The search credential, required by the report generator.
    pub fn search_api_key(&self) -> Result<&str, AgentError> {
        match self.tavily_api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(AgentError::Config("TAVILY_API_KEY is not set".to_string())),
        }
    }

    /// Bind address with a per-binary fallback.
    pub fn bind_addr_or(&self, default: &str) -> String {
        self.bind_addr.clone().unwrap_or_else(|| default.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            gemini_api_key: "test-key".to_string(),
            tavily_api_key: Some("tvly-test".to_string()),
            model: DEFAULT_MODEL.to_string(),
            bind_addr: None,
            mcp_command: None,
            mcp_args: vec![],
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn empty_model_rejected() {
        let mut config = test_config();
        config.model = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_bind_addr_rejected() {
        let mut config = test_config();
        config.bind_addr = Some("not-an-addr".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn search_key_required_when_missing() {
        let mut config = test_config();
        config.tavily_api_key = None;
        assert!(config.search_api_key().is_err());

        config.tavily_api_key = Some(String::new());
        assert!(config.search_api_key().is_err());
    }

    #[test]
    fn bind_addr_fallback() {
        let mut config = test_config();
        assert_eq!(config.bind_addr_or("127.0.0.1:9000"), "127.0.0.1:9000");
        config.bind_addr = Some("127.0.0.1:4000".to_string());
        assert_eq!(config.bind_addr_or("127.0.0.1:9000"), "127.0.0.1:4000");
    }
}
