//! Daemon configuration
//!
//! Defaults, overridden by `BINDERY_*` environment variables.

use bindery_api_rpc::RpcAdapterConfig;
use bindery_core::application::ContextOptions;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 9528;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Serve XML when negotiated
    pub xml: bool,
    /// Include error stacks in error bodies (off in production)
    pub expose_stack: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            xml: false,
            expose_stack: true,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from a variable lookup; unparsable values keep their default
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("BINDERY_HOST").unwrap_or(defaults.host),
            port: lookup("BINDERY_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            xml: lookup("BINDERY_XML")
                .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.xml),
            expose_stack: lookup("BINDERY_ENV")
                .map(|env| !env.eq_ignore_ascii_case("production"))
                .unwrap_or(defaults.expose_stack),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn context_options(&self) -> ContextOptions {
        ContextOptions {
            supported_types: None,
            xml: self.xml,
            expose_stack: self.expose_stack,
        }
    }

    pub fn rpc_config(&self) -> RpcAdapterConfig {
        RpcAdapterConfig {
            expose_stack: self.expose_stack,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[]));
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.addr(), "127.0.0.1:9528");
        assert!(!config.context_options().xml);
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("BINDERY_HOST", "0.0.0.0"),
            ("BINDERY_PORT", "8080"),
            ("BINDERY_XML", "true"),
            ("BINDERY_ENV", "production"),
        ]));

        assert_eq!(config.addr(), "0.0.0.0:8080");
        assert!(config.xml);
        assert!(!config.expose_stack);
        assert!(!config.rpc_config().expose_stack);
    }

    #[test]
    fn test_bad_port_keeps_default() {
        let config = ServerConfig::from_lookup(lookup(&[("BINDERY_PORT", "http")]));
        assert_eq!(config.port, 9528);
    }
}
