use dashmap::DashMap;
use std::env;
use std::sync::Arc;

/// Re-render 4xx/5xx responses that are not Git LFS JSON (router 404/405,
/// extractor rejections)
pub const CONVERT_FOREIGN_ERRORS_KEY: &str = "LFS_ERRORS_CONVERT_FOREIGN";
/// Refuse to install the error handlers twice
pub const STRICT_INSTALL_KEY: &str = "LFS_ERRORS_STRICT_INSTALL";

/// Configuration service
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    /// A service seeded from the process environment
    pub fn from_env() -> Self {
        let service = Self::default();
        for (key, value) in env::vars() {
            service.set(&key, &value);
        }
        service
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }

    /// Read a boolean flag, keeping `default` when unset or unparsable.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        let Some(raw) = self.get(key) else {
            return default;
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                tracing::warn!(key, value = %raw, "Ignoring unparsable boolean setting");
                default
            }
        }
    }
}

/// Settings for the error handling layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorHandlingConfig {
    pub convert_foreign_errors: bool,
    pub strict_install: bool,
}

impl Default for ErrorHandlingConfig {
    fn default() -> Self {
        Self {
            convert_foreign_errors: true,
            strict_install: false,
        }
    }
}

impl ErrorHandlingConfig {
    pub fn from_service(config: &ConfigService) -> Self {
        let defaults = Self::default();
        Self {
            convert_foreign_errors: config
                .get_bool(CONVERT_FOREIGN_ERRORS_KEY, defaults.convert_foreign_errors),
            strict_install: config.get_bool(STRICT_INSTALL_KEY, defaults.strict_install),
        }
    }

    pub fn from_env() -> Self {
        Self::from_service(&ConfigService::from_env())
    }
}
