use std::time::Duration;

use serde::{Deserialize, Serialize};

/// `modules.api_ingress` section.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ApiIngressConfig {
    pub bind_addr: String,
    #[serde(default)]
    pub enable_docs: bool,
    #[serde(default)]
    pub cors_enabled: bool,
    /// Upper bound for one handler invocation, backend call included.
    #[serde(default = "default_backend_timeout", with = "humantime_serde")]
    pub backend_timeout: Duration,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
    /// Prefix a reverse proxy mounts the API under, e.g. `/api`. Stripped
    /// before route matching.
    #[serde(default)]
    pub base_path: Option<String>,
}

fn default_backend_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_body_limit() -> usize {
    16 * 1024 * 1024
}

impl Default for ApiIngressConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            enable_docs: false,
            cors_enabled: false,
            backend_timeout: default_backend_timeout(),
            body_limit_bytes: default_body_limit(),
            base_path: None,
        }
    }
}

impl ApiIngressConfig {
    /// `base_path` without trailing slash; `None` when unset, empty or `/`.
    pub fn normalized_base_path(&self) -> Option<String> {
        let raw = self.base_path.as_deref()?.trim().trim_end_matches('/');
        if raw.is_empty() {
            return None;
        }
        Some(if raw.starts_with('/') {
            raw.to_string()
        } else {
            format!("/{raw}")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_section_gets_defaults() {
        let cfg: ApiIngressConfig =
            serde_json::from_value(serde_json::json!({"bind_addr": "0.0.0.0:9000"})).unwrap();
        assert_eq!(cfg.backend_timeout, Duration::from_secs(30));
        assert_eq!(cfg.body_limit_bytes, 16 * 1024 * 1024);
        assert!(!cfg.enable_docs);
        assert_eq!(cfg.normalized_base_path(), None);
    }

    #[test]
    fn humantime_timeout_and_base_path() {
        let cfg: ApiIngressConfig = serde_json::from_value(serde_json::json!({
            "bind_addr": "0.0.0.0:9000",
            "backend_timeout": "250ms",
            "base_path": "api/"
        }))
        .unwrap();
        assert_eq!(cfg.backend_timeout, Duration::from_millis(250));
        assert_eq!(cfg.normalized_base_path().as_deref(), Some("/api"));
    }
}
