//! Service configuration and backend factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use trulearn_core::traits::{DetectionService, QuestionSource, ReferenceStore};

use crate::http::HttpBackend;
use crate::mock::{MockBackend, MockRule};

pub(crate) const DEFAULT_BASE_URL: &str = "http://localhost:5001";
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Where questions and detections come from.
///
/// Note: Custom Debug impl masks the API token to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServiceConfig {
    Http {
        #[serde(default = "default_base_url")]
        base_url: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
        #[serde(default)]
        api_token: Option<String>,
    },
    Mock {
        #[serde(default)]
        rules: Vec<MockRule>,
    },
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceConfig::Http {
                base_url,
                timeout_secs,
                api_token,
            } => f
                .debug_struct("Http")
                .field("base_url", base_url)
                .field("timeout_secs", timeout_secs)
                .field("api_token", &api_token.as_ref().map(|_| "***"))
                .finish(),
            ServiceConfig::Mock { rules } => {
                f.debug_struct("Mock").field("rules", rules).finish()
            }
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig::Http {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            api_token: None,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Top-level TruLearn configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrulearnConfig {
    /// Learner id sent with every answer.
    #[serde(default = "default_student_id")]
    pub student_id: u64,
    /// Max concurrent detection calls. 1 submits strictly in order.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Questions requested per concept when generating.
    #[serde(default = "default_num_variations")]
    pub num_variations: u32,
    /// Output directory for saved attempts.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub service: ServiceConfig,
}

fn default_student_id() -> u64 {
    1
}
fn default_parallelism() -> usize {
    1
}
fn default_num_variations() -> u32 {
    5
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./trulearn-results")
}

impl Default for TrulearnConfig {
    fn default() -> Self {
        Self {
            student_id: default_student_id(),
            parallelism: default_parallelism(),
            num_variations: default_num_variations(),
            output_dir: default_output_dir(),
            service: ServiceConfig::default(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let mut from = 0;
    while let Some(offset) = result[from..].find("${") {
        let start = from + offset;
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let var_name = &result[start + 2..start + end];
        let value = std::env::var(var_name).unwrap_or_default();
        result = format!("{}{}{}", &result[..start], value, &result[start + end + 1..]);
        from = start + value.len();
    }
    result
}

fn resolve_service_config(config: &ServiceConfig) -> ServiceConfig {
    match config {
        ServiceConfig::Http {
            base_url,
            timeout_secs,
            api_token,
        } => {
            let base_url = resolve_env_vars(base_url);
            ServiceConfig::Http {
                base_url: if base_url.trim().is_empty() {
                    default_base_url()
                } else {
                    base_url
                },
                timeout_secs: *timeout_secs,
                api_token: api_token
                    .as_deref()
                    .map(resolve_env_vars)
                    .filter(|t| !t.trim().is_empty()),
            }
        }
        ServiceConfig::Mock { rules } => ServiceConfig::Mock {
            rules: rules.clone(),
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `trulearn.toml` in the current directory
/// 2. `~/.config/trulearn/config.toml`
///
/// `TRULEARN_API_URL` overrides the HTTP base URL.
pub fn load_config() -> Result<TrulearnConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<TrulearnConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("trulearn.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<TrulearnConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => TrulearnConfig::default(),
    };

    if let Ok(url) = std::env::var("TRULEARN_API_URL") {
        if let ServiceConfig::Http { base_url, .. } = &mut config.service {
            *base_url = url;
        }
    }

    config.service = resolve_service_config(&config.service);
    anyhow::ensure!(config.parallelism > 0, "parallelism must be at least 1");

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("trulearn"))
}

/// Question source, detection service and reference store built from one
/// [`ServiceConfig`].
#[derive(Clone)]
pub struct Backend {
    pub questions: Arc<dyn QuestionSource>,
    pub detector: Arc<dyn DetectionService>,
    pub references: Arc<dyn ReferenceStore>,
}

/// Create the backend described by `config`.
pub fn create_backend(config: &ServiceConfig) -> Result<Backend> {
    match config {
        ServiceConfig::Http {
            base_url,
            timeout_secs,
            api_token,
        } => {
            let http = Arc::new(
                HttpBackend::new(base_url, *timeout_secs, api_token.clone())
                    .context("failed to create HTTP backend")?,
            );
            Ok(Backend {
                questions: http.clone(),
                detector: http.clone(),
                references: http,
            })
        }
        ServiceConfig::Mock { rules } => {
            let mock = Arc::new(MockBackend::new(rules.clone()));
            Ok(Backend {
                questions: mock.clone(),
                detector: mock.clone(),
                references: mock,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trulearn_core::model::DetectionType;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_TRULEARN_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_TRULEARN_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_TRULEARN_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("${_TRULEARN_UNSET_VAR}"), "");
        std::env::remove_var("_TRULEARN_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = TrulearnConfig::default();
        assert_eq!(config.student_id, 1);
        assert_eq!(config.parallelism, 1);
        assert_eq!(config.num_variations, 5);
        assert!(matches!(
            config.service,
            ServiceConfig::Http { ref base_url, timeout_secs: 120, api_token: None }
                if base_url == "http://localhost:5001"
        ));
    }

    #[test]
    fn parse_mock_service() {
        let toml_str = r#"
student_id = 42
parallelism = 2

[service]
type = "mock"

[[service.rules]]
contains = "photosynthesis converts"
detection_type = "memorization"
confidence_score = 0.93
reason = "Matches the reference almost word for word"
"#;
        let config: TrulearnConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.student_id, 42);
        assert_eq!(config.parallelism, 2);
        let ServiceConfig::Mock { rules } = &config.service else {
            panic!("expected mock service");
        };
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].detection_type, DetectionType::Memorization);
    }

    #[test]
    fn empty_url_falls_back_to_default() {
        let config = ServiceConfig::Http {
            base_url: "${_TRULEARN_NEVER_SET}".into(),
            timeout_secs: 30,
            api_token: Some("${_TRULEARN_NEVER_SET}".into()),
        };
        match resolve_service_config(&config) {
            ServiceConfig::Http {
                base_url,
                timeout_secs,
                api_token,
            } => {
                assert_eq!(base_url, DEFAULT_BASE_URL);
                assert_eq!(timeout_secs, 30);
                assert!(api_token.is_none());
            }
            ServiceConfig::Mock { .. } => panic!("expected http service"),
        }
    }

    #[test]
    fn debug_masks_token() {
        let config = ServiceConfig::Http {
            base_url: DEFAULT_BASE_URL.into(),
            timeout_secs: 120,
            api_token: Some("secret-token".into()),
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trulearn.toml");
        std::fs::write(&path, "num_variations = 3\n\n[service]\ntype = \"mock\"\n").unwrap();
        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.num_variations, 3);
        assert!(matches!(config.service, ServiceConfig::Mock { .. }));

        let err = load_config_from(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn zero_parallelism_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trulearn.toml");
        std::fs::write(&path, "parallelism = 0\n").unwrap();
        assert!(load_config_from(Some(&path)).is_err());
    }

    #[tokio::test]
    async fn creates_mock_backend() {
        let backend = create_backend(&ServiceConfig::Mock { rules: vec![] }).unwrap();
        assert_eq!(backend.questions.name(), "mock");
        assert_eq!(backend.detector.name(), "mock");
        assert_eq!(backend.references.name(), "mock");
    }

    #[test]
    fn creates_http_backend() {
        let backend = create_backend(&ServiceConfig::default()).unwrap();
        assert_eq!(backend.questions.name(), "http");
    }
}
