//! YAML parsing and validation.
//!
//! Parses batch.yaml and validates structural constraints:
//! - Version must be "1.0"
//! - Name must not be empty
//! - At least one request, each with a unique id and a non-empty script

use super::types::BatchConfig;
use std::collections::HashSet;
use std::path::Path;

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Parse a batch.yaml file from disk.
pub fn parse_config_file(path: &Path) -> Result<BatchConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    parse_config(&content)
}

/// Parse a batch.yaml from a string.
pub fn parse_config(yaml: &str) -> Result<BatchConfig, String> {
    serde_yaml_ng::from_str(yaml).map_err(|e| format!("YAML parse error: {}", e))
}

/// Validate a parsed config. Returns a list of errors (empty = valid).
pub fn validate_config(config: &BatchConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.version != "1.0" {
        errors.push(ValidationError {
            message: format!("version must be \"1.0\", got \"{}\"", config.version),
        });
    }

    if config.name.is_empty() {
        errors.push(ValidationError {
            message: "name must not be empty".to_string(),
        });
    }

    if config.requests.is_empty() {
        errors.push(ValidationError {
            message: "batch has no requests".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for (i, req) in config.requests.iter().enumerate() {
        if req.id.is_empty() {
            errors.push(ValidationError {
                message: format!("request #{} has an empty id", i + 1),
            });
        } else if !seen.insert(req.id.as_str()) {
            errors.push(ValidationError {
                message: format!("duplicate request id '{}'", req.id),
            });
        }
        if req.script.trim().is_empty() {
            errors.push(ValidationError {
                message: format!("request '{}' has an empty script", req.id),
            });
        }
    }

    if let Some(ref target) = config.target {
        if target.addr.is_empty() {
            errors.push(ValidationError {
                message: "target addr must not be empty".to_string(),
            });
        }
    }

    errors
}
