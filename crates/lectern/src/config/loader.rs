use std::path::Path;

use secrecy::SecretString;
use url::Url;

use crate::config::schema::Config;
use crate::error::ConfigError;
use crate::secrets::{SecretError, SecretSource};

const SCHEMA_JSON: &str = include_str!("../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.worker_count == 0 {
        return Err(ConfigError::Validation {
            message: "worker_count must be at least 1".to_string(),
        });
    }

    if config.max_job_attempts == 0 {
        return Err(ConfigError::Validation {
            message: "max_job_attempts must be at least 1".to_string(),
        });
    }

    let timeouts = &config.timeouts;
    for (name, secs) in [
        ("fast_path_secs", timeouts.fast_path_secs),
        ("extraction_secs", timeouts.extraction_secs),
        ("metadata_secs", timeouts.metadata_secs),
        ("transcript_secs", timeouts.transcript_secs),
        ("ai_secs", timeouts.ai_secs),
    ] {
        if secs == 0 {
            return Err(ConfigError::Validation {
                message: format!("timeouts.{} must be positive", name),
            });
        }
    }

    if config
        .server
        .bind
        .parse::<std::net::SocketAddr>()
        .is_err()
    {
        return Err(ConfigError::Validation {
            message: format!("server.bind is not a socket address: {}", config.server.bind),
        });
    }

    let mut urls = vec![
        ("youtube.api_base", config.youtube.api_base.as_str()),
        ("youtube.oembed_url", config.youtube.oembed_url.as_str()),
        ("ai.base_url", config.ai.base_url.as_str()),
    ];
    if let Some(transcript) = &config.youtube.transcript_url {
        urls.push(("youtube.transcript_url", transcript.as_str()));
    }
    for (name, value) in urls {
        validate_http_url(name, value)?;
    }

    if config.ai.enabled && !config.ai.api_key.is_configured() {
        return Err(ConfigError::Validation {
            message: "ai.enabled requires an API key source".to_string(),
        });
    }

    Ok(())
}

fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    match Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Ok(()),
        _ => Err(ConfigError::Validation {
            message: format!("{} is not an http(s) URL: {}", name, value),
        }),
    }
}

/// Resolves an optional API key. A configured env var that is simply not
/// set counts as "no key"; an unreadable key file is an error.
pub fn resolve_api_key(
    name: &str,
    source: &SecretSource,
) -> Result<Option<SecretString>, ConfigError> {
    match source.resolve() {
        Ok(key) => Ok(key),
        Err(SecretError::EnvVarNotSet { name: var }) => {
            log::info!("{} key env var {} is not set; continuing without it", name, var);
            Ok(None)
        }
        Err(e) => Err(ConfigError::Secret {
            name: name.to_string(),
            source: e,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_load_minimal_config() {
        let config = load_config_from_str(r#"{"version": "1.0"}"#).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.timeouts.fast_path_secs, 10);
    }

    #[test]
    fn test_load_full_config() {
        let config_json = r#"
        {
            "version": "1.0",
            "server": { "bind": "0.0.0.0:9000" },
            "database_path": "/var/lib/lectern/lectern.db",
            "blob_directory": "/var/lib/lectern/blobs",
            "worker_count": 4,
            "max_job_attempts": 5,
            "extraction": { "chunk_chars": 800 },
            "timeouts": { "ai_secs": 30 },
            "youtube": {
                "api_key_env_var": "YOUTUBE_API_KEY",
                "transcript_url": "http://localhost:7000"
            },
            "ai": {
                "enabled": true,
                "base_url": "http://localhost:11434/v1",
                "api_key": "local",
                "title_model": "llama3.2:3b"
            },
            "logging": { "format": "json" }
        }
        "#;

        let config = load_config_from_str(config_json).unwrap();
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.max_job_attempts, 5);
        assert_eq!(config.extraction.chunk_chars, 800);
        assert_eq!(config.timeouts.ai_secs, 30);
        assert_eq!(config.ai.title_model, "llama3.2:3b");
        assert_eq!(
            config.youtube.transcript_url.as_deref(),
            Some("http://localhost:7000")
        );
        assert_eq!(
            config.database_path(),
            std::path::PathBuf::from("/var/lib/lectern/lectern.db")
        );
    }

    #[test]
    fn test_invalid_version() {
        let result = load_config_from_str(r#"{"version": "2.0"}"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_schema_rejects_unknown_and_bad_fields() {
        for json in [
            r#"{"version": "1.0", "input_directory": "/x"}"#,
            r#"{"version": "1.0", "worker_count": 0}"#,
            r#"{"version": "1.0", "logging": {"format": "xml"}}"#,
            r#"{}"#,
        ] {
            assert!(
                matches!(
                    load_config_from_str(json),
                    Err(ConfigError::SchemaValidation { .. })
                ),
                "{json}"
            );
        }
    }

    #[test]
    fn test_semantic_validation() {
        for json in [
            r#"{"version": "1.0", "server": {"bind": "localhost"}}"#,
            r#"{"version": "1.0", "ai": {"base_url": "ftp://models"}}"#,
            r#"{"version": "1.0", "ai": {"enabled": true, "api_key_env_var": ""}}"#,
        ] {
            assert!(
                matches!(
                    load_config_from_str(json),
                    Err(ConfigError::Validation { .. })
                ),
                "{json}"
            );
        }
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            load_config_from_str("{not json"),
            Err(ConfigError::ParseJson(_))
        ));
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lectern.json");
        std::fs::write(&path, r#"{"version": "1.0", "worker_count": 2}"#).unwrap();
        assert_eq!(load_config(&path).unwrap().worker_count, 2);

        let missing = load_config(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    #[serial]
    fn test_resolve_api_key_unset_env_is_none() {
        std::env::remove_var("LECTERN_TEST_UNSET_KEY");
        let source = SecretSource::from_env_var("LECTERN_TEST_UNSET_KEY");
        assert!(resolve_api_key("youtube", &source).unwrap().is_none());

        let missing_file = SecretSource {
            file: Some("/nonexistent/lectern/key".to_string()),
            ..SecretSource::default()
        };
        assert!(matches!(
            resolve_api_key("ai", &missing_file),
            Err(ConfigError::Secret { .. })
        ));
    }
}
