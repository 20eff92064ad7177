//! Startup configuration.
//!
//! The configuration is a YAML document whose `bouOptions` mapping holds the
//! four connection parameters:
//!
//! ```yaml
//! bouOptions:
//!   beebotteChannelToken: token_xxxxxxxxxxxxxxxx
//!   beebotteChannel: office
//!   beebotteResource: request
//!   endpoint: https://status.example.org
//! ```
//!
//! Every field is checked explicitly: a value of the wrong type is rejected,
//! never coerced to a string.

use std::env;
use std::path::{Path, PathBuf};

use responder::{ConfigError, ConfigField, ConnectionConfig, InvalidReason};
use serde_yaml::{Mapping, Value};

/// Configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.yml";

/// Overrides [`DEFAULT_CONFIG_PATH`].
pub const CONFIG_PATH_ENV: &str = "BOU_CONFIG";

/// Broker CA bundle looked up in the working directory.
pub const DEFAULT_BROKER_CA_PATH: &str = "mqtt.beebotte.com.pem";

/// Overrides [`DEFAULT_BROKER_CA_PATH`]; the file must then exist.
pub const BROKER_CA_ENV: &str = "BOU_BROKER_CA";

const OPTIONS_KEY: &str = "bouOptions";

/// Resolves the configuration path from the environment.
pub fn config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Reads and validates the configuration at `path`.
///
/// # Errors
///
/// - [`ConfigError::Missing`] if the file cannot be read.
/// - [`ConfigError::Malformed`] if it is not YAML or has no `bouOptions` mapping.
/// - [`ConfigError::Invalid`] if a field is absent, not a string, or empty.
pub async fn load(path: &Path) -> Result<ConnectionConfig, ConfigError> {
    let shown = path.display().to_string();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Missing {
            path: shown.clone(),
            reason: e.to_string(),
        })?;
    parse(&shown, &text)
}

/// Validates an already-read configuration document.
///
/// `path` is used only in error messages.
///
/// # Errors
///
/// See [`load`].
pub fn parse(path: &str, text: &str) -> Result<ConnectionConfig, ConfigError> {
    let malformed = |reason: String| ConfigError::Malformed {
        path: path.to_owned(),
        reason,
    };

    let document: Value = serde_yaml::from_str(text).map_err(|e| malformed(e.to_string()))?;
    let options = match document.get(OPTIONS_KEY) {
        Some(Value::Mapping(options)) => options,
        Some(_) => return Err(malformed(format!("'{OPTIONS_KEY}' is not a mapping"))),
        None => return Err(malformed(format!("'{OPTIONS_KEY}' mapping not found"))),
    };

    let [token, channel, resource, endpoint] = ConfigField::ALL;
    ConnectionConfig::new(
        string_field(options, token)?,
        string_field(options, channel)?,
        string_field(options, resource)?,
        string_field(options, endpoint)?,
    )
}

fn string_field(options: &Mapping, field: ConfigField) -> Result<String, ConfigError> {
    match options.get(field.key()) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(ConfigError::Invalid {
            field,
            reason: InvalidReason::NotAString,
        }),
        None => Err(ConfigError::Invalid {
            field,
            reason: InvalidReason::Absent,
        }),
    }
}

/// Loads the broker CA bundle, if one is available.
///
/// Without [`BROKER_CA_ENV`] a missing default file simply means "use the
/// platform roots". An explicitly configured file that cannot be read is an
/// error.
///
/// # Errors
///
/// Returns [`ConfigError::Missing`] when [`BROKER_CA_ENV`] names an unreadable file.
pub async fn load_broker_ca() -> Result<Option<Vec<u8>>, ConfigError> {
    match env::var_os(BROKER_CA_ENV) {
        Some(path) => {
            let path = PathBuf::from(path);
            tokio::fs::read(&path)
                .await
                .map(Some)
                .map_err(|e| ConfigError::Missing {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })
        }
        None => Ok(tokio::fs::read(DEFAULT_BROKER_CA_PATH).await.ok()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const VALID: &str = r#"
bouOptions:
  beebotteChannelToken: token_abc123
  beebotteChannel: office
  beebotteResource: request
  endpoint: https://status.example.org
"#;

    fn invalid(text: &str) -> (ConfigField, InvalidReason) {
        match parse("config.yml", text).unwrap_err() {
            ConfigError::Invalid { field, reason } => (field, reason),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn valid_document_keeps_all_fields() {
        let config = parse("config.yml", VALID).unwrap();

        assert_eq!(config.broker_token().expose(), "token_abc123");
        assert_eq!(config.channel().as_str(), "office");
        assert_eq!(config.resource().as_str(), "request");
        assert_eq!(config.status_endpoint().as_str(), "https://status.example.org");
    }

    #[test]
    fn missing_field_is_invalid() {
        let text = VALID.replace("  beebotteResource: request\n", "");
        assert_eq!(
            invalid(&text),
            (ConfigField::Resource, InvalidReason::Absent)
        );
    }

    #[test]
    fn non_string_field_is_invalid() {
        let text = VALID.replace("beebotteChannel: office", "beebotteChannel: 42");
        assert_eq!(
            invalid(&text),
            (ConfigField::Channel, InvalidReason::NotAString)
        );

        let text = VALID.replace("endpoint: https://status.example.org", "endpoint:");
        assert_eq!(
            invalid(&text),
            (ConfigField::Endpoint, InvalidReason::NotAString)
        );
    }

    #[test]
    fn empty_token_is_an_empty_credential() {
        let text = VALID.replace("token_abc123", "''");
        let err = parse("config.yml", &text).unwrap_err();
        assert!(err.is_empty_credential());
    }

    #[test]
    fn non_yaml_is_malformed() {
        let err = parse("config.yml", "bouOptions: [unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
    }

    #[test]
    fn document_without_options_is_malformed() {
        let err = parse("config.yml", "other: 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));

        let err = parse("config.yml", "").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));

        let err = parse("config.yml", "bouOptions: just-a-string\n").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
    }

    #[tokio::test]
    async fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(VALID.as_bytes()).unwrap();

        let config = load(file.path()).await.unwrap();

        assert_eq!(config.subscription_topic(), "office/request");
    }

    #[tokio::test]
    async fn unreadable_location_is_missing() {
        let dir = tempfile::tempdir().unwrap();

        let err = load(&dir.path().join("config.yml")).await.unwrap_err();

        assert!(matches!(err, ConfigError::Missing { .. }));
    }
}
