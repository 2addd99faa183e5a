//! Document loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::config::schema::Settings;
use crate::routing::Labels;

/// Error type for loading documents, alerts and settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error parsing YAML in '{}': {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("error parsing JSON in '{}': {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("error parsing settings '{}': {source}", .path.display())]
    SettingsParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid settings: {}", .0.join(", "))]
    Settings(Vec<String>),

    #[error("no 'route' configuration found in '{}'", .path.display())]
    MissingRoute { path: PathBuf },

    #[error("invalid route configuration in '{}': {source}", .path.display())]
    Route {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("expected a mapping at the root of '{}', got {found}", .path.display())]
    NotAMapping { path: PathBuf, found: &'static str },

    #[error("cannot walk '{}': {source}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("alert label '{label}' in '{}' must be a scalar value", .path.display())]
    AlertLabel { path: PathBuf, label: String },
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a YAML document. An empty file loads as `null`.
pub fn load_document(path: &Path) -> Result<Value, ConfigError> {
    let content = read(path)?;
    parse_document(path, &content)
}

/// Parse YAML `content` read from `path`.
pub fn parse_document(path: &Path, content: &str) -> Result<Value, ConfigError> {
    if content.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_yaml::from_str(content).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the `route` mapping of a configuration document.
pub fn load_route(path: &Path) -> Result<Value, ConfigError> {
    let document = load_document(path)?;
    match document {
        Value::Mapping(mut mapping) => mapping
            .remove("route")
            .ok_or_else(|| ConfigError::MissingRoute {
                path: path.to_path_buf(),
            }),
        other => Err(ConfigError::NotAMapping {
            path: path.to_path_buf(),
            found: crate::config::validation::type_name(&other),
        }),
    }
}

/// Load alert labels from a JSON file (`.json`) or a YAML file (anything else).
pub fn load_alert(path: &Path) -> Result<Labels, ConfigError> {
    let content = read(path)?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let value: Value = if is_json {
        serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        parse_document(path, &content)?
    };

    let mapping = match value {
        Value::Mapping(mapping) => mapping,
        other => {
            return Err(ConfigError::NotAMapping {
                path: path.to_path_buf(),
                found: crate::config::validation::type_name(&other),
            });
        }
    };

    let mut labels = Labels::new();
    for (key, value) in mapping {
        let (Some(label), Some(value)) = (scalar_string(&key), scalar_string(&value)) else {
            return Err(ConfigError::AlertLabel {
                path: path.to_path_buf(),
                label: scalar_string(&key).unwrap_or_else(|| format!("{:?}", key)),
            });
        };
        labels.insert(label, value);
    }
    Ok(labels)
}

/// Load tool settings from a TOML file and validate them.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let content = read(path)?;
    let settings: Settings = toml::from_str(&content).map_err(|source| ConfigError::SettingsParse {
        path: path.to_path_buf(),
        source,
    })?;

    settings.validate().map_err(ConfigError::Settings)?;

    Ok(settings)
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_route() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "am.yaml", "route:\n  receiver: ops\nreceivers: []\n");
        let route = load_route(&path).unwrap();
        assert_eq!(route["receiver"].as_str(), Some("ops"));
    }

    #[test]
    fn test_load_route_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "am.yaml", "receivers: []\n");
        assert!(matches!(load_route(&path), Err(ConfigError::MissingRoute { .. })));

        let list = write_file(&dir, "list.yaml", "- a\n- b\n");
        assert!(matches!(load_route(&list), Err(ConfigError::NotAMapping { .. })));

        let missing = dir.path().join("nope.yaml");
        assert!(matches!(load_route(&missing), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_load_alert_json_and_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let json = write_file(&dir, "alert.json", r#"{"severity": "critical", "code": 500}"#);
        let labels = load_alert(&json).unwrap();
        assert_eq!(labels["severity"], "critical");
        assert_eq!(labels["code"], "500");

        let yaml = write_file(&dir, "alert.yaml", "severity: warning\npaging: false\n");
        let labels = load_alert(&yaml).unwrap();
        assert_eq!(labels["paging"], "false");
    }

    #[test]
    fn test_load_alert_rejects_nested_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "alert.json", r#"{"labels": {"a": "b"}}"#);
        assert!(matches!(load_alert(&path), Err(ConfigError::AlertLabel { .. })));

        let bad = write_file(&dir, "bad.json", "{not json");
        assert!(matches!(load_alert(&bad), Err(ConfigError::Json { .. })));
    }

    #[test]
    fn test_load_settings() {
        let dir = tempfile::tempdir().unwrap();
        let ok = write_file(&dir, "axe.toml", "output_file = \"out.yaml\"\n");
        assert_eq!(load_settings(&ok).unwrap().output_file, "out.yaml");

        let clash = write_file(&dir, "clash.toml", "output_file = \"base.yaml\"\n");
        assert!(matches!(load_settings(&clash), Err(ConfigError::Settings(_))));
    }

    #[test]
    fn test_empty_document_is_null() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "empty.yaml", "\n");
        assert_eq!(load_document(&path).unwrap(), Value::Null);
    }
}
