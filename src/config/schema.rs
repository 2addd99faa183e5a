//! Tool settings schema.
//!
//! Settings control how a render folder is laid out and how routes resolve
//! defaults. All fields have defaults, so the settings file is optional.

use serde::{Deserialize, Serialize};

use crate::routing::node::DEFAULT_RECEIVER;

/// Root settings for the tool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Base document name inside the render folder.
    pub base_file: String,

    /// Combined output name; never read back as a fragment.
    pub output_file: String,

    /// Receiver used by a root route that does not name one.
    pub default_receiver: String,

    /// File extensions considered fragments.
    pub extensions: Vec<String>,

    /// Follow symbolic links while walking the render folder.
    pub follow_links: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_file: "base.yaml".to_string(),
            output_file: "alertmanager.yaml".to_string(),
            default_receiver: DEFAULT_RECEIVER.to_string(),
            extensions: vec!["yaml".to_string(), "yml".to_string()],
            follow_links: false,
        }
    }
}

impl Settings {
    /// Semantic checks serde cannot express. Returns every violation.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.base_file.is_empty() {
            errors.push("base_file must not be empty".to_string());
        }
        if self.output_file.is_empty() {
            errors.push("output_file must not be empty".to_string());
        }
        if self.base_file == self.output_file {
            errors.push(format!(
                "base_file and output_file must differ (both are '{}')",
                self.base_file
            ));
        }
        if self.extensions.is_empty() {
            errors.push("extensions must list at least one file extension".to_string());
        }
        if self.default_receiver.is_empty() {
            errors.push("default_receiver must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Whether `file_name` has one of the configured extensions.
    pub fn has_fragment_extension(&self, file_name: &str) -> bool {
        match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => {
                self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_override() {
        let settings: Settings = toml::from_str(
            r#"
base_file = "root.yml"
extensions = ["yml"]
"#,
        )
        .unwrap();
        assert_eq!(settings.base_file, "root.yml");
        assert_eq!(settings.output_file, "alertmanager.yaml");
        assert!(settings.has_fragment_extension("team.yml"));
        assert!(!settings.has_fragment_extension("team.yaml"));
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let settings = Settings {
            output_file: "base.yaml".to_string(),
            extensions: Vec::new(),
            ..Settings::default()
        };
        let errors = settings.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_extension_matching() {
        let settings = Settings::default();
        assert!(settings.has_fragment_extension("a.yaml"));
        assert!(settings.has_fragment_extension("B.YML"));
        assert!(!settings.has_fragment_extension("notes.txt"));
        assert!(!settings.has_fragment_extension(".yaml"));
        assert!(!settings.has_fragment_extension("yaml"));
    }
}
