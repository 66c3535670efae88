use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// Named paper sizes; heights are resolved by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperSize {
    #[default]
    A4,
    Letter,
    Legal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSettings {
    pub size: PaperSize,
    /// Custom page height in pixels, overrides `size`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    pub gap: f64,
    pub enabled: bool,
    pub first_page_number: u32,
    /// Header for each new page; `{page}` is replaced with the page number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    pub bleed: f64,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            size: PaperSize::A4,
            height: None,
            gap: 24.0,
            enabled: true,
            first_page_number: 1,
            header: None,
            bleed: 48.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    pub structural_debounce_ms: u64,
    pub size_debounce_ms: u64,
    pub settle_guard_ms: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            structural_debounce_ms: 250,
            size_debounce_ms: 200,
            settle_guard_ms: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Document opened when none is given on the command line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_document: Option<PathBuf>,
    pub page: PageSettings,
    pub scheduler: SchedulerSettings,
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the document path
        config.default_document = config
            .default_document
            .map(|path| Self::expand_path(&path).unwrap_or(path));

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/page-reflow");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    pub fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/page-reflow/config.toml"));
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.page.gap, 24.0);
        assert_eq!(config.scheduler.structural_debounce_ms, 250);
    }

    #[test]
    fn test_partial_page_table() {
        let config: Config = toml::from_str(
            r#"
[page]
size = "letter"
header = "Page {page}"
"#,
        )
        .unwrap();

        assert_eq!(config.page.size, PaperSize::Letter);
        assert_eq!(config.page.header.as_deref(), Some("Page {page}"));
        assert!(config.page.enabled);
        assert_eq!(config.page.height, None);
        assert_eq!(config.scheduler, SchedulerSettings::default());
    }

    #[test]
    fn test_custom_height_and_timings() {
        let config: Config = toml::from_str(
            r#"
[page]
height = 900.0
gap = 16.0
first_page_number = 3

[scheduler]
size_debounce_ms = 100
"#,
        )
        .unwrap();

        assert_eq!(config.page.height, Some(900.0));
        assert_eq!(config.page.gap, 16.0);
        assert_eq!(config.page.first_page_number, 3);
        assert_eq!(config.scheduler.size_debounce_ms, 100);
        assert_eq!(config.scheduler.settle_guard_ms, 50);
    }

    #[test]
    fn test_unknown_paper_size_is_a_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "[page]\nsize = \"tabloid\"\n").unwrap();

        let err = Config::load_from_path(&config_file).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test/path");
        let expanded = Config::expand_path(&path).unwrap();

        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/path"));
    }

    #[test]
    fn test_expand_path_with_env_var() {
        unsafe {
            env::set_var("PAGE_REFLOW_TEST_DIR", "/test/env/path");
        }

        let path = PathBuf::from("$PAGE_REFLOW_TEST_DIR/doc.md");
        let expanded = Config::expand_path(&path).unwrap();
        assert_eq!(expanded, PathBuf::from("/test/env/path/doc.md"));

        unsafe {
            env::remove_var("PAGE_REFLOW_TEST_DIR");
        }
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");
        let test_config = Config {
            default_document: Some(PathBuf::from("/tmp/report.md")),
            page: PageSettings {
                size: PaperSize::Legal,
                header: Some("Draft".to_string()),
                ..PageSettings::default()
            },
            scheduler: SchedulerSettings::default(),
        };

        test_config.save_to_path(&config_file).unwrap();
        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config, test_config);
    }

    #[test]
    fn test_default_document_with_tilde_is_expanded_on_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "default_document = \"~/notes/book.md\"\n").unwrap();

        let config = Config::load_from_path(&config_file).unwrap().unwrap();
        let path = config.default_document.unwrap();

        assert!(!path.to_string_lossy().starts_with('~'));
        assert!(path.to_string_lossy().ends_with("notes/book.md"));
    }
}
