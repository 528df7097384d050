use anyhow::{Context, Result};
use learnhub_core::export::{ExportFormat, ExportOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// JSON snapshot the reports are computed from
    pub data: Option<PathBuf>,
    /// Directory exports are written to
    pub output_dir: PathBuf,
    pub format: ExportFormat,
    /// TrueType font embedded in PDF exports
    pub pdf_font: Option<PathBuf>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data: None,
            output_dir: PathBuf::from("."),
            format: ExportFormat::Csv,
            pdf_font: None,
        }
    }
}

impl CliConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn resolve_config(cli_config: Option<PathBuf>, cli_data: Option<PathBuf>) -> Result<Self> {
        let mut config = if let Some(config_path) = cli_config {
            Self::load_from_file(config_path)?
        } else if let Ok(env_config) = std::env::var("LEARNHUB_CLI_CONFIG") {
            Self::load_from_file(env_config)?
        } else {
            Self::default()
        };

        // CLI data path overrides the environment and the file
        if let Some(data) = cli_data {
            config.data = Some(data);
        } else if let Ok(env_data) = std::env::var("LEARNHUB_DATA") {
            config.data = Some(PathBuf::from(env_data));
        }

        Ok(config)
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            pdf_font: self.pdf_font.clone(),
        }
    }

    pub fn data_path(&self) -> Result<&Path> {
        self.data.as_deref().context("no data snapshot given; pass --data or set `data` in the config file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("learnhub.toml");
        std::fs::write(&path, "format = \"pdf\"\n").unwrap();

        let config = CliConfig::load_from_file(&path).unwrap();
        assert_eq!(config.format, ExportFormat::Pdf);
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert!(config.data.is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("learnhub.toml");
        let config = CliConfig {
            data: Some(PathBuf::from("snapshot.json")),
            output_dir: PathBuf::from("out"),
            format: ExportFormat::Xlsx,
            pdf_font: Some(PathBuf::from("fonts/NotoSans-Regular.ttf")),
        };

        config.save_to_file(&path).unwrap();
        assert_eq!(CliConfig::load_from_file(&path).unwrap(), config);
        assert_eq!(config.export_options().pdf_font, config.pdf_font);
    }

    #[test]
    fn test_cli_data_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("learnhub.toml");
        std::fs::write(&path, "data = \"from-file.json\"\n").unwrap();

        let config = CliConfig::resolve_config(Some(path), Some(PathBuf::from("from-cli.json"))).unwrap();
        assert_eq!(config.data_path().unwrap(), Path::new("from-cli.json"));
    }
}
