use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::allocation::{AllocationMode, ReferenceAllocations, DEFAULT_MAX_MULTIPLIER};
use crate::model::{ResponseCurve, DEFAULT_REVENUE_PER_UNIT, DEFAULT_SCALE_FACTOR};
use crate::store::{DataSource, DirectorySource, HttpSource};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub allocation: AllocationConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Directory,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default)]
    pub source: SourceKind,
    #[serde(default = "default_directory")]
    pub directory: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,
    #[serde(default = "default_revenue_per_unit")]
    pub revenue_per_unit: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationConfig {
    #[serde(default = "default_max_multiplier")]
    pub max_multiplier: f64,
    #[serde(default = "default_mode")]
    pub default_mode: AllocationMode,
}

/// Command-line values that win over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub data_dir: Option<String>,
    pub base_url: Option<String>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/budget-analytics/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        let parsed: Self = toml::from_str(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))?;
        Ok(parsed)
    }

    /// A base URL override also switches the source to HTTP; a directory
    /// override switches it back.
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(base_url) = overrides.base_url {
            self.data.base_url = base_url;
            self.data.source = SourceKind::Http;
        }
        if let Some(dir) = overrides.data_dir {
            self.data.directory = dir;
            self.data.source = SourceKind::Directory;
        }
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    pub fn resolved_data_dir(&self) -> PathBuf {
        expand_tilde(&self.data.directory)
    }

    pub fn data_source(&self) -> Box<dyn DataSource> {
        match self.data.source {
            SourceKind::Directory => Box::new(DirectorySource::new(self.resolved_data_dir())),
            SourceKind::Http => Box::new(HttpSource::new(self.data.base_url.clone())),
        }
    }

    pub fn response_curve(&self) -> Result<ResponseCurve> {
        ResponseCurve::new(self.model.scale_factor, self.model.revenue_per_unit)
            .context("invalid [model] section")
    }

    pub fn reference_allocations(&self) -> Result<ReferenceAllocations> {
        ReferenceAllocations::with_defaults()
            .with_max_multiplier(self.allocation.max_multiplier)
            .context("invalid [allocation] section")
    }

    pub fn default_template() -> String {
        let template = r#"[data]
# "directory" reads <directory>/<resource>.json, "http" fetches <base_url>/<resource>.json
source = "directory"
directory = "./data"
base_url = "http://localhost:8000/data"

[model]
scale_factor = 100000.0
revenue_per_unit = 100.0

[allocation]
max_multiplier = 2.0
default_mode = "optimal"
"#;
        template.to_string()
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::default(),
            directory: default_directory(),
            base_url: default_base_url(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            scale_factor: default_scale_factor(),
            revenue_per_unit: default_revenue_per_unit(),
        }
    }
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            max_multiplier: default_max_multiplier(),
            default_mode: default_mode(),
        }
    }
}

fn default_directory() -> String {
    "./data".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8000/data".to_string()
}

fn default_scale_factor() -> f64 {
    DEFAULT_SCALE_FACTOR
}

fn default_revenue_per_unit() -> f64 {
    DEFAULT_REVENUE_PER_UNIT
}

fn default_max_multiplier() -> f64 {
    DEFAULT_MAX_MULTIPLIER
}

fn default_mode() -> AllocationMode {
    AllocationMode::Optimal
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use crate::allocation::AllocationMode;

    use super::{expand_tilde, Config, ConfigOverrides, SourceKind};

    #[test]
    fn template_parses_to_defaults() {
        let parsed: Config = toml::from_str(&Config::default_template()).unwrap();
        let defaults = Config::default();
        assert_eq!(parsed.data.source, defaults.data.source);
        assert_eq!(parsed.data.directory, defaults.data.directory);
        assert_eq!(parsed.model.scale_factor, defaults.model.scale_factor);
        assert_eq!(parsed.allocation.max_multiplier, 2.0);
        assert_eq!(parsed.allocation.default_mode, AllocationMode::Optimal);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str(
            r#"
[data]
source = "http"

[allocation]
default_mode = "previous"
"#,
        )
        .unwrap();
        assert_eq!(parsed.data.source, SourceKind::Http);
        assert_eq!(parsed.data.base_url, "http://localhost:8000/data");
        assert_eq!(parsed.model.revenue_per_unit, 100.0);
        assert_eq!(parsed.allocation.default_mode, AllocationMode::Previous);
    }

    #[test]
    fn overrides_pick_the_source() {
        let mut config = Config::default();
        config.apply_overrides(ConfigOverrides {
            data_dir: None,
            base_url: Some("http://example.test/data".to_string()),
        });
        assert_eq!(config.data.source, SourceKind::Http);
        assert_eq!(config.data_source().describe(), "http://example.test/data");

        config.apply_overrides(ConfigOverrides {
            data_dir: Some("/tmp/metrics".to_string()),
            base_url: None,
        });
        assert_eq!(config.data.source, SourceKind::Directory);
        assert_eq!(config.resolved_data_dir(), Path::new("/tmp/metrics"));
    }

    #[test]
    fn invalid_model_section_is_reported() {
        let mut config = Config::default();
        config.model.scale_factor = 0.0;
        assert!(config.response_curve().is_err());
        config.allocation.max_multiplier = -1.0;
        assert!(config.reference_allocations().is_err());
    }

    #[test]
    fn missing_file_loads_defaults() {
        let config = Config::load(Some(Path::new("/nonexistent/budget-analytics.toml"))).unwrap();
        assert_eq!(config.data.directory, "./data");
    }

    #[test]
    fn tilde_expands_to_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/data"), home.join("data"));
        }
        assert_eq!(expand_tilde("/abs/data"), Path::new("/abs/data"));
    }
}
