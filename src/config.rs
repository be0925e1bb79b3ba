use anyhow::{bail, Context};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

use crate::pipelines::{RecencyReference, DEFAULT_TOP_N};

pub const LOCAL_CONFIG: &str = "dashboard.toml";

/// Default configuration embedded in the binary
const DEFAULT_CONFIG: &str = r#"
[dataset]
path = "all_df.csv"

[ranking]
top_n = 5

[rfm]
recency_reference = "dataset_max"

[chart]
bar_width = 40
"#;

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Settings {
    pub dataset: DatasetSettings,
    pub ranking: RankingSettings,
    pub rfm: RfmSettings,
    pub chart: ChartSettings,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DatasetSettings {
    pub path: PathBuf,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("all_df.csv"),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RankingSettings {
    pub top_n: usize,
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct RfmSettings {
    #[serde(deserialize_with = "parse_recency_reference")]
    pub recency_reference: RecencyReference,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ChartSettings {
    pub bar_width: usize,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self { bar_width: 40 }
    }
}

impl Settings {
    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let settings: Settings = toml::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.ranking.top_n == 0 {
            bail!("ranking.top_n must be at least 1");
        }
        if self.chart.bar_width == 0 {
            bail!("chart.bar_width must be at least 1");
        }
        Ok(())
    }
}

/// Load settings
///
/// Search order:
/// 1. An explicit path (fails if it cannot be read)
/// 2. `dashboard.toml` in the working directory
/// 3. The embedded default
pub fn load_settings(explicit: Option<&Path>) -> anyhow::Result<Settings> {
    if let Some(path) = explicit {
        tracing::info!("Loading config from: {}", path.display());
        return read_settings(path);
    }

    let local = Path::new(LOCAL_CONFIG);
    if local.exists() {
        tracing::info!("Loading config from: {}", local.display());
        return read_settings(local);
    }

    tracing::debug!("Using default embedded configuration");
    Settings::from_toml(DEFAULT_CONFIG)
}

fn read_settings(path: &Path) -> anyhow::Result<Settings> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config file {}", path.display()))?;
    Settings::from_toml(&contents).with_context(|| format!("invalid config file {}", path.display()))
}

fn parse_recency_reference<'de, D>(deserializer: D) -> Result<RecencyReference, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}
