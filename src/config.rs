//! TOML configuration: retrieval tuning and the expert-mode schema map.
//!
//! Every section is optional; `Config::default()` is used when no file is
//! given. The expert schema maps logical field names to literal source
//! column names, so renaming a column in the dataset is a one-line config
//! edit rather than a code change.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub expert: ExpertSchema,
}

/// Retrieval tuning constants.
///
/// Single-token queries use the lowered threshold and raised top_k pair;
/// multi-token queries use the default pair.
#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Structured-search threshold for multi-token queries.
    #[serde(default = "default_multi_threshold")]
    pub multi_token_threshold: f64,
    /// Lowered structured-search threshold for single-token queries.
    #[serde(default = "default_single_threshold")]
    pub single_token_threshold: f64,
    /// Raised top_k for single-token queries.
    #[serde(default = "default_single_top_k")]
    pub single_token_top_k: usize,
    /// Default top_k when the caller does not request one.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Context-snippet window width, in characters.
    #[serde(default = "default_context_window")]
    pub context_window: usize,
}

fn default_multi_threshold() -> f64 {
    0.1
}
fn default_single_threshold() -> f64 {
    0.05
}
fn default_single_top_k() -> usize {
    15
}
fn default_top_k() -> usize {
    5
}
fn default_context_window() -> usize {
    200
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            multi_token_threshold: default_multi_threshold(),
            single_token_threshold: default_single_threshold(),
            single_token_top_k: default_single_top_k(),
            top_k: default_top_k(),
            context_window: default_context_window(),
        }
    }
}

/// Logical field → literal column name mapping for expert mode.
///
/// Defaults are the upstream dataset's exact column headers, including
/// their original spacing.
#[derive(Debug, Deserialize, Clone)]
pub struct ExpertSchema {
    #[serde(default = "default_name_column")]
    pub name: String,
    #[serde(default = "default_price_column")]
    pub price: String,
    #[serde(default = "default_manufacturer_column")]
    pub manufacturer: String,
    #[serde(default = "default_category_column")]
    pub category: String,
    #[serde(default = "default_indication_column")]
    pub indication: String,
    #[serde(default = "default_adult_dosage_column")]
    pub adult_dosage: String,
    #[serde(default = "default_child_dosage_column")]
    pub child_dosage: String,
    /// Literal prefix stripped from the indication text before rendering.
    #[serde(default = "default_indication_prefix")]
    pub indication_prefix: String,
}

fn default_name_column() -> String {
    "Name".to_string()
}
fn default_price_column() -> String {
    "Regular Price".to_string()
}
fn default_manufacturer_column() -> String {
    "Company Name".to_string()
}
fn default_category_column() -> String {
    "Medicine Group".to_string()
}
fn default_indication_column() -> String {
    "ওষুধের কার্যকারিতা".to_string()
}
fn default_adult_dosage_column() -> String {
    "খাওয়ার নিয়ম( প্রাপ্তবয়স্ক ক্ষেত্রে)".to_string()
}
fn default_child_dosage_column() -> String {
    "খাওয়ার নিয়ম( কিশোরদের  ক্ষেত্রে)".to_string()
}
fn default_indication_prefix() -> String {
    "কার্যকারিতা :".to_string()
}

impl Default for ExpertSchema {
    fn default() -> Self {
        Self {
            name: default_name_column(),
            price: default_price_column(),
            manufacturer: default_manufacturer_column(),
            category: default_category_column(),
            indication: default_indication_column(),
            adult_dosage: default_adult_dosage_column(),
            child_dosage: default_child_dosage_column(),
            indication_prefix: default_indication_prefix(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let r = &config.retrieval;
    if !(0.0..=1.0).contains(&r.multi_token_threshold) {
        anyhow::bail!("retrieval.multi_token_threshold must be in [0.0, 1.0]");
    }
    if !(0.0..=1.0).contains(&r.single_token_threshold) {
        anyhow::bail!("retrieval.single_token_threshold must be in [0.0, 1.0]");
    }
    if r.single_token_threshold > r.multi_token_threshold {
        anyhow::bail!(
            "retrieval.single_token_threshold must not exceed retrieval.multi_token_threshold"
        );
    }
    if r.top_k < 1 || r.single_token_top_k < 1 {
        anyhow::bail!("retrieval top_k values must be >= 1");
    }
    if r.context_window == 0 {
        anyhow::bail!("retrieval.context_window must be > 0");
    }
    Ok(())
}
