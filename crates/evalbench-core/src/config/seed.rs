//! Seed files: datasets and graders to import in bulk.
//!
//! ```yaml
//! datasets:
//!   - name: Math facts
//!     cases:
//!       - input: What is 2 + 2?
//!         expected_output: "4"
//! graders:
//!   - name: Strict
//!     description: Exact match only
//!     rubric: Pass only if the answer is exactly right.
//! ```
//!
//! JSON is accepted as well since it parses as YAML.

use crate::errors::ConfigError;
use crate::model::{Dataset, Grader, TestCase};
use crate::workbench::gen_id;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub datasets: Vec<SeedDataset>,
    #[serde(default)]
    pub graders: Vec<SeedGrader>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedDataset {
    /// Explicit ids make re-imports replace instead of duplicate.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, alias = "testCases")]
    pub cases: Vec<SeedCase>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedCase {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub expected_output: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedGrader {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub rubric: String,
}

impl SeedFile {
    pub fn into_parts(self) -> (Vec<Dataset>, Vec<Grader>) {
        let datasets = self
            .datasets
            .into_iter()
            .map(|d| Dataset {
                id: d.id.unwrap_or_else(gen_id),
                name: d.name,
                test_cases: d
                    .cases
                    .into_iter()
                    .map(|c| TestCase {
                        id: c.id.unwrap_or_else(gen_id),
                        input: c.input,
                        expected_output: c.expected_output,
                    })
                    .collect(),
            })
            .collect();
        let graders = self
            .graders
            .into_iter()
            .map(|g| Grader {
                id: g.id.unwrap_or_else(gen_id),
                name: g.name,
                description: g.description,
                rubric: g.rubric,
            })
            .collect();
        (datasets, graders)
    }
}

pub fn load_seed(path: &Path, strict: bool) -> Result<SeedFile, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read seed {}: {}", path.display(), e)))?;
    parse_seed(&raw, strict)
        .map_err(|ConfigError(msg)| ConfigError(format!("{msg} (file: {})", path.display())))
}

/// Parses seed text, collecting unknown keys. Strict mode rejects them,
/// otherwise they are logged and skipped.
pub fn parse_seed(raw: &str, strict: bool) -> Result<SeedFile, ConfigError> {
    let mut ignored = BTreeSet::new();
    let deserializer = serde_yaml::Deserializer::from_str(raw);
    let seed: SeedFile = serde_ignored::deserialize(deserializer, |path| {
        ignored.insert(path.to_string());
    })
    .map_err(|e| ConfigError(format!("failed to parse seed: {e}")))?;

    if !ignored.is_empty() {
        if strict {
            return Err(ConfigError(format!(
                "unknown fields in strict mode: {:?}",
                ignored
            )));
        }
        tracing::warn!(event = "seed_unknown_fields", fields = ?ignored);
    }

    for d in &seed.datasets {
        if d.name.trim().is_empty() {
            return Err(ConfigError("seed dataset with empty name".into()));
        }
    }
    for g in &seed.graders {
        if g.name.trim().is_empty() {
            return Err(ConfigError("seed grader with empty name".into()));
        }
    }
    Ok(seed)
}
