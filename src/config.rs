use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::registry::{default_subjects, ProfileSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SheetLayout {
    /// Rows read as header metadata (student, class, as-of date).
    pub header_rows: usize,
    /// First data row: three metadata rows plus the column-title row.
    pub body_offset: usize,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            header_rows: 5,
            body_offset: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub default_subjects: Vec<String>,
    /// Class name to profile subjects, used when no database is configured.
    pub profiles: BTreeMap<String, Vec<String>>,
    pub layout: SheetLayout,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            default_subjects: default_subjects(),
            profiles: BTreeMap::new(),
            layout: SheetLayout::default(),
        }
    }
}

impl AnalyzerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: AnalyzerConfig = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        if config.default_subjects.is_empty() {
            anyhow::bail!("config {} lists no default subjects", path.display());
        }
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn profile_snapshot(&self) -> ProfileSnapshot {
        self.profiles
            .iter()
            .flat_map(|(class_name, subjects)| {
                subjects.iter().map(move |subject| (class_name, subject))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ProfileRegistry;
    use uuid::Uuid;

    fn write_config(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("transcripts-config-{}.json", Uuid::new_v4()));
        std::fs::write(&path, contents).expect("write config");
        path
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let path = write_config(r#"{ "profiles": { "10А": ["Алгебра", "Физика"] } }"#);
        let config = AnalyzerConfig::load(&path).expect("config parses");
        assert_eq!(config.default_subjects, default_subjects());
        assert_eq!(config.layout, SheetLayout::default());
        assert!(config.profile_snapshot().profile_subjects("10А").contains("Физика"));
    }

    #[test]
    fn layout_can_be_overridden() {
        let path = write_config(r#"{ "layout": { "body_offset": 6 } }"#);
        let config = AnalyzerConfig::load(&path).expect("config parses");
        assert_eq!(config.layout.body_offset, 6);
        assert_eq!(config.layout.header_rows, 5);
    }

    #[test]
    fn empty_default_subjects_are_rejected() {
        let path = write_config(r#"{ "default_subjects": [] }"#);
        assert!(AnalyzerConfig::load(&path).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("missing-{}.json", Uuid::new_v4()));
        assert!(AnalyzerConfig::load_or_default(Some(&path)).is_err());
        assert_eq!(
            AnalyzerConfig::load_or_default(None).expect("defaults"),
            AnalyzerConfig::default()
        );
    }
}
