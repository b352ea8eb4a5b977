//! Configuration management
//!
//! Settings live in `<data dir>/settings.json`:
//! ```json
//! {
//!   "import": {
//!     "headerScanLimit": 30,
//!     "importedBy": "operator",
//!     "extraKeywords": { "performance": { "revenue": ["venda liquida"] } }
//!   }
//! }
//! ```
//! Keys this crate does not manage are kept as they are on save.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::{ImportSchema, KeywordTable, SemanticField};
use crate::ingest::DEFAULT_SCAN_LIMIT;

pub const HEADER_SCAN_LIMIT_ENV: &str = "SHEETLINE_HEADER_SCAN_LIMIT";
pub const IMPORTED_BY_ENV: &str = "SHEETLINE_IMPORTED_BY";

const DEFAULT_IMPORTED_BY: &str = "sheetline";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    import: ImportSection,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    header_scan_limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    imported_by: Option<String>,
    /// schema name → field name → keywords
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    extra_keywords: HashMap<String, HashMap<String, Vec<String>>>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Import behaviour an operator can tune
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSettings {
    /// Rows inspected when looking for the header row
    pub header_scan_limit: usize,
    /// Recorded on every performance record
    pub imported_by: String,
    /// Keywords appended after the built-in ones
    pub extra_keywords: HashMap<ImportSchema, HashMap<SemanticField, Vec<String>>>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            header_scan_limit: DEFAULT_SCAN_LIMIT,
            imported_by: DEFAULT_IMPORTED_BY.to_string(),
            extra_keywords: HashMap::new(),
        }
    }
}

impl ImportSettings {
    /// Built-in keywords for `schema` plus configured extras
    pub fn keyword_table(&self, schema: ImportSchema) -> KeywordTable {
        match self.extra_keywords.get(&schema) {
            Some(extra) => KeywordTable::new(schema, extra),
            None => schema.keyword_table(),
        }
    }
}

/// Sheetline configuration (typed view of settings.json)
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub import: ImportSettings,
    // Raw settings, kept so save() does not drop unmanaged keys
    _raw_settings: SettingsFile,
}

impl Config {
    /// Load config from the data directory
    ///
    /// A missing or unreadable settings file gives defaults. Environment
    /// variables override the file.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let raw = read_settings(data_dir)?;
        let mut import = import_settings_from(&raw.import);
        apply_env(&mut import, |key| std::env::var(key).ok());

        Ok(Self {
            import,
            _raw_settings: raw,
        })
    }

    /// Save config to the data directory, keeping keys it does not manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let mut settings = read_settings(data_dir)?;

        settings.import.header_scan_limit = Some(self.import.header_scan_limit);
        settings.import.imported_by = Some(self.import.imported_by.clone());
        settings.import.extra_keywords = self
            .import
            .extra_keywords
            .iter()
            .map(|(schema, fields)| {
                let fields = fields
                    .iter()
                    .map(|(field, keywords)| (field.to_string(), keywords.clone()))
                    .collect();
                (schema.to_string(), fields)
            })
            .collect();

        std::fs::create_dir_all(data_dir)?;
        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(data_dir.join("settings.json"), content)
            .context("Failed to write settings.json")?;
        Ok(())
    }
}

fn read_settings(data_dir: &Path) -> Result<SettingsFile> {
    let settings_path = data_dir.join("settings.json");
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)
        .with_context(|| format!("Failed to read {}", settings_path.display()))?;
    Ok(serde_json::from_str(&content).unwrap_or_default())
}

fn import_settings_from(section: &ImportSection) -> ImportSettings {
    let defaults = ImportSettings::default();

    // Unknown schema or field names are ignored
    let mut extra_keywords: HashMap<ImportSchema, HashMap<SemanticField, Vec<String>>> =
        HashMap::new();
    for (schema, fields) in &section.extra_keywords {
        let Ok(schema) = schema.parse::<ImportSchema>() else {
            continue;
        };
        for (field, keywords) in fields {
            if let Ok(field) = field.parse::<SemanticField>() {
                extra_keywords
                    .entry(schema)
                    .or_default()
                    .entry(field)
                    .or_default()
                    .extend(keywords.iter().cloned());
            }
        }
    }

    ImportSettings {
        header_scan_limit: section
            .header_scan_limit
            .filter(|n| *n > 0)
            .unwrap_or(defaults.header_scan_limit),
        imported_by: section
            .imported_by
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.imported_by),
        extra_keywords,
    }
}

fn apply_env(settings: &mut ImportSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(limit) = lookup(HEADER_SCAN_LIMIT_ENV)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
    {
        settings.header_scan_limit = limit;
    }
    if let Some(who) = lookup(IMPORTED_BY_ENV).filter(|v| !v.trim().is_empty()) {
        settings.imported_by = who.trim().to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, json: &str) {
        std::fs::write(dir.join("settings.json"), json).unwrap();
    }

    fn load_file(dir: &Path) -> ImportSettings {
        import_settings_from(&read_settings(dir).unwrap().import)
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        assert_eq!(load_file(dir.path()), ImportSettings::default());
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "{ not json");
        assert_eq!(load_file(dir.path()).header_scan_limit, DEFAULT_SCAN_LIMIT);
    }

    #[test]
    fn test_reads_import_section() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            r#"{
                "import": {
                    "headerScanLimit": 50,
                    "importedBy": "maria",
                    "extraKeywords": {
                        "performance": { "revenue": ["Venda Liquida"], "colour": ["x"] },
                        "inventory": { "store": ["y"] }
                    }
                }
            }"#,
        );

        let settings = load_file(dir.path());
        assert_eq!(settings.header_scan_limit, 50);
        assert_eq!(settings.imported_by, "maria");
        assert_eq!(settings.extra_keywords.len(), 1);

        let table = settings.keyword_table(ImportSchema::Performance);
        assert!(table
            .keywords(SemanticField::Revenue)
            .contains(&"venda liquida".to_string()));
        assert!(table
            .header_groups()
            .iter()
            .any(|group| group.contains(&"venda liquida".to_string())));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut settings = ImportSettings::default();
        apply_env(&mut settings, |key| match key {
            HEADER_SCAN_LIMIT_ENV => Some("12".to_string()),
            IMPORTED_BY_ENV => Some(" joão ".to_string()),
            _ => None,
        });
        assert_eq!(settings.header_scan_limit, 12);
        assert_eq!(settings.imported_by, "joão");

        apply_env(&mut settings, |_| Some("0".to_string()));
        assert_eq!(settings.header_scan_limit, 12);
    }

    #[test]
    fn test_save_preserves_unknown_keys() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            r#"{ "ui": { "theme": "dark" }, "import": { "legacy": true } }"#,
        );

        let mut config = Config::default();
        config.import.header_scan_limit = 40;
        config.save(dir.path()).unwrap();

        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("settings.json")).unwrap())
                .unwrap();
        assert_eq!(saved["ui"]["theme"], "dark");
        assert_eq!(saved["import"]["legacy"], true);
        assert_eq!(saved["import"]["headerScanLimit"], 40);
    }
}
