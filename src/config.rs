//! Run configuration.
//!
//! `DedupConfig` holds every knob with its default. A TOML file can override
//! any subset of fields; CLI flags are applied on top by the binary.

use anyhow::{bail, Context, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use std::path::Path;

use crate::normalize::{Normalizer, BUILTIN_ABBREVIATIONS, BUILTIN_STOPWORDS};
use crate::scoring::{Algorithm, DEFAULT_THRESHOLD};

#[derive(Debug, Clone, PartialEq)]
pub struct DedupConfig {
    pub remove_numbers: bool,
    pub fold_ascii: bool,
    pub use_builtin_lexicon: bool,
    pub stopwords: Option<FxHashSet<String>>,
    pub abbreviations: Option<FxHashMap<String, String>>,
    pub algorithm: Algorithm,
    pub algorithm_fallback: bool, // Set when a selector string was not recognized
    pub threshold: f64,
    pub max_records: Option<usize>,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            remove_numbers: true,
            fold_ascii: false,
            use_builtin_lexicon: false,
            stopwords: None,
            abbreviations: None,
            algorithm: Algorithm::SetRatio,
            algorithm_fallback: false,
            threshold: DEFAULT_THRESHOLD,
            max_records: None,
        }
    }
}

/// On-disk shape of the config file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub remove_numbers: Option<bool>,
    pub fold_ascii: Option<bool>,
    pub builtin_lexicon: Option<bool>,
    pub stopwords: Option<Vec<String>>,
    pub abbreviations: Option<FxHashMap<String, String>>,
    pub algorithm: Option<String>,
    pub threshold: Option<f64>,
    pub max_records: Option<usize>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

impl DedupConfig {
    /// Select the similarity algorithm by name, falling back to set-ratio when unknown.
    pub fn set_algorithm(&mut self, selector: &str) {
        let (algorithm, fallback) = Algorithm::from_selector(selector);
        self.algorithm = algorithm;
        self.algorithm_fallback = fallback;
    }

    /// Overlay values present in a config file.
    pub fn apply_file(&mut self, file: ConfigFile) {
        if let Some(v) = file.remove_numbers {
            self.remove_numbers = v;
        }
        if let Some(v) = file.fold_ascii {
            self.fold_ascii = v;
        }
        if let Some(v) = file.builtin_lexicon {
            self.use_builtin_lexicon = v;
        }
        if let Some(words) = file.stopwords {
            self.stopwords = Some(words.into_iter().collect());
        }
        if let Some(map) = file.abbreviations {
            self.abbreviations = Some(map);
        }
        if let Some(selector) = file.algorithm {
            self.set_algorithm(&selector);
        }
        if let Some(v) = file.threshold {
            self.threshold = v;
        }
        if file.max_records.is_some() {
            self.max_records = file.max_records;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            bail!("similarity threshold must be within [0, 1], got {}", self.threshold);
        }
        if self.max_records == Some(0) {
            bail!("max_records must be at least 1 when set");
        }
        Ok(())
    }

    /// Build the normalizer for this run.
    ///
    /// With the built-in lexicon enabled, user stopwords extend it and user
    /// abbreviations override entries with the same key.
    pub fn normalizer(&self) -> Normalizer {
        let mut normalizer = if self.use_builtin_lexicon {
            Normalizer::with_builtin_lexicon(self.remove_numbers)
        } else {
            Normalizer::new(self.remove_numbers)
        };
        normalizer.fold_ascii = self.fold_ascii;

        if let Some(stopwords) = &self.stopwords {
            normalizer
                .stopwords
                .get_or_insert_with(FxHashSet::default)
                .extend(stopwords.iter().cloned());
        }
        if let Some(abbreviations) = &self.abbreviations {
            normalizer
                .abbreviations
                .get_or_insert_with(FxHashMap::default)
                .extend(abbreviations.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        normalizer
    }

    /// Number of (stopwords, abbreviations) the normalizer will apply
    pub fn lexicon_size(&self) -> (usize, usize) {
        let normalizer = self.normalizer();
        (
            normalizer.stopwords.as_ref().map_or(0, |s| s.len()),
            normalizer.abbreviations.as_ref().map_or(0, |a| a.len()),
        )
    }
}

/// Sizes of the built-in lexicon, for log lines
pub fn builtin_lexicon_size() -> (usize, usize) {
    (BUILTIN_STOPWORDS.len(), BUILTIN_ABBREVIATIONS.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DedupConfig::default();
        assert!(config.remove_numbers);
        assert!(!config.fold_ascii);
        assert_eq!(config.stopwords, None);
        assert_eq!(config.abbreviations, None);
        assert_eq!(config.algorithm, Algorithm::SetRatio);
        assert_eq!(config.threshold, 0.8);
        assert_eq!(config.max_records, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config_file() {
        let file = ConfigFile::parse(
            r#"
            remove_numbers = false
            algorithm = "levenshtein"
            threshold = 0.85
            max_records = 10000
            stopwords = ["llc", "inc"]

            [abbreviations]
            apartments = "apt"
            "#,
        )
        .unwrap();

        let mut config = DedupConfig::default();
        config.apply_file(file);

        assert!(!config.remove_numbers);
        assert_eq!(config.algorithm, Algorithm::EditRatio);
        assert!(!config.algorithm_fallback);
        assert_eq!(config.threshold, 0.85);
        assert_eq!(config.max_records, Some(10000));
        assert_eq!(config.stopwords.as_ref().map(|s| s.len()), Some(2));
        assert_eq!(
            config.abbreviations.as_ref().and_then(|a| a.get("apartments")).map(String::as_str),
            Some("apt")
        );
    }

    #[test]
    fn test_unknown_algorithm_in_file_is_flagged() {
        let mut config = DedupConfig::default();
        config.apply_file(ConfigFile::parse(r#"algorithm = "cosine""#).unwrap());
        assert_eq!(config.algorithm, Algorithm::SetRatio);
        assert!(config.algorithm_fallback);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(ConfigFile::parse("treshold = 0.9").is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = DedupConfig {
            threshold: 1.5,
            ..DedupConfig::default()
        };
        assert!(config.validate().is_err());

        let config = DedupConfig {
            max_records: Some(0),
            ..DedupConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_user_lexicon_overrides_builtin() {
        let mut abbreviations = FxHashMap::default();
        abbreviations.insert("apartments".to_string(), "apts".to_string());
        let config = DedupConfig {
            use_builtin_lexicon: true,
            stopwords: Some(["ltd".to_string()].into_iter().collect()),
            abbreviations: Some(abbreviations),
            ..DedupConfig::default()
        };

        let normalizer = config.normalizer();
        assert_eq!(normalizer.normalize("Acme Apartments Ltd LLC"), "acme apts");
        let (builtin_stop, builtin_abbr) = builtin_lexicon_size();
        assert_eq!(config.lexicon_size(), (builtin_stop + 1, builtin_abbr));
    }

    #[test]
    fn test_no_lexicon_by_default() {
        let normalizer = DedupConfig::default().normalizer();
        assert!(normalizer.stopwords.is_none());
        assert!(normalizer.abbreviations.is_none());
        assert_eq!(normalizer.normalize("Acme Apartments LLC"), "acme apartments llc");
    }
}
