//! Pipeline configuration.

use filepipe_core::{HashAlgorithm, HashCalculatorManager};
use filepipe_multipart::ParserConfig;
use serde::{Deserialize, Serialize};

/// Default platform name used in diagnostics.
pub const DEFAULT_PLATFORM: &str = "local";

/// Configuration for [`UploadPipeline`](crate::UploadPipeline).
///
/// Loadable from any serde format:
///
/// ```ignore
/// let config: PipelineConfig = serde_json::from_str(
///     r#"{"platform": "minio", "hash_algorithms": ["MD5", "SHA-256"]}"#,
/// )?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    parser: ParserConfig,
    hash_algorithms: Vec<HashAlgorithm>,
    platform: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            parser: ParserConfig::default(),
            hash_algorithms: Vec::new(),
            platform: DEFAULT_PLATFORM.to_string(),
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn parser(mut self, parser: ParserConfig) -> Self {
        self.parser = parser;
        self
    }

    /// Adds a digest computed over every upload. Duplicates are ignored.
    #[must_use]
    pub fn hash_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        if !self.hash_algorithms.contains(&algorithm) {
            self.hash_algorithms.push(algorithm);
        }
        self
    }

    #[must_use]
    pub fn hash_algorithms(self, algorithms: impl IntoIterator<Item = HashAlgorithm>) -> Self {
        algorithms
            .into_iter()
            .fold(self, |config, algorithm| config.hash_algorithm(algorithm))
    }

    /// Name of the storage platform, reported in failure diagnostics.
    #[must_use]
    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    #[must_use]
    pub fn get_parser(&self) -> &ParserConfig {
        &self.parser
    }

    #[must_use]
    pub fn get_hash_algorithms(&self) -> &[HashAlgorithm] {
        &self.hash_algorithms
    }

    #[must_use]
    pub fn get_platform(&self) -> &str {
        &self.platform
    }

    /// A fresh digest set for one upload.
    #[must_use]
    pub fn hash_manager(&self) -> HashCalculatorManager {
        HashCalculatorManager::with_algorithms(self.hash_algorithms.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.get_platform(), "local");
        assert!(config.get_hash_algorithms().is_empty());
        assert!(config.hash_manager().is_empty());
    }

    #[test]
    fn duplicate_algorithms_are_ignored() {
        let config = PipelineConfig::new().hash_algorithms([
            HashAlgorithm::Md5,
            HashAlgorithm::Sha256,
            HashAlgorithm::Md5,
        ]);
        assert_eq!(
            config.get_hash_algorithms(),
            [HashAlgorithm::Md5, HashAlgorithm::Sha256]
        );
        assert_eq!(config.hash_manager().len(), 2);
    }

    #[test]
    fn loads_from_json() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{"platform": "minio", "hash_algorithms": ["md5", "SHA-256"], "parser": {"max_fields": 5}}"#,
        )
        .unwrap();
        assert_eq!(config.get_platform(), "minio");
        assert_eq!(
            config.get_hash_algorithms(),
            [HashAlgorithm::Md5, HashAlgorithm::Sha256]
        );
        assert_eq!(config.get_parser().get_max_fields(), 5);
    }

    #[test]
    fn unknown_algorithm_fails_to_load() {
        let result = serde_json::from_str::<PipelineConfig>(r#"{"hash_algorithms": ["crc32"]}"#);
        assert!(result.is_err());
    }
}
