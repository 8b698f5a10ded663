use crate::models::{
    DocumentManifest, ExtractionMetadata, ExtractionMethod, ReviewConfig, ReviewDocument,
    ReviewField,
};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use std::collections::HashMap;
use std::fs;

/// Prefix for environment overrides, e.g. `REVIEWFLOW_AUTOSAVE__DELAY_MS=500`
pub const ENV_PREFIX: &str = "REVIEWFLOW";

/// Configuration manager for loading and saving YAML configuration files.
///
/// Manages two files in the data directory:
/// - Review config (`ReviewFlow Config.yaml`): Autosave, review gate and logging settings
/// - Document manifest (`ReviewFlow Documents.yaml`): The review queue
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    review_config_path: Utf8PathBuf,
    manifest_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory containing configuration files (e.g., "ReviewFlow Data")
    ///
    /// # Returns
    /// A new ConfigManager instance
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            review_config_path: config_dir.join("ReviewFlow Config.yaml"),
            manifest_path: config_dir.join("ReviewFlow Documents.yaml"),
            config_dir,
        })
    }

    /// Load the review configuration with environment overrides applied.
    ///
    /// The YAML file is optional; missing keys fall back to defaults.
    pub fn load_review_config(&self) -> Result<ReviewConfig> {
        self.load_review_config_from(None)
    }

    /// Same as [`load_review_config`](Self::load_review_config), reading
    /// overrides from `env` instead of the process environment when given.
    pub fn load_review_config_from(&self, env: Option<HashMap<String, String>>) -> Result<ReviewConfig> {
        if !self.review_config_path.exists() {
            tracing::warn!(
                "Review config file not found at {}, using defaults",
                self.review_config_path
            );
        }

        let settings = Config::builder()
            .add_source(File::new(self.review_config_path.as_str(), FileFormat::Yaml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .with_context(|| format!("Failed to read review config: {}", self.review_config_path))?;

        let config: ReviewConfig = settings
            .try_deserialize()
            .with_context(|| format!("Failed to parse review config: {}", self.review_config_path))?;

        tracing::info!("Loaded review config from {}", self.review_config_path);
        Ok(config)
    }

    /// Save the review configuration file.
    ///
    /// # Arguments
    /// * `config` - The ReviewConfig to save
    pub fn save_review_config(&self, config: &ReviewConfig) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize review config to YAML")?;

        fs::write(&self.review_config_path, yaml_string)
            .with_context(|| format!("Failed to write review config: {}", self.review_config_path))?;

        tracing::info!("Saved review config to {}", self.review_config_path);
        Ok(())
    }

    /// Load the document manifest.
    ///
    /// # Returns
    /// The loaded manifest. When the file doesn't exist a sample manifest is
    /// written and returned.
    pub fn load_manifest(&self) -> Result<DocumentManifest> {
        if !self.manifest_path.exists() {
            tracing::warn!(
                "Document manifest not found at {}, writing sample manifest",
                self.manifest_path
            );
            let manifest = Self::sample_manifest()?;
            self.save_manifest(&manifest)?;
            return Ok(manifest);
        }

        let file_contents = fs::read_to_string(&self.manifest_path)
            .with_context(|| format!("Failed to read document manifest: {}", self.manifest_path))?;

        let manifest: DocumentManifest = serde_yaml_ng::from_str(&file_contents)
            .with_context(|| format!("Failed to parse document manifest: {}", self.manifest_path))?;
        manifest
            .validate()
            .with_context(|| format!("Invalid document manifest: {}", self.manifest_path))?;

        tracing::info!(
            "Loaded {} document(s) from {}",
            manifest.documents.len(),
            self.manifest_path
        );
        Ok(manifest)
    }

    /// Save the document manifest.
    ///
    /// # Arguments
    /// * `manifest` - The DocumentManifest to save
    pub fn save_manifest(&self, manifest: &DocumentManifest) -> Result<()> {
        let yaml_string = serde_yaml_ng::to_string(manifest)
            .context("Failed to serialize document manifest to YAML")?;

        fs::write(&self.manifest_path, yaml_string)
            .with_context(|| format!("Failed to write document manifest: {}", self.manifest_path))?;

        tracing::info!("Saved document manifest to {}", self.manifest_path);
        Ok(())
    }

    /// One document per extraction method, so every review path can be tried
    fn sample_manifest() -> Result<DocumentManifest> {
        let field = |name: &str, value: &str, page: u32| ReviewField {
            name: name.to_string(),
            value: value.to_string(),
            source_page: Some(page),
        };

        let documents = vec![
            ReviewDocument {
                id: "invoice-2041".to_string(),
                name: "Invoice 2041 (digital PDF)".to_string(),
                metadata: ExtractionMetadata::new(ExtractionMethod::Text, 0.99)?,
                fields: vec![
                    field("vendor", "Northwind Traders", 1),
                    field("invoice_date", "2024-03-18", 1),
                    field("total", "1,284.50", 2),
                ],
            },
            ReviewDocument {
                id: "receipt-0117".to_string(),
                name: "Receipt 0117 (scanned)".to_string(),
                metadata: ExtractionMetadata::new(ExtractionMethod::Ocr, 0.62)?,
                fields: vec![
                    field("merchant", "C0rner Deli", 1),
                    field("date", "2024-O3-21", 1),
                    field("total", "48.S0", 1),
                ],
            },
            ReviewDocument {
                id: "contract-88".to_string(),
                name: "Service contract 88 (signed scan pages)".to_string(),
                metadata: ExtractionMetadata::new(ExtractionMethod::Hybrid, 0.81)?,
                fields: vec![
                    field("counterparty", "Fabrikam Ltd", 1),
                    field("effective_date", "2024-04-01", 1),
                    field("monthly_fee", "2,500.00", 3),
                    field("signature_date", "2024-03-29", 7),
                ],
            },
        ];

        Ok(DocumentManifest { documents })
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn review_config_path(&self) -> &Utf8Path {
        &self.review_config_path
    }

    pub fn manifest_path(&self) -> &Utf8Path {
        &self.manifest_path
    }
}
