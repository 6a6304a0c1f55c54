use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use leaf_server::config::LOG_LEVEL_ENV;
use leaf_server::{LeafServer, ServerConfig, ServerError};
use leafscan::{BurnClassifier, DefaultBackend, LabelCatalog, LeafError, Pipeline, PreprocessConfig, PreviewConfig};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shops::{OverpassClient, OverpassConfig, ShopError};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    Classifier(#[from] LeafError),
    #[error(transparent)]
    ShopLookup(#[from] ShopError),
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// Where the trained model lives
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct ModelSection {
    /// Directory holding `model.json` and `model.mpk`
    pub dir: PathBuf,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("models/plant_village"),
        }
    }
}

/// Label catalog source
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct CatalogSection {
    /// TOML or JSON catalog file; the built-in PlantVillage list when unset
    pub path: Option<PathBuf>,
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelSection,
    pub catalog: CatalogSection,
    pub preprocess: PreprocessConfig,
    pub preview: PreviewConfig,
    pub server: ServerConfig,
    pub shops: OverpassConfig,
}

impl AppConfig {
    /// Load AppConfig from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load AppConfig from TOML string
    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        Ok(toml::from_str(content)?)
    }

    /// Load AppConfig from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load AppConfig from JSON string
    pub fn from_json(content: &str) -> Result<Self, CliError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(CliError::UnsupportedFileFormat),
        }
    }

    /// Configuration file if given, defaults otherwise
    pub fn read(path: Option<&Path>) -> Result<Self, CliError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Log level to start with, before environment overrides are applied
    pub fn initial_log_level(&self) -> String {
        std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| self.server.log_level.clone())
    }

    /// Apply `LEAFSCAN_*` environment overrides to the server section
    #[must_use]
    pub fn with_env(mut self) -> Self {
        self.server = self.server.with_env();
        self
    }

    pub fn to_toml(&self) -> Result<String, CliError> {
        Ok(toml::to_string_pretty(&self)?)
    }

    pub fn to_json(&self) -> Result<String, CliError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }

    /// JSON schema of the configuration file
    pub fn schema() -> Result<String, CliError> {
        let schema = schemars::schema_for!(AppConfig);
        Ok(serde_json::to_string_pretty(&schema)?)
    }

    pub fn load_catalog(&self) -> Result<LabelCatalog, CliError> {
        match &self.catalog.path {
            Some(path) => {
                info!(path = %path.display(), "Loading label catalog");
                Ok(LabelCatalog::from_file(path)?)
            }
            None => Ok(LabelCatalog::plant_village()),
        }
    }

    /// Load the model and catalog and wire them into a pipeline
    pub fn build_pipeline(&self) -> Result<Pipeline, CliError> {
        let catalog = self.load_catalog()?;
        let model = BurnClassifier::<DefaultBackend>::from_dir(&self.model.dir, Default::default())?;

        let pipeline = Pipeline::builder()
            .model(model)
            .catalog(catalog)
            .preprocess(self.preprocess)
            .preview(self.preview)
            .build()?;
        Ok(pipeline)
    }

    pub fn shop_client(&self) -> Result<OverpassClient, CliError> {
        Ok(OverpassClient::new(self.shops.clone())?)
    }

    /// Everything `serve` needs, validated before binding
    pub fn build_server(&self) -> Result<LeafServer, CliError> {
        let pipeline = self.build_pipeline()?;
        let shops = Arc::new(self.shop_client()?);
        Ok(LeafServer::new(pipeline, shops, self.server.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leafscan::{ChannelOrder, LeafCnnConfig};
    use std::io::{self, Write};
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn write_model(dir: &Path, classes: usize) {
        let config = LeafCnnConfig::new()
            .with_num_classes(classes)
            .with_input_height(16)
            .with_input_width(16);
        BurnClassifier::<DefaultBackend>::random(config, Default::default())
            .unwrap()
            .save(dir)
            .unwrap();
    }

    #[test]
    fn test_partial_toml_takes_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [model]
            dir = "/opt/models/leaf"

            [preprocess]
            channel_order = "bgr"

            [server]
            port = 9000
            "#,
        )
        .unwrap();

        assert_eq!(config.model.dir, PathBuf::from("/opt/models/leaf"));
        assert_eq!(config.preprocess.channel_order, ChannelOrder::Bgr);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, leaf_server::config::DEFAULT_HOST);
        assert_eq!(config.preview.quality, 95);
        assert_eq!(config.shops.radius_m, 2000);
        assert!(config.catalog.path.is_none());
    }

    #[test]
    fn test_from_file_by_extension() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::default();

        let toml_path = dir.path().join("leafscan.toml");
        fs::write(&toml_path, config.to_toml().unwrap()).unwrap();
        assert_eq!(AppConfig::from_file(&toml_path).unwrap(), config);

        let json_path = dir.path().join("leafscan.json");
        fs::write(&json_path, config.to_json().unwrap()).unwrap();
        assert_eq!(AppConfig::from_file(&json_path).unwrap(), config);

        let yaml_path = dir.path().join("leafscan.yaml");
        fs::write(&yaml_path, "model: {}").unwrap();
        assert!(matches!(AppConfig::from_file(&yaml_path), Err(CliError::UnsupportedFileFormat)));
    }

    #[test]
    fn test_schema_names_sections() {
        let schema = AppConfig::schema().unwrap();
        for section in ["model", "catalog", "preprocess", "preview", "server", "shops"] {
            assert!(schema.contains(&format!("\"{}\"", section)), "missing {}", section);
        }
    }

    #[test]
    fn test_build_pipeline_from_model_dir() {
        let dir = TempDir::new().unwrap();
        write_model(dir.path(), 38);

        let config = AppConfig {
            model: ModelSection { dir: dir.path().to_path_buf() },
            ..Default::default()
        };
        let pipeline = config.build_pipeline().unwrap();
        assert_eq!(pipeline.catalog().len(), 38);
        assert_eq!(pipeline.input_size().width, 16);
    }

    #[test]
    fn test_build_pipeline_with_custom_catalog() {
        let dir = TempDir::new().unwrap();
        write_model(dir.path(), 2);

        let catalog_path = dir.path().join("labels.toml");
        fs::write(
            &catalog_path,
            r#"
            [[classes]]
            label = "Healthy"
            care = "No action needed."

            [[classes]]
            label = "Rust"
            "#,
        )
        .unwrap();

        let config = AppConfig {
            model: ModelSection { dir: dir.path().to_path_buf() },
            catalog: CatalogSection { path: Some(catalog_path) },
            ..Default::default()
        };
        let pipeline = config.build_pipeline().unwrap();
        assert_eq!(pipeline.catalog().len(), 2);
        assert_eq!(pipeline.catalog().get(1).unwrap().care.as_str(), leafscan::FALLBACK_CARE);
    }

    #[test]
    fn test_class_count_mismatch_fails_at_startup() {
        let dir = TempDir::new().unwrap();
        write_model(dir.path(), 5);

        let config = AppConfig {
            model: ModelSection { dir: dir.path().to_path_buf() },
            ..Default::default()
        };
        assert!(matches!(
            config.build_pipeline(),
            Err(CliError::Classifier(LeafError::Configuration(_)))
        ));
    }

    #[test]
    fn test_rejected_override_is_logged_once_subscriber_is_installed() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let config = AppConfig::read(None).unwrap();
        let server = tracing::subscriber::with_default(subscriber, || {
            config
                .server
                .clone()
                .with_overrides(|key| (key == "LEAFSCAN_PORT").then(|| "eighty".to_string()))
        });

        assert_eq!(server.port, leaf_server::config::DEFAULT_PORT);
        assert!(logs.contents().contains("Ignoring invalid LEAFSCAN_PORT"));
    }

    #[test]
    fn test_read_without_path_is_defaults() {
        assert_eq!(AppConfig::read(None).unwrap(), AppConfig::default());
    }
}
