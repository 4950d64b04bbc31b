use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use snowcask_core::{
    CatalogScope, ObjectKind, ObjectTypeConfig, StagingLayout, StrategyRegistry, archive_prefix,
    write_bytes_atomic,
};
use snowcask_extract::ExtractOptions;
use snowcask_replay::{Manifest, RawManifestStep};

use crate::CliError;

pub const DEFAULT_CONFIG_PATH: &str = "snowcask.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub database: Option<String>,
    pub schema: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            database: None,
            schema: "PUBLIC".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    pub directory: PathBuf,
    pub archive_directory: PathBuf,
    pub runs_directory: PathBuf,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("staging"),
            archive_directory: PathBuf::from("archive"),
            runs_directory: PathBuf::from("runs"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Kind labels to extract, e.g. `TABLE` or `FILE_FORMAT`.
    pub objects: Vec<String>,
    pub table_data: bool,
    pub stage_data: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            objects: ObjectKind::ALL
                .iter()
                .map(|kind| kind.label().to_string())
                .collect(),
            table_data: true,
            stage_data: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Local directory backing `@stage` locations.
    pub stage_root: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            stage_root: PathBuf::from("stages"),
        }
    }
}

/// Contents of `snowcask.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnowcaskConfig {
    pub source: SourceConfig,
    pub staging: StagingConfig,
    pub extract: ExtractConfig,
    pub session: SessionConfig,
    pub build_manifest: Vec<RawManifestStep>,
}

impl Default for SnowcaskConfig {
    fn default() -> Self {
        let mut build_manifest: Vec<RawManifestStep> = ObjectKind::ALL
            .iter()
            .map(|kind| {
                RawManifestStep::new(
                    "infrastructure",
                    kind.label(),
                    &format!("infrastructure/{}", kind.dir_name()),
                )
            })
            .collect();
        build_manifest.push(RawManifestStep::new("data", "TABLE", "data/tables"));
        build_manifest.push(RawManifestStep::new("data", "STAGE", "data/stages"));

        Self {
            source: SourceConfig::default(),
            staging: StagingConfig::default(),
            extract: ExtractConfig::default(),
            session: SessionConfig::default(),
            build_manifest,
        }
    }
}

impl SnowcaskConfig {
    pub fn scope(&self) -> CatalogScope {
        CatalogScope::new(self.source.database.clone(), self.source.schema.clone())
    }

    pub fn kinds(&self) -> Result<Vec<ObjectKind>, CliError> {
        let kinds = self
            .extract
            .objects
            .iter()
            .map(|label| label.parse::<ObjectKind>())
            .collect::<Result<Vec<_>, _>>()?;
        if kinds.is_empty() {
            return Err(CliError::InvalidConfig(
                "extract.objects must name at least one object kind".to_string(),
            ));
        }
        Ok(kinds)
    }

    /// Registry of the configured kinds; listing a kind twice is an error.
    pub fn registry(&self) -> Result<StrategyRegistry, CliError> {
        let scope = self.scope();
        let configs = self
            .kinds()?
            .into_iter()
            .map(|kind| ObjectTypeConfig::standard(kind, &scope))
            .collect();
        Ok(StrategyRegistry::from_configs(scope, configs)?)
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            table_data: self.extract.table_data,
            stage_data: self.extract.stage_data,
        }
    }

    pub fn layout(&self) -> StagingLayout {
        StagingLayout::new(&self.staging.directory)
    }

    pub fn archive_prefix(&self) -> PathBuf {
        archive_prefix(
            &self.staging.archive_directory,
            self.source.database.as_deref(),
            &self.source.schema,
        )
    }

    pub fn manifest(&self) -> Result<Manifest, CliError> {
        Ok(Manifest::from_raw(&self.build_manifest)?)
    }
}

/// Read the config at `path`, writing the defaults there first if it is missing.
pub fn load_or_create_config(path: &Path) -> Result<SnowcaskConfig, CliError> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: SnowcaskConfig = toml::from_str(&content)?;
        return Ok(config);
    }

    let config = SnowcaskConfig::default();
    save_config(path, &config)?;
    Ok(config)
}

pub fn save_config(path: &Path, config: &SnowcaskConfig) -> Result<(), CliError> {
    let encoded = toml::to_string_pretty(config)?;
    write_bytes_atomic(path, encoded.as_bytes())?;
    Ok(())
}
