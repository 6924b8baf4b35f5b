use crate::error::{StoreError, StoreErrorExt};
use ::config::{Case, Config, Environment, File, FileFormat, FileSourceFile};
use mdock_archive::Compression;
use mdock_backend::BackendConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File stem probed in the working directory when no explicit path is given.
const DEFAULT_CONFIG_NAME: &str = "mdock";

/// How archives are built before they are uploaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveSettings {
    /// Directory archive files are written into.
    pub output_dir: PathBuf,
    /// Payload compression applied by the builder.
    pub compression: Compression,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self { output_dir: PathBuf::from("."), compression: Compression::Lz4 }
    }
}

/// Complete store configuration: one backend plus archive settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend selection with its credentials and root.
    pub backend: BackendConfig,
    #[serde(default)]
    pub archive: ArchiveSettings,
}

/// A reusable configuration loader that combines file-based settings with
/// environment overrides.
///
/// The layering, lowest precedence first:
/// 1. **Base file**: the given path (required), or an optional
///    `mdock.{toml,json,yaml,...}` in the working directory when no path is
///    given.
/// 2. **Environment overrides**: variables prefixed with `MDOCK__`, nested
///    keys separated by double underscores (`MDOCK__BACKEND__ROOT` maps to
///    `backend.root`).
///
/// # Errors
///
/// Returns [`StoreError::Config`] when an explicitly named file is missing,
/// a source is malformed, or the merged settings do not deserialize into `T`.
///
/// # Example
/// ```rust,no_run
/// use mdock_registry::{StoreConfig, load_config};
///
/// let config: StoreConfig = load_config(Some("config/store.toml")).unwrap();
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, StoreError>
where
    T: DeserializeOwned,
{
    let file = match path {
        Some(path) => {
            let path = path.as_ref();
            info!("Loading configuration from {}", path.display());
            File::from(path).required(true)
        },
        None => {
            debug!("No configuration file given, probing for '{DEFAULT_CONFIG_NAME}'");
            File::with_name(DEFAULT_CONFIG_NAME).required(false)
        },
    };

    let env = Environment::with_prefix("MDOCK").separator("__").convert_case(Case::Snake);

    build_layered(file, env)?
        .try_deserialize::<T>()
        .context("Failed to deserialize configuration")
}

fn build_layered(
    file: File<FileSourceFile, FileFormat>,
    env: Environment,
) -> Result<Config, StoreError> {
    Config::builder()
        .add_source(file)
        .add_source(env)
        .build()
        .context("Failed to build configuration")
}
