pub mod error;

use std::fs;
use std::path::{Path, PathBuf};

use darkroom_core::GatherConfig;
use tracing::debug;

use self::error::ConfigLoadError;
use crate::sources::EnvConfig;
use crate::validation::{ConfigWarnings, apply_guard_rails};

pub const DEFAULT_CONFIG_FILE: &str = "darkroom.toml";

/// Where the file layer of the configuration came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    /// No file; built-in defaults plus environment overrides.
    #[default]
    Default,
    /// Path passed to the loader (e.g. `--config`).
    Explicit(PathBuf),
    /// Path taken from `$DARKROOM_CONFIG_PATH`.
    EnvPath(PathBuf),
    /// `darkroom.toml` found in the working directory.
    File(PathBuf),
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::Default => None,
            ConfigSource::Explicit(path)
            | ConfigSource::EnvPath(path)
            | ConfigSource::File(path) => Some(path),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
    /// Directory searched for `darkroom.toml` and `.env`. Defaults to the
    /// process working directory.
    pub working_dir: Option<PathBuf>,
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: GatherConfig,
    pub source: ConfigSource,
    /// Environment variables that overrode file or default values.
    pub env_overrides: Vec<&'static str>,
    pub warnings: ConfigWarnings,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn with_working_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.working_dir = Some(path.into());
        self
    }

    /// Load `.env`, then the config file, then environment overrides, then
    /// run the guard rails.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = self.load_env_file()?;
        debug!(env_file_loaded, "environment file processed");
        self.load_with_env(EnvConfig::gather()?)
    }

    /// Same as [`ConfigLoader::load`] with the environment layer supplied by
    /// the caller. The process environment and `.env` are not consulted.
    pub fn load_with_env(&self, env: EnvConfig) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, source) = self.load_file_config(&env)?;
        let env_overrides = env.applied();
        let config = compose_config(file_config.unwrap_or_default(), env);
        let warnings = apply_guard_rails(&config)?;

        debug!(
            source = ?source,
            overrides = ?env_overrides,
            warnings = warnings.items.len(),
            "configuration loaded"
        );
        Ok(ConfigLoad {
            config,
            source,
            env_overrides,
            warnings,
        })
    }

    fn working_path(&self, relative: &str) -> PathBuf {
        match &self.options.working_dir {
            Some(dir) => dir.join(relative),
            None => PathBuf::from(relative),
        }
    }

    fn load_env_file(&self) -> Result<bool, ConfigLoadError> {
        let path = self
            .options
            .env_file
            .clone()
            .unwrap_or_else(|| self.working_path(".env"));
        dotenvy::from_path(&path)
            .map(|_| true)
            .or_else(|err| match err {
                dotenvy::Error::Io(_) => Ok(false),
                _ => Err(ConfigLoadError::EnvFile(err)),
            })
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<GatherConfig>, ConfigSource), ConfigLoadError> {
        let source = if let Some(explicit) = &self.options.config_path {
            ConfigSource::Explicit(explicit.clone())
        } else if let Some(from_env) = &env.config_path {
            ConfigSource::EnvPath(from_env.clone())
        } else {
            let candidate = self.working_path(DEFAULT_CONFIG_FILE);
            if !candidate.exists() {
                return Ok((None, ConfigSource::Default));
            }
            ConfigSource::File(candidate)
        };

        let Some(path) = source.path() else {
            return Ok((None, source));
        };
        if !path.exists() {
            return Err(ConfigLoadError::MissingConfig {
                path: path.to_path_buf(),
            });
        }

        let config = parse_config_file(path)?;
        Ok((Some(config), source))
    }
}

/// Parse a config file as JSON when it has a `.json` extension, TOML
/// otherwise.
pub fn parse_config_file(path: &Path) -> Result<GatherConfig, ConfigLoadError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => {
            serde_json::from_str(&contents).map_err(|source| ConfigLoadError::Json {
                path: path.to_path_buf(),
                source,
            })
        }
        _ => toml::from_str(&contents).map_err(|source| ConfigLoadError::Toml {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn compose_config(file: GatherConfig, env: EnvConfig) -> GatherConfig {
    GatherConfig {
        base_dir: env.base_dir.unwrap_or(file.base_dir),
        search_roots: env.search_roots.unwrap_or(file.search_roots),
        search_download_root: env
            .search_download_root
            .unwrap_or(file.search_download_root),
        prefix: env.prefix.unwrap_or(file.prefix),
        page_size: env.page_size.unwrap_or(file.page_size),
        max_concurrent_assets: env
            .max_concurrent_assets
            .unwrap_or(file.max_concurrent_assets),
        ..file
    }
}
