use std::path::PathBuf;

use crate::loader::error::ConfigLoadError;

pub const ENV_CONFIG_PATH: &str = "DARKROOM_CONFIG_PATH";
pub const ENV_BASE_DIR: &str = "DARKROOM_BASE_DIR";
pub const ENV_SEARCH_ROOTS: &str = "DARKROOM_SEARCH_ROOTS";
pub const ENV_SEARCH_DOWNLOAD_ROOT: &str = "DARKROOM_SEARCH_DOWNLOAD_ROOT";
pub const ENV_PREFIX: &str = "DARKROOM_PREFIX";
pub const ENV_PAGE_SIZE: &str = "DARKROOM_PAGE_SIZE";
pub const ENV_CONCURRENCY: &str = "DARKROOM_CONCURRENCY";

/// Overrides read from the environment. `None` means "not set"; set values
/// win over the config file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub base_dir: Option<PathBuf>,
    pub search_roots: Option<Vec<PathBuf>>,
    pub search_download_root: Option<bool>,
    pub prefix: Option<String>,
    pub page_size: Option<usize>,
    pub max_concurrent_assets: Option<usize>,
}

impl EnvConfig {
    /// Read overrides from the process environment.
    pub fn gather() -> Result<Self, ConfigLoadError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigLoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|raw| !raw.trim().is_empty());

        Ok(Self {
            config_path: var(ENV_CONFIG_PATH).map(PathBuf::from),
            base_dir: var(ENV_BASE_DIR).map(PathBuf::from),
            search_roots: var(ENV_SEARCH_ROOTS)
                .map(|raw| std::env::split_paths(&raw).collect()),
            search_download_root: var(ENV_SEARCH_DOWNLOAD_ROOT)
                .map(|raw| parse_bool(ENV_SEARCH_DOWNLOAD_ROOT, &raw))
                .transpose()?,
            prefix: var(ENV_PREFIX),
            page_size: var(ENV_PAGE_SIZE)
                .map(|raw| parse_count(ENV_PAGE_SIZE, &raw))
                .transpose()?,
            max_concurrent_assets: var(ENV_CONCURRENCY)
                .map(|raw| parse_count(ENV_CONCURRENCY, &raw))
                .transpose()?,
        })
    }

    /// Names of the overrides that are set, for diagnostics.
    pub fn applied(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.base_dir.is_some() {
            names.push(ENV_BASE_DIR);
        }
        if self.search_roots.is_some() {
            names.push(ENV_SEARCH_ROOTS);
        }
        if self.search_download_root.is_some() {
            names.push(ENV_SEARCH_DOWNLOAD_ROOT);
        }
        if self.prefix.is_some() {
            names.push(ENV_PREFIX);
        }
        if self.page_size.is_some() {
            names.push(ENV_PAGE_SIZE);
        }
        if self.max_concurrent_assets.is_some() {
            names.push(ENV_CONCURRENCY);
        }
        names
    }
}

fn parse_count(key: &'static str, raw: &str) -> Result<usize, ConfigLoadError> {
    raw.trim()
        .parse()
        .map_err(|err: std::num::ParseIntError| ConfigLoadError::InvalidEnv {
            key,
            value: raw.to_string(),
            reason: err.to_string(),
        })
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigLoadError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigLoadError::InvalidEnv {
            key,
            value: raw.to_string(),
            reason: "expected a boolean".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn parses_overrides_and_ignores_blank_values() {
        let roots = std::env::join_paths(["/Pictures", "/mnt/photos"]).unwrap();
        let roots = roots.to_str().unwrap().to_string();
        let env = EnvConfig::from_lookup(lookup(&[
            (ENV_BASE_DIR, "/srv/darkroom"),
            (ENV_SEARCH_ROOTS, &roots),
            (ENV_SEARCH_DOWNLOAD_ROOT, "off"),
            (ENV_PAGE_SIZE, " 250 "),
            (ENV_PREFIX, "  "),
        ]))
        .unwrap();

        assert_eq!(env.base_dir, Some(PathBuf::from("/srv/darkroom")));
        assert_eq!(
            env.search_roots,
            Some(vec![PathBuf::from("/Pictures"), PathBuf::from("/mnt/photos")])
        );
        assert_eq!(env.search_download_root, Some(false));
        assert_eq!(env.page_size, Some(250));
        assert_eq!(env.prefix, None);
        assert_eq!(
            env.applied(),
            vec![ENV_BASE_DIR, ENV_SEARCH_ROOTS, ENV_SEARCH_DOWNLOAD_ROOT, ENV_PAGE_SIZE]
        );
    }

    #[test]
    fn rejects_malformed_numbers() {
        let err = EnvConfig::from_lookup(lookup(&[(ENV_CONCURRENCY, "ten")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::InvalidEnv {
                key: ENV_CONCURRENCY,
                ..
            }
        ));
    }
}
