use std::collections::HashSet;

use darkroom_core::{GatherConfig, MAX_CONCURRENT_ASSETS};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigGuardRailError {
    #[error("page_size must be at least 1")]
    ZeroPageSize,
    #[error("max_concurrent_assets must be at least 1")]
    ZeroConcurrency,
    #[error("max_concurrent_assets {requested} exceeds the limit of {max}")]
    ConcurrencyTooHigh { requested: usize, max: usize },
    #[error("no thumbnail specs configured")]
    NoThumbnailSpecs,
    #[error("thumbnail spec {key} has a zero dimension")]
    ZeroDimension { key: String },
    #[error("thumbnail key {key} is configured more than once")]
    DuplicateThumbnailKey { key: String },
    #[error("jpeg_quality {quality} is outside 1..=100")]
    JpegQualityOutOfRange { quality: u8 },
    #[error("no processable extensions configured")]
    NoExtensions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }
}

pub fn apply_guard_rails(
    config: &GatherConfig,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();

    if config.page_size == 0 {
        return Err(ConfigGuardRailError::ZeroPageSize);
    }
    if config.max_concurrent_assets == 0 {
        return Err(ConfigGuardRailError::ZeroConcurrency);
    }
    if config.max_concurrent_assets > MAX_CONCURRENT_ASSETS {
        return Err(ConfigGuardRailError::ConcurrencyTooHigh {
            requested: config.max_concurrent_assets,
            max: MAX_CONCURRENT_ASSETS,
        });
    }
    if !(1..=100).contains(&config.jpeg_quality) {
        return Err(ConfigGuardRailError::JpegQualityOutOfRange {
            quality: config.jpeg_quality,
        });
    }

    validate_thumbnails(config)?;

    if config.extensions.iter().all(|ext| {
        let ext = ext.trim();
        ext.strip_prefix('.').unwrap_or(ext).is_empty()
    }) {
        return Err(ConfigGuardRailError::NoExtensions);
    }

    if !config.base_dir.is_absolute() {
        warnings.push(format!(
            "base_dir {} is relative; artifacts land relative to the working directory",
            config.base_dir.display()
        ));
    }

    for root in &config.search_roots {
        if !root.exists() {
            warnings.push_with_hint(
                format!("search root {} does not exist", root.display()),
                "It is skipped during lookup; mount it or drop it from search_roots",
            );
        } else if !root.is_dir() {
            warnings.push_with_hint(
                format!("search root {} is not a directory", root.display()),
                "search_roots entries must be directories",
            );
        }
    }

    if config.search_roots.is_empty() && !config.search_download_root {
        warnings.push_with_hint(
            "no search roots and download root lookup disabled; \
             every missing thumbnail refetches its source",
            "Enable search_download_root or add search_roots",
        );
    }

    Ok(warnings)
}

fn validate_thumbnails(config: &GatherConfig) -> Result<(), ConfigGuardRailError> {
    if config.thumbnails.is_empty() {
        return Err(ConfigGuardRailError::NoThumbnailSpecs);
    }

    let mut seen = HashSet::new();
    for spec in &config.thumbnails {
        let key = spec.cache_key();
        if spec.width == 0 || spec.height == 0 {
            return Err(ConfigGuardRailError::ZeroDimension { key });
        }
        if !seen.insert(key.clone()) {
            return Err(ConfigGuardRailError::DuplicateThumbnailKey { key });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use darkroom_core::ThumbnailSpec;

    fn valid() -> GatherConfig {
        GatherConfig::with_base_dir(std::env::temp_dir())
    }

    #[test]
    fn defaults_pass() {
        let warnings = apply_guard_rails(&valid()).unwrap();
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn hard_limits_are_errors() {
        let zero_pages = GatherConfig {
            page_size: 0,
            ..valid()
        };
        assert_eq!(
            apply_guard_rails(&zero_pages).unwrap_err(),
            ConfigGuardRailError::ZeroPageSize
        );

        let zero_permits = GatherConfig {
            max_concurrent_assets: 0,
            ..valid()
        };
        assert_eq!(
            apply_guard_rails(&zero_permits).unwrap_err(),
            ConfigGuardRailError::ZeroConcurrency
        );

        let too_many_permits = GatherConfig {
            max_concurrent_assets: usize::MAX,
            ..valid()
        };
        assert_eq!(
            apply_guard_rails(&too_many_permits).unwrap_err(),
            ConfigGuardRailError::ConcurrencyTooHigh {
                requested: usize::MAX,
                max: MAX_CONCURRENT_ASSETS,
            }
        );
        let at_limit = GatherConfig {
            max_concurrent_assets: MAX_CONCURRENT_ASSETS,
            ..valid()
        };
        assert!(apply_guard_rails(&at_limit).is_ok());

        let quality = GatherConfig {
            jpeg_quality: 0,
            ..valid()
        };
        assert_eq!(
            apply_guard_rails(&quality).unwrap_err(),
            ConfigGuardRailError::JpegQualityOutOfRange { quality: 0 }
        );

        let no_ext = GatherConfig {
            extensions: vec![" ".into(), ".".into()],
            ..valid()
        };
        assert_eq!(
            apply_guard_rails(&no_ext).unwrap_err(),
            ConfigGuardRailError::NoExtensions
        );
    }

    #[test]
    fn thumbnail_specs_are_checked() {
        let empty = GatherConfig {
            thumbnails: Vec::new(),
            ..valid()
        };
        assert_eq!(
            apply_guard_rails(&empty).unwrap_err(),
            ConfigGuardRailError::NoThumbnailSpecs
        );

        let zero = GatherConfig {
            thumbnails: vec![ThumbnailSpec::new(0, 240, false)],
            ..valid()
        };
        assert_eq!(
            apply_guard_rails(&zero).unwrap_err(),
            ConfigGuardRailError::ZeroDimension { key: "0x240".into() }
        );

        let duplicate = GatherConfig {
            thumbnails: vec![
                ThumbnailSpec::new(320, 240, false),
                ThumbnailSpec::new(320, 240, true),
                ThumbnailSpec::new(320, 240, false),
            ],
            ..valid()
        };
        assert_eq!(
            apply_guard_rails(&duplicate).unwrap_err(),
            ConfigGuardRailError::DuplicateThumbnailKey {
                key: "320x240".into()
            }
        );
    }

    #[test]
    fn questionable_roots_only_warn() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, b"").unwrap();
        let config = GatherConfig {
            search_roots: vec![
                dir.path().join("missing"),
                file,
                dir.path().to_path_buf(),
            ],
            extensions: vec![".jpg".into(), "jpeg".into()],
            ..valid()
        };

        let warnings = apply_guard_rails(&config).unwrap();
        let messages: Vec<_> =
            warnings.items.iter().map(|w| w.message.as_str()).collect();
        assert_eq!(messages.len(), 2, "{messages:?}");
        assert!(messages[0].contains("does not exist"));
        assert!(messages[1].contains("is not a directory"));
        assert!(warnings.items.iter().all(|w| w.hint.is_some()));
    }
}
