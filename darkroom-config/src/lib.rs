//! Configuration loading for darkroom.
//!
//! Layers, lowest to highest: built-in defaults, a TOML or JSON file, then
//! `DARKROOM_*` environment variables (optionally seeded from `.env`). The
//! result is checked by [`validation::apply_guard_rails`] before it is handed
//! to the orchestrator.

pub mod loader;
pub mod sources;
pub mod validation;

pub use loader::{
    ConfigLoad, ConfigLoader, ConfigLoaderOptions, ConfigSource, error::ConfigLoadError,
};
pub use sources::EnvConfig;
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings, apply_guard_rails};
