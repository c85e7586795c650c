//! Configuration types and path resolution for ctxprobe.
//!
//! ctxprobe stores its settings as TOML at the platform's XDG config path
//! (e.g. `~/.config/ctxprobe/config.toml` on Linux) and run reports under the
//! XDG data directory (`~/.local/share/ctxprobe/`).

mod loader;
mod paths;
mod resolve;
mod types;

pub use types::Config;

use anyhow::Result;

impl Config {
    /// Load config with precedence: project > global > defaults.
    /// Creates default config file if none exists.
    pub fn load() -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project()?;

        let mut config = global;
        if let Some(proj) = project {
            config = Self::merge(config, proj);
        }

        config.resolve_substitutions();
        Ok(config)
    }
}
