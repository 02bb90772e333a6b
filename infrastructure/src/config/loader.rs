//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

/// Project-level config file names, checked in order.
const PROJECT_FILES: [&str; 2] = ["ausweis.toml", ".ausweis.toml"];

/// Prefix of environment overrides, e.g. `AUSWEIS_SDK__URL`.
const ENV_PREFIX: &str = "AUSWEIS_";

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. `AUSWEIS_*` environment variables (`__` separates sections)
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./ausweis.toml` or `./.ausweis.toml`
    /// 4. Global: `$XDG_CONFIG_HOME/ausweis/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&Path>) -> Result<FileConfig, Box<figment::Error>> {
        Self::figment(config_path).extract().map_err(Box::new)
    }

    fn figment(config_path: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(&global_path));
        }

        if let Some(path) = Self::project_config_path() {
            figment = figment.merge(Toml::file(path));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load only default configuration (for --no-config)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// Get the global config file path
    ///
    /// Returns `$XDG_CONFIG_HOME/ausweis/config.toml` if set,
    /// otherwise the platform config directory.
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("ausweis").join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Print the config file locations being used (for debugging)
    pub fn print_config_sources(config_path: Option<&Path>) {
        println!("Configuration sources (in priority order):");

        if let Some(path) = config_path {
            let found = if path.exists() { "FOUND" } else { "     " };
            println!("  [{}] Explicit: {}", found, path.display());
        }

        if let Some(path) = Self::project_config_path() {
            println!("  [FOUND] Project: {}", path.display());
        } else {
            println!("  [     ] Project: ./ausweis.toml or ./.ausweis.toml");
        }

        if let Some(path) = Self::global_config_path() {
            let found = if path.exists() { "FOUND" } else { "     " };
            println!("  [{}] Global:  {}", found, path.display());
        }

        println!("  [     ] Env:     {}*", ENV_PREFIX);
        println!("  [     ] Default: built-in defaults");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::load_defaults();
        assert_eq!(config.reader.name, "NFC");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_global_config_path_returns_some() {
        let path = ConfigLoader::global_config_path();
        assert!(path.is_some());
        assert!(path.unwrap().ends_with("ausweis/config.toml"));
    }

    #[test]
    fn test_project_file_and_env_override() {
        Jail::expect_with(|jail| {
            jail.set_env("XDG_CONFIG_HOME", jail.directory().join("xdg").display());
            jail.create_file(
                "ausweis.toml",
                r#"
                [sdk]
                url = "ws://10.0.0.2:24727/eID-Kernel"

                [timeouts]
                command_ms = 1000
                "#,
            )?;
            jail.set_env("AUSWEIS_TIMEOUTS__COMMAND_MS", "2500");
            jail.set_env("AUSWEIS_READER__SIMULATOR", "true");

            let config = ConfigLoader::load(None).map_err(|e| *e)?;
            assert_eq!(config.sdk.url, "ws://10.0.0.2:24727/eID-Kernel");
            assert_eq!(config.timeouts.command_ms, 2500);
            assert_eq!(config.timeouts.stop_ms, 40_000);
            assert!(config.reader.simulator);
            Ok(())
        });
    }

    #[test]
    fn test_explicit_path_beats_project_file() {
        Jail::expect_with(|jail| {
            jail.set_env("XDG_CONFIG_HOME", jail.directory().join("xdg").display());
            jail.create_file(".ausweis.toml", "[reader]\nname = \"Project Reader\"")?;
            jail.create_file("custom.toml", "[reader]\nname = \"Custom Reader\"")?;

            let config = ConfigLoader::load(Some(Path::new("custom.toml"))).map_err(|e| *e)?;
            assert_eq!(config.reader.name, "Custom Reader");
            Ok(())
        });
    }

    #[test]
    fn test_global_config_is_lowest_file_priority() {
        Jail::expect_with(|jail| {
            let xdg = jail.directory().join("xdg");
            jail.set_env("XDG_CONFIG_HOME", xdg.display());
            std::fs::create_dir_all(xdg.join("ausweis")).map_err(|e| e.to_string())?;
            std::fs::write(
                xdg.join("ausweis").join("config.toml"),
                "[sdk]\napi_level = 2\n[reader]\nname = \"Global Reader\"",
            )
            .map_err(|e| e.to_string())?;
            jail.create_file("ausweis.toml", "[reader]\nname = \"Project Reader\"")?;

            let config = ConfigLoader::load(None).map_err(|e| *e)?;
            assert_eq!(config.sdk.api_level, Some(2));
            assert_eq!(config.reader.name, "Project Reader");
            Ok(())
        });
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        Jail::expect_with(|jail| {
            jail.set_env("XDG_CONFIG_HOME", jail.directory().join("xdg").display());
            jail.create_file("ausweis.toml", "[timeouts]\ncommand_ms = \"soon\"")?;
            assert!(ConfigLoader::load(None).is_err());
            Ok(())
        });
    }
}
