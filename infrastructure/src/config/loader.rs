//! Configuration file loader with multi-source merging

use super::error::ConfigError;
use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix of environment overrides (`TOOLPOD_SESSION__FAN_OUT=8`).
pub const ENV_PREFIX: &str = "TOOLPOD_";

/// Legacy switch that forces auto-approve mode when set to `1`.
pub const SKIP_PERMISSIONS_VAR: &str = "TOOLPOD_SKIP_PERMISSIONS";

const PROJECT_FILES: [&str; 2] = ["toolpod.toml", ".toolpod.toml"];

/// One place configuration may come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub label: &'static str,
    pub location: String,
    pub found: bool,
}

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. `TOOLPOD_*` environment variables (`__` separates sections)
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./toolpod.toml` or `./.toolpod.toml`
    /// 4. Global: `$XDG_CONFIG_HOME/toolpod/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&Path>) -> Result<FileConfig, ConfigError> {
        let figment = Self::file_figment(
            Self::global_config_path().as_deref(),
            Path::new("."),
            config_path,
        )
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: FileConfig = figment.extract().map_err(Box::new)?;
        Ok(Self::apply_legacy_env(config, |key| std::env::var(key).ok()))
    }

    /// Load only default configuration (for `--no-config`)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// Load, then validate. Warnings are returned alongside the config;
    /// any error-severity issue fails the load.
    pub fn load_validated(
        config_path: Option<&Path>,
        cwd: &Path,
    ) -> Result<(FileConfig, Vec<toolpod_domain::ConfigIssue>), ConfigError> {
        let config = Self::load(config_path)?;
        let issues = config.validate(cwd);
        if issues.iter().any(|i| i.is_error()) {
            return Err(ConfigError::Invalid(issues));
        }
        Ok((config, issues))
    }

    /// File-backed layers only, lowest priority first.
    fn file_figment(
        global: Option<&Path>,
        project_dir: &Path,
        explicit: Option<&Path>,
    ) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global) = global
            && global.exists()
        {
            debug!(path = %global.display(), "Merging global config");
            figment = figment.merge(Toml::file(global));
        }

        if let Some(project) = Self::project_config_in(project_dir) {
            debug!(path = %project.display(), "Merging project config");
            figment = figment.merge(Toml::file(project));
        }

        if let Some(path) = explicit {
            debug!(path = %path.display(), "Merging explicit config");
            figment = figment.merge(Toml::file(path));
        }

        figment
    }

    /// `TOOLPOD_SKIP_PERMISSIONS=1` forces auto-approve regardless of files.
    fn apply_legacy_env(
        mut config: FileConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> FileConfig {
        if lookup(SKIP_PERMISSIONS_VAR).as_deref() == Some("1") {
            debug!("{} set, forcing auto_approve", SKIP_PERMISSIONS_VAR);
            config.permissions.mode = "auto_approve".to_string();
        }
        config
    }

    /// Get the global config file path
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("toolpod").join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        Self::project_config_in(Path::new("."))
    }

    fn project_config_in(dir: &Path) -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    }

    /// Every source in priority order, marked with whether it was found.
    pub fn sources(config_path: Option<&Path>) -> Vec<ConfigSource> {
        let mut sources = Vec::new();

        let env_found = std::env::vars().any(|(key, _)| key.starts_with(ENV_PREFIX));
        sources.push(ConfigSource {
            label: "Env",
            location: format!("{}*", ENV_PREFIX),
            found: env_found,
        });

        if let Some(path) = config_path {
            sources.push(ConfigSource {
                label: "Explicit",
                location: path.display().to_string(),
                found: path.exists(),
            });
        }

        sources.push(match Self::project_config_path() {
            Some(path) => ConfigSource {
                label: "Project",
                location: path.display().to_string(),
                found: true,
            },
            None => ConfigSource {
                label: "Project",
                location: "./toolpod.toml or ./.toolpod.toml".to_string(),
                found: false,
            },
        });

        if let Some(path) = Self::global_config_path() {
            sources.push(ConfigSource {
                label: "Global",
                location: path.display().to_string(),
                found: path.exists(),
            });
        }

        sources.push(ConfigSource {
            label: "Default",
            location: "built-in defaults".to_string(),
            found: true,
        });

        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn extract(figment: Figment) -> FileConfig {
        figment.extract().unwrap()
    }

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::load_defaults();
        assert_eq!(config.session.turn_limit, 20);
        assert_eq!(config.permissions.mode, "interactive");
    }

    #[test]
    fn test_global_config_path_returns_some() {
        let path = ConfigLoader::global_config_path().unwrap();
        assert!(path.ends_with("toolpod/config.toml"));
    }

    #[test]
    fn test_layer_priority() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("global.toml");
        fs::write(&global, "[session]\nturn_limit = 7\nfan_out = 7\n").unwrap();

        let project_dir = dir.path().join("project");
        fs::create_dir(&project_dir).unwrap();
        fs::write(
            project_dir.join(".toolpod.toml"),
            "[session]\nfan_out = 3\n",
        )
        .unwrap();

        let explicit = dir.path().join("explicit.toml");
        fs::write(&explicit, "[permissions]\nallow = [\"bash\"]\n").unwrap();

        let config = extract(ConfigLoader::file_figment(
            Some(&global),
            &project_dir,
            Some(&explicit),
        ));
        assert_eq!(config.session.turn_limit, 7);
        assert_eq!(config.session.fan_out, 3);
        assert_eq!(config.permissions.allow, vec!["bash"]);
        // Untouched sections keep defaults
        assert_eq!(config.session.call_timeout_secs, 30);
    }

    #[test]
    fn test_project_file_preference() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("toolpod.toml"), "[session]\nfan_out = 2\n").unwrap();
        fs::write(dir.path().join(".toolpod.toml"), "[session]\nfan_out = 9\n").unwrap();

        let config = extract(ConfigLoader::file_figment(None, dir.path(), None));
        assert_eq!(config.session.fan_out, 2);
    }

    #[test]
    fn test_missing_global_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = extract(ConfigLoader::file_figment(
            Some(&dir.path().join("nope.toml")),
            dir.path(),
            None,
        ));
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "[session]\nfan_out = \"many\"\n").unwrap();

        let result: Result<FileConfig, _> =
            ConfigLoader::file_figment(None, dir.path(), Some(&bad)).extract();
        assert!(result.is_err());
    }

    #[test]
    fn test_skip_permissions_env() {
        let forced = ConfigLoader::apply_legacy_env(FileConfig::default(), |key| {
            (key == SKIP_PERMISSIONS_VAR).then(|| "1".to_string())
        });
        assert_eq!(forced.permissions.mode, "auto_approve");

        let untouched =
            ConfigLoader::apply_legacy_env(FileConfig::default(), |_| Some("0".to_string()));
        assert_eq!(untouched.permissions.mode, "interactive");
    }
}
