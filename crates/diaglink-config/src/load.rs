use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::ConfigError;
use crate::merge::merge_configs;
use crate::validate::validate;

/// Written to the global config location on first run.
const DEFAULT_CONFIG_CONTENT: &str = r#"# diaglink configuration
# Every setting is optional. Uncomment a line to override the default.

# [server]
# host = "127.0.0.1"
# port = 6005

# [project]
# root = "/path/to/project"
# language_id = "gdscript"

# [poll]
# tick_interval_ms = 100

# [log]
# level = "info"
# file = "diaglink.log"
"#;

const CONFIG_FILE_NAME: &str = "config.toml";
/// Per-project overrides live in `<project>/.diaglink/config.toml`.
const PROJECT_CONFIG_DIR: &str = ".diaglink";

/// Build the effective configuration from its layers.
///
/// Defaults, then `config_dir/config.toml` (written with commented
/// defaults if absent), then the nearest `.diaglink/config.toml` at or
/// above `project_dir`. The result is validated.
pub fn load_config(config_dir: &Path, project_dir: Option<&Path>) -> Result<Config, ConfigError> {
    let global = ensure_global_config(config_dir)?;
    let project = project_dir.and_then(find_project_config);

    let config = std::iter::once(global)
        .chain(project)
        .try_fold(Config::default(), |config, layer| apply_layer(&config, &layer))?;
    check(config)
}

/// Load one explicit file over the defaults, skipping the global and
/// project layers.
pub fn load_from_file(path: &Path) -> Result<Config, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    check(apply_layer(&Config::default(), path)?)
}

/// Parse inline TOML over the defaults.
pub fn load_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    check(merge_configs(&Config::default(), toml_str, "<string>")?)
}

fn ensure_global_config(config_dir: &Path) -> Result<PathBuf, ConfigError> {
    let path = config_dir.join(CONFIG_FILE_NAME);
    if path.exists() {
        return Ok(path);
    }

    std::fs::create_dir_all(config_dir)?;
    std::fs::write(&path, DEFAULT_CONFIG_CONTENT).map_err(|source| {
        ConfigError::CreateDefault {
            path: path.clone(),
            source,
        }
    })?;
    tracing::info!(path = %path.display(), "wrote default config");
    Ok(path)
}

fn apply_layer(base: &Config, path: &Path) -> Result<Config, ConfigError> {
    tracing::debug!(path = %path.display(), "applying config layer");
    let content = std::fs::read_to_string(path)?;
    merge_configs(base, &content, &path.display().to_string())
}

fn check(config: Config) -> Result<Config, ConfigError> {
    let issues = validate(&config);
    if issues.is_empty() {
        Ok(config)
    } else {
        Err(ConfigError::Invalid(issues))
    }
}

fn find_project_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(PROJECT_CONFIG_DIR).join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogLevel;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn first_run_writes_commented_defaults() {
        let tmp = TempDir::new().unwrap();
        let cfg_dir = tmp.path().join("config");

        let config = load_config(&cfg_dir, None).unwrap();
        assert_eq!(config, Config::default());

        let written = std::fs::read_to_string(cfg_dir.join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(written, DEFAULT_CONFIG_CONTENT);
        // Loading again must parse the file it just wrote.
        assert_eq!(load_config(&cfg_dir, None).unwrap(), Config::default());
    }

    #[test]
    fn existing_global_is_not_overwritten() {
        let tmp = TempDir::new().unwrap();
        let global = tmp.path().join("config").join(CONFIG_FILE_NAME);
        write(&global, "[server]\nport = 6010\n");

        let config = load_config(global.parent().unwrap(), None).unwrap();
        assert_eq!(config.server.port, 6010);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(
            std::fs::read_to_string(&global).unwrap(),
            "[server]\nport = 6010\n"
        );
    }

    #[test]
    fn project_layer_wins_over_global() {
        let tmp = TempDir::new().unwrap();
        let cfg_dir = tmp.path().join("config");
        write(
            &cfg_dir.join(CONFIG_FILE_NAME),
            "[server]\nhost = \"10.1.1.1\"\nport = 6010\n",
        );
        let game = tmp.path().join("game");
        write(
            &game.join(PROJECT_CONFIG_DIR).join(CONFIG_FILE_NAME),
            "[server]\nport = 6020\n",
        );

        let config = load_config(&cfg_dir, Some(&game.join("scenes"))).unwrap();
        assert_eq!(config.server.port, 6020);
        assert_eq!(config.server.host, "10.1.1.1");
    }

    #[test]
    fn invalid_merge_result_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let cfg_dir = tmp.path().join("config");
        write(
            &cfg_dir.join(CONFIG_FILE_NAME),
            "[server]\nport = 0\n[poll]\ntick_interval_ms = 1\n",
        );

        match load_config(&cfg_dir, None) {
            Err(ConfigError::Invalid(issues)) => assert_eq!(issues.len(), 2),
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn parse_error_names_the_layer() {
        let tmp = TempDir::new().unwrap();
        let cfg_dir = tmp.path().join("config");
        let global = cfg_dir.join(CONFIG_FILE_NAME);
        write(&global, "[server\n");

        match load_config(&cfg_dir, None) {
            Err(ConfigError::Parse { origin, .. }) => {
                assert_eq!(origin, global.display().to_string())
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn explicit_file_must_exist() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            load_from_file(&tmp.path().join("nope.toml")),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn explicit_file_overlays_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("custom.toml");
        write(&path, "[log]\nlevel = \"trace\"\n");

        let config = load_from_file(&path).unwrap();
        assert_eq!(config.log.level, LogLevel::Trace);
        assert_eq!(config.server.port, 6005);
    }

    #[test]
    fn inline_toml() {
        assert_eq!(
            load_from_str("[poll]\ntick_interval_ms = 40\n")
                .unwrap()
                .poll
                .tick_interval_ms,
            40
        );
        assert!(matches!(
            load_from_str("{{bad}}"),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            load_from_str("[poll]\ntick_interval_ms = 1\n"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn project_config_found_from_nested_dir() {
        let tmp = TempDir::new().unwrap();
        let repo = tmp.path().join("repo");
        let marker = repo.join(PROJECT_CONFIG_DIR).join(CONFIG_FILE_NAME);
        write(&marker, "[server]\nport = 6011\n");
        let deep = repo.join("scenes").join("player");
        std::fs::create_dir_all(&deep).unwrap();

        assert_eq!(find_project_config(&deep), Some(marker));
    }

    #[test]
    fn project_dir_marker_without_file_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let inner = tmp.path().join("outer").join("inner");
        std::fs::create_dir_all(inner.join(PROJECT_CONFIG_DIR)).unwrap();
        let outer_file = tmp
            .path()
            .join("outer")
            .join(PROJECT_CONFIG_DIR)
            .join(CONFIG_FILE_NAME);
        write(&outer_file, "");

        assert_eq!(find_project_config(&inner), Some(outer_file));
    }
}
