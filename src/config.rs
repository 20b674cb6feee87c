use crate::error::{PotentialError, Result};
use crate::types::config::PotentialConfig;
use std::path::{Path, PathBuf};
use toml::map::Map;
use toml::Value;

pub const DEFAULT_CONFIG_FILE: &str = "potential.toml";
pub const DEFAULT_LOCAL_FILE: &str = ".potential/local.toml";
pub const DEFAULT_GLOBAL_CONFIG_FILE: &str = ".config/potential/config.toml";

/// Load global, repository and local layers, later layers winning key by key.
/// With no file present anywhere the built-in defaults apply.
pub fn load_config(root: &Path) -> Result<PotentialConfig> {
    let global = std::env::var_os("HOME")
        .map(PathBuf::from)
        .map(|home| home.join(DEFAULT_GLOBAL_CONFIG_FILE));
    load_config_with_global(root, global.as_deref())
}

pub(crate) fn load_config_with_global(
    root: &Path,
    global_path: Option<&Path>,
) -> Result<PotentialConfig> {
    let mut merged = Value::Table(Map::new());
    if let Some(path) = global_path {
        merge_file_if_exists(&mut merged, path)?;
    }
    merge_file_if_exists(&mut merged, &root.join(DEFAULT_CONFIG_FILE))?;
    merge_file_if_exists(&mut merged, &root.join(DEFAULT_LOCAL_FILE))?;

    let cfg: PotentialConfig = merged
        .try_into()
        .map_err(|e: toml::de::Error| PotentialError::ConfigParse(e.to_string()))?;
    cfg.validate()?;
    Ok(cfg)
}

fn merge_file_if_exists(merged: &mut Value, path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let value = read_toml_value(path)?;
    merge_toml(merged, value);
    Ok(())
}

fn read_toml_value(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| PotentialError::ConfigParse(format!("{}: {}", path.display(), e)))
}

fn merge_toml(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Table(base_table), Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => {
            *slot = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::config::FetchErrorPolicy;
    use crate::window::WindowMode;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn load_config_defaults_when_no_file_exists() {
        let dir = TempDir::new().expect("temp dir should be created");
        let cfg = load_config_with_global(dir.path(), None).expect("load should not fail");
        assert_eq!(cfg.window_settings().months, 6);
        assert_eq!(cfg.batch_settings().on_fetch_error, FetchErrorPolicy::Discard);
    }

    #[test]
    fn load_config_merges_global_repo_and_local_in_order() {
        let root = TempDir::new().expect("root temp dir should be created");
        let global_root = TempDir::new().expect("global temp dir should be created");
        let global_path = global_root.path().join("config.toml");

        fs::write(
            &global_path,
            r#"
[provider]
timeout_secs = 5

[window]
months = 12
"#,
        )
        .expect("global config should write");

        fs::write(
            root.path().join(DEFAULT_CONFIG_FILE),
            r#"
[window]
months = 6
end_month = "2025-06"

[batch]
on_fetch_error = "discard"
"#,
        )
        .expect("repo config should write");

        fs::create_dir_all(root.path().join(".potential")).expect("local dir should create");
        fs::write(
            root.path().join(DEFAULT_LOCAL_FILE),
            r#"
[batch]
on_fetch_error = "propagate"
"#,
        )
        .expect("local override should write");

        let cfg = load_config_with_global(root.path(), Some(&global_path))
            .expect("load should succeed");

        assert_eq!(cfg.provider_settings().timeout.as_secs(), 5);
        assert_eq!(cfg.window_settings().months, 6);
        assert_eq!(
            cfg.window_settings().mode,
            WindowMode::EndingAt("2025-06".parse().expect("month"))
        );
        assert_eq!(cfg.batch_settings().on_fetch_error, FetchErrorPolicy::Propagate);
    }

    #[test]
    fn load_config_surfaces_validation_errors() {
        let root = TempDir::new().expect("root temp dir should be created");
        fs::write(
            root.path().join(DEFAULT_CONFIG_FILE),
            "[model]\npreset = \"legacy\"\n",
        )
        .expect("repo config should write");

        let err = load_config_with_global(root.path(), None).expect_err("bad preset");
        assert!(matches!(err, PotentialError::ConfigParse(_)));
    }
}
