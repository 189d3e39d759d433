use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::BuchiConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["buchi.toml", "buchi.yaml", "buchi.yml", "buchi.json"];

/// Load config from the given path (any supported format).
///
/// Errors are surfaced to the caller: an explicitly requested config file
/// that cannot be read or parsed is fatal at startup.
pub fn load_config(path: &Path) -> anyhow::Result<BuchiConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./buchi.{toml,yaml,yml,json}` (working directory)
/// 2. `~/.config/buchi/buchi.{toml,yaml,yml,json}` (user-global)
///
/// Returns `BuchiConfig::default()` if no config file is found. A file that
/// exists but fails to parse is reported and skipped rather than silently
/// producing a half-configured service.
pub fn discover_and_load() -> BuchiConfig {
    let Some(path) = find_config_file() else {
        debug!("no config file found, using defaults");
        return BuchiConfig::default();
    };
    debug!(path = %path.display(), "loading config");
    match load_config(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            BuchiConfig::default()
        },
    }
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    if let Some(dir) = home_dir().map(|h| h.join(".config").join("buchi")) {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<BuchiConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DeviceMode;

    #[test]
    fn loads_toml_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("buchi.toml");
        std::fs::write(&path, "http_port = 7777\n[device]\nmode = \"serial\"\n")
            .expect("write config");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.http_port, 7777);
        assert_eq!(cfg.device.mode, DeviceMode::Serial);
    }

    #[test]
    fn loads_json_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("buchi.json");
        std::fs::write(&path, r#"{"device": {"mode": "remote"}}"#).expect("write config");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.device.mode, DeviceMode::Remote);
        assert_eq!(cfg.http_port, 8080);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_config(Path::new("/nonexistent/buchi.toml"));
        assert!(err.is_err());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("buchi.toml");
        std::fs::write(&path, "http_port = \"not a number\"").expect("write config");
        assert!(load_config(&path).is_err());
    }
}
