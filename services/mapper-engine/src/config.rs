use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_METRICS_BIND: &str = "0.0.0.0:9090";
pub const DEFAULT_TRANSFORM_TIMEOUT_MS: u64 = 250;
pub const DEFAULT_CHANGES_LIMIT: u64 = 500;
pub const DEFAULT_CHANGE_RETENTION_MAX_ROWS: i64 = 5000;

// Mapper engine configuration sourced from environment variables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub metrics_bind: SocketAddr,
    pub transform_timeout: Duration,
    pub changes_limit: u64,
    pub change_retention_max_rows: Option<i64>,
    pub seed_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct EngineConfigOverride {
    metrics_bind: Option<String>,
    transform_timeout_ms: Option<u64>,
    changes_limit: Option<u64>,
    change_retention_max_rows: Option<i64>,
    seed_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            metrics_bind: SocketAddr::from(([0, 0, 0, 0], 9090)),
            transform_timeout: Duration::from_millis(DEFAULT_TRANSFORM_TIMEOUT_MS),
            changes_limit: DEFAULT_CHANGES_LIMIT,
            change_retention_max_rows: Some(DEFAULT_CHANGE_RETENTION_MAX_ROWS),
            seed_path: None,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        let metrics_bind = std::env::var("MAPPER_METRICS_BIND")
            .unwrap_or_else(|_| DEFAULT_METRICS_BIND.to_string())
            .parse()
            .with_context(|| "parse MAPPER_METRICS_BIND")?;
        let transform_timeout_ms = match std::env::var("MAPPER_TRANSFORM_TIMEOUT_MS") {
            Ok(value) => value
                .parse()
                .with_context(|| "parse MAPPER_TRANSFORM_TIMEOUT_MS")?,
            Err(_) => DEFAULT_TRANSFORM_TIMEOUT_MS,
        };
        let changes_limit = match std::env::var("MAPPER_CHANGES_LIMIT") {
            Ok(value) => value.parse().with_context(|| "parse MAPPER_CHANGES_LIMIT")?,
            Err(_) => DEFAULT_CHANGES_LIMIT,
        };
        let change_retention_max_rows = match std::env::var("MAPPER_CHANGE_RETENTION_MAX_ROWS") {
            Ok(value) => Some(
                value
                    .parse()
                    .with_context(|| "parse MAPPER_CHANGE_RETENTION_MAX_ROWS")?,
            ),
            Err(_) => Some(DEFAULT_CHANGE_RETENTION_MAX_ROWS),
        };
        let seed_path = std::env::var("MAPPER_SEED").ok().map(PathBuf::from);
        Ok(Self {
            metrics_bind,
            transform_timeout: Duration::from_millis(transform_timeout_ms),
            changes_limit,
            change_retention_max_rows,
            seed_path,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("MAPPER_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read MAPPER_CONFIG: {path}"))?;
            config.apply_yaml(&contents)?;
        }
        Ok(config)
    }

    fn apply_yaml(&mut self, contents: &str) -> Result<()> {
        let override_cfg: EngineConfigOverride =
            serde_yaml::from_str(contents).with_context(|| "parse mapper engine config yaml")?;
        if let Some(value) = override_cfg.metrics_bind {
            self.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = override_cfg.transform_timeout_ms {
            self.transform_timeout = Duration::from_millis(value);
        }
        if let Some(value) = override_cfg.changes_limit {
            self.changes_limit = value;
        }
        if let Some(value) = override_cfg.change_retention_max_rows {
            self.change_retention_max_rows = Some(value);
        }
        if let Some(value) = override_cfg.seed_path {
            self.seed_path = Some(value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    const KEYS: [&str; 6] = [
        "MAPPER_METRICS_BIND",
        "MAPPER_TRANSFORM_TIMEOUT_MS",
        "MAPPER_CHANGES_LIMIT",
        "MAPPER_CHANGE_RETENTION_MAX_ROWS",
        "MAPPER_SEED",
        "MAPPER_CONFIG",
    ];

    struct EnvGuard {
        saved: Vec<(&'static str, Option<String>)>,
    }

    impl EnvGuard {
        fn clean() -> Self {
            let saved = KEYS
                .iter()
                .map(|key| (*key, std::env::var(key).ok()))
                .collect();
            for key in KEYS {
                unsafe {
                    std::env::remove_var(key);
                }
            }
            Self { saved }
        }

        fn set(&self, key: &'static str, value: &str) {
            unsafe {
                std::env::set_var(key, value);
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, prev) in &self.saved {
                match prev {
                    Some(value) => unsafe {
                        std::env::set_var(key, value);
                    },
                    None => unsafe {
                        std::env::remove_var(key);
                    },
                }
            }
        }
    }

    #[test]
    #[serial]
    fn defaults_without_env() {
        let _env = EnvGuard::clean();
        let config = EngineConfig::from_env().expect("config");
        assert_eq!(config.metrics_bind, DEFAULT_METRICS_BIND.parse().expect("addr"));
        assert_eq!(config.transform_timeout, Duration::from_millis(250));
        assert_eq!(config.changes_limit, 500);
        assert_eq!(config.change_retention_max_rows, Some(5000));
        assert!(config.seed_path.is_none());
    }

    #[test]
    #[serial]
    fn env_values_are_parsed() {
        let env = EnvGuard::clean();
        env.set("MAPPER_TRANSFORM_TIMEOUT_MS", "40");
        env.set("MAPPER_CHANGES_LIMIT", "7");
        env.set("MAPPER_SEED", "/tmp/seed.yaml");
        let config = EngineConfig::from_env().expect("config");
        assert_eq!(config.transform_timeout, Duration::from_millis(40));
        assert_eq!(config.changes_limit, 7);
        assert_eq!(config.seed_path, Some(PathBuf::from("/tmp/seed.yaml")));

        env.set("MAPPER_CHANGES_LIMIT", "many");
        let err = EngineConfig::from_env().expect_err("bad limit");
        assert!(err.to_string().contains("MAPPER_CHANGES_LIMIT"));
    }

    #[test]
    #[serial]
    fn yaml_overrides_env() {
        let env = EnvGuard::clean();
        env.set("MAPPER_CHANGES_LIMIT", "7");
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "metrics_bind: \"127.0.0.1:9999\"\ntransform_timeout_ms: 15\nchanges_limit: 3"
        )
        .expect("write yaml");
        env.set("MAPPER_CONFIG", file.path().to_str().expect("utf8 path"));

        let config = EngineConfig::from_env_or_yaml().expect("config");
        assert_eq!(config.metrics_bind.port(), 9999);
        assert_eq!(config.transform_timeout, Duration::from_millis(15));
        assert_eq!(config.changes_limit, 3);
        assert_eq!(config.change_retention_max_rows, Some(5000));
    }
}
