//! Server configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use coupon_core::constants::DEFAULT_COOLDOWN;
use coupon_core::pool;
use coupon_core::Coupon;

#[derive(Clone, Debug)]
pub struct Config {
    /// Address to bind the HTTP server.
    pub bind_addr: String,
    /// Cooldown between successful claims per identity, in seconds.
    pub cooldown_secs: u64,
    /// How often lapsed claim records are pruned, in seconds.
    pub prune_interval_secs: u64,
    /// Optional JSON file replacing the built-in coupon set.
    pub pool_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr = lookup("COUPON_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string());

        let cooldown_secs: u64 = lookup("COUPON_COOLDOWN_SECS")
            .unwrap_or_else(|| DEFAULT_COOLDOWN.as_secs().to_string())
            .parse()
            .context("COUPON_COOLDOWN_SECS must be a positive integer")?;
        anyhow::ensure!(cooldown_secs > 0, "COUPON_COOLDOWN_SECS must be greater than zero");

        let prune_interval_secs: u64 = lookup("COUPON_PRUNE_INTERVAL_SECS")
            .unwrap_or_else(|| "600".to_string())
            .parse()
            .context("COUPON_PRUNE_INTERVAL_SECS must be a positive integer")?;
        anyhow::ensure!(prune_interval_secs > 0, "COUPON_PRUNE_INTERVAL_SECS must be greater than zero");

        let pool_path = lookup("COUPON_POOL_PATH").map(PathBuf::from);

        Ok(Config {
            bind_addr,
            cooldown_secs,
            prune_interval_secs,
            pool_path,
        })
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn prune_interval(&self) -> Duration {
        Duration::from_secs(self.prune_interval_secs)
    }

    /// The configured coupon pool, or the built-in seed set.
    pub fn load_pool(&self) -> Result<Vec<Coupon>> {
        let Some(path) = &self.pool_path else {
            return Ok(pool::seed_coupons());
        };
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read coupon pool at {}", path.display()))?;
        pool::from_json(&json)
            .with_context(|| format!("Invalid coupon pool at {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config_with(&[]).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
        assert_eq!(cfg.cooldown(), DEFAULT_COOLDOWN);
        assert_eq!(cfg.prune_interval(), Duration::from_secs(600));
        assert!(cfg.pool_path.is_none());
        assert_eq!(cfg.load_pool().unwrap().len(), 5);
    }

    #[test]
    fn overrides() {
        let cfg = config_with(&[
            ("COUPON_BIND_ADDR", "127.0.0.1:9000"),
            ("COUPON_COOLDOWN_SECS", "60"),
            ("COUPON_PRUNE_INTERVAL_SECS", "5"),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:9000");
        assert_eq!(cfg.cooldown_secs, 60);
        assert_eq!(cfg.prune_interval_secs, 5);
    }

    #[test]
    fn rejects_non_numeric_cooldown() {
        let err = config_with(&[("COUPON_COOLDOWN_SECS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("COUPON_COOLDOWN_SECS"));
    }

    #[test]
    fn rejects_zero_cooldown() {
        let err = config_with(&[("COUPON_COOLDOWN_SECS", "0")]).unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
    }

    #[test]
    fn rejects_zero_prune_interval() {
        assert!(config_with(&[("COUPON_PRUNE_INTERVAL_SECS", "0")]).is_err());
    }

    #[test]
    fn missing_pool_file_is_an_error() {
        let cfg = config_with(&[("COUPON_POOL_PATH", "/nonexistent/coupons.json")]).unwrap();
        let err = cfg.load_pool().unwrap_err();
        assert!(err.to_string().contains("Failed to read coupon pool"));
    }

    #[test]
    fn pool_file_replaces_seed_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coupons.json");
        std::fs::write(
            &path,
            r#"[{"id": "x", "code": "XMAS25", "description": "25% off"}]"#,
        )
        .unwrap();
        let cfg = config_with(&[("COUPON_POOL_PATH", path.to_str().unwrap())]).unwrap();
        let pool = cfg.load_pool().unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].code, "XMAS25");
    }
}
