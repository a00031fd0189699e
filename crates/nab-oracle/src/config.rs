//! Engine configuration (TOML).
//!
//! ```toml
//! [query]
//! topic_days = 90
//! topic_soul_limit = 1000
//!
//! [listing]
//! max_size = 1000
//!
//! [cache]
//! capacity = 4096
//!
//! [oracles.indexer]
//! concurrent = 1
//!
//! [oracles.tabulator.routes.votecounts]
//! cache_ttl_ms = 14400000
//! ```
//!
//! Every key is optional; unknown keys are rejected.

use crate::indexer;
use crate::oracle::{Oracle, OracleRegistry, OracleSettings};
use crate::tabulator;
use chrono::{DateTime, Utc};
use nab_kernel::{GraphScope, MAX_LISTING_SIZE, QueryError};
use nab_query::{DEFAULT_TOPIC_DAYS, DEFAULT_TOPIC_SOUL_LIMIT, MAX_TOPIC_DAYS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Query(#[from] QueryError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub query: QueryConfig,
    pub listing: ListingConfig,
    pub cache: CacheConfig,
    pub oracles: BTreeMap<String, OracleConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryConfig {
    pub topic_days: u32,
    pub topic_soul_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            topic_days: DEFAULT_TOPIC_DAYS,
            topic_soul_limit: DEFAULT_TOPIC_SOUL_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListingConfig {
    pub max_size: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            max_size: MAX_LISTING_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Retained results per oracle; unbounded when absent.
    pub capacity: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OracleConfig {
    /// Concurrency ceiling; `0` lifts the oracle's built-in limit.
    pub concurrent: Option<usize>,
    pub routes: BTreeMap<String, RouteConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouteConfig {
    /// Result retention; `0` disables caching for the route.
    pub cache_ttl_ms: Option<u64>,
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Defaults when no path is given.
    pub fn load_optional(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.query.topic_days == 0 {
            return Err(ConfigError::Invalid("query.topic_days must be positive".into()));
        }
        if self.query.topic_days > MAX_TOPIC_DAYS {
            return Err(ConfigError::Invalid(format!(
                "query.topic_days must be at most {MAX_TOPIC_DAYS}"
            )));
        }
        if self.query.topic_soul_limit == 0 {
            return Err(ConfigError::Invalid(
                "query.topic_soul_limit must be positive".into(),
            ));
        }
        if self.listing.max_size == 0 {
            return Err(ConfigError::Invalid("listing.max_size must be positive".into()));
        }
        if self.cache.capacity == Some(0) {
            return Err(ConfigError::Invalid(
                "cache.capacity must be positive when set".into(),
            ));
        }
        Ok(())
    }

    pub fn settings(&self, now: Option<DateTime<Utc>>) -> OracleSettings {
        OracleSettings {
            topic_days: self.query.topic_days,
            topic_soul_limit: self.query.topic_soul_limit,
            max_listing_size: self.listing.max_size,
            now,
        }
    }

    /// Apply shared settings and this oracle's overrides.
    pub fn configure(&self, oracle: Oracle) -> Result<Oracle, ConfigError> {
        let now = oracle.settings().now;
        let mut oracle = oracle
            .with_settings(self.settings(now))
            .with_cache_capacity(self.cache.capacity);

        let Some(overrides) = self.oracles.get(oracle.name()) else {
            return Ok(oracle);
        };
        if let Some(limit) = overrides.concurrent {
            oracle = oracle.with_concurrency(Some(limit));
        }
        for (name, route_config) in &overrides.routes {
            let oracle_name = oracle.name().to_string();
            let route = oracle
                .routes_mut()
                .iter_mut()
                .find(|route| &route.name == name)
                .ok_or_else(|| {
                    ConfigError::Invalid(format!("oracle `{oracle_name}` has no route `{name}`"))
                })?;
            if let Some(ms) = route_config.cache_ttl_ms {
                route.cache_ttl = Some(Duration::from_millis(ms)).filter(|ttl| !ttl.is_zero());
            }
        }
        Ok(oracle)
    }

    /// The standard oracles (indexer, then tabulator) over `scope`.
    pub fn registry(
        &self,
        scope: Arc<dyn GraphScope>,
        now: Option<DateTime<Utc>>,
    ) -> Result<OracleRegistry, ConfigError> {
        for name in self.oracles.keys() {
            if name != indexer::NAME && name != tabulator::NAME {
                return Err(ConfigError::Invalid(format!("unknown oracle `{name}`")));
            }
        }

        let mut registry = OracleRegistry::new();
        for oracle in [
            indexer::oracle(Arc::clone(&scope))?,
            tabulator::oracle(Arc::clone(&scope))?,
        ] {
            let oracle = oracle.with_settings(self.settings(now));
            registry.register(self.configure(oracle)?)?;
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nab_graph::MemoryScope;

    #[test]
    fn empty_source_is_all_defaults() {
        let config = EngineConfig::from_toml_str("").expect("config");
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.listing.max_size, 1000);
        assert_eq!(config.query.topic_days, 90);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = EngineConfig::from_toml_str("[query]\ntopic_weeks = 3\n").expect_err("unknown");
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn zero_sizes_are_invalid() {
        let err = EngineConfig::from_toml_str("[listing]\nmax_size = 0\n").expect_err("zero");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn topic_window_has_a_ceiling() {
        let config = EngineConfig::from_toml_str(&format!("[query]\ntopic_days = {MAX_TOPIC_DAYS}\n"))
            .expect("widest window");
        assert_eq!(config.query.topic_days, MAX_TOPIC_DAYS);

        let err = EngineConfig::from_toml_str("[query]\ntopic_days = 200000000\n")
            .expect_err("too wide");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn overrides_reach_routes_and_limits() {
        let config = EngineConfig::from_toml_str(
            r#"
            [oracles.indexer]
            concurrent = 4

            [oracles.tabulator.routes.votecounts]
            cache_ttl_ms = 1000
            "#,
        )
        .expect("config");
        let registry = config
            .registry(Arc::new(MemoryScope::new()), None)
            .expect("registry");

        let indexer = registry.get(indexer::NAME).expect("indexer");
        assert_eq!(indexer.available_permits(), Some(4));

        let tabulator = registry.get(tabulator::NAME).expect("tabulator");
        assert_eq!(tabulator.available_permits(), None);
        assert_eq!(
            tabulator.routes()[0].cache_ttl,
            Some(Duration::from_millis(1000))
        );
    }

    #[test]
    fn unknown_oracles_and_routes_are_invalid() {
        let scope: Arc<dyn GraphScope> = Arc::new(MemoryScope::new());
        let config = EngineConfig::from_toml_str("[oracles.curator]\nconcurrent = 1\n")
            .expect("parses");
        assert!(matches!(
            config.registry(Arc::clone(&scope), None),
            Err(ConfigError::Invalid(_))
        ));

        let config = EngineConfig::from_toml_str("[oracles.indexer.routes.nope]\ncache_ttl_ms = 1\n")
            .expect("parses");
        assert!(matches!(config.registry(scope, None), Err(ConfigError::Invalid(_))));
    }
}
