//! Process-wide snapshot settings read from `SNAPSHOT_*` environment
//! variables.

use crate::errors::SnapshotError;
use config::{Config, Environment};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "SNAPSHOT";

/// Attribute names excluded from every snapshot unless configured otherwise
pub const DEFAULT_EXCLUDE_PROPERTIES: &str = "__initializer__,__cloner__,__isInitialized__";

/// Nesting depth normalized in full unless configured otherwise
pub const DEFAULT_MAX_DEPTH: u32 = 1;

const KEY_AUTO_ENABLED: &str = "auto_enabled";
const KEY_DEFAULT_MAX_DEPTH: &str = "default_max_depth";
const KEY_EXCLUDE_PROPERTIES: &str = "exclude_properties";

/// Snapshot settings
///
/// | variable | default |
/// |----------|---------|
/// | `SNAPSHOT_AUTO_ENABLED` | `true` |
/// | `SNAPSHOT_DEFAULT_MAX_DEPTH` | `1` |
/// | `SNAPSHOT_EXCLUDE_PROPERTIES` | `__initializer__,__cloner__,__isInitialized__` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotConfig {
    /// Whether lifecycle listeners capture marked fields
    pub auto_snapshot_enabled: bool,
    pub default_max_depth: u32,
    /// Attribute names passed as `ignored_attributes`
    pub exclude_properties: Vec<String>,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            auto_snapshot_enabled: true,
            default_max_depth: DEFAULT_MAX_DEPTH,
            exclude_properties: parse_exclude_properties(DEFAULT_EXCLUDE_PROPERTIES),
        }
    }
}

impl SnapshotConfig {
    /// Read settings from the process environment
    ///
    /// # Errors
    ///
    /// `SnapshotError::Configuration` when a variable is set but cannot be
    /// parsed (e.g. a non-boolean `SNAPSHOT_AUTO_ENABLED`).
    pub fn from_env() -> Result<Self, SnapshotError> {
        Self::load(None)
    }

    /// Read settings from an explicit variable map instead of the process
    /// environment. Keys are full variable names (`SNAPSHOT_AUTO_ENABLED`).
    ///
    /// # Errors
    ///
    /// Same as [`SnapshotConfig::from_env`].
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, SnapshotError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: config::Map<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::load(Some(vars))
    }

    fn load(vars: Option<config::Map<String, String>>) -> Result<Self, SnapshotError> {
        let settings = Config::builder()
            .set_default(KEY_AUTO_ENABLED, true)?
            .set_default(KEY_DEFAULT_MAX_DEPTH, i64::from(DEFAULT_MAX_DEPTH))?
            .set_default(KEY_EXCLUDE_PROPERTIES, DEFAULT_EXCLUDE_PROPERTIES)?
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .source(vars),
            )
            .build()?;

        let depth = settings.get_int(KEY_DEFAULT_MAX_DEPTH)?;
        let default_max_depth =
            u32::try_from(depth).map_err(|_| SnapshotError::Configuration {
                message: format!("SNAPSHOT_DEFAULT_MAX_DEPTH must be >= 0, got {}", depth),
            })?;

        Ok(Self {
            auto_snapshot_enabled: settings.get_bool(KEY_AUTO_ENABLED)?,
            default_max_depth,
            exclude_properties: parse_exclude_properties(
                &settings.get_string(KEY_EXCLUDE_PROPERTIES)?,
            ),
        })
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones
pub fn parse_exclude_properties(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let config = SnapshotConfig::from_vars(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(config, SnapshotConfig::default());
        assert_eq!(
            config.exclude_properties,
            vec!["__initializer__", "__cloner__", "__isInitialized__"]
        );
    }

    #[test]
    fn test_overrides_from_vars() {
        let config = SnapshotConfig::from_vars([
            ("SNAPSHOT_AUTO_ENABLED", "false"),
            ("SNAPSHOT_DEFAULT_MAX_DEPTH", "3"),
            ("SNAPSHOT_EXCLUDE_PROPERTIES", " password , ,token,"),
        ])
        .unwrap();
        assert!(!config.auto_snapshot_enabled);
        assert_eq!(config.default_max_depth, 3);
        assert_eq!(config.exclude_properties, vec!["password", "token"]);
    }

    #[test]
    fn test_negative_depth_is_rejected() {
        let err = SnapshotConfig::from_vars([("SNAPSHOT_DEFAULT_MAX_DEPTH", "-1")]).unwrap_err();
        assert!(matches!(err, SnapshotError::Configuration { .. }));
    }

    #[test]
    fn test_unparsable_bool_is_rejected() {
        let err = SnapshotConfig::from_vars([("SNAPSHOT_AUTO_ENABLED", "maybe")]).unwrap_err();
        assert!(matches!(err, SnapshotError::Configuration { .. }));
    }

    #[test]
    fn test_parse_exclude_properties() {
        assert!(parse_exclude_properties("").is_empty());
        assert_eq!(parse_exclude_properties("a,b"), vec!["a", "b"]);
    }
}
