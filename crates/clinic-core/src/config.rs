use std::str::FromStr;

/// Startup configuration error. Any of these is fatal for a service.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    Missing(&'static str),
    #[error("invalid value for env var {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Source of configuration values, keyed by env var name.
///
/// Services read through this instead of `std::env` directly so tests can
/// feed a plain map without mutating the process environment.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;
}

/// The process environment.
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl<F> EnvSource for F
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        self(key)
    }
}

/// Read a required value. Empty strings count as missing.
pub fn required<E: EnvSource + ?Sized>(env: &E, key: &'static str) -> Result<String, ConfigError> {
    env.get(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(key))
}

/// Read and parse a required value.
pub fn required_parsed<E, T>(env: &E, key: &'static str) -> Result<T, ConfigError>
where
    E: EnvSource + ?Sized,
    T: FromStr,
{
    let raw = required(env, key)?;
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value: raw })
}

/// Read an optional value, falling back to `default` when unset or empty.
pub fn optional_or<E: EnvSource + ?Sized>(env: &E, key: &str, default: &str) -> String {
    env.get(key)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_owned())
}

/// Read and parse an optional value. A value that is present but unparsable
/// is an error rather than a silent fallback.
pub fn optional_parsed<E, T>(env: &E, key: &'static str, default: T) -> Result<T, ConfigError>
where
    E: EnvSource + ?Sized,
    T: FromStr,
{
    match env.get(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}
