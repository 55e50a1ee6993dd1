use crate::accumulator::Encoding;
use crate::error::{MssError, Result};
use crate::fetch::{DEFAULT_BACKOFF_MS, DEFAULT_MAX_ATTEMPTS, FetchConfig};
use std::env;
use std::time::Duration;

/// Parser configuration loaded from environment variables
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Declared character encoding of manifest bytes (default: latin1)
    pub encoding: Encoding,
    /// Retry policy for fetching manifests over HTTP
    pub fetch: FetchConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// - `MSS_ENCODING`: `latin1` (default), `utf8`, `utf16le`, `utf16be`
    /// - `MSS_FETCH_ATTEMPTS`: total attempts (default 2)
    /// - `MSS_FETCH_BACKOFF_MS`: sleep between attempts (default 500)
    /// - `MSS_FETCH_TIMEOUT_SECS`: optional per-attempt timeout
    pub fn from_env() -> Result<Self> {
        let encoding = match env::var("MSS_ENCODING") {
            Ok(label) => label.parse()?,
            Err(_) => Encoding::default(),
        };

        let max_attempts = parse_var("MSS_FETCH_ATTEMPTS")?.unwrap_or(DEFAULT_MAX_ATTEMPTS);
        let backoff_ms = parse_var("MSS_FETCH_BACKOFF_MS")?.unwrap_or(DEFAULT_BACKOFF_MS);
        let timeout = parse_var::<u64>("MSS_FETCH_TIMEOUT_SECS")?.map(Duration::from_secs);

        Ok(Config {
            encoding,
            fetch: FetchConfig {
                max_attempts,
                backoff: Duration::from_millis(backoff_ms),
                timeout,
            },
        })
    }
}

/// Parse an optional numeric variable; set-but-invalid is an error
fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| MssError::Config(format!("{} must be a number, got '{}'", name, raw))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serialize all env-var tests to prevent races between parallel test threads.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "MSS_ENCODING",
        "MSS_FETCH_ATTEMPTS",
        "MSS_FETCH_BACKOFF_MS",
        "MSS_FETCH_TIMEOUT_SECS",
    ];

    /// Clear all config vars, set `set`, run `f`, then restore original state.
    fn with_env(set: &[(&str, &str)], f: impl FnOnce()) {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());

        let saved: Vec<(&str, Option<String>)> =
            VARS.iter().map(|k| (*k, std::env::var(k).ok())).collect();

        for k in VARS {
            // SAFETY: serialized by ENV_LOCK — no other thread modifies env vars concurrently.
            unsafe { std::env::remove_var(k) };
        }
        for (k, v) in set {
            unsafe { std::env::set_var(k, v) };
        }

        f();

        for (k, old) in saved {
            match old {
                Some(v) => unsafe { std::env::set_var(k, v) },
                None => unsafe { std::env::remove_var(k) },
            }
        }
    }

    #[test]
    fn defaults_without_env() {
        with_env(&[], || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.encoding, Encoding::Latin1);
            assert_eq!(config.fetch, FetchConfig::default());
        });
    }

    #[test]
    fn encoding_labels() {
        with_env(&[("MSS_ENCODING", "UTF-16LE")], || {
            assert_eq!(Config::from_env().unwrap().encoding, Encoding::Utf16Le);
        });
        with_env(&[("MSS_ENCODING", "utf8")], || {
            assert_eq!(Config::from_env().unwrap().encoding, Encoding::Utf8);
        });
    }

    #[test]
    fn unknown_encoding_is_config_error() {
        with_env(&[("MSS_ENCODING", "ebcdic")], || {
            assert!(matches!(Config::from_env(), Err(MssError::Config(_))));
        });
    }

    #[test]
    fn fetch_policy_parsed() {
        with_env(
            &[
                ("MSS_FETCH_ATTEMPTS", "4"),
                ("MSS_FETCH_BACKOFF_MS", "50"),
                ("MSS_FETCH_TIMEOUT_SECS", "10"),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.fetch.max_attempts, 4);
                assert_eq!(config.fetch.backoff, Duration::from_millis(50));
                assert_eq!(config.fetch.timeout, Some(Duration::from_secs(10)));
            },
        );
    }

    #[test]
    fn invalid_number_is_config_error() {
        with_env(&[("MSS_FETCH_ATTEMPTS", "lots")], || {
            assert!(matches!(Config::from_env(), Err(MssError::Config(_))));
        });
    }
}
