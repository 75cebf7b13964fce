//! Snapshot of process environment variables with a secrets overlay.

use std::{collections::HashMap, env, str::FromStr};

use super::ConfigError;

/// Immutable view over configuration variables.
///
/// Built once from the process environment (after `.env` has been loaded) and
/// optionally extended with values fetched from the secret store. Settings are
/// always derived from this snapshot rather than from `std::env` directly so the
/// secret overlay never needs to mutate global process state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Capture the current process environment.
    pub fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    /// Build an environment from explicit pairs. Mostly useful in tests.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Raw lookup. Empty values are treated as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn get_owned(&self, key: &str) -> Option<String> {
        self.get(key).map(str::to_owned)
    }

    /// Parse a variable, falling back to `default` when it is unset.
    ///
    /// A value that is present but unparseable is reported as an error instead of
    /// silently reverting to the default.
    pub fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        Ok(self.parse_optional(key)?.unwrap_or(default))
    }

    pub fn parse_optional<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|e: T::Err| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: raw.to_string(),
                    reason: e.to_string(),
                }),
        }
    }

    /// Boolean flags accept `true/false`, `1/0`, `yes/no` and `on/off`.
    pub fn flag_or(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.get(key).map(str::to_ascii_lowercase).as_deref() {
            None => Ok(default),
            Some("true" | "1" | "yes" | "on") => Ok(true),
            Some("false" | "0" | "no" | "off") => Ok(false),
            Some(other) => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: other.to_string(),
                reason: "expected a boolean".to_string(),
            }),
        }
    }

    /// Comma separated list with blank entries dropped.
    pub fn list(&self, key: &str) -> Option<Vec<String>> {
        self.get(key).map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_owned)
                .collect()
        })
    }

    /// Layer `overlay` under the current values: keys that already exist win.
    ///
    /// Returns the names of the keys that were added.
    pub fn merge_missing<I>(&mut self, overlay: I) -> Vec<String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut added = Vec::new();
        for (key, value) in overlay {
            if self.get(&key).is_none() {
                self.vars.insert(key.clone(), value);
                added.push(key);
            }
        }
        added.sort();
        added
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Serializes tests that touch the process environment
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_capture_reads_process_variables() {
        let _lock = ENV_MUTEX.lock().unwrap();

        unsafe {
            env::set_var("KEEL_TEST_CAPTURED", " value ");
        }
        let captured = Environment::capture();
        unsafe {
            env::remove_var("KEEL_TEST_CAPTURED");
        }

        assert_eq!(captured.get("KEEL_TEST_CAPTURED"), Some("value"));
        assert!(!Environment::capture().contains("KEEL_TEST_CAPTURED"));
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let env = Environment::from_pairs([("EMPTY", "   "), ("PORT", "9000")]);

        assert_eq!(env.get("EMPTY"), None);
        assert_eq!(env.get_or("EMPTY", "fallback"), "fallback");
        assert_eq!(env.parse_or("PORT", 1u16).unwrap(), 9000);
        assert_eq!(env.parse_optional::<u16>("MISSING").unwrap(), None);
    }

    #[test]
    fn test_flags_accept_common_spellings() {
        let env = Environment::from_pairs([("A", "Yes"), ("B", "off"), ("C", "maybe")]);

        assert!(env.flag_or("A", false).unwrap());
        assert!(!env.flag_or("B", true).unwrap());
        assert!(env.flag_or("C", true).is_err());
        assert!(env.flag_or("D", true).unwrap());
    }
}
