use std::str::FromStr;

pub trait EnvVars {
    fn load() -> Self;
    fn get_env_var(&self, key: &str) -> String;
}

/// Reads `key`, falling back to `default` when it is unset.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Reads and parses `key`. Unset or unparsable values yield `None`; the
/// latter is logged so a typo in deployment config does not go unnoticed.
pub fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("[env] ignoring unparsable value for {}: {:?}", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_when_unset() {
        assert_eq!(env_or("SUMMON_COMMON_TEST_UNSET_KEY", "fallback"), "fallback");
    }

    #[test]
    fn parse_env_rejects_garbage() {
        std::env::set_var("SUMMON_COMMON_TEST_GARBAGE", "eighty");
        assert_eq!(parse_env::<u32>("SUMMON_COMMON_TEST_GARBAGE"), None);
        std::env::set_var("SUMMON_COMMON_TEST_NUMBER", " 80 ");
        assert_eq!(parse_env::<u32>("SUMMON_COMMON_TEST_NUMBER"), Some(80));
    }
}
