mod client;
mod env;

pub use client::{MissingEnv, ModuleClient};
pub use env::{EnvVars, env_or, parse_env};

/// Seconds since the unix epoch.
pub fn get_current_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
