use std::env;

use summon_common::{env_or, EnvVars};

pub struct PostgresEnv {
    pub database_url: String,
    pub max_connections: u32,
}

impl PostgresEnv {
    pub fn from_env() -> Self {
        <Self as EnvVars>::load()
    }
}

impl EnvVars for PostgresEnv {
    fn load() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").unwrap_or_default(),
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", "10").parse().unwrap_or(10),
        }
    }

    fn get_env_var(&self, key: &str) -> String {
        match key {
            "DATABASE_URL" => self.database_url.clone(),
            "DATABASE_MAX_CONNECTIONS" => self.max_connections.to_string(),
            _ => panic!("Invalid environment variable: {}", key),
        }
    }
}
