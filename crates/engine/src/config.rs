use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use summon_common::{parse_env, EnvVars};

use crate::rarity::RarityTable;

/// Regular pulls that mint one mythic scroll.
pub const FUSED_PULLS_PER_SCROLL: u32 = 80;
pub const DEFAULT_MYTHIC_PITY_THRESHOLD: u32 = 35;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummonConfig {
    pub fused_pulls_per_scroll: u32,
    /// Threshold given to a player's mythic pity when it is first created.
    pub mythic_pity_threshold: u32,
    /// Fragments credited for a duplicate, per rarity.
    pub fragments: RarityTable<i64>,
    /// Stars a newly obtained hero starts with, per rarity.
    pub base_stars: RarityTable<u32>,
    pub new_hero_level: u32,
    /// Attempts of a batch when commits keep losing races on the player.
    pub max_commit_attempts: u32,
    /// Upper bound for the persistence step of one batch.
    pub commit_timeout_ms: u64,
}

impl Default for SummonConfig {
    fn default() -> Self {
        Self {
            fused_pulls_per_scroll: FUSED_PULLS_PER_SCROLL,
            mythic_pity_threshold: DEFAULT_MYTHIC_PITY_THRESHOLD,
            fragments: RarityTable { common: 5, rare: 10, epic: 20, legendary: 50, mythic: 100 },
            base_stars: RarityTable { common: 1, rare: 2, epic: 3, legendary: 4, mythic: 5 },
            new_hero_level: 1,
            max_commit_attempts: 3,
            commit_timeout_ms: 5_000,
        }
    }
}

impl SummonConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading summon config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing summon config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `SUMMON_CONFIG` (if set) and applies `SUMMON_*` overrides.
    pub fn from_env() -> Result<Self> {
        let env = SummonEnv::load();
        let mut config = match &env.config_path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        if let Some(v) = env.fused_pulls_per_scroll {
            config.fused_pulls_per_scroll = v;
        }
        if let Some(v) = env.mythic_pity_threshold {
            config.mythic_pity_threshold = v;
        }
        if let Some(v) = env.max_commit_attempts {
            config.max_commit_attempts = v;
        }
        if let Some(v) = env.commit_timeout_ms {
            config.commit_timeout_ms = v;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fused_pulls_per_scroll == 0 {
            bail!("fused_pulls_per_scroll must be at least 1");
        }
        if self.mythic_pity_threshold == 0 {
            bail!("mythic_pity_threshold must be at least 1");
        }
        if self.max_commit_attempts == 0 {
            bail!("max_commit_attempts must be at least 1");
        }
        for rarity in crate::rarity::Rarity::ALL {
            if self.fragments.get(rarity) < 0 {
                bail!("fragment amount for {} must be non-negative", rarity);
            }
        }
        Ok(())
    }
}

pub struct SummonEnv {
    pub config_path: Option<String>,
    pub fused_pulls_per_scroll: Option<u32>,
    pub mythic_pity_threshold: Option<u32>,
    pub max_commit_attempts: Option<u32>,
    pub commit_timeout_ms: Option<u64>,
}

impl EnvVars for SummonEnv {
    fn load() -> Self {
        Self {
            config_path: std::env::var("SUMMON_CONFIG").ok(),
            fused_pulls_per_scroll: parse_env("SUMMON_FUSED_PULLS_PER_SCROLL"),
            mythic_pity_threshold: parse_env("SUMMON_MYTHIC_PITY_THRESHOLD"),
            max_commit_attempts: parse_env("SUMMON_MAX_COMMIT_ATTEMPTS"),
            commit_timeout_ms: parse_env("SUMMON_COMMIT_TIMEOUT_MS"),
        }
    }

    fn get_env_var(&self, key: &str) -> String {
        fn show<T: ToString>(v: &Option<T>) -> String {
            v.as_ref().map(|v| v.to_string()).unwrap_or_default()
        }
        match key {
            "SUMMON_CONFIG" => show(&self.config_path),
            "SUMMON_FUSED_PULLS_PER_SCROLL" => show(&self.fused_pulls_per_scroll),
            "SUMMON_MYTHIC_PITY_THRESHOLD" => show(&self.mythic_pity_threshold),
            "SUMMON_MAX_COMMIT_ATTEMPTS" => show(&self.max_commit_attempts),
            "SUMMON_COMMIT_TIMEOUT_MS" => show(&self.commit_timeout_ms),
            _ => panic!("{} is not set", key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_economy() {
        let config = SummonConfig::default();
        assert_eq!(config.fused_pulls_per_scroll, 80);
        assert_eq!(config.mythic_pity_threshold, 35);
        assert_eq!(config.fragments.legendary, 50);
        assert_eq!(config.fragments.mythic, 100);
        config.validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: SummonConfig =
            serde_json::from_str(r#"{ "mythic_pity_threshold": 40 }"#).unwrap();
        assert_eq!(config.mythic_pity_threshold, 40);
        assert_eq!(config.fused_pulls_per_scroll, 80);
    }

    #[test]
    fn zero_pulls_per_scroll_is_rejected() {
        let config = SummonConfig { fused_pulls_per_scroll: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }
}
