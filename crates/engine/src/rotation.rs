use std::collections::HashMap;
use std::sync::RwLock;

/// Decides which Elemental banner a server may pull from right now. The
/// engine only asks; the schedule itself lives elsewhere.
pub trait RotationSchedule: Send + Sync {
    fn active_elemental_banner(&self, server_id: &str, now: i64) -> Option<String>;
}

/// No elemental banner is ever open.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRotation;

impl RotationSchedule for NoRotation {
    fn active_elemental_banner(&self, _server_id: &str, _now: i64) -> Option<String> {
        None
    }
}

/// Rotation pushed in by the external scheduler, per server. A `"*"` entry
/// applies to servers without their own.
#[derive(Debug, Default)]
pub struct StaticRotation {
    active: RwLock<HashMap<String, String>>,
}

impl StaticRotation {
    pub const ALL_SERVERS: &'static str = "*";

    pub fn set(&self, server_id: impl Into<String>, banner_id: impl Into<String>) {
        let mut active = self.active.write().unwrap_or_else(|e| e.into_inner());
        active.insert(server_id.into(), banner_id.into());
    }

    pub fn clear(&self, server_id: &str) {
        let mut active = self.active.write().unwrap_or_else(|e| e.into_inner());
        active.remove(server_id);
    }
}

impl RotationSchedule for StaticRotation {
    fn active_elemental_banner(&self, server_id: &str, _now: i64) -> Option<String> {
        let active = self.active.read().unwrap_or_else(|e| e.into_inner());
        active
            .get(server_id)
            .or_else(|| active.get(Self::ALL_SERVERS))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_entry_wins_over_wildcard() {
        let rotation = StaticRotation::default();
        rotation.set(StaticRotation::ALL_SERVERS, "fire");
        rotation.set("eu-1", "water");
        assert_eq!(rotation.active_elemental_banner("eu-1", 0).as_deref(), Some("water"));
        assert_eq!(rotation.active_elemental_banner("us-1", 0).as_deref(), Some("fire"));
        rotation.clear("eu-1");
        assert_eq!(rotation.active_elemental_banner("eu-1", 0).as_deref(), Some("fire"));
    }
}
