use std::sync::Arc;

use tracing::{error, info};

use crate::banner::{validate_banner, Banner, ResolvedBanner};
use crate::error::{SummonError, SummonResult};
use crate::hero::HeroCatalog;
use crate::rotation::RotationSchedule;
use crate::store::SummonStore;

/// Banner configuration on top of a store. Everything saved through here has
/// passed validation against the current hero catalog.
#[derive(Clone)]
pub struct BannerCatalog {
    store: Arc<dyn SummonStore>,
}

impl BannerCatalog {
    pub fn new(store: Arc<dyn SummonStore>) -> Self {
        Self { store }
    }

    pub async fn heroes(&self) -> SummonResult<HeroCatalog> {
        Ok(HeroCatalog::new(self.store.load_heroes().await?))
    }

    pub async fn save_banner(&self, banner: Banner) -> SummonResult<ResolvedBanner> {
        let heroes = self.heroes().await?;
        let resolved = validate_banner(&banner, &heroes).map_err(|e| {
            error!("rejected banner {}: {}", banner.id, e);
            e
        })?;
        self.store.save_banner(banner).await?;
        info!("saved banner {} ({:?})", resolved.banner.id, resolved.banner.kind);
        Ok(resolved)
    }

    pub async fn get_banner(&self, banner_id: &str) -> SummonResult<Banner> {
        self.store
            .load_banner(banner_id)
            .await?
            .ok_or_else(|| SummonError::invalid(format!("unknown banner {}", banner_id)))
    }

    /// Resolves the pools of a loaded banner against the current hero
    /// catalog.
    pub async fn resolve(&self, banner: &Banner) -> SummonResult<ResolvedBanner> {
        let heroes = self.heroes().await?;
        validate_banner(banner, &heroes)
    }

    /// Banners a player on `server_id` can pull from at `now`, ordered by id.
    pub async fn active_banners(
        &self,
        server_id: &str,
        now: i64,
        rotation: &dyn RotationSchedule,
    ) -> SummonResult<Vec<Banner>> {
        let mut banners: Vec<Banner> = self
            .store
            .list_banners()
            .await?
            .into_iter()
            .filter(|b| {
                b.is_open_at(now) && b.runs_on(server_id) && b.in_rotation(rotation, server_id, now)
            })
            .collect();
        banners.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(banners)
    }
}
