use async_trait::async_trait;
use chargeplan_core::{ConnectorChargingProfile, Station, Transaction, VehicleProfile};

use crate::EngineResult;

/// Storage the cycle reads from and the caller persists profiles to.
///
/// Lookups return `Ok(None)` for unknown identifiers; `Err` is reserved for
/// storage failures.
#[async_trait]
pub trait SiteRepository: Send + Sync {
    async fn station(&self, station_id: &str) -> EngineResult<Option<Station>>;

    async fn transaction(&self, transaction_id: i64) -> EngineResult<Option<Transaction>>;

    async fn vehicle(&self, vehicle_id: &str) -> EngineResult<Option<VehicleProfile>>;

    /// Profiles issued by the previous cycle of the site.
    async fn charging_profiles(
        &self,
        site_id: &str,
    ) -> EngineResult<Vec<ConnectorChargingProfile>>;

    async fn station_configuration(
        &self,
        station_id: &str,
        key: &str,
    ) -> EngineResult<Option<String>>;

    /// Replaces the profiles of the site.
    async fn save_charging_profiles(
        &self,
        site_id: &str,
        profiles: &[ConnectorChargingProfile],
    ) -> EngineResult<()>;
}
