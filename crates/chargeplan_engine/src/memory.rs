use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chargeplan_core::{
    ConnectorChargingProfile, PhasesUsed, Site, Station, Transaction, VehicleProfile,
};
use serde::{Deserialize, Serialize};

use crate::{EngineError, EngineResult, SiteRepository};

/// Instantaneous readings reported by a station for a running session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MeterValues {
    /// A, summed over phases
    pub current_instant_amps: f64,
    /// W
    pub current_instant_watts: f64,
    #[serde(default)]
    pub current_total_consumption_wh: Option<f64>,
    #[serde(default)]
    pub phases_used: Option<PhasesUsed>,
}

/// Site topology and sessions held in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sites: RwLock<HashMap<String, Site>>,
    transactions: RwLock<HashMap<i64, Transaction>>,
    vehicles: RwLock<HashMap<String, VehicleProfile>>,
    profiles: RwLock<HashMap<String, Vec<ConnectorChargingProfile>>>,
    station_configuration: RwLock<HashMap<(String, String), String>>,
}

fn read<T>(lock: &RwLock<T>) -> EngineResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|e| EngineError::Storage(format!("Lock poisoned: {}", e)))
}

fn write<T>(lock: &RwLock<T>) -> EngineResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|e| EngineError::Storage(format!("Lock poisoned: {}", e)))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_site(&self, site: Site) -> EngineResult<()> {
        write(&self.sites)?.insert(site.id.clone(), site);
        Ok(())
    }

    pub fn insert_transaction(&self, transaction: Transaction) -> EngineResult<()> {
        write(&self.transactions)?.insert(transaction.id, transaction);
        Ok(())
    }

    pub fn insert_vehicle(&self, vehicle: VehicleProfile) -> EngineResult<()> {
        write(&self.vehicles)?.insert(vehicle.id.clone(), vehicle);
        Ok(())
    }

    pub fn set_station_configuration(
        &self,
        station_id: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> EngineResult<()> {
        write(&self.station_configuration)?
            .insert((station_id.into(), key.into()), value.into());
        Ok(())
    }

    pub fn site(&self, site_id: &str) -> EngineResult<Option<Site>> {
        Ok(read(&self.sites)?.get(site_id).cloned())
    }

    /// Applies `values` to the session, returning the updated session or
    /// `None` when it is unknown.
    pub fn update_meter_values(
        &self,
        transaction_id: i64,
        values: &MeterValues,
    ) -> EngineResult<Option<Transaction>> {
        let mut transactions = write(&self.transactions)?;
        let Some(transaction) = transactions.get_mut(&transaction_id) else {
            return Ok(None);
        };
        transaction.current_instant_amps = values.current_instant_amps.max(0.0);
        transaction.current_instant_watts = values.current_instant_watts.max(0.0);
        if let Some(consumption) = values.current_total_consumption_wh {
            transaction.current_total_consumption_wh = consumption;
        }
        if values.phases_used.is_some() {
            transaction.phases_used = values.phases_used;
        }
        Ok(Some(transaction.clone()))
    }
}

#[async_trait]
impl SiteRepository for MemoryStore {
    async fn station(&self, station_id: &str) -> EngineResult<Option<Station>> {
        Ok(read(&self.sites)?
            .values()
            .find_map(|site| site.station(station_id))
            .cloned())
    }

    async fn transaction(&self, transaction_id: i64) -> EngineResult<Option<Transaction>> {
        Ok(read(&self.transactions)?.get(&transaction_id).cloned())
    }

    async fn vehicle(&self, vehicle_id: &str) -> EngineResult<Option<VehicleProfile>> {
        Ok(read(&self.vehicles)?.get(vehicle_id).cloned())
    }

    async fn charging_profiles(
        &self,
        site_id: &str,
    ) -> EngineResult<Vec<ConnectorChargingProfile>> {
        Ok(read(&self.profiles)?
            .get(site_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn station_configuration(
        &self,
        station_id: &str,
        key: &str,
    ) -> EngineResult<Option<String>> {
        Ok(read(&self.station_configuration)?
            .get(&(station_id.to_string(), key.to_string()))
            .cloned())
    }

    async fn save_charging_profiles(
        &self,
        site_id: &str,
        profiles: &[ConnectorChargingProfile],
    ) -> EngineResult<()> {
        write(&self.profiles)?.insert(site_id.to_string(), profiles.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn transaction() -> Transaction {
        Transaction {
            id: 7,
            station_id: "CS-01".into(),
            connector_id: 1,
            timestamp: Utc::now(),
            current_total_consumption_wh: 0.0,
            current_instant_amps: 0.0,
            current_instant_watts: 0.0,
            phases_used: None,
            car_id: None,
        }
    }

    #[tokio::test]
    async fn test_station_lookup_across_sites() {
        let store = MemoryStore::new();
        store
            .insert_site(Site {
                id: "SITE-01".into(),
                max_power: Some(10_000.0),
                voltage: Some(230.0),
                number_of_phases: Some(3),
                timezone: None,
                stations: vec![Station {
                    id: "CS-01".into(),
                    excluded_from_smart_charging: false,
                    maximum_power: 22_000.0,
                    voltage: None,
                    charge_points: vec![],
                    connectors: vec![],
                }],
            })
            .unwrap();

        assert!(store.station("CS-01").await.unwrap().is_some());
        assert!(store.station("CS-02").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_meter_values_update() {
        let store = MemoryStore::new();
        store.insert_transaction(transaction()).unwrap();

        let updated = store
            .update_meter_values(
                7,
                &MeterValues {
                    current_instant_amps: 20.0,
                    current_instant_watts: 4_600.0,
                    current_total_consumption_wh: Some(1_200.0),
                    phases_used: Some(PhasesUsed::ALL),
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.current_instant_amps, 20.0);
        assert_eq!(updated.phases_used, Some(PhasesUsed::ALL));

        let stored = store.transaction(7).await.unwrap().unwrap();
        assert_eq!(stored.current_total_consumption_wh, 1_200.0);
        assert!(
            store
                .update_meter_values(8, &MeterValues::default())
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_profiles_replaced_per_site() {
        let store = MemoryStore::new();
        assert!(store.charging_profiles("SITE-01").await.unwrap().is_empty());

        store.save_charging_profiles("SITE-01", &[]).await.unwrap();
        store
            .set_station_configuration("CS-01", "ChargingScheduleMaxPeriods", "5")
            .unwrap();
        assert_eq!(
            store
                .station_configuration("CS-01", "ChargingScheduleMaxPeriods")
                .await
                .unwrap(),
            Some("5".to_string())
        );
        assert_eq!(
            store.station_configuration("CS-02", "ChargingScheduleMaxPeriods").await.unwrap(),
            None
        );
    }
}
