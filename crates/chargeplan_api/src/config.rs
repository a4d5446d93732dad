use std::net::SocketAddr;
use std::path::Path;

use chargeplan_core::{Site, Transaction, VehicleProfile};
use chargeplan_engine::{EngineResult, MemoryStore, OptimizerSettings};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

/// Service settings, read from a TOML file and `CHARGEPLAN__` prefixed
/// environment variables (`CHARGEPLAN__OPTIMIZER__URL`, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub optimizer: OptimizerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

impl Settings {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("CHARGEPLAN__").split("__"));
        Ok(figment.extract()?)
    }
}

/// A site with its running sessions, as loaded into the demo service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSnapshot {
    pub site: Site,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub vehicles: Vec<VehicleProfile>,
    #[serde(default)]
    pub station_configuration: Vec<StationConfigurationEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationConfigurationEntry {
    pub station_id: String,
    pub key: String,
    pub value: String,
}

impl SiteSnapshot {
    pub fn into_store(self) -> EngineResult<MemoryStore> {
        let store = MemoryStore::new();
        store.insert_site(self.site)?;
        for transaction in self.transactions {
            store.insert_transaction(transaction)?;
        }
        for vehicle in self.vehicles {
            store.insert_vehicle(vehicle)?;
        }
        for entry in self.station_configuration {
            store.set_station_configuration(entry.station_id, entry.key, entry.value)?;
        }
        Ok(store)
    }
}
