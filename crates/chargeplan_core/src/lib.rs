//! Translation between a charging site's topology and the request/response
//! format of an external power-allocation optimizer.
//!
//! The crate is pure: every function works on already-loaded entities.
//! Loading them, calling the optimizer and persisting the resulting
//! profiles is left to `chargeplan_engine`.

mod car_model;
mod clock;
mod context;
mod fuse_tree;
mod lookup;
mod models;
mod ocpp;
mod optimizer;
mod plan;
mod sanitizer;
mod settings;
mod units;

pub use crate::car_model::{CarCorrelation, CarModel, CarModelInput, VehicleOverride, build_car_model};
pub use crate::clock::{SLOT_SECONDS, SiteClock};
pub use crate::context::BuildContext;
pub use crate::fuse_tree::{
    ConnectorFuse, Fuse, FuseNode, FuseTree, FuseTreeBuild, LeafRef, build_fuse_tree,
};
pub use crate::models::*;
pub use crate::ocpp::*;
pub use crate::optimizer::*;
pub use crate::plan::translate_car_plan;
pub use crate::sanitizer::{SiteCapacity, sanitize_site, validate_site};
pub use crate::settings::*;
pub use crate::units::round_current;

use std::fmt;

use thiserror::Error;

/// Broad classification of a [`SmartChargingError`], used by callers to pick
/// a reporting channel (HTTP status, alerting, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
}

/// Entities that can be looked up by identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Station,
    Connector,
    Transaction,
    Vehicle,
    Car,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::Station => "Station",
            Entity::Connector => "Connector",
            Entity::Transaction => "Transaction",
            Entity::Vehicle => "Vehicle",
            Entity::Car => "Car",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum SmartChargingError {
    #[error("Site {site_id} cannot be smart charged: {reason}")]
    InvalidSite { site_id: String, reason: String },
    #[error("Connector {connector_id} of station {station_id} has no resolvable {missing}")]
    IncompleteConnector {
        station_id: String,
        connector_id: u32,
        missing: &'static str,
    },
    #[error("Connector {connector_id} of station {station_id} is charging but has no session")]
    MissingSession {
        station_id: String,
        connector_id: u32,
    },
    #[error("Car name '{name}' is not of the form stationID~connectorID")]
    InvalidCarName { name: String },
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: String },
}

impl SmartChargingError {
    pub fn not_found(entity: Entity, id: impl ToString) -> Self {
        SmartChargingError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SmartChargingError::NotFound { .. } => ErrorKind::NotFound,
            SmartChargingError::InvalidSite { .. }
            | SmartChargingError::IncompleteConnector { .. }
            | SmartChargingError::MissingSession { .. }
            | SmartChargingError::InvalidCarName { .. } => ErrorKind::Validation,
        }
    }
}

pub type SmartChargingResult<T> = Result<T, SmartChargingError>;
