//! Lookups resolving the electrical characteristics of a connector.
//!
//! A charge point, when one serves the connector, wins over the raw values
//! stored on the connector itself.

use crate::{ChargePoint, Connector, CurrentType, PhasesUsed, Site, Station, Transaction};

impl Site {
    pub fn station(&self, station_id: &str) -> Option<&Station> {
        self.stations.iter().find(|station| station.id == station_id)
    }
}

impl Station {
    pub fn connector(&self, connector_id: u32) -> Option<&Connector> {
        self.connectors
            .iter()
            .find(|connector| connector.connector_id == connector_id)
    }

    pub fn charge_point_for(&self, connector_id: u32) -> Option<&ChargePoint> {
        self.charge_points
            .iter()
            .find(|charge_point| charge_point.connector_ids.contains(&connector_id))
    }

    pub fn current_type(&self, connector_id: u32) -> CurrentType {
        self.charge_point_for(connector_id)
            .and_then(|charge_point| charge_point.current_type)
            .or_else(|| {
                self.connector(connector_id)
                    .and_then(|connector| connector.current_type)
            })
            .unwrap_or_default()
    }

    pub fn phase_count(&self, connector_id: u32) -> Option<u8> {
        let phases = match self.charge_point_for(connector_id) {
            Some(charge_point) => charge_point.number_of_connected_phases,
            None => self
                .connector(connector_id)
                .and_then(|connector| connector.number_of_connected_phases),
        };
        phases.filter(|phases| (1..=3).contains(phases))
    }

    /// Amperage of the connector summed over its phases.
    pub fn amperage(&self, connector_id: u32) -> Option<f64> {
        let amperage = match self.charge_point_for(connector_id) {
            Some(charge_point) => charge_point.amperage,
            None => self
                .connector(connector_id)
                .and_then(|connector| connector.amperage),
        };
        amperage.filter(|amperage| *amperage >= 0.0)
    }

    pub fn amperage_per_phase(&self, connector_id: u32) -> Option<f64> {
        let phases = self.phase_count(connector_id)?;
        Some(self.amperage(connector_id)? / f64::from(phases))
    }

    /// Conversion efficiency in percent, `default_percent` when the charge
    /// point does not declare a usable one.
    pub fn efficiency(&self, connector_id: u32, default_percent: f64) -> f64 {
        self.charge_point_for(connector_id)
            .and_then(|charge_point| charge_point.efficiency)
            .filter(|efficiency| *efficiency > 0.0 && *efficiency <= 100.0)
            .unwrap_or(default_percent)
    }

    /// Connectors of `charge_point` currently holding a share of its power,
    /// in station order.
    pub fn active_connector_ids(&self, charge_point: &ChargePoint) -> Vec<u32> {
        self.connectors
            .iter()
            .filter(|connector| charge_point.connector_ids.contains(&connector.connector_id))
            .filter(|connector| connector.status.is_active())
            .map(|connector| connector.connector_id)
            .collect()
    }

    pub fn voltage_or(&self, site_voltage: f64) -> f64 {
        self.voltage.filter(|voltage| *voltage > 0.0).unwrap_or(site_voltage)
    }
}

impl Transaction {
    /// Phases reported by the meter, if any phase was reported in use.
    pub fn measured_phases(&self) -> Option<PhasesUsed> {
        self.phases_used.filter(|phases| phases.count() > 0)
    }
}
