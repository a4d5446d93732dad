use std::collections::HashSet;

use crate::units::watts_to_amps;
use crate::{Site, SmartChargingError, SmartChargingResult};

/// Validated electrical capacity of a sanitized site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiteCapacity {
    /// W
    pub max_power: f64,
    /// V
    pub voltage: f64,
    pub number_of_phases: u8,
}

impl SiteCapacity {
    /// Capacity summed over all phases, in A.
    pub fn amps(&self) -> f64 {
        watts_to_amps(self.max_power, self.voltage)
    }

    pub fn amps_per_phase(&self) -> f64 {
        self.amps() / f64::from(self.number_of_phases)
    }
}

/// Removes what must not be power limited from the site, and the capacity it
/// consumes.
///
/// Excluded stations are removed with their full rated power. Connectors of
/// charge points excluded from power limitation are removed, and the charge
/// point's amperage is subtracted once. Stations left without connectors are
/// dropped. The remaining capacity is clamped at zero and written back to the
/// site's maximum power when it changed.
///
/// This never fails: a site that cannot be sanitized is returned pruned but
/// otherwise untouched, and is rejected later by [`validate_site`].
pub fn sanitize_site(mut site: Site) -> Site {
    let voltage = site.voltage.filter(|voltage| *voltage > 0.0);
    let mut removed_amps = 0.0;
    let mut stations = Vec::with_capacity(site.stations.len());

    for mut station in std::mem::take(&mut site.stations) {
        if station.excluded_from_smart_charging {
            tracing::info!(
                "Station {} is excluded from smart charging, removing {} W from site {}",
                station.id,
                station.maximum_power,
                site.id
            );
            if let Some(voltage) = voltage {
                removed_amps += watts_to_amps(station.maximum_power, voltage);
            }
            continue;
        }

        let excluded_charge_points: HashSet<u32> = station
            .charge_points
            .iter()
            .filter(|charge_point| charge_point.excluded_from_power_limitation)
            .map(|charge_point| charge_point.id)
            .collect();
        if !excluded_charge_points.is_empty() {
            let mut removed_charge_points = HashSet::new();
            let charge_points = &station.charge_points;
            let station_id = &station.id;
            station.connectors.retain(|connector| {
                let excluded = charge_points.iter().find(|charge_point| {
                    excluded_charge_points.contains(&charge_point.id)
                        && charge_point.connector_ids.contains(&connector.connector_id)
                });
                match excluded {
                    Some(charge_point) => {
                        if removed_charge_points.insert(charge_point.id) {
                            match charge_point.amperage {
                                Some(amperage) => removed_amps += amperage,
                                None => tracing::warn!(
                                    "Charge point {} of station {} has no amperage, site capacity is not reduced",
                                    charge_point.id,
                                    station_id
                                ),
                            }
                        }
                        false
                    }
                    None => true,
                }
            });
            for charge_point_id in &removed_charge_points {
                tracing::info!(
                    "Charge point {} of station {} is excluded from power limitation",
                    charge_point_id,
                    station.id
                );
            }
        }

        if station.connectors.is_empty() {
            tracing::warn!("Station {} has no connector left to limit", station.id);
            continue;
        }
        stations.push(station);
    }
    site.stations = stations;

    if let (Some(max_power), Some(voltage)) = (site.max_power, voltage) {
        let original_amps = watts_to_amps(max_power, voltage);
        let remaining_amps = (original_amps - removed_amps).max(0.0);
        if remaining_amps != original_amps {
            site.max_power = Some(remaining_amps * voltage);
        }
    }
    site
}

/// Checks that a sanitized site carries everything the fuse tree needs.
pub fn validate_site(site: &Site) -> SmartChargingResult<SiteCapacity> {
    let invalid = |reason: &str| SmartChargingError::InvalidSite {
        site_id: site.id.clone(),
        reason: reason.to_string(),
    };
    let max_power = site
        .max_power
        .filter(|power| *power >= 0.0)
        .ok_or_else(|| invalid("no maximum power"))?;
    let voltage = site
        .voltage
        .filter(|voltage| *voltage > 0.0)
        .ok_or_else(|| invalid("no voltage"))?;
    let number_of_phases = site
        .number_of_phases
        .filter(|phases| *phases == 1 || *phases == 3)
        .ok_or_else(|| invalid("number of phases must be 1 or 3"))?;
    if site.stations.is_empty() {
        return Err(invalid("no charging station to limit"));
    }
    Ok(SiteCapacity {
        max_power,
        voltage,
        number_of_phases,
    })
}
