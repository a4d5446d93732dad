use chrono::{DateTime, Utc};

use crate::units::{kwh_to_amp_hours, watts_to_amps};
use crate::{
    BuildContext, CarName, CarType, Connector, CurrentType, NOMINAL_BATTERY_KWH, OptimizerCar,
    SiteClock, SmartChargingError, SmartChargingResult, Station, Transaction, VehicleProfile,
};

/// A session that started longer ago than this is considered present since
/// the beginning of the cycle.
const ARRIVAL_TOLERANCE_SECONDS: i64 = 30;
/// Share of the sticky buffer band tolerated as meter jitter.
const STICKY_JITTER_SHARE: f64 = 0.2;
/// Draw per phase under which a vehicle is considered idle, in A.
const IDLE_CURRENT_PER_PHASE: f64 = 0.1;

/// How the known vehicle overrides the generic constraint model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VehicleOverride {
    None,
    /// AC charging on 3 phases is bounded by the on-board charger.
    AcConverter { amperage_per_phase: f64 },
    /// DC charging is bounded by the vehicle's fast charge ceiling.
    DcCatalog { fast_charge_power_max_kw: f64 },
}

impl VehicleOverride {
    pub fn resolve(
        vehicle: Option<&VehicleProfile>,
        current_type: CurrentType,
        connected_phases: u8,
    ) -> Self {
        let Some(vehicle) = vehicle else {
            return VehicleOverride::None;
        };
        let resolved = match current_type {
            CurrentType::Ac if connected_phases == 3 => {
                vehicle
                    .converter
                    .as_ref()
                    .map(|converter| VehicleOverride::AcConverter {
                        amperage_per_phase: converter.amperage_per_phase,
                    })
            }
            CurrentType::Ac => None,
            CurrentType::Dc => vehicle
                .fast_charge_power_max
                .filter(|power| *power > 0.0)
                .map(|power| VehicleOverride::DcCatalog {
                    fast_charge_power_max_kw: power,
                }),
        };
        resolved.unwrap_or(VehicleOverride::None)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CarModelInput<'a> {
    pub leaf_id: u32,
    pub station: &'a Station,
    pub connector: &'a Connector,
    pub transaction: &'a Transaction,
    pub vehicle: Option<&'a VehicleProfile>,
}

/// What the plan translator needs to map a car of the response back onto
/// its connector.
#[derive(Debug, Clone, PartialEq)]
pub struct CarCorrelation {
    pub car_name: CarName,
    pub leaf_id: u32,
    pub transaction_id: i64,
    /// Phases the vehicle charges on
    pub phase_count: u8,
}

#[derive(Debug, Clone)]
pub struct CarModel {
    pub car: OptimizerCar,
    pub correlation: CarCorrelation,
}

#[derive(Debug, Clone, Copy)]
struct CurrentLimits {
    phases: [bool; 3],
    phase_count: u8,
    min_per_phase: f64,
    max_per_phase: f64,
}

impl CurrentLimits {
    fn min_current(&self) -> f64 {
        self.min_per_phase * f64::from(self.phase_count)
    }

    fn max_current(&self) -> f64 {
        self.max_per_phase * f64::from(self.phase_count)
    }
}

/// Builds the constraint model of the session charging on `input.connector`.
///
/// The generic model assumes a 3 phase capable vehicle limited by the
/// connector. It is then refined, in order, by the known vehicle, by the
/// phases the meter reports in use, by sticky limitation and finally
/// converted to grid side current for DC.
pub fn build_car_model(
    input: &CarModelInput<'_>,
    context: &BuildContext,
) -> SmartChargingResult<CarModel> {
    let CarModelInput {
        leaf_id,
        station,
        connector,
        transaction,
        vehicle,
    } = *input;
    let connector_id = connector.connector_id;
    let settings = &context.settings;
    let incomplete = |missing| SmartChargingError::IncompleteConnector {
        station_id: station.id.clone(),
        connector_id,
        missing,
    };
    let connected_phases = station
        .phase_count(connector_id)
        .ok_or_else(|| incomplete("phase count"))?;
    let amps_per_phase = station
        .amperage_per_phase(connector_id)
        .ok_or_else(|| incomplete("amperage"))?;
    let current_type = station.current_type(connector_id);
    let voltage = station.voltage_or(context.voltage);

    let mut limits = CurrentLimits {
        phases: [true; 3],
        phase_count: connected_phases,
        min_per_phase: settings.min_current_per_phase,
        max_per_phase: amps_per_phase,
    };

    match VehicleOverride::resolve(vehicle, current_type, connected_phases) {
        VehicleOverride::None => {}
        VehicleOverride::AcConverter { amperage_per_phase } => {
            limits.max_per_phase = amperage_per_phase;
        }
        VehicleOverride::DcCatalog {
            fast_charge_power_max_kw,
        } => {
            limits.max_per_phase =
                watts_to_amps(fast_charge_power_max_kw * 1000.0, voltage) / 3.0;
        }
    }
    let battery_kwh = vehicle
        .and_then(|vehicle| vehicle.battery_capacity_full)
        .filter(|capacity| *capacity > 0.0)
        .unwrap_or(NOMINAL_BATTERY_KWH);

    if let Some(measured) = transaction.measured_phases() {
        limits.phases = measured.as_array();
        limits.phase_count = measured.count();
    }

    if settings.sticky_limitation {
        let sticky = sticky_limit(station, transaction, current_type, voltage, &limits, context);
        if let Some(max_per_phase) = sticky {
            tracing::debug!(
                "Sticky limitation of connector {} of station {}: {:.1} A -> {:.1} A per phase",
                connector_id,
                station.id,
                limits.max_per_phase,
                max_per_phase
            );
            limits.max_per_phase = max_per_phase;
        }
    }

    if current_type == CurrentType::Dc {
        let efficiency = station.efficiency(connector_id, settings.dc_efficiency_percent);
        limits.max_per_phase /= efficiency / 100.0;
    }

    let capacity = kwh_to_amp_hours(battery_kwh, voltage);
    let car_name = CarName::new(&station.id, connector_id);
    let car = OptimizerCar {
        id: leaf_id,
        name: car_name.to_string(),
        car_type: CarType::Bev,
        timestamp_arrival: arrival_seconds(&context.clock, transaction.timestamp),
        max_capacity: capacity,
        start_capacity: capacity / 2.0,
        min_current: limits.min_current(),
        min_current_per_phase: limits.min_per_phase,
        max_current: limits.max_current(),
        max_current_per_phase: limits.max_per_phase,
        suspendable: true,
        can_use_variable_power: true,
        can_load_phase1: limits.phases[0],
        can_load_phase2: limits.phases[1],
        can_load_phase3: limits.phases[2],
    };
    Ok(CarModel {
        car,
        correlation: CarCorrelation {
            car_name,
            leaf_id,
            transaction_id: transaction.id,
            phase_count: limits.phase_count,
        },
    })
}

/// Arrival in seconds since local midnight.
///
/// Sessions started earlier today are reported as arriving now, sessions of
/// another day as arriving at midnight.
fn arrival_seconds(clock: &SiteClock, started: DateTime<Utc>) -> u32 {
    let Some(started) = clock.seconds_today(started) else {
        return 0;
    };
    let now = clock.seconds_since_midnight();
    if i64::from(now) - i64::from(started) > ARRIVAL_TOLERANCE_SECONDS {
        now
    } else {
        started.min(now)
    }
}

/// Maximum current per phase after sticky limitation, `None` when the
/// heuristic does not apply to this session.
fn sticky_limit(
    station: &Station,
    transaction: &Transaction,
    current_type: CurrentType,
    voltage: f64,
    limits: &CurrentLimits,
    context: &BuildContext,
) -> Option<f64> {
    let phase_count = f64::from(limits.phase_count);
    let (draw_per_phase, buffer_percent) = match current_type {
        CurrentType::Ac => {
            transaction.measured_phases()?;
            (
                transaction.current_instant_amps / phase_count,
                context.settings.limit_buffer_ac,
            )
        }
        CurrentType::Dc => {
            if transaction.current_instant_watts <= 0.0 {
                return None;
            }
            (
                watts_to_amps(transaction.current_instant_watts, voltage) / phase_count,
                context.settings.limit_buffer_dc,
            )
        }
    };
    let previous_per_phase = context
        .previous_profile(&station.id, transaction.connector_id, transaction.id)?
        .limit_at(context.clock.now())?
        / phase_count;
    Some(sticky_max_current_per_phase(
        previous_per_phase,
        draw_per_phase,
        limits.max_per_phase,
        limits.min_per_phase,
        buffer_percent,
    ))
}

/// Keeps a vehicle that does not use its previous limit from being offered
/// the freed capacity again.
///
/// A vehicle drawing close to its previous limit, while that limit was below
/// `max_per_phase`, is still ramping up and keeps `max_per_phase`. Any other
/// vehicle is bounded by its current draw plus the buffer.
fn sticky_max_current_per_phase(
    previous_per_phase: f64,
    draw_per_phase: f64,
    max_per_phase: f64,
    min_per_phase: f64,
    buffer_percent: f64,
) -> f64 {
    let factor = 1.0 + buffer_percent / 100.0;
    let threshold = previous_per_phase / factor;
    let widened_threshold = threshold - STICKY_JITTER_SHARE * (previous_per_phase - threshold);
    if draw_per_phase > widened_threshold && previous_per_phase < max_per_phase {
        return max_per_phase;
    }
    if draw_per_phase < IDLE_CURRENT_PER_PHASE {
        return min_per_phase;
    }
    (draw_per_phase * factor).max(min_per_phase).min(max_per_phase)
}
