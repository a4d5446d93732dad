use crate::{
    BuildContext, CarCorrelation, ChargingProfile, ChargingProfileKind, ChargingProfilePurpose,
    ChargingRateUnit, ChargingSchedule, ChargingSchedulePeriod, ConnectorChargingProfile,
    CurrentType, Entity, MIN_SCHEDULE_PERIODS, OptimizerCarPlan, SLOT_SECONDS,
    SMART_CHARGING_PROFILE_ID, SMART_CHARGING_STACK_LEVEL, SmartChargingError,
    SmartChargingResult, Station, round_current,
};

/// Translates the plan of one car into a charging profile for its connector.
///
/// The plan holds one current per phase for each slot of the local day. The
/// schedule starts at the slot containing now and is cut at `max_periods`, at
/// the end of the plan, or at the first zero slot once
/// [`MIN_SCHEDULE_PERIODS`] periods are emitted. Returns `None` when the plan
/// holds nothing from the current slot on.
pub fn translate_car_plan(
    plan: &OptimizerCarPlan,
    correlation: &CarCorrelation,
    station: &Station,
    max_periods: usize,
    context: &BuildContext,
) -> SmartChargingResult<Option<ConnectorChargingProfile>> {
    let car_name = &correlation.car_name;
    let connector_id = car_name.connector_id;
    station
        .connector(connector_id)
        .ok_or_else(|| SmartChargingError::not_found(Entity::Connector, car_name))?;

    let mut factor = f64::from(correlation.phase_count);
    if station.current_type(connector_id) == CurrentType::Dc {
        factor *= station.efficiency(connector_id, context.settings.dc_efficiency_percent) / 100.0;
    }

    let clock = &context.clock;
    let mut periods: Vec<ChargingSchedulePeriod> = Vec::new();
    for (index, current) in plan.current_plan.iter().skip(clock.current_slot()).enumerate() {
        if periods.len() >= max_periods {
            break;
        }
        if *current == 0.0 && periods.len() >= MIN_SCHEDULE_PERIODS {
            break;
        }
        periods.push(ChargingSchedulePeriod {
            start_period: index as u32 * SLOT_SECONDS,
            limit: round_current(current * factor),
            number_phases: Some(correlation.phase_count),
        });
    }
    if periods.is_empty() {
        tracing::warn!("Plan of car {} holds no slot from now on", car_name);
        return Ok(None);
    }
    tracing::debug!(
        "Car {} gets a schedule of {} periods",
        car_name,
        periods.len()
    );

    Ok(Some(ConnectorChargingProfile {
        station_id: station.id.clone(),
        connector_id,
        profile: ChargingProfile {
            charging_profile_id: SMART_CHARGING_PROFILE_ID,
            transaction_id: Some(correlation.transaction_id),
            stack_level: SMART_CHARGING_STACK_LEVEL,
            charging_profile_purpose: ChargingProfilePurpose::TxProfile,
            charging_profile_kind: ChargingProfileKind::Absolute,
            valid_from: None,
            valid_to: None,
            charging_schedule: ChargingSchedule {
                duration: Some(periods.len() as u32 * SLOT_SECONDS),
                start_schedule: Some(clock.slot_start()),
                charging_rate_unit: ChargingRateUnit::A,
                charging_schedule_period: periods,
                min_charging_rate: None,
            },
        },
    }))
}
