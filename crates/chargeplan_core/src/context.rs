use crate::{ConnectorChargingProfile, LimitationSettings, SiteClock};

/// Everything a translation cycle shares between its steps.
///
/// Populated once at the start of the cycle and passed by reference; the
/// previously issued profiles are a snapshot and are never refreshed.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub clock: SiteClock,
    /// Site voltage in V
    pub voltage: f64,
    pub settings: LimitationSettings,
    pub previous_profiles: Vec<ConnectorChargingProfile>,
}

impl BuildContext {
    pub fn new(
        clock: SiteClock,
        voltage: f64,
        settings: LimitationSettings,
        previous_profiles: Vec<ConnectorChargingProfile>,
    ) -> Self {
        BuildContext {
            clock,
            voltage,
            settings,
            previous_profiles,
        }
    }

    /// Profile previously issued for this exact connector and session.
    pub fn previous_profile(
        &self,
        station_id: &str,
        connector_id: u32,
        transaction_id: i64,
    ) -> Option<&ConnectorChargingProfile> {
        self.previous_profiles.iter().find(|profile| {
            profile.station_id == station_id
                && profile.connector_id == connector_id
                && profile.profile.transaction_id == Some(transaction_id)
        })
    }
}
