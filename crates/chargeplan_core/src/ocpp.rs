//! OCPP 1.6 charging profile shapes produced by the plan translator.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A charging profile addressed to one connector of a station.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorChargingProfile {
    pub station_id: String,
    pub connector_id: u32,
    pub profile: ChargingProfile,
}

impl ConnectorChargingProfile {
    /// Limit of the schedule period in force at `instant`, in the schedule's
    /// rate unit.
    pub fn limit_at(&self, instant: DateTime<Utc>) -> Option<f64> {
        let schedule = &self.profile.charging_schedule;
        let start = schedule.start_schedule?;
        if instant < start {
            return None;
        }
        if let Some(duration) = schedule.duration {
            if instant >= start + Duration::seconds(i64::from(duration)) {
                return None;
            }
        }
        let elapsed = (instant - start).num_seconds();
        schedule
            .charging_schedule_period
            .iter()
            .take_while(|period| i64::from(period.start_period) <= elapsed)
            .last()
            .map(|period| period.limit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChargingProfile {
    pub charging_profile_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<i64>,
    pub stack_level: i32,
    pub charging_profile_purpose: ChargingProfilePurpose,
    pub charging_profile_kind: ChargingProfileKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<DateTime<Utc>>,
    pub charging_schedule: ChargingSchedule,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChargingProfilePurpose {
    ChargePointMaxProfile,
    TxDefaultProfile,
    TxProfile,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChargingProfileKind {
    Absolute,
    Recurring,
    Relative,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChargingSchedule {
    /// Seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_schedule: Option<DateTime<Utc>>,
    pub charging_rate_unit: ChargingRateUnit,
    pub charging_schedule_period: Vec<ChargingSchedulePeriod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_charging_rate: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChargingRateUnit {
    W,
    A,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChargingSchedulePeriod {
    /// Seconds from the start of the schedule
    pub start_period: u32,
    pub limit: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_phases: Option<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn profile() -> ConnectorChargingProfile {
        ConnectorChargingProfile {
            station_id: "CS-01".into(),
            connector_id: 1,
            profile: ChargingProfile {
                charging_profile_id: 100,
                transaction_id: Some(42),
                stack_level: 2,
                charging_profile_purpose: ChargingProfilePurpose::TxProfile,
                charging_profile_kind: ChargingProfileKind::Absolute,
                valid_from: None,
                valid_to: None,
                charging_schedule: ChargingSchedule {
                    duration: Some(2700),
                    start_schedule: Some(Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap()),
                    charging_rate_unit: ChargingRateUnit::A,
                    charging_schedule_period: vec![
                        ChargingSchedulePeriod {
                            start_period: 0,
                            limit: 96.0,
                            number_phases: Some(3),
                        },
                        ChargingSchedulePeriod {
                            start_period: 900,
                            limit: 48.0,
                            number_phases: Some(3),
                        },
                        ChargingSchedulePeriod {
                            start_period: 1800,
                            limit: 18.0,
                            number_phases: Some(3),
                        },
                    ],
                    min_charging_rate: None,
                },
            },
        }
    }

    #[test]
    fn test_limit_at() {
        let profile = profile();
        let at = |h, m| Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap();
        assert_eq!(profile.limit_at(at(9, 59)), None);
        assert_eq!(profile.limit_at(at(10, 0)), Some(96.0));
        assert_eq!(profile.limit_at(at(10, 20)), Some(48.0));
        assert_eq!(profile.limit_at(at(10, 44)), Some(18.0));
        assert_eq!(profile.limit_at(at(10, 45)), None);
    }

    #[test]
    fn test_charging_profile_serialization() {
        let json = serde_json::to_value(&profile().profile).unwrap();
        assert_eq!(json["chargingProfilePurpose"], "TxProfile");
        assert_eq!(json["chargingProfileKind"], "Absolute");
        assert_eq!(json["transactionId"], 42);
        assert_eq!(json["chargingSchedule"]["chargingRateUnit"], "A");
        assert_eq!(json["chargingSchedule"]["chargingSchedulePeriod"][1]["startPeriod"], 900);
        assert!(json.get("validFrom").is_none());
    }
}
