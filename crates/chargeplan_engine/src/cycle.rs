use std::collections::HashMap;
use std::sync::Arc;

use chargeplan_core::{
    BuildContext, CarAssignment, CarCorrelation, CarModel, CarModelInput, CarName,
    ConnectorChargingProfile, DEFAULT_MAX_SCHEDULE_PERIODS, Entity, FuseTreeBuild, LeafRef,
    MAX_SCHEDULE_PERIODS_KEY, OptimizerEvent, OptimizerEventType, OptimizerRequest,
    OptimizerResponse, OptimizerState, Site, SiteClock, SmartChargingError, build_car_model,
    build_fuse_tree, sanitize_site, translate_car_plan, validate_site,
};
use chrono::{DateTime, Utc};
use tracing::Instrument;
use uuid::Uuid;

use crate::{EngineResult, OptimizerTransport, SiteRepository, TransportSettings};

/// A request ready to be sent, with what is needed to read its response.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub request: OptimizerRequest,
    /// Keyed by car name
    pub correlations: HashMap<String, CarCorrelation>,
    pub context: BuildContext,
}

/// One site's round trip: build the request, call the optimizer, translate
/// its plans into charging profiles.
pub struct SmartChargingCycle<T, R> {
    transport: T,
    repository: Arc<R>,
}

impl<T, R> SmartChargingCycle<T, R>
where
    T: OptimizerTransport,
    R: SiteRepository,
{
    pub fn new(transport: T, repository: Arc<R>) -> Self {
        SmartChargingCycle {
            transport,
            repository,
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    pub async fn compute_profiles(&self, site: Site) -> EngineResult<Vec<ConnectorChargingProfile>> {
        self.compute_profiles_at(site, Utc::now()).await
    }

    /// Runs a cycle as of `now`. A site without active session yields no
    /// profile and the optimizer is not called.
    pub async fn compute_profiles_at(
        &self,
        site: Site,
        now: DateTime<Utc>,
    ) -> EngineResult<Vec<ConnectorChargingProfile>> {
        let span = tracing::info_span!("smart_charging", cycle = %Uuid::new_v4(), site = %site.id);
        self.run(site, now).instrument(span).await
    }

    async fn run(&self, site: Site, now: DateTime<Utc>) -> EngineResult<Vec<ConnectorChargingProfile>> {
        self.transport.settings().check()?;
        let Some(prepared) = self.build_request(site, now).await? else {
            return Ok(Vec::new());
        };
        tracing::info!(
            "Requesting plans for {} cars",
            prepared.request.state.cars.len()
        );
        let response = self.transport.optimize(&prepared.request).await?;
        let profiles = self.translate_response(&response, &prepared).await?;
        tracing::info!("Computed {} charging profiles", profiles.len());
        Ok(profiles)
    }

    /// Assembles the optimizer request of `site`, or `None` when no
    /// connector holds an active session.
    pub async fn build_request(
        &self,
        site: Site,
        now: DateTime<Utc>,
    ) -> EngineResult<Option<PreparedRequest>> {
        let site = sanitize_site(site);
        let capacity = validate_site(&site)?;
        let clock = SiteClock::new(now, site.timezone.unwrap_or(chrono_tz::UTC));
        let previous_profiles = self.repository.charging_profiles(&site.id).await?;
        let context = BuildContext::new(
            clock,
            capacity.voltage,
            self.transport.settings().limitation().clone(),
            previous_profiles,
        );

        let FuseTreeBuild { tree, leaves } = build_fuse_tree(&site, &capacity, &context.settings)?;
        tracing::info!(
            "Fuse tree of site {} has {} connectors",
            site.id,
            leaves.len()
        );

        let mut cars = Vec::new();
        let mut car_assignments = Vec::new();
        let mut correlations = HashMap::new();
        for leaf in &leaves {
            let Some(model) = self.build_car(leaf, &context).await? else {
                continue;
            };
            car_assignments.push(CarAssignment {
                car_id: model.car.id,
                charging_station_id: leaf.leaf_id,
            });
            correlations.insert(model.car.name.clone(), model.correlation);
            cars.push(model.car);
        }

        if cars.is_empty() {
            tracing::info!("No active session on site {}", site.id);
            return Ok(None);
        }

        let request = OptimizerRequest {
            event: OptimizerEvent {
                event_type: OptimizerEventType::Reoptimize,
            },
            state: OptimizerState {
                fuse_tree: tree,
                cars,
                car_assignments,
                current_time_seconds: context.clock.seconds_since_midnight(),
            },
        };
        Ok(Some(PreparedRequest {
            request,
            correlations,
            context,
        }))
    }

    /// Car model of the session on `leaf`, `None` when nothing charges there.
    async fn build_car(
        &self,
        leaf: &LeafRef,
        context: &BuildContext,
    ) -> EngineResult<Option<CarModel>> {
        let station = self
            .repository
            .station(&leaf.station_id)
            .await?
            .ok_or_else(|| SmartChargingError::not_found(Entity::Station, &leaf.station_id))?;
        let connector = station.connector(leaf.connector_id).ok_or_else(|| {
            SmartChargingError::not_found(Entity::Connector, CarName::new(&station.id, leaf.connector_id))
        })?;

        let transaction_id = match connector.current_transaction_id {
            Some(transaction_id) if connector.status.is_active() => transaction_id,
            None if connector.status.is_charging() => {
                return Err(SmartChargingError::MissingSession {
                    station_id: station.id.clone(),
                    connector_id: connector.connector_id,
                }
                .into());
            }
            _ => {
                tracing::debug!(
                    "Connector {} of station {} is {:?}, not charging",
                    connector.connector_id,
                    station.id,
                    connector.status
                );
                return Ok(None);
            }
        };

        let transaction = self
            .repository
            .transaction(transaction_id)
            .await?
            .ok_or_else(|| SmartChargingError::not_found(Entity::Transaction, transaction_id))?;
        let vehicle = match &transaction.car_id {
            Some(vehicle_id) => Some(
                self.repository
                    .vehicle(vehicle_id)
                    .await?
                    .ok_or_else(|| SmartChargingError::not_found(Entity::Vehicle, vehicle_id))?,
            ),
            None => None,
        };

        let model = build_car_model(
            &CarModelInput {
                leaf_id: leaf.leaf_id,
                station: &station,
                connector,
                transaction: &transaction,
                vehicle: vehicle.as_ref(),
            },
            context,
        )?;
        tracing::debug!(
            "Car {} may draw {:.1} A to {:.1} A",
            model.car.name,
            model.car.min_current,
            model.car.max_current
        );
        Ok(Some(model))
    }

    /// Turns every plan of `response` into a charging profile.
    pub async fn translate_response(
        &self,
        response: &OptimizerResponse,
        prepared: &PreparedRequest,
    ) -> EngineResult<Vec<ConnectorChargingProfile>> {
        let mut profiles = Vec::with_capacity(response.cars.len());
        for plan in &response.cars {
            let car_name: CarName = plan.name.parse()?;
            let correlation = prepared
                .correlations
                .get(&plan.name)
                .ok_or_else(|| SmartChargingError::not_found(Entity::Car, &plan.name))?;
            let station = self
                .repository
                .station(&car_name.station_id)
                .await?
                .ok_or_else(|| SmartChargingError::not_found(Entity::Station, &car_name.station_id))?;
            let max_periods = self.max_schedule_periods(&station.id).await?;
            if let Some(profile) =
                translate_car_plan(plan, correlation, &station, max_periods, &prepared.context)?
            {
                profiles.push(profile);
            }
        }
        Ok(profiles)
    }

    async fn max_schedule_periods(&self, station_id: &str) -> EngineResult<usize> {
        let configured = self
            .repository
            .station_configuration(station_id, MAX_SCHEDULE_PERIODS_KEY)
            .await?;
        let Some(value) = configured else {
            return Ok(DEFAULT_MAX_SCHEDULE_PERIODS);
        };
        match value.trim().parse::<usize>() {
            Ok(periods) if periods > 0 => Ok(periods),
            _ => {
                tracing::warn!(
                    "Station {} reports an invalid {} '{}', using {}",
                    station_id,
                    MAX_SCHEDULE_PERIODS_KEY,
                    value,
                    DEFAULT_MAX_SCHEDULE_PERIODS
                );
                Ok(DEFAULT_MAX_SCHEDULE_PERIODS)
            }
        }
    }
}
