use serde::{Deserialize, Serialize};

use crate::{
    CurrentType, LimitationSettings, Site, SiteCapacity, SmartChargingError, SmartChargingResult,
    Station,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FuseTree {
    pub root_fuse: Fuse,
}

/// A capacity-limiting node: the site itself or one of its stations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "@type", rename = "Fuse", rename_all = "camelCase")]
pub struct Fuse {
    pub id: u32,
    /// A per phase
    pub phase1_current: f64,
    pub phase2_current: f64,
    pub phase3_current: f64,
    pub phase1_connected: bool,
    pub phase2_connected: bool,
    pub phase3_connected: bool,
    pub children: Vec<FuseNode>,
}

/// A terminal load: one connector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "@type", rename = "ChargingStation", rename_all = "camelCase")]
pub struct ConnectorFuse {
    pub id: u32,
    /// A per phase
    pub fuse_phase1: f64,
    pub fuse_phase2: f64,
    pub fuse_phase3: f64,
    pub phase1_connected: bool,
    pub phase2_connected: bool,
    pub phase3_connected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FuseNode {
    Fuse(Fuse),
    Connector(ConnectorFuse),
}

impl FuseNode {
    pub fn id(&self) -> u32 {
        match self {
            FuseNode::Fuse(fuse) => fuse.id,
            FuseNode::Connector(connector) => connector.id,
        }
    }

    pub fn phase_currents(&self) -> [f64; 3] {
        match self {
            FuseNode::Fuse(fuse) => fuse.phase_currents(),
            FuseNode::Connector(connector) => connector.phase_currents(),
        }
    }

    pub fn phases_connected(&self) -> [bool; 3] {
        match self {
            FuseNode::Fuse(fuse) => fuse.phases_connected(),
            FuseNode::Connector(connector) => connector.phases_connected(),
        }
    }
}

impl Fuse {
    fn new(id: u32, capacity: PhaseCapacity, children: Vec<FuseNode>) -> Self {
        Fuse {
            id,
            phase1_current: capacity.currents[0],
            phase2_current: capacity.currents[1],
            phase3_current: capacity.currents[2],
            phase1_connected: capacity.connected[0],
            phase2_connected: capacity.connected[1],
            phase3_connected: capacity.connected[2],
            children,
        }
    }

    pub fn phase_currents(&self) -> [f64; 3] {
        [self.phase1_current, self.phase2_current, self.phase3_current]
    }

    pub fn phases_connected(&self) -> [bool; 3] {
        [
            self.phase1_connected,
            self.phase2_connected,
            self.phase3_connected,
        ]
    }

    /// Ids of this node and all its descendants, depth first.
    pub fn ids(&self) -> Vec<u32> {
        let mut ids = vec![self.id];
        for child in &self.children {
            match child {
                FuseNode::Fuse(fuse) => ids.extend(fuse.ids()),
                FuseNode::Connector(connector) => ids.push(connector.id),
            }
        }
        ids
    }
}

impl ConnectorFuse {
    fn new(id: u32, capacity: PhaseCapacity) -> Self {
        ConnectorFuse {
            id,
            fuse_phase1: capacity.currents[0],
            fuse_phase2: capacity.currents[1],
            fuse_phase3: capacity.currents[2],
            phase1_connected: capacity.connected[0],
            phase2_connected: capacity.connected[1],
            phase3_connected: capacity.connected[2],
        }
    }

    pub fn phase_currents(&self) -> [f64; 3] {
        [self.fuse_phase1, self.fuse_phase2, self.fuse_phase3]
    }

    pub fn phases_connected(&self) -> [bool; 3] {
        [
            self.phase1_connected,
            self.phase2_connected,
            self.phase3_connected,
        ]
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct PhaseCapacity {
    currents: [f64; 3],
    connected: [bool; 3],
}

impl PhaseCapacity {
    /// `amps_per_phase` on the first `phases` phases.
    fn spread(amps_per_phase: f64, phases: u8) -> Self {
        let mut capacity = PhaseCapacity::default();
        for phase in 0..usize::from(phases.min(3)) {
            capacity.currents[phase] = amps_per_phase;
            capacity.connected[phase] = true;
        }
        capacity
    }

    fn sum<'a>(nodes: impl IntoIterator<Item = &'a FuseNode>) -> Self {
        let mut capacity = PhaseCapacity::default();
        for node in nodes {
            let currents = node.phase_currents();
            let connected = node.phases_connected();
            for phase in 0..3 {
                capacity.currents[phase] += currents[phase];
                capacity.connected[phase] |= connected[phase];
            }
        }
        capacity
    }
}

/// Correlates a leaf of the tree with the connector it stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafRef {
    pub leaf_id: u32,
    pub station_id: String,
    pub connector_id: u32,
}

#[derive(Debug, Clone)]
pub struct FuseTreeBuild {
    pub tree: FuseTree,
    /// Leaves in construction order
    pub leaves: Vec<LeafRef>,
}

/// Node ids: root is 0, then every node in depth first construction order.
#[derive(Debug, Default)]
struct FuseIds {
    next: u32,
}

impl FuseIds {
    fn next_id(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Builds the site → station → connector capacity tree of a sanitized site.
///
/// Any connector whose phase count or amperage cannot be resolved aborts the
/// whole build.
pub fn build_fuse_tree(
    site: &Site,
    capacity: &SiteCapacity,
    settings: &LimitationSettings,
) -> SmartChargingResult<FuseTreeBuild> {
    let mut ids = FuseIds::default();
    let root_id = ids.next_id();
    let mut leaves = Vec::new();
    let mut stations = Vec::with_capacity(site.stations.len());

    for station in &site.stations {
        let station_id = ids.next_id();
        let mut connectors = Vec::with_capacity(station.connectors.len());
        for connector in &station.connectors {
            let leaf_id = ids.next_id();
            let phases = station.phase_count(connector.connector_id).ok_or_else(|| {
                SmartChargingError::IncompleteConnector {
                    station_id: station.id.clone(),
                    connector_id: connector.connector_id,
                    missing: "phase count",
                }
            })?;
            let amps_per_phase =
                connector_capacity_per_phase(station, connector.connector_id, settings)?;
            tracing::debug!(
                "Fuse {} for connector {} of station {}: {:.2} A on {} phase(s)",
                leaf_id,
                connector.connector_id,
                station.id,
                amps_per_phase,
                phases
            );
            connectors.push(FuseNode::Connector(ConnectorFuse::new(
                leaf_id,
                PhaseCapacity::spread(amps_per_phase, phases),
            )));
            leaves.push(LeafRef {
                leaf_id,
                station_id: station.id.clone(),
                connector_id: connector.connector_id,
            });
        }
        let station_capacity = PhaseCapacity::sum(&connectors);
        stations.push(FuseNode::Fuse(Fuse::new(station_id, station_capacity, connectors)));
    }

    let root = Fuse::new(
        root_id,
        PhaseCapacity::spread(capacity.amps_per_phase(), capacity.number_of_phases),
        stations,
    );
    Ok(FuseTreeBuild {
        tree: FuseTree { root_fuse: root },
        leaves,
    })
}

/// Grid side current per phase a connector may draw.
fn connector_capacity_per_phase(
    station: &Station,
    connector_id: u32,
    settings: &LimitationSettings,
) -> SmartChargingResult<f64> {
    let mut amps_per_phase = station.amperage_per_phase(connector_id).ok_or_else(|| {
        SmartChargingError::IncompleteConnector {
            station_id: station.id.clone(),
            connector_id,
            missing: "amperage",
        }
    })?;

    if let Some(charge_point) = station.charge_point_for(connector_id) {
        let active = station.active_connector_ids(charge_point);
        if charge_point.share_power_to_all_connectors {
            amps_per_phase /= active.len().max(1) as f64;
        } else if charge_point.cannot_charge_in_parallel
            && active.len() > 1
            && active.first() != Some(&connector_id)
        {
            tracing::debug!(
                "Connector {} of station {} cannot charge in parallel of connector {:?}",
                connector_id,
                station.id,
                active.first()
            );
            amps_per_phase = 0.0;
        }
    }

    if station.current_type(connector_id) == CurrentType::Dc {
        amps_per_phase /= station.efficiency(connector_id, settings.dc_efficiency_percent) / 100.0;
    }
    Ok(amps_per_phase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChargePoint, Connector, ConnectorStatus};

    fn connector(connector_id: u32, status: ConnectorStatus) -> Connector {
        Connector {
            connector_id,
            status,
            amperage: Some(96.0),
            number_of_connected_phases: Some(3),
            current_type: None,
            current_transaction_id: None,
        }
    }

    fn charge_point(connector_ids: Vec<u32>) -> ChargePoint {
        ChargePoint {
            id: 1,
            connector_ids,
            current_type: Some(CurrentType::Ac),
            amperage: Some(96.0),
            number_of_connected_phases: Some(3),
            power: Some(22_080.0),
            share_power_to_all_connectors: false,
            cannot_charge_in_parallel: false,
            excluded_from_power_limitation: false,
            efficiency: None,
        }
    }

    fn station(id: &str, connectors: Vec<Connector>) -> Station {
        Station {
            id: id.into(),
            excluded_from_smart_charging: false,
            maximum_power: 44_160.0,
            voltage: None,
            charge_points: vec![],
            connectors,
        }
    }

    fn site(stations: Vec<Station>) -> (Site, SiteCapacity) {
        let site = Site {
            id: "SITE-01".into(),
            max_power: Some(10_000.0),
            voltage: Some(230.0),
            number_of_phases: Some(3),
            timezone: None,
            stations,
        };
        let capacity = crate::validate_site(&site).unwrap();
        (site, capacity)
    }

    fn leaf(build: &FuseTreeBuild, station_index: usize, connector_index: usize) -> ConnectorFuse {
        let FuseNode::Fuse(station) = &build.tree.root_fuse.children[station_index] else {
            panic!("Expected a station fuse");
        };
        let FuseNode::Connector(connector) = &station.children[connector_index] else {
            panic!("Expected a connector fuse");
        };
        connector.clone()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_single_connector_site() {
        let (site, capacity) = site(vec![station(
            "CS-01",
            vec![connector(1, ConnectorStatus::Charging)],
        )]);
        let build = build_fuse_tree(&site, &capacity, &LimitationSettings::default()).unwrap();
        let root = &build.tree.root_fuse;

        assert_eq!(root.id, 0);
        for current in root.phase_currents() {
            assert_close(current, 10_000.0 / 230.0 / 3.0);
        }
        assert_eq!(leaf(&build, 0, 0).phase_currents(), [32.0, 32.0, 32.0]);
        assert_eq!(
            build.leaves,
            vec![LeafRef {
                leaf_id: 2,
                station_id: "CS-01".into(),
                connector_id: 1
            }]
        );
    }

    #[test]
    fn test_ids_strictly_increasing() {
        let (site, capacity) = site(vec![
            station(
                "CS-01",
                vec![
                    connector(1, ConnectorStatus::Charging),
                    connector(2, ConnectorStatus::Available),
                ],
            ),
            station("CS-02", vec![connector(1, ConnectorStatus::Charging)]),
        ]);
        let build = build_fuse_tree(&site, &capacity, &LimitationSettings::default()).unwrap();

        assert_eq!(build.tree.root_fuse.ids(), vec![0, 1, 2, 3, 4, 5]);
        let leaf_ids: Vec<u32> = build.leaves.iter().map(|leaf| leaf.leaf_id).collect();
        assert_eq!(leaf_ids, vec![2, 3, 5]);
    }

    #[test]
    fn test_station_capacity_is_sum_of_leaves() {
        let mut single_phase = connector(3, ConnectorStatus::Charging);
        single_phase.amperage = Some(16.0);
        single_phase.number_of_connected_phases = Some(1);
        let (site, capacity) = site(vec![station(
            "CS-01",
            vec![
                connector(1, ConnectorStatus::Charging),
                connector(2, ConnectorStatus::Available),
                single_phase,
            ],
        )]);
        let build = build_fuse_tree(&site, &capacity, &LimitationSettings::default()).unwrap();

        for station in &build.tree.root_fuse.children {
            let FuseNode::Fuse(fuse) = station else {
                panic!("Expected a station fuse");
            };
            let mut sum = [0.0; 3];
            for child in &fuse.children {
                for (phase, current) in child.phase_currents().iter().enumerate() {
                    sum[phase] += current;
                }
            }
            assert_eq!(fuse.phase_currents(), sum);
        }
        assert_eq!(leaf(&build, 0, 2).phase_currents(), [16.0, 0.0, 0.0]);
        assert!(!leaf(&build, 0, 2).phase2_connected);
    }

    #[test]
    fn test_shared_charge_point_splits_between_active_connectors() {
        let mut station = station(
            "CS-01",
            vec![
                connector(1, ConnectorStatus::Charging),
                connector(2, ConnectorStatus::Occupied),
                connector(3, ConnectorStatus::Available),
            ],
        );
        let mut shared = charge_point(vec![1, 2, 3]);
        shared.share_power_to_all_connectors = true;
        station.charge_points = vec![shared];
        let (site, capacity) = site(vec![station]);
        let build = build_fuse_tree(&site, &capacity, &LimitationSettings::default()).unwrap();

        assert_eq!(leaf(&build, 0, 0).fuse_phase1, 16.0);
        assert_eq!(leaf(&build, 0, 1).fuse_phase1, 16.0);
        assert_eq!(leaf(&build, 0, 2).fuse_phase1, 16.0);
    }

    #[test]
    fn test_exclusive_charge_point_zeroes_non_primary_connector() {
        let mut station = station(
            "CS-01",
            vec![
                connector(1, ConnectorStatus::Charging),
                connector(2, ConnectorStatus::SuspendedEv),
            ],
        );
        let mut exclusive = charge_point(vec![1, 2]);
        exclusive.cannot_charge_in_parallel = true;
        station.charge_points = vec![exclusive];
        let (site, capacity) = site(vec![station]);
        let build = build_fuse_tree(&site, &capacity, &LimitationSettings::default()).unwrap();

        assert_eq!(leaf(&build, 0, 0).fuse_phase1, 32.0);
        assert_eq!(leaf(&build, 0, 1).phase_currents(), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_station_keeps_phases_of_zero_amp_leaves() {
        let mut empty = connector(1, ConnectorStatus::Charging);
        empty.amperage = Some(0.0);
        let (site, capacity) = site(vec![station("CS-01", vec![empty])]);
        let build = build_fuse_tree(&site, &capacity, &LimitationSettings::default()).unwrap();

        assert_eq!(leaf(&build, 0, 0).phase_currents(), [0.0, 0.0, 0.0]);
        assert_eq!(leaf(&build, 0, 0).phases_connected(), [true, true, true]);
        let FuseNode::Fuse(station) = &build.tree.root_fuse.children[0] else {
            panic!("Expected a station fuse");
        };
        assert_eq!(station.phases_connected(), [true, true, true]);
    }

    #[test]
    fn test_dc_connector_expresses_grid_side_draw() {
        let mut station = station("CS-01", vec![connector(1, ConnectorStatus::Charging)]);
        let mut dc = charge_point(vec![1]);
        dc.current_type = Some(CurrentType::Dc);
        dc.efficiency = Some(80.0);
        station.charge_points = vec![dc];
        let (site, capacity) = site(vec![station]);
        let build = build_fuse_tree(&site, &capacity, &LimitationSettings::default()).unwrap();

        assert_close(leaf(&build, 0, 0).fuse_phase1, 40.0);
    }

    #[test]
    fn test_dc_connector_without_efficiency_uses_default() {
        let mut dc = connector(1, ConnectorStatus::Charging);
        dc.current_type = Some(CurrentType::Dc);
        let (site, capacity) = site(vec![station("CS-01", vec![dc])]);
        let settings = LimitationSettings {
            dc_efficiency_percent: 50.0,
            ..LimitationSettings::default()
        };
        let build = build_fuse_tree(&site, &capacity, &settings).unwrap();

        assert_close(leaf(&build, 0, 0).fuse_phase1, 64.0);
    }

    #[test]
    fn test_incomplete_connector_aborts_build() {
        let mut broken = connector(2, ConnectorStatus::Available);
        broken.amperage = None;
        let (site, capacity) = site(vec![station(
            "CS-01",
            vec![connector(1, ConnectorStatus::Charging), broken],
        )]);
        let result = build_fuse_tree(&site, &capacity, &LimitationSettings::default());

        match result {
            Err(SmartChargingError::IncompleteConnector {
                station_id,
                connector_id,
                missing,
            }) => {
                assert_eq!(station_id, "CS-01");
                assert_eq!(connector_id, 2);
                assert_eq!(missing, "amperage");
            }
            _ => panic!("Expected IncompleteConnector error"),
        }
    }

    #[test]
    fn test_single_phase_site() {
        let (mut site, _) = site(vec![station(
            "CS-01",
            vec![connector(1, ConnectorStatus::Charging)],
        )]);
        site.number_of_phases = Some(1);
        let capacity = crate::validate_site(&site).unwrap();
        let build = build_fuse_tree(&site, &capacity, &LimitationSettings::default()).unwrap();
        let root = &build.tree.root_fuse;

        assert_close(root.phase1_current, 10_000.0 / 230.0);
        assert_eq!(root.phase2_current, 0.0);
        assert!(!root.phase3_connected);
    }

    #[test]
    fn test_serialized_discriminators() {
        let (site, capacity) = site(vec![station(
            "CS-01",
            vec![connector(1, ConnectorStatus::Charging)],
        )]);
        let build = build_fuse_tree(&site, &capacity, &LimitationSettings::default()).unwrap();
        let json = serde_json::to_value(&build.tree).unwrap();

        let root = &json["rootFuse"];
        assert_eq!(root["@type"], "Fuse");
        assert_eq!(root["id"], 0);
        assert!(root.get("phase1Current").is_some());
        assert_eq!(root["children"][0]["@type"], "Fuse");
        let leaf = &root["children"][0]["children"][0];
        assert_eq!(leaf["@type"], "ChargingStation");
        assert_eq!(leaf["fusePhase3"], 32.0);
        assert_eq!(leaf["phase3Connected"], true);
        assert!(leaf.get("children").is_none());
    }
}
