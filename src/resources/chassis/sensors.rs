//! Sensor discovery for one chassis node.
//!
//! # Data Flow
//! ```text
//! chassis path (GetSubTreePaths) → all_sensors association → filter by node types
//!     → serving connections (GetSubTree below the sensors root)
//!     → ObjectManager path per connection
//!     → inventory items via <sensor>/inventory associations, then their data
//!     → GetManagedObjects per connection → Thermal / Power entries
//!     → sort, number, and for Thermal the fan redundancy
//! ```
//!
//! # Design Decisions
//! - Each stage hands its result to the next as an owned value; nothing is
//!   shared between requests
//! - Inventory data is read one connection at a time, sensor data in
//!   parallel with a countdown for the final pass
//! - A failed stage records the error and ends the chain; partial data
//!   already in the document is kept

use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::body::{first, ObjectReader};
use crate::bus::message::{MAPPER_SERVICE, OBJECT_MANAGER_INTERFACE};
use crate::bus::names::*;
use crate::bus::{BusCall, BusError, BusReply, ManagedObjects, PropertyValue};
use crate::error::GatewayError;
use crate::resources::chassis::reading::{self, InventoryItem};
use crate::resources::chassis::{chassis_not_found, CHASSIS_INTERFACES};
use crate::resources::{array_slot, backend_error, write_done};
use crate::response::{messages, AsyncResp, Response};

const THERMAL_TYPES: &[&str] = &[
    "/xyz/openbmc_project/sensors/fan_tach",
    "/xyz/openbmc_project/sensors/temperature",
    "/xyz/openbmc_project/sensors/fan_pwm",
];

const POWER_TYPES: &[&str] = &[
    "/xyz/openbmc_project/sensors/voltage",
    "/xyz/openbmc_project/sensors/power",
];

const INVENTORY_ITEM_INTERFACES: &[&str] = &[
    ITEM_INTERFACE,
    ITEM_POWER_SUPPLY_INTERFACE,
    ASSET_INTERFACE,
    OPERATIONAL_STATUS_INTERFACE,
];

/// Connection name → path of its ObjectManager.
type ObjectManagerPaths = BTreeMap<String, String>;

/// Which sensor view of a chassis is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorNode {
    Thermal,
    Power,
}

impl SensorNode {
    pub fn name(self) -> &'static str {
        match self {
            SensorNode::Thermal => "Thermal",
            SensorNode::Power => "Power",
        }
    }

    /// Sensor type prefixes shown on this node.
    fn types(self) -> &'static [&'static str] {
        match self {
            SensorNode::Thermal => THERMAL_TYPES,
            SensorNode::Power => POWER_TYPES,
        }
    }

    fn default_collection(self) -> &'static str {
        match self {
            SensorNode::Thermal => "Temperatures",
            SensorNode::Power => "Voltages",
        }
    }

    fn sort_groups(self) -> [&'static str; 2] {
        match self {
            SensorNode::Thermal => ["Temperatures", "Fans"],
            SensorNode::Power => ["Voltages", "PowerSupplies"],
        }
    }

    /// `(collection, reading property)` pairs a PATCH may override.
    pub fn override_collections(self) -> &'static [(&'static str, &'static str)] {
        match self {
            SensorNode::Thermal => &[("Temperatures", "ReadingCelsius"), ("Fans", "Reading")],
            SensorNode::Power => &[("Voltages", "ReadingVolts")],
        }
    }

    fn uri(self, chassis_id: &str) -> String {
        format!("/redfish/v1/Chassis/{}/{}", chassis_id, self.name())
    }

    /// Document before any sensor is read.
    pub fn header(self, chassis_id: &str) -> Value {
        let mut json = json!({
            "@odata.id": self.uri(chassis_id),
            "Id": self.name(),
            "Name": self.name(),
            "Redundancy": [],
        });
        match self {
            SensorNode::Thermal => {
                json["@odata.type"] = json!("#Thermal.v1_4_0.Thermal");
                json["Temperatures"] = json!([]);
                json["Fans"] = json!([]);
            }
            SensorNode::Power => {
                json["@odata.type"] = json!("#Power.v1_5_2.Power");
                json["PowerControl"] = json!([]);
                json["Voltages"] = json!([]);
                json["PowerSupplies"] = json!([]);
            }
        }
        json
    }

    /// Error for a PATCH that names none of the overridable collections.
    fn nothing_to_override(self) -> GatewayError {
        match self {
            SensorNode::Thermal => GatewayError::ResourceNotFound {
                kind: self.name().into(),
                id: "Temperatures / Fans".into(),
            },
            SensorNode::Power => GatewayError::PropertyMissing("Voltages".into()),
        }
    }
}

/// One requested reading override.
#[derive(Debug, Clone, PartialEq)]
pub struct Override {
    pub value: f64,
    pub collection: &'static str,
}

/// Node and chassis one GET renders.
#[derive(Debug)]
struct View {
    node: SensorNode,
    chassis_id: String,
}

/// Sensors served by each connection.
#[derive(Debug, Default)]
struct Connections {
    services: BTreeSet<String>,
    /// `(sensor path, service)` pairs.
    objects: Vec<(String, String)>,
}

/// Sensor paths of `chassis_id` shown on `node`.
fn chassis_sensors<F>(resp: &Arc<AsyncResp>, node: SensorNode, chassis_id: String, next: F)
where
    F: FnOnce(BTreeSet<String>, &mut Response, &Arc<AsyncResp>) + Send + 'static,
{
    resp.issue(
        BusCall::get_subtree_paths(INVENTORY_ROOT, 0, CHASSIS_INTERFACES),
        move |result, res, resp| {
            let paths = match result.and_then(BusReply::into_paths) {
                Ok(paths) => paths,
                Err(e) => return backend_error(res, e),
            };
            let Some(path) = paths
                .into_iter()
                .find(|path| reading::last_segment(path) == Some(chassis_id.as_str()))
            else {
                messages::record(res, &chassis_not_found(&chassis_id));
                return;
            };

            resp.issue(
                BusCall::get_property(
                    MAPPER_SERVICE,
                    format!("{}/all_sensors", path),
                    ASSOCIATION_INTERFACE,
                    "endpoints",
                ),
                move |result, res, resp| {
                    let endpoints = match result.and_then(BusReply::into_value) {
                        Ok(PropertyValue::StrList(endpoints)) => endpoints,
                        Ok(other) => {
                            tracing::error!(kind = %other.kind(), "Sensor association has unexpected type");
                            messages::record(
                                res,
                                &GatewayError::ResourceNotFound {
                                    kind: node.name().into(),
                                    id: node.default_collection().into(),
                                },
                            );
                            return;
                        }
                        // No association yet: a chassis without sensors.
                        Err(BusError::UnknownObject(_)) => Vec::new(),
                        Err(e) => return backend_error(res, e),
                    };
                    let sensors: BTreeSet<String> = endpoints
                        .into_iter()
                        .filter(|sensor| {
                            node.types().iter().any(|kind| {
                                sensor
                                    .strip_prefix(*kind)
                                    .is_some_and(|rest| rest.starts_with('/'))
                            })
                        })
                        .collect();
                    tracing::debug!(chassis = %chassis_id, node = node.name(), sensors = sensors.len(), "Chassis sensors");
                    next(sensors, res, resp);
                },
            );
        },
    );
}

/// Connections serving any of `sensors`.
fn objects_with_connection<F>(resp: &Arc<AsyncResp>, sensors: Arc<BTreeSet<String>>, next: F)
where
    F: FnOnce(Connections, &mut Response, &Arc<AsyncResp>) + Send + 'static,
{
    resp.issue(
        BusCall::get_subtree(SENSORS_ROOT, 2, &[SENSOR_VALUE_INTERFACE]),
        move |result, res, resp| {
            let tree = match result.and_then(BusReply::into_subtree) {
                Ok(tree) => tree,
                Err(e) => return backend_error(res, e),
            };
            let mut connections = Connections::default();
            for (path, services) in tree {
                if !sensors.contains(&path) {
                    continue;
                }
                for service in services.into_keys() {
                    connections.services.insert(service.clone());
                    connections.objects.push((path.clone(), service));
                }
            }
            next(connections, res, resp);
        },
    );
}

fn object_manager_paths<F>(resp: &Arc<AsyncResp>, next: F)
where
    F: FnOnce(Arc<ObjectManagerPaths>, &mut Response, &Arc<AsyncResp>) + Send + 'static,
{
    resp.issue(
        BusCall::get_subtree("/", 0, &[OBJECT_MANAGER_INTERFACE]),
        move |result, res, resp| {
            let tree = match result.and_then(BusReply::into_subtree) {
                Ok(tree) => tree,
                Err(e) => return backend_error(res, e),
            };
            let mut paths = ObjectManagerPaths::new();
            for (path, services) in tree {
                for service in services.into_keys() {
                    paths.entry(service).or_insert_with(|| path.clone());
                }
            }
            next(Arc::new(paths), res, resp);
        },
    );
}

fn object_manager_path(paths: &ObjectManagerPaths, service: &str) -> String {
    paths.get(service).cloned().unwrap_or_else(|| "/".to_string())
}

/// Inventory items associated with `sensors`, with their data filled in.
fn inventory_items<F>(
    resp: &Arc<AsyncResp>,
    sensors: Arc<BTreeSet<String>>,
    om_paths: Arc<ObjectManagerPaths>,
    next: F,
) where
    F: FnOnce(Vec<InventoryItem>, &mut Response, &Arc<AsyncResp>) + Send + 'static,
{
    resp.issue(
        BusCall::get_managed_objects(MAPPER_SERVICE, "/"),
        move |result, res, resp| {
            let associations = match result.and_then(BusReply::into_managed_objects) {
                Ok(objects) => objects,
                Err(e) => return backend_error(res, e),
            };
            let mut items = Vec::new();
            for sensor in sensors.iter() {
                let endpoints = associations
                    .get(&format!("{}/inventory", sensor))
                    .and_then(|interfaces| interfaces.get(ASSOCIATION_INTERFACE))
                    .and_then(|bag| bag.get("endpoints"));
                if let Some(PropertyValue::StrList(endpoints)) = endpoints {
                    if let Some(item) = endpoints.first() {
                        reading::add_inventory_item(&mut items, item, sensor);
                    }
                }
            }
            if items.is_empty() {
                return next(items, res, resp);
            }

            resp.issue(
                BusCall::get_subtree(INVENTORY_ROOT, 0, INVENTORY_ITEM_INTERFACES),
                move |result, res, resp| {
                    let tree = match result.and_then(BusReply::into_subtree) {
                        Ok(tree) => tree,
                        Err(e) => return backend_error(res, e),
                    };
                    let connections: BTreeSet<String> = items
                        .iter()
                        .filter_map(|item| tree.get(&item.path))
                        .flat_map(|services| services.keys().cloned())
                        .collect();
                    inventory_data(res, resp, items, connections.into_iter().collect(), om_paths, next);
                },
            );
        },
    );
}

/// Read item data from one connection after the other.
fn inventory_data<F>(
    res: &mut Response,
    resp: &Arc<AsyncResp>,
    mut items: Vec<InventoryItem>,
    mut connections: VecDeque<String>,
    om_paths: Arc<ObjectManagerPaths>,
    next: F,
) where
    F: FnOnce(Vec<InventoryItem>, &mut Response, &Arc<AsyncResp>) + Send + 'static,
{
    let Some(service) = connections.pop_front() else {
        return next(items, res, resp);
    };
    let root = object_manager_path(&om_paths, &service);
    resp.issue(
        BusCall::get_managed_objects(service, root),
        move |result, res, resp| {
            let objects = match result.and_then(BusReply::into_managed_objects) {
                Ok(objects) => objects,
                Err(e) => return backend_error(res, e),
            };
            for item in items.iter_mut() {
                if let Some(interfaces) = objects.get(&item.path) {
                    item.store(interfaces);
                }
            }
            inventory_data(res, resp, items, connections, om_paths, next);
        },
    );
}

/// Entry of `group` matching `matches`, created by `create` when absent.
fn group_entry<'a>(
    json: &'a mut Value,
    group: &str,
    matches: impl Fn(&Value) -> bool,
    create: impl FnOnce() -> Value,
) -> &'a mut Value {
    let found = json[group]
        .as_array()
        .and_then(|entries| entries.iter().position(|entry| matches(entry)));
    let index = match found {
        Some(index) => index,
        None => {
            let index = json[group].as_array().map_or(0, Vec::len);
            *array_slot(json, group, index) = create();
            index
        }
    };
    array_slot(json, group, index)
}

/// Render every listed sensor among `objects` into the document.
fn fill_sensors(
    json: &mut Value,
    view: &View,
    sensors: &BTreeSet<String>,
    items: &[InventoryItem],
    objects: &ManagedObjects,
) {
    for (path, interfaces) in objects {
        if !sensors.contains(path) {
            continue;
        }
        let Some((kind, name)) = reading::split_sensor_path(path) else {
            tracing::error!(sensor = %path, "Malformed sensor path");
            continue;
        };
        let item = reading::item_for_sensor(items, path);
        let Some(group) = reading::group_for(kind, name, item) else {
            tracing::debug!(sensor = %path, "Sensor not shown");
            continue;
        };
        let (node, chassis_id) = (view.node, view.chassis_id.as_str());
        let entry = match (group, item) {
            ("PowerControl", _) => group_entry(
                json,
                group,
                |_| true,
                || json!({ "@odata.id": format!("{}#/PowerControl/0", node.uri(chassis_id)) }),
            ),
            ("PowerSupplies", Some(item)) => group_entry(
                json,
                group,
                |entry| entry["MemberId"] == item.name.as_str(),
                || reading::power_supply(item, chassis_id),
            ),
            ("PowerSupplies", None) => continue,
            _ => group_entry(
                json,
                group,
                |_| false,
                || json!({ "@odata.id": format!("{}#/{}/", node.uri(chassis_id), group) }),
            ),
        };
        reading::fill_sensor(entry, name, kind, interfaces, item);
    }
}

/// Read sensor values from every connection, then finish the document.
fn sensor_data(
    res: &mut Response,
    resp: &Arc<AsyncResp>,
    view: Arc<View>,
    sensors: Arc<BTreeSet<String>>,
    connections: Connections,
    om_paths: Arc<ObjectManagerPaths>,
    items: Vec<InventoryItem>,
) {
    if connections.services.is_empty() {
        return finish(res, resp, &view);
    }
    let items = Arc::new(items);
    let remaining = Arc::new(AtomicUsize::new(connections.services.len()));
    for service in connections.services {
        let root = object_manager_path(&om_paths, &service);
        let (view, sensors, items, remaining) = (
            Arc::clone(&view),
            Arc::clone(&sensors),
            Arc::clone(&items),
            Arc::clone(&remaining),
        );
        resp.issue(
            BusCall::get_managed_objects(service, root),
            move |result, res, resp| {
                match result.and_then(BusReply::into_managed_objects) {
                    Ok(objects) => fill_sensors(&mut res.json, &view, &sensors, &items, &objects),
                    Err(e) => backend_error(res, e),
                }
                if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                    finish(res, resp, &view);
                }
            },
        );
    }
}

fn finish(res: &mut Response, resp: &Arc<AsyncResp>, view: &View) {
    reading::sort_groups(&mut res.json, view.node.sort_groups());
    if view.node == SensorNode::Thermal {
        fan_redundancy(resp, view.chassis_id.clone());
    }
}

/// Fan redundancy objects associated with the chassis.
fn fan_redundancy(resp: &Arc<AsyncResp>, chassis_id: String) {
    resp.issue(
        BusCall::get_subtree(CONTROL_ROOT, 2, &[FAN_REDUNDANCY_INTERFACE]),
        move |result, _, resp| {
            let tree = match result.and_then(BusReply::into_subtree) {
                Ok(tree) => tree,
                Err(e) => {
                    tracing::debug!(error = %e, "No fan redundancy");
                    return;
                }
            };
            for (path, services) in tree {
                let Some(service) = services.into_keys().next() else {
                    continue;
                };
                let chassis_id = chassis_id.clone();
                resp.issue(
                    BusCall::get_property(
                        MAPPER_SERVICE,
                        format!("{}/chassis", path),
                        ASSOCIATION_INTERFACE,
                        "endpoints",
                    ),
                    move |result, _, resp| {
                        let endpoints = match result.and_then(BusReply::into_value) {
                            Ok(PropertyValue::StrList(endpoints)) => endpoints,
                            _ => {
                                tracing::debug!(redundancy = %path, "Redundancy without chassis");
                                return;
                            }
                        };
                        if !endpoints.iter().any(|endpoint| endpoint.contains(chassis_id.as_str())) {
                            return;
                        }
                        resp.issue(
                            BusCall::get_all(service.as_str(), path.as_str(), FAN_REDUNDANCY_INTERFACE),
                            move |result, res, _| {
                                let bag = match result.and_then(BusReply::into_properties) {
                                    Ok(bag) => bag,
                                    Err(e) => return backend_error(res, e),
                                };
                                match reading::redundancy(&res.json, &chassis_id, &path, &bag) {
                                    Ok(entry) => res.push("Redundancy", entry),
                                    Err(err) => {
                                        tracing::error!(redundancy = %path, error = %err, "Invalid fan redundancy");
                                        messages::record(res, &err);
                                    }
                                }
                            },
                        );
                    },
                );
            }
        },
    );
}

/// Fill the node's document for `chassis_id`.
pub(super) fn render(resp: &Arc<AsyncResp>, node: SensorNode, chassis_id: String) {
    let view = Arc::new(View {
        node,
        chassis_id: chassis_id.clone(),
    });
    chassis_sensors(resp, node, chassis_id, move |sensors, _, resp| {
        let sensors = Arc::new(sensors);
        objects_with_connection(resp, Arc::clone(&sensors), move |connections, _, resp| {
            object_manager_paths(resp, move |om_paths, _, resp| {
                let all = Arc::clone(&sensors);
                inventory_items(resp, all, Arc::clone(&om_paths), move |items, res, resp| {
                    sensor_data(res, resp, view, sensors, connections, om_paths, items);
                });
            });
        });
    });
}

/// Overrides requested by a PATCH body, keyed by `MemberId`.
///
/// `collections` holds each overridable collection with its reading
/// property and the body's value for it.
pub(super) fn parse_overrides(
    node: SensorNode,
    collections: &[(&'static str, &'static str, Option<&Value>)],
) -> Result<BTreeMap<String, Override>, GatewayError> {
    if collections.iter().all(|(_, _, items)| items.is_none()) {
        return Err(node.nothing_to_override());
    }
    let mut overrides = BTreeMap::new();
    for &(collection, reading, items) in collections {
        let Some(items) = items else {
            continue;
        };
        let Some(items) = items.as_array() else {
            return Err(GatewayError::PropertyValueTypeError {
                value: items.to_string(),
                path: collection.to_string(),
            });
        };
        for (index, item) in items.iter().enumerate() {
            let path = format!("{}/{}", collection, index);
            let mut reader = ObjectReader::nested(item, &path)?;
            let member = reader.string("MemberId");
            let value = reader.f64(reading);
            reader.finish().map_err(first)?;
            let member = member.ok_or_else(|| GatewayError::PropertyMissing(format!("{}/MemberId", path)))?;
            let value = value.ok_or_else(|| GatewayError::PropertyMissing(format!("{}/{}", path, reading)))?;
            overrides.insert(member, Override { value, collection });
        }
    }
    Ok(overrides)
}

/// Write each override to the sensor whose name matches its `MemberId`.
pub(super) fn apply_overrides(
    resp: &Arc<AsyncResp>,
    node: SensorNode,
    chassis_id: String,
    overrides: BTreeMap<String, Override>,
) {
    chassis_sensors(resp, node, chassis_id, move |sensors, res, resp| {
        let mut targets = BTreeSet::new();
        for (member, requested) in &overrides {
            let Some(sensor) = sensors
                .iter()
                .find(|sensor| reading::last_segment(sensor) == Some(member.as_str()))
            else {
                messages::record(
                    res,
                    &GatewayError::ResourceNotFound {
                        kind: requested.collection.into(),
                        id: member.clone(),
                    },
                );
                return;
            };
            targets.insert(sensor.clone());
        }

        objects_with_connection(resp, Arc::new(targets), move |connections, res, resp| {
            if connections.objects.len() != overrides.len() {
                messages::record(
                    res,
                    &GatewayError::ResourceNotFound {
                        kind: node.default_collection().into(),
                        id: "Count".into(),
                    },
                );
                return;
            }
            for (path, service) in connections.objects {
                let Some(requested) = reading::last_segment(&path).and_then(|name| overrides.get(name)) else {
                    continue;
                };
                tracing::info!(sensor = %path, value = requested.value, "Overriding sensor reading");
                resp.issue(
                    BusCall::set_property(
                        service,
                        path.as_str(),
                        SENSOR_VALUE_INTERFACE,
                        "Value",
                        PropertyValue::Double(requested.value),
                    ),
                    write_done("Sensor override"),
                );
            }
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_seeds_node_groups() {
        let thermal = SensorNode::Thermal.header("chassis");
        assert_eq!(thermal["@odata.id"], "/redfish/v1/Chassis/chassis/Thermal");
        assert_eq!(thermal["Temperatures"], json!([]));
        assert!(thermal.get("Voltages").is_none());
        let power = SensorNode::Power.header("chassis");
        assert_eq!(power["@odata.type"], "#Power.v1_5_2.Power");
        assert_eq!(power["PowerSupplies"], json!([]));
    }

    #[test]
    fn test_parse_overrides() {
        let temperatures = json!([{"MemberId": "inlet_temp", "ReadingCelsius": 30}]);
        let fans = json!([{"MemberId": "fan0", "Reading": 4000.5}]);
        let overrides = parse_overrides(
            SensorNode::Thermal,
            &[
                ("Temperatures", "ReadingCelsius", Some(&temperatures)),
                ("Fans", "Reading", Some(&fans)),
            ],
        )
        .unwrap();
        assert_eq!(
            overrides["inlet_temp"],
            Override { value: 30.0, collection: "Temperatures" }
        );
        assert_eq!(overrides["fan0"].value, 4000.5);
    }

    #[test]
    fn test_parse_overrides_errors() {
        assert!(matches!(
            parse_overrides(SensorNode::Thermal, &[("Temperatures", "ReadingCelsius", None), ("Fans", "Reading", None)]),
            Err(GatewayError::ResourceNotFound { .. })
        ));
        assert_eq!(
            parse_overrides(SensorNode::Power, &[("Voltages", "ReadingVolts", None)]),
            Err(GatewayError::PropertyMissing("Voltages".into()))
        );

        let not_array = json!({"MemberId": "p12v"});
        assert!(matches!(
            parse_overrides(SensorNode::Power, &[("Voltages", "ReadingVolts", Some(&not_array))]),
            Err(GatewayError::PropertyValueTypeError { path, .. }) if path == "Voltages"
        ));

        let no_reading = json!([{"MemberId": "p12v"}]);
        assert_eq!(
            parse_overrides(SensorNode::Power, &[("Voltages", "ReadingVolts", Some(&no_reading))]),
            Err(GatewayError::PropertyMissing("Voltages/0/ReadingVolts".into()))
        );

        let extra = json!([{"MemberId": "p12v", "ReadingVolts": 12, "Units": "V"}]);
        assert_eq!(
            parse_overrides(SensorNode::Power, &[("Voltages", "ReadingVolts", Some(&extra))]),
            Err(GatewayError::PropertyUnknown("Voltages/0/Units".into()))
        );
    }

    #[test]
    fn test_group_entry_reuses_matching_entry() {
        let mut json = json!({"PowerSupplies": []});
        group_entry(&mut json, "PowerSupplies", |e| e["MemberId"] == "ps0", || json!({"MemberId": "ps0"}))["A"] = json!(1);
        group_entry(&mut json, "PowerSupplies", |e| e["MemberId"] == "ps0", || json!({"MemberId": "ps0"}))["B"] = json!(2);
        group_entry(&mut json, "PowerSupplies", |e| e["MemberId"] == "ps1", || json!({"MemberId": "ps1"}));
        assert_eq!(
            json["PowerSupplies"],
            json!([{"MemberId": "ps0", "A": 1, "B": 2}, {"MemberId": "ps1"}])
        );
    }
}
