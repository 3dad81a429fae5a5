//! Sensor and inventory data rendered as Thermal / Power entries.

use serde_json::{json, Value};
use std::collections::BTreeSet;

use crate::bus::names::*;
use crate::bus::{InterfaceMap, PropertyBag, PropertyValue};
use crate::error::GatewayError;
use crate::resources::link;

/// Inventory item one or more sensors are associated with.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryItem {
    pub path: String,
    pub name: String,
    pub present: bool,
    pub functional: bool,
    pub power_supply: bool,
    pub manufacturer: String,
    pub model: String,
    pub part_number: String,
    pub serial_number: String,
    pub sensors: BTreeSet<String>,
}

impl InventoryItem {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            name: last_segment(path).unwrap_or_default().to_string(),
            present: true,
            functional: true,
            power_supply: false,
            manufacturer: String::new(),
            model: String::new(),
            part_number: String::new(),
            serial_number: String::new(),
            sensors: BTreeSet::new(),
        }
    }

    /// Take presence, health and asset data from the item's interfaces.
    pub fn store(&mut self, interfaces: &InterfaceMap) {
        let flag = |interface: &str, property: &str| {
            interfaces
                .get(interface)
                .and_then(|bag| bag.get(property))
                .and_then(PropertyValue::as_bool)
        };
        if let Some(present) = flag(ITEM_INTERFACE, "Present") {
            self.present = present;
        }
        if let Some(functional) = flag(OPERATIONAL_STATUS_INTERFACE, "Functional") {
            self.functional = functional;
        }
        if interfaces.contains_key(ITEM_POWER_SUPPLY_INTERFACE) {
            self.power_supply = true;
        }
        if let Some(asset) = interfaces.get(ASSET_INTERFACE) {
            let text = |property: &str| asset.get(property).and_then(PropertyValue::as_str).map(str::to_string);
            for (slot, property) in [
                (&mut self.manufacturer, "Manufacturer"),
                (&mut self.model, "Model"),
                (&mut self.part_number, "PartNumber"),
                (&mut self.serial_number, "SerialNumber"),
            ] {
                if let Some(value) = text(property) {
                    *slot = value;
                }
            }
        }
    }
}

/// Record `sensor` under the item at `item_path`, adding the item if new.
pub fn add_inventory_item(items: &mut Vec<InventoryItem>, item_path: &str, sensor: &str) {
    let index = match items.iter().position(|item| item.path == item_path) {
        Some(index) => index,
        None => {
            items.push(InventoryItem::new(item_path));
            items.len() - 1
        }
    };
    items[index].sensors.insert(sensor.to_string());
}

pub fn item_for_sensor<'a>(items: &'a [InventoryItem], sensor: &str) -> Option<&'a InventoryItem> {
    items.iter().find(|item| item.sensors.contains(sensor))
}

pub fn last_segment(path: &str) -> Option<&str> {
    path.rsplit('/').next().filter(|name| !name.is_empty())
}

/// `(type, name)` of `/xyz/openbmc_project/sensors/<type>/<name>`.
pub fn split_sensor_path(path: &str) -> Option<(&str, &str)> {
    let relative = path.strip_prefix(SENSORS_ROOT)?.strip_prefix('/')?;
    let (kind, name) = relative.split_once('/')?;
    if kind.is_empty() || name.is_empty() {
        return None;
    }
    Some((kind, name))
}

/// Array a sensor reading lands in, `None` when it is not shown.
pub fn group_for(kind: &str, name: &str, item: Option<&InventoryItem>) -> Option<&'static str> {
    match kind {
        "temperature" => Some("Temperatures"),
        "fan" | "fan_tach" | "fan_pwm" => Some("Fans"),
        "voltage" => Some("Voltages"),
        "power" if name == "total_power" => Some("PowerControl"),
        "power" if item.is_some_and(|item| item.power_supply) => Some("PowerSupplies"),
        _ => None,
    }
}

pub fn state(item: Option<&InventoryItem>) -> &'static str {
    match item {
        Some(item) if !item.present => "Absent",
        _ => "Enabled",
    }
}

fn alarm(interfaces: &InterfaceMap, interface: &str, properties: [&str; 2]) -> bool {
    let Some(bag) = interfaces.get(interface) else {
        return false;
    };
    properties.iter().any(|property| match bag.get(*property) {
        Some(PropertyValue::Bool(asserted)) => *asserted,
        Some(other) => {
            tracing::error!(property, kind = %other.kind(), "Illegal sensor threshold");
            false
        }
        None => false,
    })
}

/// Most severe health of the entry so far, the threshold alarms and the item.
pub fn health(current: &Value, interfaces: &InterfaceMap, item: Option<&InventoryItem>) -> &'static str {
    let current = current["Status"]["Health"].as_str().unwrap_or_default();
    if current == "Critical"
        || alarm(interfaces, SENSOR_CRITICAL_INTERFACE, ["CriticalAlarmHigh", "CriticalAlarmLow"])
        || item.is_some_and(|item| !item.functional)
    {
        return "Critical";
    }
    if current == "Warning" || alarm(interfaces, SENSOR_WARNING_INTERFACE, ["WarningAlarmHigh", "WarningAlarmLow"]) {
        return "Warning";
    }
    "OK"
}

fn scaled(value: f64, scale: i64) -> f64 {
    let exponent = i32::try_from(scale.unsigned_abs()).unwrap_or(0);
    if scale >= 0 {
        value * 10f64.powi(exponent)
    } else {
        value / 10f64.powi(exponent)
    }
}

/// Write one sensor into `entry`.
///
/// Power readings share entries, so they keep the entry's own `MemberId`
/// and `Name`.
pub fn fill_sensor(entry: &mut Value, name: &str, kind: &str, interfaces: &InterfaceMap, item: Option<&InventoryItem>) {
    let Some(value_bag) = interfaces.get(SENSOR_VALUE_INTERFACE) else {
        tracing::error!(sensor = name, "Sensor has no value interface");
        return;
    };
    let scale = match value_bag.get("Scale") {
        Some(PropertyValue::I64(scale)) => *scale,
        _ => 0,
    };

    if kind != "power" {
        entry["MemberId"] = json!(name);
        entry["Name"] = json!(name.replace('_', " "));
    }
    entry["Status"]["State"] = json!(state(item));
    let health = health(entry, interfaces, item);
    entry["Status"]["Health"] = json!(health);

    let mut force_int = false;
    let unit = match kind {
        "temperature" => {
            entry["@odata.type"] = json!("#Thermal.v1_3_0.Temperature");
            "ReadingCelsius"
        }
        "fan" | "fan_tach" | "fan_pwm" => {
            entry["ReadingUnits"] = json!(if kind == "fan_pwm" { "Percent" } else { "RPM" });
            entry["@odata.type"] = json!("#Thermal.v1_3_0.Fan");
            force_int = true;
            "Reading"
        }
        "voltage" => {
            entry["@odata.type"] = json!("#Power.v1_0_0.Voltage");
            "ReadingVolts"
        }
        "power" if name == "total_power" => {
            entry["@odata.type"] = json!("#Power.v1_0_0.PowerControl");
            entry["MemberId"] = json!("0");
            entry["Name"] = json!("Chassis Power Control");
            "PowerConsumedWatts"
        }
        "power" if name.to_ascii_lowercase().contains("input") => "PowerInputWatts",
        "power" => "PowerOutputWatts",
        _ => {
            tracing::error!(sensor = name, kind, "No Redfish mapping for sensor type");
            return;
        }
    };

    let mut properties = vec![(SENSOR_VALUE_INTERFACE, "Value", unit)];
    if kind != "power" {
        properties.extend([
            (SENSOR_WARNING_INTERFACE, "WarningHigh", "UpperThresholdNonCritical"),
            (SENSOR_WARNING_INTERFACE, "WarningLow", "LowerThresholdNonCritical"),
            (SENSOR_CRITICAL_INTERFACE, "CriticalHigh", "UpperThresholdCritical"),
            (SENSOR_CRITICAL_INTERFACE, "CriticalLow", "LowerThresholdCritical"),
        ]);
        let (min, max) = if kind == "temperature" {
            ("MinReadingRangeTemp", "MaxReadingRangeTemp")
        } else {
            ("MinReadingRange", "MaxReadingRange")
        };
        properties.extend([
            (SENSOR_VALUE_INTERFACE, "MinValue", min),
            (SENSOR_VALUE_INTERFACE, "MaxValue", max),
        ]);
    }

    for (interface, property, key) in properties {
        let Some(value) = interfaces.get(interface).and_then(|bag| bag.get(property)) else {
            continue;
        };
        let Some(number) = value.as_f64() else {
            tracing::error!(sensor = name, property, kind = %value.kind(), "Sensor property is not numeric");
            continue;
        };
        let number = scaled(number, scale);
        entry[key] = if force_int { json!(number as i64) } else { json!(number) };
    }
}

/// New `PowerSupplies` entry for `item`.
pub fn power_supply(item: &InventoryItem, chassis_id: &str) -> Value {
    json!({
        "@odata.id": format!("/redfish/v1/Chassis/{}/Power#/PowerSupplies/", chassis_id),
        "MemberId": item.name,
        "Name": item.name.replace('_', " "),
        "Manufacturer": item.manufacturer,
        "Model": item.model,
        "PartNumber": item.part_number,
        "SerialNumber": item.serial_number,
        "Status": {
            "State": state(Some(item)),
            "Health": if item.functional { "OK" } else { "Critical" },
        },
    })
}

/// Sort each group by `Name` and number the entries' `@odata.id`.
pub fn sort_groups(json: &mut Value, groups: [&str; 2]) {
    for group in groups {
        let Some(entries) = json.get_mut(group).and_then(Value::as_array_mut) else {
            continue;
        };
        entries.sort_by(|a, b| {
            let name = |v: &Value| v["Name"].as_str().unwrap_or_default().to_string();
            name(a).cmp(&name(b))
        });
        let mut count = 0;
        for entry in entries.iter_mut() {
            if let Some(Value::String(id)) = entry.get_mut("@odata.id") {
                id.push_str(&count.to_string());
                count += 1;
            }
        }
    }
}

fn redundancy_property(property: &str, value: Option<&PropertyValue>) -> GatewayError {
    let kind = value.map_or_else(|| "nothing".to_string(), |value| value.kind().to_string());
    GatewayError::InternalError(format!("fan redundancy {} has type {}", property, kind))
}

/// `Redundancy` entry for the fan redundancy object at `path`.
///
/// Fans named in the object's collection must already be in `json`.
pub fn redundancy(json: &Value, chassis_id: &str, path: &str, bag: &PropertyBag) -> Result<Value, GatewayError> {
    let allowed = match bag.get("AllowedFailures") {
        Some(PropertyValue::Byte(allowed)) => *allowed,
        other => return Err(redundancy_property("AllowedFailures", other)),
    };
    let collection = match bag.get("Collection") {
        Some(PropertyValue::StrList(collection)) => collection,
        other => return Err(redundancy_property("Collection", other)),
    };
    let status = match bag.get("Status") {
        Some(PropertyValue::Str(status)) => status,
        other => return Err(redundancy_property("Status", other)),
    };
    let name = last_segment(path)
        .ok_or_else(|| GatewayError::InternalError(format!("bad redundancy path {}", path)))?;

    let fans = json["Fans"].as_array().map(Vec::as_slice).unwrap_or_default();
    let mut members = Vec::with_capacity(collection.len());
    for fan in collection {
        let member = last_segment(fan).unwrap_or_default();
        let entry = fans
            .iter()
            .find(|entry| entry["MemberId"] == member)
            .ok_or_else(|| GatewayError::InternalError(format!("redundant fan {} not listed", member)))?;
        members.push(link(entry["@odata.id"].as_str().unwrap_or_default()));
    }

    let health = if status.ends_with("Full") {
        "OK"
    } else if status.ends_with("Degraded") {
        "Warning"
    } else {
        "Critical"
    };
    let index = json["Redundancy"].as_array().map_or(0, Vec::len);
    Ok(json!({
        "@odata.id": format!("/redfish/v1/Chassis/{}/Thermal#/Redundancy/{}", chassis_id, index),
        "@odata.type": "#Redundancy.v1_3_2.Redundancy",
        "MemberId": name,
        "Name": name.replace('_', " "),
        "Mode": "N+m",
        "MinNumNeeded": collection.len().saturating_sub(usize::from(allowed)),
        "RedundancySet": members,
        "Status": { "Health": health, "State": "Enabled" },
    }))
}
