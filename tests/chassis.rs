use axum::http::StatusCode;
use serde_json::json;

use bmc_gateway::bus::message::MAPPER_SERVICE;
use bmc_gateway::bus::names::*;
use bmc_gateway::bus::{MemoryBus, PropertyBag, PropertyValue};
use bmc_gateway::security::Role;

mod common;

const CHASSIS: &str = "/redfish/v1/Chassis/chassis";
const THERMAL: &str = "/redfish/v1/Chassis/chassis/Thermal";
const POWER: &str = "/redfish/v1/Chassis/chassis/Power";

const TEMP_SENSOR_SERVICE: &str = "xyz.openbmc_project.HwmonTempSensor";
const ADC_SENSOR_SERVICE: &str = "xyz.openbmc_project.ADCSensor";
const INLET_TEMP: &str = "/xyz/openbmc_project/sensors/temperature/inlet_temp";
const POWER_SUPPLY: &str = "/xyz/openbmc_project/inventory/system/chassis/powersupply0";
const CPU0: &str = "/xyz/openbmc_project/inventory/system/chassis/motherboard/cpu0";

fn bag(entries: &[(&str, PropertyValue)]) -> PropertyBag {
    entries
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

fn sensor_value(bus: &MemoryBus, service: &str, path: &str) -> PropertyValue {
    bus.inspect(|store| store.properties(service, path, SENSOR_VALUE_INTERFACE).unwrap()["Value"].clone())
}

#[tokio::test]
async fn test_collection_lists_chassis() {
    let h = common::harness();
    let res = h.get("/redfish/v1/Chassis").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json["Members"], json!([{"@odata.id": CHASSIS}]));
    assert_eq!(res.json["Members@odata.count"], 1);
}

#[tokio::test]
async fn test_get_chassis() {
    let h = common::harness();
    let res = h.get(CHASSIS).await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.json);
    assert_eq!(res.json["Id"], "chassis");
    assert_eq!(res.json["Manufacturer"], "Example Systems");
    assert_eq!(res.json["Model"], "C100");
    assert_eq!(res.json["SerialNumber"], "CH0001");
    assert_eq!(res.json["Thermal"], json!({"@odata.id": THERMAL}));
    assert_eq!(res.json["Power"], json!({"@odata.id": POWER}));
}

#[tokio::test]
async fn test_unknown_chassis() {
    let h = common::harness();
    let res = h.get("/redfish/v1/Chassis/rack9").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(common::message_ids(&res), ["ResourceNotFound"]);

    let res = h.get("/redfish/v1/Chassis/rack9/Thermal").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.json["Temperatures"], json!([]));
}

#[tokio::test]
async fn test_thermal_readings() {
    let h = common::harness();
    let res = h.get(THERMAL).await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.json);
    assert_eq!(res.json["@odata.type"], "#Thermal.v1_4_0.Thermal");

    let temperatures = res.json["Temperatures"].as_array().unwrap();
    let names: Vec<_> = temperatures.iter().map(|t| t["Name"].as_str().unwrap()).collect();
    assert_eq!(names, ["cpu0 temp", "inlet temp"]);
    assert_eq!(temperatures[0]["@odata.id"], format!("{}#/Temperatures/0", THERMAL));
    assert_eq!(temperatures[1]["@odata.id"], format!("{}#/Temperatures/1", THERMAL));

    let inlet = &temperatures[1];
    assert_eq!(inlet["MemberId"], "inlet_temp");
    assert_eq!(inlet["ReadingCelsius"], 23.5);
    assert_eq!(inlet["UpperThresholdNonCritical"], 40.0);
    assert_eq!(inlet["LowerThresholdCritical"], 0.0);
    assert_eq!(inlet["MinReadingRangeTemp"], -40.0);
    assert_eq!(inlet["Status"], json!({"State": "Enabled", "Health": "OK"}));

    let fan = &res.json["Fans"][0];
    assert_eq!(fan["@odata.id"], format!("{}#/Fans/0", THERMAL));
    assert_eq!(fan["Reading"], json!(5200));
    assert_eq!(fan["ReadingUnits"], "RPM");
    assert!(res.json.get("Voltages").is_none());
}

#[tokio::test]
async fn test_fan_redundancy() {
    let h = common::harness();
    let res = h.get(THERMAL).await;
    assert_eq!(
        res.json["Redundancy"],
        json!([{
            "@odata.id": format!("{}#/Redundancy/0", THERMAL),
            "@odata.type": "#Redundancy.v1_3_2.Redundancy",
            "MemberId": "Fan_Redundancy",
            "Name": "Fan Redundancy",
            "Mode": "N+m",
            "MinNumNeeded": 1,
            "RedundancySet": [{"@odata.id": format!("{}#/Fans/0", THERMAL)}],
            "Status": {"Health": "OK", "State": "Enabled"},
        }])
    );
}

#[tokio::test]
async fn test_threshold_alarm_raises_health() {
    let h = common::harness();
    h.bus.modify(|store| {
        store.insert(
            TEMP_SENSOR_SERVICE,
            INLET_TEMP,
            SENSOR_WARNING_INTERFACE,
            bag(&[("WarningAlarmHigh", PropertyValue::Bool(true))]),
        );
    });
    let res = h.get(THERMAL).await;
    assert_eq!(res.json["Temperatures"][1]["Status"]["Health"], "Warning");

    h.bus.modify(|store| {
        store.insert(
            TEMP_SENSOR_SERVICE,
            INLET_TEMP,
            SENSOR_CRITICAL_INTERFACE,
            bag(&[("CriticalAlarmLow", PropertyValue::Bool(true))]),
        );
    });
    let res = h.get(THERMAL).await;
    assert_eq!(res.json["Temperatures"][1]["Status"]["Health"], "Critical");
}

#[tokio::test]
async fn test_inventory_item_state() {
    let h = common::harness();
    h.bus.modify(|store| {
        store.insert(
            INVENTORY_SERVICE,
            CPU0,
            ITEM_INTERFACE,
            bag(&[("Present", PropertyValue::Bool(false))]),
        );
    });
    let res = h.get(THERMAL).await;
    let cpu_temp = &res.json["Temperatures"][0];
    assert_eq!(cpu_temp["MemberId"], "cpu0_temp");
    assert_eq!(cpu_temp["Status"]["State"], "Absent");
    assert_eq!(res.json["Temperatures"][1]["Status"]["State"], "Enabled");
}

#[tokio::test]
async fn test_power_readings() {
    let h = common::harness();
    let res = h.get(POWER).await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.json);
    assert_eq!(res.json["@odata.type"], "#Power.v1_5_2.Power");

    let voltage = &res.json["Voltages"][0];
    assert_eq!(voltage["@odata.id"], format!("{}#/Voltages/0", POWER));
    assert_eq!(voltage["Name"], "p12v");
    assert_eq!(voltage["ReadingVolts"], 12.1);
    assert_eq!(voltage["UpperThresholdCritical"], 13.2);
    assert_eq!(voltage["@odata.type"], "#Power.v1_0_0.Voltage");

    let control = res.json["PowerControl"].as_array().unwrap();
    assert_eq!(control.len(), 1);
    assert_eq!(control[0]["@odata.id"], format!("{}#/PowerControl/0", POWER));
    assert_eq!(control[0]["MemberId"], "0");
    assert_eq!(control[0]["Name"], "Chassis Power Control");
    assert_eq!(control[0]["PowerConsumedWatts"], 310.0);

    let supplies = res.json["PowerSupplies"].as_array().unwrap();
    assert_eq!(supplies.len(), 1, "both supply sensors share one entry");
    let supply = &supplies[0];
    assert_eq!(supply["@odata.id"], format!("{}#/PowerSupplies/0", POWER));
    assert_eq!(supply["MemberId"], "powersupply0");
    assert_eq!(supply["PowerInputWatts"], 160.0);
    assert_eq!(supply["PowerOutputWatts"], 150.0);
    assert_eq!(supply["Manufacturer"], "Example Power");
    assert_eq!(supply["Model"], "PSU-550");
    assert_eq!(supply["Status"], json!({"State": "Enabled", "Health": "OK"}));
    assert!(res.json.get("Temperatures").is_none());
}

#[tokio::test]
async fn test_failed_power_supply_is_critical() {
    let h = common::harness();
    h.bus.modify(|store| {
        store.insert(
            INVENTORY_SERVICE,
            POWER_SUPPLY,
            OPERATIONAL_STATUS_INTERFACE,
            bag(&[("Functional", PropertyValue::Bool(false))]),
        );
    });
    let res = h.get(POWER).await;
    assert_eq!(res.json["PowerSupplies"][0]["Status"]["Health"], "Critical");
    assert_eq!(res.json["Voltages"][0]["Status"]["Health"], "OK");
}

#[tokio::test]
async fn test_chassis_without_sensor_association() {
    let h = common::harness();
    h.bus.modify(|store| {
        store
            .remove(MAPPER_SERVICE, &format!("{}/all_sensors", CHASSIS_INVENTORY_PATH))
            .unwrap();
    });
    let res = h.get(POWER).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json["Voltages"], json!([]));
    assert_eq!(res.json["PowerControl"], json!([]));
}

#[tokio::test]
async fn test_failed_connection_keeps_other_readings() {
    let h = common::harness();
    h.bus.fail_when(|call| call.service == ADC_SENSOR_SERVICE && call.member == "GetManagedObjects");

    let res = h.get(POWER).await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(common::message_ids(&res), ["InternalError"]);
    assert_eq!(res.json["Voltages"], json!([]));
    assert_eq!(res.json["PowerControl"][0]["PowerConsumedWatts"], 310.0);
    assert_eq!(res.json["PowerSupplies"][0]["MemberId"], "powersupply0");
}

#[tokio::test]
async fn test_override_temperature() {
    let h = common::harness();
    let res = h
        .patch(
            THERMAL,
            json!({"Temperatures": [{"MemberId": "inlet_temp", "ReadingCelsius": 30}]}),
        )
        .await;
    assert_eq!(res.status, StatusCode::NO_CONTENT, "{}", res.json);
    assert_eq!(
        sensor_value(&h.bus, TEMP_SENSOR_SERVICE, INLET_TEMP),
        PropertyValue::Double(30.0)
    );

    let res = h.get(THERMAL).await;
    assert_eq!(res.json["Temperatures"][1]["ReadingCelsius"], 30.0);
}

#[tokio::test]
async fn test_override_voltage() {
    let h = common::harness();
    let res = h
        .patch(POWER, json!({"Voltages": [{"MemberId": "p12v", "ReadingVolts": 11.9}]}))
        .await;
    assert_eq!(res.status, StatusCode::NO_CONTENT, "{}", res.json);
    assert_eq!(
        sensor_value(&h.bus, ADC_SENSOR_SERVICE, "/xyz/openbmc_project/sensors/voltage/p12v"),
        PropertyValue::Double(11.9)
    );
}

#[tokio::test]
async fn test_override_unknown_member() {
    let h = common::harness();
    let res = h
        .patch(THERMAL, json!({"Fans": [{"MemberId": "fan7", "Reading": 100}]}))
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(common::message_ids(&res), ["ResourceNotFound"]);

    // A voltage is not on the Thermal node.
    let res = h
        .patch(THERMAL, json!({"Temperatures": [{"MemberId": "p12v", "ReadingCelsius": 1}]}))
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_override_rejects_bad_body_before_any_call() {
    let h = common::harness();
    let before = h.bus.call_count();

    let res = h
        .patch(THERMAL, json!({"Temperatures": [{"MemberId": "inlet_temp"}]}))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(common::message_ids(&res), ["PropertyMissing"]);

    let res = h.patch(POWER, json!({})).await;
    assert_eq!(common::message_ids(&res), ["PropertyMissing"]);

    let res = h.patch(THERMAL, json!({"Temperatures": "hot"})).await;
    assert_eq!(common::message_ids(&res), ["PropertyValueTypeError"]);

    let res = h.patch(THERMAL, json!({})).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    assert_eq!(h.bus.call_count(), before);
}

#[tokio::test]
async fn test_override_needs_configure_manager() {
    let h = common::harness();
    let body = json!({"Temperatures": [{"MemberId": "inlet_temp", "ReadingCelsius": 30}]});
    let res = h.send("PATCH", THERMAL, Some(body), Role::Operator).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(
        sensor_value(&h.bus, TEMP_SENSOR_SERVICE, INLET_TEMP),
        PropertyValue::Double(23.5)
    );
}
