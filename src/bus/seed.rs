//! Demo object tree and the custom methods a BMC exposes.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::bus::message::{DELETE_INTERFACE, MAPPER_SERVICE, OBJECT_MANAGER_INTERFACE};
use crate::bus::names::*;
use crate::bus::{BusCall, BusError, BusReply, MemoryBus, ObjectStore, PropertyBag, PropertyValue};

fn bag<const N: usize>(entries: [(&str, PropertyValue); N]) -> PropertyBag {
    entries
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

/// Object id the network service assigns to a new address.
fn address_id(address: &str, prefix: u8, gateway: &str) -> String {
    let mut hasher = DefaultHasher::new();
    address.hash(&mut hasher);
    prefix.hash(&mut hasher);
    gateway.hash(&mut hasher);
    format!("{:08x}", hasher.finish() as u32)
}

fn insert_address(
    store: &mut ObjectStore,
    iface: &str,
    family: &str,
    address: &str,
    prefix: u8,
    gateway: &str,
    origin: &str,
) -> String {
    let id = address_id(address, prefix, gateway);
    let path = format!("{}/{}/{}/{}", NETWORK_ROOT, iface, family, id);
    store.insert(
        NETWORK_SERVICE,
        &path,
        IP_INTERFACE,
        bag([
            ("Address", address.into()),
            ("PrefixLength", PropertyValue::Byte(prefix)),
            ("Gateway", gateway.into()),
            ("Origin", origin.into()),
        ]),
    );
    store.insert(NETWORK_SERVICE, &path, DELETE_INTERFACE, PropertyBag::new());
    path
}

fn insert_interface(store: &mut ObjectStore, iface: &str, mac: &str, speed: u32, dhcp: bool) {
    let path = format!("{}/{}", NETWORK_ROOT, iface);
    store.insert(
        NETWORK_SERVICE,
        &path,
        ETHERNET_INTERFACE,
        bag([
            ("AutoNeg", true.into()),
            ("Speed", PropertyValue::U32(speed)),
            ("DHCPEnabled", dhcp.into()),
            ("Nameservers", PropertyValue::StrList(vec!["10.0.0.53".into()])),
            ("DomainName", PropertyValue::StrList(vec!["lab.example".into()])),
        ]),
    );
    store.insert(
        NETWORK_SERVICE,
        &path,
        MAC_ADDRESS_INTERFACE,
        bag([("MACAddress", mac.into())]),
    );
}

const TEMP_SENSOR_SERVICE: &str = "xyz.openbmc_project.HwmonTempSensor";
const FAN_SENSOR_SERVICE: &str = "xyz.openbmc_project.FanSensor";
const ADC_SENSOR_SERVICE: &str = "xyz.openbmc_project.ADCSensor";
const PSU_SENSOR_SERVICE: &str = "xyz.openbmc_project.PSUSensor";

const MOTHERBOARD_PATH: &str = "/xyz/openbmc_project/inventory/system/chassis/motherboard";
const DIMM_SIZE_KB: u64 = 16 * 1024 * 1024;

fn item_state(store: &mut ObjectStore, path: &str, present: bool, functional: bool) {
    store.insert(INVENTORY_SERVICE, path, ITEM_INTERFACE, bag([("Present", present.into())]));
    store.insert(
        INVENTORY_SERVICE,
        path,
        OPERATIONAL_STATUS_INTERFACE,
        bag([("Functional", functional.into())]),
    );
}

/// Chassis, processors, DIMMs and a power supply.
fn insert_inventory(store: &mut ObjectStore) {
    store.insert(INVENTORY_SERVICE, INVENTORY_ROOT, OBJECT_MANAGER_INTERFACE, PropertyBag::new());
    store.insert(
        INVENTORY_SERVICE,
        INVENTORY_SYSTEM_PATH,
        ASSET_INTERFACE,
        bag([
            ("Manufacturer", "Example Systems".into()),
            ("Model", "X100".into()),
            ("SerialNumber", "SN0001".into()),
            ("PartNumber", "PN-X100".into()),
        ]),
    );
    store.insert(INVENTORY_SERVICE, INVENTORY_SYSTEM_PATH, ITEM_SYSTEM_INTERFACE, PropertyBag::new());
    store.insert(
        INVENTORY_SERVICE,
        INVENTORY_SYSTEM_PATH,
        ASSET_TAG_INTERFACE,
        bag([("AssetTag", "rack-12".into())]),
    );

    store.insert(INVENTORY_SERVICE, CHASSIS_INVENTORY_PATH, ITEM_CHASSIS_INTERFACE, PropertyBag::new());
    store.insert(
        INVENTORY_SERVICE,
        CHASSIS_INVENTORY_PATH,
        ASSET_INTERFACE,
        bag([
            ("Manufacturer", "Example Systems".into()),
            ("Model", "C100".into()),
            ("SerialNumber", "CH0001".into()),
            ("PartNumber", "PN-C100".into()),
        ]),
    );
    store.insert(
        INVENTORY_SERVICE,
        CHASSIS_INVENTORY_PATH,
        UUID_INTERFACE,
        bag([("UUID", "4c4c4544004d3910804ab4c04f4d3232".into())]),
    );

    let cpu0 = format!("{}/cpu0", MOTHERBOARD_PATH);
    store.insert(
        INVENTORY_SERVICE,
        &cpu0,
        ITEM_CPU_INTERFACE,
        bag([("ProcessorFamily", "Xeon".into())]),
    );
    item_state(store, &cpu0, true, true);
    // No CPU properties: presence and health come from the decorators.
    let cpu1 = format!("{}/cpu1", MOTHERBOARD_PATH);
    store.insert(INVENTORY_SERVICE, &cpu1, ITEM_CPU_INTERFACE, PropertyBag::new());
    item_state(store, &cpu1, true, true);

    for dimm in ["dimm0", "dimm1"] {
        let path = format!("{}/{}", MOTHERBOARD_PATH, dimm);
        store.insert(
            INVENTORY_SERVICE,
            &path,
            ITEM_DIMM_INTERFACE,
            bag([("MemorySizeInKb", PropertyValue::U64(DIMM_SIZE_KB))]),
        );
        item_state(store, &path, true, true);
    }

    let psu = format!("{}/powersupply0", CHASSIS_INVENTORY_PATH);
    store.insert(INVENTORY_SERVICE, &psu, ITEM_POWER_SUPPLY_INTERFACE, PropertyBag::new());
    store.insert(
        INVENTORY_SERVICE,
        &psu,
        ASSET_INTERFACE,
        bag([
            ("Manufacturer", "Example Power".into()),
            ("Model", "PSU-550".into()),
            ("SerialNumber", "PS0001".into()),
            ("PartNumber", "PN-PSU-550".into()),
        ]),
    );
    item_state(store, &psu, true, true);
}

fn insert_sensor(store: &mut ObjectStore, service: &str, kind: &str, name: &str, value: PropertyBag) -> String {
    let path = format!("{}/{}/{}", SENSORS_ROOT, kind, name);
    store.insert(service, &path, SENSOR_VALUE_INTERFACE, value);
    path
}

fn insert_thresholds(store: &mut ObjectStore, service: &str, path: &str, warning: (f64, f64), critical: (f64, f64)) {
    store.insert(
        service,
        path,
        SENSOR_WARNING_INTERFACE,
        bag([
            ("WarningHigh", warning.1.into()),
            ("WarningLow", warning.0.into()),
            ("WarningAlarmHigh", false.into()),
            ("WarningAlarmLow", false.into()),
        ]),
    );
    store.insert(
        service,
        path,
        SENSOR_CRITICAL_INTERFACE,
        bag([
            ("CriticalHigh", critical.1.into()),
            ("CriticalLow", critical.0.into()),
            ("CriticalAlarmHigh", false.into()),
            ("CriticalAlarmLow", false.into()),
        ]),
    );
}

fn associate(store: &mut ObjectStore, path: &str, endpoints: Vec<String>) {
    store.insert(
        MAPPER_SERVICE,
        path,
        ASSOCIATION_INTERFACE,
        bag([("endpoints", PropertyValue::StrList(endpoints))]),
    );
}

/// Sensors of the chassis, spread over several sensor services, plus the
/// mapper associations tying them to the chassis and to inventory items.
fn insert_sensors(store: &mut ObjectStore) {
    for service in [TEMP_SENSOR_SERVICE, FAN_SENSOR_SERVICE, ADC_SENSOR_SERVICE, PSU_SENSOR_SERVICE] {
        store.insert(service, SENSORS_ROOT, OBJECT_MANAGER_INTERFACE, PropertyBag::new());
    }

    let inlet = insert_sensor(
        store,
        TEMP_SENSOR_SERVICE,
        "temperature",
        "inlet_temp",
        bag([
            ("Value", 23.5.into()),
            ("MinValue", (-40.0).into()),
            ("MaxValue", 125.0.into()),
        ]),
    );
    insert_thresholds(store, TEMP_SENSOR_SERVICE, &inlet, (5.0, 40.0), (0.0, 50.0));
    let cpu_temp = insert_sensor(
        store,
        TEMP_SENSOR_SERVICE,
        "temperature",
        "cpu0_temp",
        bag([
            ("Value", 61.0.into()),
            ("MinValue", 0.0.into()),
            ("MaxValue", 110.0.into()),
        ]),
    );
    insert_thresholds(store, TEMP_SENSOR_SERVICE, &cpu_temp, (5.0, 85.0), (0.0, 95.0));
    let fan = insert_sensor(
        store,
        FAN_SENSOR_SERVICE,
        "fan_tach",
        "fan0",
        bag([
            ("Value", 5200.4.into()),
            ("MinValue", 0.0.into()),
            ("MaxValue", 12000.0.into()),
        ]),
    );
    let p12v = insert_sensor(
        store,
        ADC_SENSOR_SERVICE,
        "voltage",
        "p12v",
        bag([("Value", 12.1.into())]),
    );
    insert_thresholds(store, ADC_SENSOR_SERVICE, &p12v, (11.4, 12.6), (10.8, 13.2));
    let total = insert_sensor(store, PSU_SENSOR_SERVICE, "power", "total_power", bag([("Value", 310.0.into())]));
    let ps_in = insert_sensor(store, PSU_SENSOR_SERVICE, "power", "ps0_input_power", bag([("Value", 160.0.into())]));
    let ps_out = insert_sensor(store, PSU_SENSOR_SERVICE, "power", "ps0_output_power", bag([("Value", 150.0.into())]));

    let all = [&inlet, &cpu_temp, &fan, &p12v, &total, &ps_in, &ps_out]
        .iter()
        .map(|path| path.to_string())
        .collect();
    associate(store, &format!("{}/all_sensors", CHASSIS_INVENTORY_PATH), all);
    associate(
        store,
        &format!("{}/inventory", cpu_temp),
        vec![format!("{}/cpu0", MOTHERBOARD_PATH)],
    );
    let psu = format!("{}/powersupply0", CHASSIS_INVENTORY_PATH);
    for sensor in [&ps_in, &ps_out] {
        associate(store, &format!("{}/inventory", sensor), vec![psu.clone()]);
    }

    let redundancy = format!("{}/FanRedundancy/Fan_Redundancy", CONTROL_ROOT);
    store.insert(
        FAN_SENSOR_SERVICE,
        &redundancy,
        FAN_REDUNDANCY_INTERFACE,
        bag([
            ("AllowedFailures", PropertyValue::Byte(0)),
            ("Collection", PropertyValue::StrList(vec![fan])),
            ("Status", "xyz.openbmc_project.Control.FanRedundancy.State.Full".into()),
        ]),
    );
    associate(
        store,
        &format!("{}/chassis", redundancy),
        vec![CHASSIS_INVENTORY_PATH.to_string()],
    );
}

/// Persistent and one-time boot override settings, both at their defaults.
fn insert_boot_settings(store: &mut ObjectStore) {
    for path in [BOOT_PATH, BOOT_ONE_TIME_PATH] {
        store.insert(
            SETTINGS_SERVICE,
            path,
            BOOT_SOURCE_INTERFACE,
            bag([("BootSource", BOOT_SOURCE_DEFAULT.into())]),
        );
        store.insert(
            SETTINGS_SERVICE,
            path,
            BOOT_MODE_INTERFACE,
            bag([("BootMode", BOOT_MODE_REGULAR.into())]),
        );
    }
    store.insert(
        SETTINGS_SERVICE,
        BOOT_ONE_TIME_PATH,
        ENABLE_INTERFACE,
        bag([("Enabled", false.into())]),
    );
}

/// Object tree of a small BMC: one NIC with a static address, host, chassis,
/// LEDs, inventory, sensors and boot settings.
pub fn demo_store() -> ObjectStore {
    let mut store = ObjectStore::new();

    insert_interface(&mut store, "eth0", "52:54:00:12:34:56", 1000, false);
    insert_address(&mut store, "eth0", "ipv4", "10.0.0.5", 24, "10.0.0.1", ORIGIN_STATIC);
    insert_address(&mut store, "eth0", "ipv4", "169.254.10.20", 16, "0.0.0.0", ORIGIN_LINK_LOCAL);
    insert_address(&mut store, "eth0", "ipv6", "fd00::5", 64, "", ORIGIN_STATIC);
    insert_address(&mut store, "eth0", "ipv6", "fe80::5054:ff:fe12:3456", 64, "", ORIGIN_LINK_LOCAL);
    store.insert(NETWORK_SERVICE, NETWORK_ROOT, VLAN_CREATE_INTERFACE, PropertyBag::new());

    store.insert(
        NETWORK_SERVICE,
        NETWORK_CONFIG_PATH,
        SYSTEM_CONFIGURATION_INTERFACE,
        bag([
            ("HostName", "bmc".into()),
            ("DefaultGateway", "10.0.0.1".into()),
            ("DefaultGateway6", "".into()),
        ]),
    );
    store.insert(
        NETWORK_SERVICE,
        DHCP_CONFIG_PATH,
        DHCP_CONFIGURATION_INTERFACE,
        bag([
            ("DNSEnabled", true.into()),
            ("HostNameEnabled", true.into()),
            ("NTPEnabled", false.into()),
        ]),
    );

    store.insert(
        HOST_SERVICE,
        HOST_PATH,
        HOST_INTERFACE,
        bag([
            ("CurrentHostState", HOST_RUNNING.into()),
            (
                "RequestedHostTransition",
                "xyz.openbmc_project.State.Host.Transition.On".into(),
            ),
        ]),
    );
    store.insert(
        CHASSIS_SERVICE,
        CHASSIS_PATH,
        CHASSIS_INTERFACE,
        bag([
            (
                "CurrentPowerState",
                "xyz.openbmc_project.State.Chassis.PowerState.On".into(),
            ),
            (
                "RequestedPowerTransition",
                "xyz.openbmc_project.State.Chassis.Transition.On".into(),
            ),
        ]),
    );
    store.insert(NMI_SERVICE, NMI_PATH, NMI_INTERFACE, PropertyBag::new());

    store.insert(
        LED_GROUP_SERVICE,
        LED_IDENTIFY_GROUP_PATH,
        LED_GROUP_INTERFACE,
        bag([("Asserted", false.into())]),
    );
    store.insert(
        LED_CONTROLLER_SERVICE,
        LED_IDENTIFY_PATH,
        LED_PHYSICAL_INTERFACE,
        bag([("State", LED_ACTION_OFF.into())]),
    );

    insert_inventory(&mut store);
    insert_sensors(&mut store);
    insert_boot_settings(&mut store);

    store
}

fn create_ip(store: &mut ObjectStore, call: &BusCall) -> Result<BusReply, BusError> {
    let protocol = call.str_arg(0)?;
    let address = call.str_arg(1)?;
    let prefix = match call.args.get(2) {
        Some(PropertyValue::Byte(prefix)) => *prefix,
        _ => return Err(BusError::InvalidArgs("argument 2 must be a byte".into())),
    };
    let gateway = call.str_arg(3)?;
    let family = match protocol {
        IPV4_PROTOCOL => "ipv4",
        IPV6_PROTOCOL => "ipv6",
        other => return Err(BusError::InvalidArgs(format!("unknown protocol {}", other))),
    };
    let iface = call
        .path
        .strip_prefix(&format!("{}/", NETWORK_ROOT))
        .filter(|iface| !iface.contains('/'))
        .ok_or_else(|| BusError::UnknownObject(call.path.clone()))?;
    store.object(NETWORK_SERVICE, &call.path)?;

    let path = insert_address(store, iface, family, address, prefix, gateway, ORIGIN_STATIC);
    Ok(BusReply::ObjectPath(path))
}

fn create_vlan(store: &mut ObjectStore, call: &BusCall) -> Result<BusReply, BusError> {
    let parent = call.str_arg(0)?;
    let id = match call.args.get(1) {
        Some(PropertyValue::U32(id)) => *id,
        _ => return Err(BusError::InvalidArgs("argument 1 must be a u32".into())),
    };
    let parent_path = format!("{}/{}", NETWORK_ROOT, parent);
    let mac = store
        .properties(NETWORK_SERVICE, &parent_path, MAC_ADDRESS_INTERFACE)?
        .get("MACAddress")
        .cloned()
        .unwrap_or_else(|| "".into());

    let name = format!("{}_{}", parent, id);
    let path = format!("{}/{}", NETWORK_ROOT, name);
    if store.contains(NETWORK_SERVICE, &path) {
        return Err(BusError::Failed(format!("{} already exists", name)));
    }
    insert_interface(store, &name, "", 0, false);
    store.insert(NETWORK_SERVICE, &path, MAC_ADDRESS_INTERFACE, bag([("MACAddress", mac)]));
    store.insert(NETWORK_SERVICE, &path, VLAN_INTERFACE, bag([("Id", PropertyValue::U32(id))]));
    store.insert(NETWORK_SERVICE, &path, DELETE_INTERFACE, PropertyBag::new());
    Ok(BusReply::ObjectPath(path))
}

fn nmi(store: &mut ObjectStore, call: &BusCall) -> Result<BusReply, BusError> {
    store.properties(&call.service, &call.path, NMI_INTERFACE)?;
    tracing::info!("NMI injected");
    Ok(BusReply::Empty)
}

/// Memory bus over `store` with the network and host control methods registered.
pub fn standard_bus(store: ObjectStore) -> MemoryBus {
    MemoryBus::new(store)
        .with_method(IP_CREATE_INTERFACE, "IP", create_ip)
        .with_method(VLAN_CREATE_INTERFACE, "VLAN", create_vlan)
        .with_method(NMI_INTERFACE, "NMI", nmi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Bus;

    #[tokio::test]
    async fn test_create_ip_adds_static_child() {
        let bus = standard_bus(demo_store());
        let path = bus
            .call(
                BusCall::method(NETWORK_SERVICE, format!("{}/eth0", NETWORK_ROOT), IP_CREATE_INTERFACE, "IP")
                    .arg(IPV4_PROTOCOL)
                    .arg("10.0.0.7")
                    .arg(24u8)
                    .arg("10.0.0.1"),
            )
            .await
            .unwrap()
            .into_object_path()
            .unwrap();
        assert!(path.starts_with("/xyz/openbmc_project/network/eth0/ipv4/"));
        let origin = bus.inspect(|s| {
            s.properties(NETWORK_SERVICE, &path, IP_INTERFACE).unwrap()["Origin"].clone()
        });
        assert_eq!(origin, PropertyValue::Str(ORIGIN_STATIC.into()));
    }

    #[tokio::test]
    async fn test_create_vlan_copies_mac() {
        let bus = standard_bus(demo_store());
        bus.call(
            BusCall::method(NETWORK_SERVICE, NETWORK_ROOT, VLAN_CREATE_INTERFACE, "VLAN")
                .arg("eth0")
                .arg(7u32),
        )
        .await
        .unwrap();
        let mac = bus.inspect(|s| {
            s.properties(NETWORK_SERVICE, "/xyz/openbmc_project/network/eth0_7", MAC_ADDRESS_INTERFACE)
                .unwrap()["MACAddress"]
                .clone()
        });
        assert_eq!(mac, PropertyValue::Str("52:54:00:12:34:56".into()));
    }

    #[test]
    fn test_address_id_is_stable() {
        assert_eq!(address_id("10.0.0.5", 24, "10.0.0.1"), address_id("10.0.0.5", 24, "10.0.0.1"));
        assert_ne!(address_id("10.0.0.5", 24, "10.0.0.1"), address_id("10.0.0.6", 24, "10.0.0.1"));
    }
}
