//! Network service object tree → typed interface snapshot.

use crate::bus::names::*;
use crate::bus::{decode, field, FieldSpec, InterfaceMap, ManagedObjects, ValueKind};

const ETHERNET_FIELDS: &[FieldSpec] = &[
    field("Speed", ValueKind::U32),
    field("AutoNeg", ValueKind::Bool),
    field("DHCPEnabled", ValueKind::Bool),
    field("Nameservers", ValueKind::StrList),
    field("DomainName", ValueKind::StrList),
];

const MAC_FIELDS: &[FieldSpec] = &[field("MACAddress", ValueKind::Str)];

const VLAN_FIELDS: &[FieldSpec] = &[field("Id", ValueKind::U32)];

const SYSTEM_CONFIG_FIELDS: &[FieldSpec] = &[
    field("HostName", ValueKind::Str),
    field("DefaultGateway", ValueKind::Str),
    field("DefaultGateway6", ValueKind::Str),
];

const IP_FIELDS: &[FieldSpec] = &[
    field("Address", ValueKind::Str),
    field("PrefixLength", ValueKind::Byte),
    field("Gateway", ValueKind::Str),
    field("Origin", ValueKind::Str),
];

/// Address family of an IP child object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    pub fn segment(self) -> &'static str {
        match self {
            Family::V4 => "ipv4",
            Family::V6 => "ipv6",
        }
    }

    pub fn protocol(self) -> &'static str {
        match self {
            Family::V4 => IPV4_PROTOCOL,
            Family::V6 => IPV6_PROTOCOL,
        }
    }
}

/// Interface-level properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterfaceData {
    pub speed: u32,
    pub auto_neg: bool,
    pub dhcp_enabled: bool,
    pub mac_address: String,
    pub nameservers: Vec<String>,
    pub domain_names: Vec<String>,
    pub vlan_id: Option<u32>,
    pub hostname: String,
    pub default_gateway: String,
    pub default_gateway6: String,
}

/// One address child object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpAddress {
    pub id: String,
    pub address: String,
    pub prefix_length: u8,
    pub gateway: String,
    /// Redfish `AddressOrigin`.
    pub origin: &'static str,
}

impl IpAddress {
    pub fn is_static(&self) -> bool {
        self.origin == "Static"
    }

    pub fn is_link_local_v4(&self) -> bool {
        self.address.starts_with("169.254.")
    }
}

/// Everything the interface resource renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterfaceSnapshot {
    pub data: InterfaceData,
    /// Ordered by object id.
    pub ipv4: Vec<IpAddress>,
    pub ipv6: Vec<IpAddress>,
}

impl InterfaceSnapshot {
    pub fn static_ids(&self, family: Family) -> Vec<String> {
        let list = match family {
            Family::V4 => &self.ipv4,
            Family::V6 => &self.ipv6,
        };
        list.iter()
            .filter(|a| a.is_static())
            .map(|a| a.id.clone())
            .collect()
    }
}

/// Object path of interface `iface`.
pub fn interface_path(iface: &str) -> String {
    format!("{}/{}", NETWORK_ROOT, iface)
}

/// Object path of address `id` under `iface`.
pub fn address_path(iface: &str, family: Family, id: &str) -> String {
    format!("{}/{}/{}/{}", NETWORK_ROOT, iface, family.segment(), id)
}

/// Redfish name of a bus address origin.
pub fn origin_name(origin: &str, family: Family) -> &'static str {
    match (origin, family) {
        (ORIGIN_STATIC, _) => "Static",
        (ORIGIN_LINK_LOCAL, Family::V4) => "IPv4LinkLocal",
        (ORIGIN_LINK_LOCAL, Family::V6) => "LinkLocal",
        (ORIGIN_DHCP, Family::V4) => "DHCP",
        (ORIGIN_DHCP, Family::V6) => "DHCPv6",
        (ORIGIN_SLAAC, _) => "SLAAC",
        _ => "",
    }
}

/// Every Ethernet interface name, VLANs included, in path order.
pub fn interface_ids(objects: &ManagedObjects) -> Vec<String> {
    objects
        .iter()
        .filter(|(_, interfaces)| interfaces.contains_key(ETHERNET_INTERFACE))
        .filter_map(|(path, _)| path.rsplit('/').next())
        .map(str::to_string)
        .collect()
}

/// True when `iface` exists as an Ethernet interface.
pub fn has_interface(objects: &ManagedObjects, iface: &str) -> bool {
    objects
        .get(&interface_path(iface))
        .is_some_and(|interfaces| interfaces.contains_key(ETHERNET_INTERFACE))
}

fn interface_data(interfaces: &InterfaceMap, objects: &ManagedObjects) -> InterfaceData {
    let mut data = InterfaceData::default();
    if let Some(bag) = interfaces.get(ETHERNET_INTERFACE) {
        let props = decode(bag, ETHERNET_FIELDS);
        data.speed = props.u32("Speed");
        data.auto_neg = props.bool("AutoNeg");
        data.dhcp_enabled = props.bool("DHCPEnabled");
        data.nameservers = props.strings("Nameservers");
        data.domain_names = props.strings("DomainName");
    }
    if let Some(bag) = interfaces.get(MAC_ADDRESS_INTERFACE) {
        data.mac_address = decode(bag, MAC_FIELDS).string("MACAddress");
    }
    if let Some(bag) = interfaces.get(VLAN_INTERFACE) {
        let props = decode(bag, VLAN_FIELDS);
        if props.is_set("Id") {
            data.vlan_id = Some(props.u32("Id"));
        }
    }
    if let Some(bag) = objects
        .get(NETWORK_CONFIG_PATH)
        .and_then(|interfaces| interfaces.get(SYSTEM_CONFIGURATION_INTERFACE))
    {
        let props = decode(bag, SYSTEM_CONFIG_FIELDS);
        data.hostname = props.string("HostName");
        data.default_gateway = props.string("DefaultGateway");
        data.default_gateway6 = props.string("DefaultGateway6");
    }
    data
}

fn addresses(objects: &ManagedObjects, iface: &str, family: Family) -> Vec<IpAddress> {
    let prefix = format!("{}/{}/", interface_path(iface), family.segment());
    objects
        .iter()
        .filter_map(|(path, interfaces)| {
            let id = path.strip_prefix(&prefix).filter(|id| !id.contains('/'))?;
            let props = decode(interfaces.get(IP_INTERFACE)?, IP_FIELDS);
            Some(IpAddress {
                id: id.to_string(),
                address: props.string("Address"),
                prefix_length: props.byte("PrefixLength"),
                gateway: props.string("Gateway"),
                origin: origin_name(&props.string("Origin"), family),
            })
        })
        .collect()
}

/// Snapshot of `iface`, or `None` when it does not exist.
pub fn snapshot(objects: &ManagedObjects, iface: &str) -> Option<InterfaceSnapshot> {
    let interfaces = objects
        .get(&interface_path(iface))
        .filter(|interfaces| interfaces.contains_key(ETHERNET_INTERFACE))?;
    let data = interface_data(interfaces, objects);

    let mut ipv4 = addresses(objects, iface, Family::V4);
    for address in &mut ipv4 {
        let global_without_gateway = !address.is_link_local_v4() && address.gateway == "0.0.0.0";
        if global_without_gateway || address.origin == "DHCP" {
            address.gateway = data.default_gateway.clone();
        }
    }
    let ipv6 = addresses(objects, iface, Family::V6);

    Some(InterfaceSnapshot { data, ipv4, ipv6 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::seed::demo_store;

    fn demo_objects() -> ManagedObjects {
        demo_store().managed_objects(NETWORK_SERVICE, NETWORK_ROOT).unwrap()
    }

    #[test]
    fn test_snapshot_of_demo_interface() {
        let snapshot = snapshot(&demo_objects(), "eth0").unwrap();
        assert_eq!(snapshot.data.speed, 1000);
        assert_eq!(snapshot.data.mac_address, "52:54:00:12:34:56");
        assert_eq!(snapshot.data.hostname, "bmc");
        assert_eq!(snapshot.data.domain_names, vec!["lab.example".to_string()]);
        assert_eq!(snapshot.data.vlan_id, None);

        assert_eq!(snapshot.ipv4.len(), 2);
        assert_eq!(snapshot.static_ids(Family::V4).len(), 1);
        let link_local = snapshot.ipv4.iter().find(|a| a.is_link_local_v4()).unwrap();
        assert_eq!(link_local.origin, "IPv4LinkLocal");
        assert_eq!(link_local.gateway, "0.0.0.0");

        assert_eq!(snapshot.ipv6.len(), 2);
        assert!(snapshot.ipv6.iter().any(|a| a.origin == "LinkLocal"));
        assert_eq!(snapshot.static_ids(Family::V6).len(), 1);
    }

    #[test]
    fn test_missing_interface() {
        let objects = demo_objects();
        assert!(snapshot(&objects, "eth9").is_none());
        assert!(!has_interface(&objects, "eth9"));
        assert!(has_interface(&objects, "eth0"));
        assert_eq!(interface_ids(&objects), vec!["eth0".to_string()]);
    }

    #[test]
    fn test_origin_names() {
        assert_eq!(origin_name(ORIGIN_DHCP, Family::V4), "DHCP");
        assert_eq!(origin_name(ORIGIN_DHCP, Family::V6), "DHCPv6");
        assert_eq!(origin_name(ORIGIN_SLAAC, Family::V6), "SLAAC");
        assert_eq!(origin_name("bogus", Family::V4), "");
    }
}
