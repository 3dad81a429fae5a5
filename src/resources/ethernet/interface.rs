//! `/redfish/v1/Managers/bmc/EthernetInterfaces/{id}`

use axum::http::Method;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::body::ObjectReader;
use crate::bus::names::*;
use crate::bus::{decode, field, BusCall, FieldSpec, PropertyValue, ValueKind};
use crate::error::GatewayError;
use crate::reconcile::{ipv4::prefix_to_mask, reconcile, Ipv4Static, Ipv6Static};
use crate::resources::ethernet::addresses::{apply_ipv4, apply_ipv6};
use crate::resources::ethernet::data::{interface_path, snapshot, Family, InterfaceSnapshot};
use crate::resources::ethernet::{interface_uri, network_privileges};
use crate::resources::{backend_error, body_reader, finish_body, link, write_done};
use crate::response::{messages, AsyncResp, Response};
use crate::routing::{EntityPrivileges, RequestContext, Resource};

const DHCP_FIELDS: &[FieldSpec] = &[
    field("DNSEnabled", ValueKind::Bool),
    field("HostNameEnabled", ValueKind::Bool),
    field("NTPEnabled", ValueKind::Bool),
];

/// Redfish `DHCPv4` key → DHCP configuration property.
const DHCP_OPTIONS: [(&str, &str); 3] = [
    ("UseDNSServers", "DNSEnabled"),
    ("UseDomainName", "HostNameEnabled"),
    ("UseNTPServers", "NTPEnabled"),
];

/// One managed Ethernet interface.
pub struct EthernetInterface;

fn render(json: &mut Value, iface: &str, snapshot: &InterfaceSnapshot) {
    let data = &snapshot.data;
    json["Id"] = json!(iface);
    json["@odata.id"] = json!(interface_uri(iface));
    json["InterfaceEnabled"] = json!(true);
    if data.speed == 0 {
        json["LinkStatus"] = json!("NoLink");
        json["Status"] = json!({ "Health": "OK", "State": "Disabled" });
    } else {
        json["LinkStatus"] = json!("LinkUp");
        json["Status"] = json!({ "Health": "OK", "State": "Enabled" });
    }
    json["SpeedMbps"] = json!(data.speed);
    json["AutoNeg"] = json!(data.auto_neg);
    json["MACAddress"] = json!(data.mac_address);
    json["DHCPv4"]["DHCPEnabled"] = json!(data.dhcp_enabled);

    if !data.hostname.is_empty() {
        json["HostName"] = json!(data.hostname);
        if let Some(domain) = data.domain_names.first() {
            json["FQDN"] = json!(format!("{}.{}", data.hostname, domain));
        }
    }

    json["VLANs"] = link(&format!("{}/VLANs", interface_uri(iface)));
    json["NameServers"] = json!(data.nameservers);
    json["StaticNameServers"] = if data.dhcp_enabled {
        json!([])
    } else {
        json!(data.nameservers)
    };

    let gateway_or_any = |gateway: &str| {
        if gateway.is_empty() {
            "0.0.0.0".to_string()
        } else {
            gateway.to_string()
        }
    };
    json["IPv4Addresses"] = snapshot
        .ipv4
        .iter()
        .map(|a| {
            json!({
                "AddressOrigin": a.origin,
                "SubnetMask": prefix_to_mask(a.prefix_length),
                "Address": a.address,
                "Gateway": gateway_or_any(&a.gateway),
            })
        })
        .collect();
    json["IPv4StaticAddresses"] = snapshot
        .ipv4
        .iter()
        .filter(|a| a.is_static())
        .map(|a| {
            json!({
                "SubnetMask": prefix_to_mask(a.prefix_length),
                "Address": a.address,
                "Gateway": gateway_or_any(&a.gateway),
            })
        })
        .collect();

    json["IPv6DefaultGateway"] = json!(data.default_gateway6);
    json["IPv6Addresses"] = snapshot
        .ipv6
        .iter()
        .map(|a| {
            json!({
                "Address": a.address,
                "PrefixLength": a.prefix_length,
                "AddressOrigin": a.origin,
            })
        })
        .collect();
    json["IPv6StaticAddresses"] = snapshot
        .ipv6
        .iter()
        .filter(|a| a.is_static())
        .map(|a| json!({ "Address": a.address, "PrefixLength": a.prefix_length }))
        .collect();
}

/// Validated `DHCPv4` object of a PATCH body.
#[derive(Debug, Default)]
struct DhcpPatch {
    enabled: Option<bool>,
    /// (Redfish key, DHCP configuration property, value)
    options: Vec<(&'static str, &'static str, bool)>,
}

fn read_dhcp(value: &Value) -> Result<DhcpPatch, Vec<GatewayError>> {
    let mut reader = ObjectReader::nested(value, "DHCPv4").map_err(|e| vec![e])?;
    let mut patch = DhcpPatch {
        enabled: reader.bool("DHCPEnabled"),
        options: Vec::new(),
    };
    for (key, property) in DHCP_OPTIONS {
        if let Some(flag) = reader.bool(key) {
            patch.options.push((key, property, flag));
        }
    }
    reader.finish()?;
    Ok(patch)
}

/// Fields of an interface PATCH, validated before any write.
#[derive(Debug, Default)]
struct InterfacePatch {
    hostname: Option<String>,
    mac_address: Option<String>,
    static_name_servers: Option<Vec<String>>,
    ipv4_static: Option<Value>,
    ipv6_static: Option<Value>,
    dhcp: Option<DhcpPatch>,
    read_only: Vec<&'static str>,
}

fn read_patch(req: &RequestContext, resp: &AsyncResp) -> Option<InterfacePatch> {
    let mut body = body_reader(req, resp)?;
    let mut patch = InterfacePatch {
        hostname: body.string("HostName"),
        mac_address: body.string("MACAddress"),
        static_name_servers: body.strings("StaticNameServers"),
        ipv4_static: body.value("IPv4StaticAddresses").cloned(),
        ipv6_static: body.value("IPv6StaticAddresses").cloned(),
        ..Default::default()
    };
    for key in ["IPv4Addresses", "NameServers", "IPv6DefaultGateway"] {
        if body.value(key).is_some() {
            patch.read_only.push(key);
        }
    }
    let dhcp = body.value("DHCPv4");
    if !finish_body(body, resp) {
        return None;
    }

    if let Some(dhcp) = dhcp {
        match read_dhcp(dhcp) {
            Ok(dhcp) => patch.dhcp = Some(dhcp),
            Err(errors) => {
                for err in &errors {
                    resp.fail(err);
                }
                return None;
            }
        }
    }
    Some(patch)
}

fn apply_patch(
    resp: &Arc<AsyncResp>,
    res: &mut Response,
    iface: &str,
    patch: InterfacePatch,
    snapshot: &InterfaceSnapshot,
) {
    let path = interface_path(iface);

    if let Some(dhcp) = patch.dhcp {
        if let Some(enabled) = dhcp.enabled {
            res.json["DHCPv4"]["DHCPEnabled"] = json!(enabled);
            resp.issue(
                BusCall::set_property(NETWORK_SERVICE, path.as_str(), ETHERNET_INTERFACE, "DHCPEnabled", enabled),
                write_done("Set DHCPEnabled"),
            );
        }
        for (key, property, flag) in dhcp.options {
            res.json["DHCPv4"][key] = json!(flag);
            resp.issue(
                BusCall::set_property(NETWORK_SERVICE, DHCP_CONFIG_PATH, DHCP_CONFIGURATION_INTERFACE, property, flag),
                write_done("Set DHCP option"),
            );
        }
    }

    if let Some(hostname) = patch.hostname {
        res.json["HostName"] = json!(&hostname);
        resp.issue(
            BusCall::set_property(
                NETWORK_SERVICE,
                NETWORK_CONFIG_PATH,
                SYSTEM_CONFIGURATION_INTERFACE,
                "HostName",
                hostname,
            ),
            write_done("Set HostName"),
        );
    }

    if let Some(mac) = patch.mac_address {
        res.json["MACAddress"] = json!(&mac);
        resp.issue(
            BusCall::set_property(NETWORK_SERVICE, path.as_str(), MAC_ADDRESS_INTERFACE, "MACAddress", mac),
            write_done("Set MACAddress"),
        );
    }

    for key in patch.read_only {
        messages::record(res, &GatewayError::PropertyNotWritable(key.to_string()));
    }

    if let Some(client) = patch.ipv4_static {
        let backend = snapshot.static_ids(Family::V4);
        apply_ipv4(resp, res, iface, reconcile(&Ipv4Static, &client, &backend));
    }

    if let Some(servers) = patch.static_name_servers {
        res.json["StaticNameServers"] = json!(&servers);
        resp.issue(
            BusCall::set_property(
                NETWORK_SERVICE,
                path.as_str(),
                ETHERNET_INTERFACE,
                "Nameservers",
                PropertyValue::StrList(servers),
            ),
            write_done("Set Nameservers"),
        );
    }

    if let Some(client) = patch.ipv6_static {
        let backend = snapshot.static_ids(Family::V6);
        apply_ipv6(resp, res, iface, reconcile(&Ipv6Static, &client, &backend));
    }
}

impl Resource for EthernetInterface {
    fn template(&self) -> &'static str {
        "/redfish/v1/Managers/bmc/EthernetInterfaces/{id}"
    }

    fn privileges(&self) -> EntityPrivileges {
        network_privileges(&[Method::GET, Method::HEAD, Method::PATCH])
    }

    fn get(&self, req: &RequestContext, resp: &Arc<AsyncResp>) {
        let iface = match req.params.require_str("id") {
            Ok(iface) => iface.to_string(),
            Err(e) => return resp.fail(&e),
        };
        {
            let mut doc = resp.doc();
            doc.json["@odata.type"] = json!("#EthernetInterface.v1_4_1.EthernetInterface");
            doc.json["Name"] = json!("Manager Ethernet Interface");
            doc.json["Description"] = json!("Management Network Interface");
        }

        resp.issue(
            BusCall::get_managed_objects(NETWORK_SERVICE, NETWORK_ROOT),
            move |result, res, resp| {
                let objects = match result.and_then(|reply| reply.into_managed_objects()) {
                    Ok(objects) => objects,
                    Err(e) => return backend_error(res, e),
                };
                let Some(snapshot) = snapshot(&objects, &iface) else {
                    messages::record(
                        res,
                        &GatewayError::ResourceNotFound {
                            kind: "EthernetInterface".into(),
                            id: iface,
                        },
                    );
                    return;
                };
                render(&mut res.json, &iface, &snapshot);

                resp.issue(
                    BusCall::get_all(NETWORK_SERVICE, DHCP_CONFIG_PATH, DHCP_CONFIGURATION_INTERFACE),
                    |result, res, _| match result.and_then(|reply| reply.into_properties()) {
                        Ok(bag) => {
                            let dhcp = decode(&bag, DHCP_FIELDS);
                            for (key, property) in DHCP_OPTIONS {
                                if dhcp.is_set(property) {
                                    res.json["DHCPv4"][key] = json!(dhcp.bool(property));
                                }
                            }
                        }
                        Err(e) => backend_error(res, e),
                    },
                );
            },
        );
    }

    fn patch(&self, req: &RequestContext, resp: &Arc<AsyncResp>) {
        let iface = match req.params.require_str("id") {
            Ok(iface) => iface.to_string(),
            Err(e) => return resp.fail(&e),
        };
        let Some(patch) = read_patch(req, resp) else {
            return;
        };
        {
            let mut doc = resp.doc();
            doc.json["Id"] = json!(iface);
            doc.json["@odata.id"] = json!(interface_uri(&iface));
        }

        resp.issue(
            BusCall::get_managed_objects(NETWORK_SERVICE, NETWORK_ROOT),
            move |result, res, resp| {
                let objects = match result.and_then(|reply| reply.into_managed_objects()) {
                    Ok(objects) => objects,
                    Err(e) => return backend_error(res, e),
                };
                match snapshot(&objects, &iface) {
                    Some(snapshot) => apply_patch(resp, res, &iface, patch, &snapshot),
                    None => messages::record(
                        res,
                        &GatewayError::ResourceNotFound {
                            kind: "EthernetInterface".into(),
                            id: iface,
                        },
                    ),
                }
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::seed::demo_store;

    #[test]
    fn test_render_demo_interface() {
        let objects = demo_store().managed_objects(NETWORK_SERVICE, NETWORK_ROOT).unwrap();
        let snapshot = snapshot(&objects, "eth0").unwrap();
        let mut json = json!({});
        render(&mut json, "eth0", &snapshot);

        assert_eq!(json["@odata.id"], "/redfish/v1/Managers/bmc/EthernetInterfaces/eth0");
        assert_eq!(json["LinkStatus"], "LinkUp");
        assert_eq!(json["FQDN"], "bmc.lab.example");
        assert_eq!(json["StaticNameServers"], json!(["10.0.0.53"]));
        assert_eq!(
            json["IPv4StaticAddresses"],
            json!([{"SubnetMask": "255.255.255.0", "Address": "10.0.0.5", "Gateway": "10.0.0.1"}])
        );
        assert_eq!(json["IPv4Addresses"].as_array().map(Vec::len), Some(2));
        assert_eq!(json["IPv6StaticAddresses"], json!([{"Address": "fd00::5", "PrefixLength": 64}]));
    }

    #[test]
    fn test_dhcp_object_validation() {
        let patch = read_dhcp(&json!({"DHCPEnabled": true, "UseNTPServers": false})).unwrap();
        assert_eq!(patch.enabled, Some(true));
        assert_eq!(patch.options, vec![("UseNTPServers", "NTPEnabled", false)]);

        let errors = read_dhcp(&json!({"UseDNSServers": "yes", "Bogus": 1})).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(read_dhcp(&json!(true)).is_err());
    }
}
