//! Turn reconciliation plans into network service calls.

use serde_json::{json, Value};
use std::sync::Arc;

use crate::bus::names::{IP_CREATE_INTERFACE, IP_INTERFACE, NETWORK_SERVICE};
use crate::bus::{BusCall, PropertyValue};
use crate::error::GatewayError;
use crate::observability::metrics;
use crate::reconcile::{Action, Ipv4Patch, Ipv6Patch, Plan};
use crate::resources::ethernet::data::{address_path, interface_path, Family};
use crate::resources::{array_slot, write_done};
use crate::response::{messages, AsyncResp, Response};

/// Property writes for one existing address entry.
fn set_calls(path: &str, fields: Vec<(&'static str, PropertyValue)>) -> Vec<BusCall> {
    fields
        .into_iter()
        .map(|(property, value)| BusCall::set_property(NETWORK_SERVICE, path, IP_INTERFACE, property, value))
        .collect()
}

fn create_call(iface: &str, family: Family, address: &str, prefix: u8, gateway: &str) -> BusCall {
    BusCall::method(NETWORK_SERVICE, interface_path(iface), IP_CREATE_INTERFACE, "IP")
        .arg(family.protocol())
        .arg(address)
        .arg(prefix)
        .arg(gateway)
}

fn ipv4_fields(patch: &Ipv4Patch) -> Vec<(&'static str, PropertyValue)> {
    let mut fields = Vec::new();
    if let Some(address) = &patch.address {
        fields.push(("Address", PropertyValue::from(address.as_str())));
    }
    if let Some(prefix) = patch.prefix_length {
        fields.push(("PrefixLength", PropertyValue::Byte(prefix)));
    }
    if let Some(gateway) = &patch.gateway {
        fields.push(("Gateway", PropertyValue::from(gateway.as_str())));
    }
    fields
}

fn ipv4_echo(patch: &Ipv4Patch) -> Value {
    let mut echo = json!({});
    if let Some(address) = &patch.address {
        echo["Address"] = json!(address);
    }
    if let Some(mask) = &patch.subnet_mask {
        echo["SubnetMask"] = json!(mask);
    }
    if let Some(gateway) = &patch.gateway {
        echo["Gateway"] = json!(gateway);
    }
    echo
}

fn ipv6_fields(patch: &Ipv6Patch) -> Vec<(&'static str, PropertyValue)> {
    let mut fields = Vec::new();
    if let Some(address) = &patch.address {
        fields.push(("Address", PropertyValue::from(address.as_str())));
    }
    if let Some(prefix) = patch.prefix_length {
        fields.push(("PrefixLength", PropertyValue::Byte(prefix)));
    }
    fields
}

fn ipv6_echo(patch: &Ipv6Patch) -> Value {
    let mut echo = json!({});
    if let Some(address) = &patch.address {
        echo["Address"] = json!(address);
    }
    if let Some(prefix) = patch.prefix_length {
        echo["PrefixLength"] = json!(prefix);
    }
    echo
}

fn delete(resp: &Arc<AsyncResp>, iface: &str, family: Family, id: &str) {
    resp.issue(
        BusCall::delete(NETWORK_SERVICE, address_path(iface, family, id)),
        write_done("Delete address"),
    );
}

fn finish(res: &mut Response, error: Option<GatewayError>) {
    if let Some(err) = error {
        tracing::debug!(error = %err, "Reconciliation stopped");
        messages::record(res, &err);
    }
}

/// Issue the calls of an `IPv4StaticAddresses` plan.
pub fn apply_ipv4(resp: &Arc<AsyncResp>, res: &mut Response, iface: &str, plan: Plan<Ipv4Patch>) {
    for action in plan.actions {
        metrics::record_reconcile_action(action.kind());
        match action {
            Action::Delete { id, .. } => delete(resp, iface, Family::V4, &id),
            Action::Update { index, id, patch } => {
                let path = address_path(iface, Family::V4, &id);
                for call in set_calls(&path, ipv4_fields(&patch)) {
                    resp.issue(call, write_done("Update IPv4 address"));
                }
                *array_slot(&mut res.json, "IPv4StaticAddresses", index) = ipv4_echo(&patch);
            }
            Action::Create { index, patch } => {
                let (Some(address), Some(prefix), Some(gateway)) =
                    (&patch.address, patch.prefix_length, &patch.gateway)
                else {
                    messages::record(res, &GatewayError::InternalError("incomplete IPv4 entry".into()));
                    continue;
                };
                resp.issue(
                    create_call(iface, Family::V4, address, prefix, gateway),
                    write_done("Create IPv4 address"),
                );
                *array_slot(&mut res.json, "IPv4StaticAddresses", index) = ipv4_echo(&patch);
            }
        }
    }
    finish(res, plan.error);
}

/// Issue the calls of an `IPv6StaticAddresses` plan.
pub fn apply_ipv6(resp: &Arc<AsyncResp>, res: &mut Response, iface: &str, plan: Plan<Ipv6Patch>) {
    for action in plan.actions {
        metrics::record_reconcile_action(action.kind());
        match action {
            Action::Delete { id, .. } => delete(resp, iface, Family::V6, &id),
            Action::Update { index, id, patch } => {
                let path = address_path(iface, Family::V6, &id);
                for call in set_calls(&path, ipv6_fields(&patch)) {
                    resp.issue(call, write_done("Update IPv6 address"));
                }
                *array_slot(&mut res.json, "IPv6StaticAddresses", index) = ipv6_echo(&patch);
            }
            Action::Create { index, patch } => {
                let (Some(address), Some(prefix)) = (&patch.address, patch.prefix_length) else {
                    messages::record(res, &GatewayError::InternalError("incomplete IPv6 entry".into()));
                    continue;
                };
                resp.issue(
                    create_call(iface, Family::V6, address, prefix, ""),
                    write_done("Create IPv6 address"),
                );
                *array_slot(&mut res.json, "IPv6StaticAddresses", index) = ipv6_echo(&patch);
            }
        }
    }
    finish(res, plan.error);
}
