//! VLAN interfaces stacked on a physical interface.
//!
//! A VLAN of `eth0` with tag 7 is the bus interface `eth0_7`.

use axum::http::Method;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::bus::names::*;
use crate::bus::{BusCall, BusError, ManagedObjects, PropertyValue};
use crate::error::GatewayError;
use crate::resources::ethernet::data::{has_interface, interface_ids, interface_path, snapshot};
use crate::resources::ethernet::{interface_uri, network_privileges, vlan_uri};
use crate::resources::{backend_error, body_reader, finish_body, link, write_done};
use crate::response::{messages, AsyncResp, Response};
use crate::routing::{EntityPrivileges, RequestContext, Resource};

pub const MIN_VLAN_ID: u32 = 1;
pub const MAX_VLAN_ID: u32 = 4094;

fn belongs_to(parent: &str, vlan: &str) -> bool {
    vlan.strip_prefix(parent)
        .and_then(|rest| rest.strip_prefix('_'))
        .is_some_and(|tag| !tag.is_empty())
}

fn vlan_not_found(vlan: &str) -> GatewayError {
    GatewayError::ResourceNotFound {
        kind: "VLAN Network Interface".into(),
        id: vlan.to_string(),
    }
}

fn read_vlan_id(value: Option<u32>) -> Result<Option<u32>, GatewayError> {
    match value {
        Some(id) if !(MIN_VLAN_ID..=MAX_VLAN_ID).contains(&id) => Err(GatewayError::PropertyValueFormatError {
            value: id.to_string(),
            path: "VLANId".into(),
        }),
        other => Ok(other),
    }
}

/// VLAN tag of `vlan`, `None` when it is not an existing VLAN interface.
fn vlan_tag(objects: &ManagedObjects, vlan: &str) -> Option<u32> {
    snapshot(objects, vlan)?.data.vlan_id
}

/// `/redfish/v1/Managers/bmc/EthernetInterfaces/{id}/VLANs`
pub struct VlanCollection;

impl Resource for VlanCollection {
    fn template(&self) -> &'static str {
        "/redfish/v1/Managers/bmc/EthernetInterfaces/{id}/VLANs"
    }

    fn privileges(&self) -> EntityPrivileges {
        network_privileges(&[Method::GET, Method::HEAD, Method::POST])
    }

    fn get(&self, req: &RequestContext, resp: &Arc<AsyncResp>) {
        let parent = match req.params.require_str("id") {
            Ok(parent) => parent.to_string(),
            Err(e) => return resp.fail(&e),
        };
        resp.doc().json = json!({
            "@odata.type": "#VLanNetworkInterfaceCollection.VLanNetworkInterfaceCollection",
            "@odata.id": format!("{}/VLANs", interface_uri(&parent)),
            "Name": "VLAN Network Interface Collection",
        });

        resp.issue(
            BusCall::get_managed_objects(NETWORK_SERVICE, NETWORK_ROOT),
            move |result, res, _| {
                let objects = match result.and_then(|reply| reply.into_managed_objects()) {
                    Ok(objects) => objects,
                    Err(e) => return backend_error(res, e),
                };
                if !has_interface(&objects, &parent) {
                    messages::record(
                        res,
                        &GatewayError::ResourceNotFound {
                            kind: "VLanNetworkInterfaceCollection".into(),
                            id: parent,
                        },
                    );
                    return;
                }
                let members: Vec<Value> = interface_ids(&objects)
                    .iter()
                    .filter(|iface| belongs_to(&parent, iface))
                    .map(|iface| link(&vlan_uri(&parent, iface)))
                    .collect();
                res.json["Members@odata.count"] = json!(members.len());
                res.json["Members"] = Value::Array(members);
            },
        );
    }

    fn post(&self, req: &RequestContext, resp: &Arc<AsyncResp>) {
        let parent = match req.params.require_str("id") {
            Ok(parent) => parent.to_string(),
            Err(e) => return resp.fail(&e),
        };
        let Some(mut body) = body_reader(req, resp) else {
            return;
        };
        let vlan_id = body.u32("VLANId");
        let enable = body.bool("VLANEnable");
        if !finish_body(body, resp) {
            return;
        }
        let vlan_id = match read_vlan_id(vlan_id) {
            Ok(vlan_id) => vlan_id,
            Err(e) => return resp.fail(&e),
        };
        let (Some(vlan_id), Some(_)) = (vlan_id, enable) else {
            if vlan_id.is_none() {
                resp.fail(&GatewayError::PropertyMissing("VLANId".into()));
            }
            if enable.is_none() {
                resp.fail(&GatewayError::PropertyMissing("VLANEnable".into()));
            }
            return;
        };

        tracing::info!(parent = %parent, vlan_id, "Creating VLAN");
        resp.issue(
            BusCall::method(NETWORK_SERVICE, NETWORK_ROOT, VLAN_CREATE_INTERFACE, "VLAN")
                .arg(parent.as_str())
                .arg(vlan_id),
            move |result, res, _| match result {
                Ok(_) => {
                    let name = format!("{}_{}", parent, vlan_id);
                    messages::created(res, &vlan_uri(&parent, &name));
                }
                Err(BusError::UnknownObject(_)) => messages::record(
                    res,
                    &GatewayError::ResourceNotFound {
                        kind: "EthernetInterface".into(),
                        id: parent,
                    },
                ),
                Err(e) => backend_error(res, e),
            },
        );
    }
}

/// `/redfish/v1/Managers/bmc/EthernetInterfaces/{id}/VLANs/{vlan}`
pub struct VlanInterface;

/// Parent and VLAN names, or `None` after recording a failure.
fn names(req: &RequestContext, resp: &AsyncResp) -> Option<(String, String)> {
    let names = req
        .params
        .require_str("id")
        .and_then(|parent| Ok((parent.to_string(), req.params.require_str("vlan")?.to_string())));
    match names {
        Ok((parent, vlan)) if belongs_to(&parent, &vlan) => Some((parent, vlan)),
        Ok((_, vlan)) => {
            resp.fail(&vlan_not_found(&vlan));
            None
        }
        Err(e) => {
            resp.fail(&e);
            None
        }
    }
}

/// Run `then` against the VLAN's current tag once the tree has been read.
fn with_vlan<F>(resp: &Arc<AsyncResp>, vlan: String, then: F)
where
    F: FnOnce(u32, &mut Response, &Arc<AsyncResp>) + Send + 'static,
{
    resp.issue(
        BusCall::get_managed_objects(NETWORK_SERVICE, NETWORK_ROOT),
        move |result, res, resp| {
            let objects = match result.and_then(|reply| reply.into_managed_objects()) {
                Ok(objects) => objects,
                Err(e) => return backend_error(res, e),
            };
            match vlan_tag(&objects, &vlan) {
                Some(tag) => then(tag, res, resp),
                None => messages::record(res, &vlan_not_found(&vlan)),
            }
        },
    );
}

impl Resource for VlanInterface {
    fn template(&self) -> &'static str {
        "/redfish/v1/Managers/bmc/EthernetInterfaces/{id}/VLANs/{vlan}"
    }

    fn privileges(&self) -> EntityPrivileges {
        network_privileges(&[Method::GET, Method::HEAD, Method::PATCH, Method::DELETE])
    }

    fn get(&self, req: &RequestContext, resp: &Arc<AsyncResp>) {
        let Some((parent, vlan)) = names(req, resp) else {
            return;
        };
        {
            let mut doc = resp.doc();
            doc.json["@odata.type"] = json!("#VLanNetworkInterface.v1_1_0.VLanNetworkInterface");
            doc.json["Name"] = json!("VLAN Network Interface");
        }
        let id = vlan.clone();
        with_vlan(resp, vlan, move |tag, res, _| {
            res.json["Id"] = json!(id);
            res.json["@odata.id"] = json!(vlan_uri(&parent, &id));
            res.json["VLANEnable"] = json!(true);
            res.json["VLANId"] = json!(tag);
        });
    }

    fn patch(&self, req: &RequestContext, resp: &Arc<AsyncResp>) {
        let Some((_, vlan)) = names(req, resp) else {
            return;
        };
        let Some(mut body) = body_reader(req, resp) else {
            return;
        };
        let enable = body.bool("VLANEnable");
        let vlan_id = body.u32("VLANId");
        if !finish_body(body, resp) {
            return;
        }
        let vlan_id = match read_vlan_id(vlan_id) {
            Ok(vlan_id) => vlan_id,
            Err(e) => return resp.fail(&e),
        };
        let Some(enable) = enable else {
            resp.fail(&GatewayError::PropertyMissing("VLANEnable".into()));
            return;
        };
        if enable && vlan_id.is_none() {
            resp.fail(&GatewayError::PropertyMissing("VLANId".into()));
            return;
        }

        let path = interface_path(&vlan);
        with_vlan(resp, vlan, move |_, res, resp| {
            messages::success(res);
            let call = match vlan_id {
                Some(id) if enable => {
                    BusCall::set_property(NETWORK_SERVICE, path, VLAN_INTERFACE, "Id", PropertyValue::U32(id))
                }
                _ => {
                    tracing::debug!(path = %path, "VLAN disabled, deleting interface");
                    BusCall::delete(NETWORK_SERVICE, path)
                }
            };
            resp.issue(call, write_done("Update VLAN"));
        });
    }

    fn delete(&self, req: &RequestContext, resp: &Arc<AsyncResp>) {
        let Some((_, vlan)) = names(req, resp) else {
            return;
        };
        let path = interface_path(&vlan);
        with_vlan(resp, vlan, move |_, res, resp| {
            messages::no_content(res);
            resp.issue(BusCall::delete(NETWORK_SERVICE, path), write_done("Delete VLAN"));
        });
    }
}
