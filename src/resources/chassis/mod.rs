//! Chassis resources: the collection, one chassis, and its Thermal and
//! Power sensor views.

mod reading;
mod sensors;

use axum::http::Method;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::bus::names::*;
use crate::bus::{decode, field, BusCall, BusReply, FieldSpec, ValueKind};
use crate::error::GatewayError;
use crate::resources::{backend_error, body_reader, finish_body, link};
use crate::response::{messages, AsyncResp};
use crate::routing::{EntityPrivileges, RequestContext, Resource};

pub use sensors::SensorNode;

const CHASSIS_INTERFACES: &[&str] = &[ITEM_BOARD_INTERFACE, ITEM_CHASSIS_INTERFACE];

const ASSET_FIELDS: &[FieldSpec] = &[
    field("Manufacturer", ValueKind::Str),
    field("Model", ValueKind::Str),
    field("SerialNumber", ValueKind::Str),
    field("PartNumber", ValueKind::Str),
];

fn chassis_not_found(id: &str) -> GatewayError {
    GatewayError::ResourceNotFound {
        kind: "Chassis".into(),
        id: id.to_string(),
    }
}

/// `/redfish/v1/Chassis`
pub struct ChassisCollection;

impl Resource for ChassisCollection {
    fn template(&self) -> &'static str {
        "/redfish/v1/Chassis"
    }

    fn get(&self, _req: &RequestContext, resp: &Arc<AsyncResp>) {
        resp.doc().json = json!({
            "@odata.type": "#ChassisCollection.ChassisCollection",
            "@odata.id": "/redfish/v1/Chassis",
            "Name": "Chassis Collection",
        });

        resp.issue(
            BusCall::get_subtree_paths(INVENTORY_ROOT, 0, CHASSIS_INTERFACES),
            |result, res, _| {
                let paths = match result.and_then(BusReply::into_paths) {
                    Ok(paths) => paths,
                    Err(e) => return backend_error(res, e),
                };
                let members: Vec<Value> = paths
                    .iter()
                    .filter_map(|path| reading::last_segment(path))
                    .map(|name| link(&format!("/redfish/v1/Chassis/{}", name)))
                    .collect();
                res.json["Members@odata.count"] = json!(members.len());
                res.json["Members"] = Value::Array(members);
            },
        );
    }
}

/// `/redfish/v1/Chassis/{id}`
pub struct Chassis;

impl Resource for Chassis {
    fn template(&self) -> &'static str {
        "/redfish/v1/Chassis/{id}"
    }

    fn get(&self, req: &RequestContext, resp: &Arc<AsyncResp>) {
        let id = match req.params.require_str("id") {
            Ok(id) => id.to_string(),
            Err(e) => return resp.fail(&e),
        };
        let base = format!("/redfish/v1/Chassis/{}", id);
        resp.doc().json = json!({
            "@odata.type": "#Chassis.v1_4_0.Chassis",
            "@odata.id": base,
            "Id": id,
            "Name": id,
            "ChassisType": "RackMount",
            "Status": { "State": "Enabled", "Health": "OK" },
            "Thermal": link(&format!("{}/Thermal", base)),
            "Power": link(&format!("{}/Power", base)),
            "Links": {
                "ComputerSystems": [link("/redfish/v1/Systems/system")],
                "ManagedBy": [link("/redfish/v1/Managers/bmc")],
            },
        });

        resp.issue(
            BusCall::get_subtree(INVENTORY_ROOT, 0, CHASSIS_INTERFACES),
            move |result, res, resp| {
                let tree = match result.and_then(BusReply::into_subtree) {
                    Ok(tree) => tree,
                    Err(e) => return backend_error(res, e),
                };
                let Some((path, services)) = tree
                    .iter()
                    .find(|(path, _)| reading::last_segment(path) == Some(id.as_str()))
                else {
                    messages::record(res, &chassis_not_found(&id));
                    return;
                };
                let Some(service) = services
                    .iter()
                    .find(|(_, interfaces)| interfaces.iter().any(|i| i == ASSET_INTERFACE))
                    .map(|(service, _)| service)
                else {
                    tracing::debug!(chassis = %id, "Chassis has no asset data");
                    return;
                };

                resp.issue(
                    BusCall::get_all(service.as_str(), path.as_str(), ASSET_INTERFACE),
                    |result, res, _| match result.and_then(BusReply::into_properties) {
                        Ok(bag) => {
                            let asset = decode(&bag, ASSET_FIELDS);
                            for spec in ASSET_FIELDS {
                                if asset.is_set(spec.name) {
                                    res.json[spec.name] = json!(asset.string(spec.name));
                                }
                            }
                        }
                        Err(e) => backend_error(res, e),
                    },
                );
            },
        );
    }
}

/// `/redfish/v1/Chassis/{id}/Thermal` and `/redfish/v1/Chassis/{id}/Power`.
///
/// GET renders every sensor of the node's types associated with the
/// chassis; PATCH overrides sensor readings.
pub struct ChassisSensors {
    node: SensorNode,
}

impl ChassisSensors {
    pub const fn thermal() -> Self {
        Self { node: SensorNode::Thermal }
    }

    pub const fn power() -> Self {
        Self { node: SensorNode::Power }
    }
}

impl Resource for ChassisSensors {
    fn template(&self) -> &'static str {
        match self.node {
            SensorNode::Thermal => "/redfish/v1/Chassis/{id}/Thermal",
            SensorNode::Power => "/redfish/v1/Chassis/{id}/Power",
        }
    }

    fn privileges(&self) -> EntityPrivileges {
        EntityPrivileges::manager().only(&[Method::GET, Method::HEAD, Method::PATCH])
    }

    fn get(&self, req: &RequestContext, resp: &Arc<AsyncResp>) {
        let id = match req.params.require_str("id") {
            Ok(id) => id.to_string(),
            Err(e) => return resp.fail(&e),
        };
        resp.doc().json = self.node.header(&id);
        sensors::render(resp, self.node, id);
    }

    fn patch(&self, req: &RequestContext, resp: &Arc<AsyncResp>) {
        let id = match req.params.require_str("id") {
            Ok(id) => id.to_string(),
            Err(e) => return resp.fail(&e),
        };
        let Some(mut body) = body_reader(req, resp) else {
            return;
        };
        let collections: Vec<_> = self
            .node
            .override_collections()
            .iter()
            .map(|&(collection, reading)| (collection, reading, body.value(collection)))
            .collect();
        if !finish_body(body, resp) {
            return;
        }

        let overrides = match sensors::parse_overrides(self.node, &collections) {
            Ok(overrides) => overrides,
            Err(err) => return resp.fail(&err),
        };
        messages::no_content(&mut resp.doc());
        sensors::apply_overrides(resp, self.node, id, overrides);
    }
}
