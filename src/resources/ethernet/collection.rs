//! `/redfish/v1/Managers/bmc/EthernetInterfaces`

use axum::http::Method;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::bus::names::{NETWORK_ROOT, NETWORK_SERVICE};
use crate::bus::BusCall;
use crate::resources::ethernet::data::interface_ids;
use crate::resources::ethernet::{interface_uri, network_privileges, COLLECTION_URI};
use crate::resources::{backend_error, link};
use crate::response::AsyncResp;
use crate::routing::{EntityPrivileges, RequestContext, Resource};

/// Collection of physical interfaces; VLANs are listed under their parent.
pub struct EthernetCollection;

/// VLAN interfaces are named `<parent>_<id>`.
fn is_vlan(iface: &str) -> bool {
    iface.contains('_')
}

fn members(ids: &[String]) -> Vec<Value> {
    ids.iter()
        .filter(|id| !is_vlan(id))
        .map(|id| link(&interface_uri(id)))
        .collect()
}

impl Resource for EthernetCollection {
    fn template(&self) -> &'static str {
        COLLECTION_URI
    }

    fn privileges(&self) -> EntityPrivileges {
        network_privileges(&[Method::GET, Method::HEAD])
    }

    fn get(&self, _req: &RequestContext, resp: &Arc<AsyncResp>) {
        resp.doc().json = json!({
            "@odata.type": "#EthernetInterfaceCollection.EthernetInterfaceCollection",
            "@odata.id": COLLECTION_URI,
            "Name": "Ethernet Network Interface Collection",
            "Description": "Collection of EthernetInterfaces for this Manager",
        });

        resp.issue(
            BusCall::get_managed_objects(NETWORK_SERVICE, NETWORK_ROOT),
            |result, res, _| match result.and_then(|reply| reply.into_managed_objects()) {
                Ok(objects) => {
                    let members = members(&interface_ids(&objects));
                    res.json["Members@odata.count"] = json!(members.len());
                    res.json["Members"] = Value::Array(members);
                }
                Err(e) => backend_error(res, e),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vlans_hidden_from_collection() {
        let ids = vec!["eth0".to_string(), "eth0_7".to_string(), "eth1".to_string()];
        let members = members(&ids);
        assert_eq!(members.len(), 2);
        assert_eq!(members[1]["@odata.id"], "/redfish/v1/Managers/bmc/EthernetInterfaces/eth1");
    }
}
