//! Manager resources: the BMC itself.

use axum::http::Method;
use serde_json::json;
use std::sync::Arc;

use crate::resources::link;
use crate::response::AsyncResp;
use crate::routing::{EntityPrivileges, RequestContext, Resource};

pub const MANAGER_PATH: &str = "/redfish/v1/Managers/bmc";

/// `/redfish/v1/Managers`
pub struct ManagerCollection;

impl Resource for ManagerCollection {
    fn template(&self) -> &'static str {
        "/redfish/v1/Managers"
    }

    fn get(&self, _req: &RequestContext, resp: &Arc<AsyncResp>) {
        resp.doc().json = json!({
            "@odata.type": "#ManagerCollection.ManagerCollection",
            "@odata.id": "/redfish/v1/Managers",
            "Name": "Manager Collection",
            "Members": [link(MANAGER_PATH)],
            "Members@odata.count": 1,
        });
    }
}

/// `/redfish/v1/Managers/bmc`
pub struct Manager;

impl Resource for Manager {
    fn template(&self) -> &'static str {
        MANAGER_PATH
    }

    fn privileges(&self) -> EntityPrivileges {
        EntityPrivileges::manager().only(&[Method::GET, Method::HEAD])
    }

    fn get(&self, _req: &RequestContext, resp: &Arc<AsyncResp>) {
        resp.doc().json = json!({
            "@odata.type": "#Manager.v1_3_0.Manager",
            "@odata.id": MANAGER_PATH,
            "Id": "bmc",
            "Name": "OpenBmc Manager",
            "Description": "Baseboard Management Controller",
            "ManagerType": "BMC",
            "Status": { "Health": "OK", "State": "Enabled" },
            "EthernetInterfaces": link("/redfish/v1/Managers/bmc/EthernetInterfaces"),
            "Links": { "ManagerForServers": [link("/redfish/v1/Systems/system")] },
        });
    }
}
