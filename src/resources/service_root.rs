//! `/redfish` and `/redfish/v1`.

use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::resources::link;
use crate::response::AsyncResp;
use crate::routing::{EntityPrivileges, RequestContext, Resource};

pub const SERVICE_VERSION: &str = "1.6.0";

/// Protocol version document.
pub struct RedfishVersions;

impl Resource for RedfishVersions {
    fn template(&self) -> &'static str {
        "/redfish"
    }

    fn privileges(&self) -> EntityPrivileges {
        EntityPrivileges::anonymous_read()
    }

    fn get(&self, _req: &RequestContext, resp: &Arc<AsyncResp>) {
        resp.doc().json = json!({ "v1": "/redfish/v1/" });
    }
}

/// Entry point of the resource tree.
///
/// The service UUID is drawn once per process.
pub struct ServiceRoot {
    uuid: Uuid,
}

impl ServiceRoot {
    pub fn new() -> Self {
        Self { uuid: Uuid::new_v4() }
    }
}

impl Default for ServiceRoot {
    fn default() -> Self {
        Self::new()
    }
}

impl Resource for ServiceRoot {
    fn template(&self) -> &'static str {
        "/redfish/v1"
    }

    fn privileges(&self) -> EntityPrivileges {
        EntityPrivileges::anonymous_read()
    }

    fn get(&self, _req: &RequestContext, resp: &Arc<AsyncResp>) {
        resp.doc().json = json!({
            "@odata.type": "#ServiceRoot.v1_5_0.ServiceRoot",
            "@odata.id": "/redfish/v1",
            "Id": "RootService",
            "Name": "Root Service",
            "RedfishVersion": SERVICE_VERSION,
            "UUID": self.uuid.to_string(),
            "Systems": link("/redfish/v1/Systems"),
            "Chassis": link("/redfish/v1/Chassis"),
            "Managers": link("/redfish/v1/Managers"),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::seed::{demo_store, standard_bus};
    use crate::gateway::{Gateway, GatewayRequest};
    use axum::http::Method;

    #[tokio::test]
    async fn test_root_uuid_is_stable() {
        let gateway = Gateway::with_all_resources(Arc::new(standard_bus(demo_store()))).unwrap();
        let mut seen = Vec::new();
        for _ in 0..2 {
            let res = gateway.handle(GatewayRequest::new(Method::GET, "/redfish/v1")).await;
            seen.push(res.json["UUID"].clone());
        }
        assert_eq!(seen[0], seen[1]);
        assert!(Uuid::parse_str(seen[0].as_str().unwrap()).is_ok());
    }
}
