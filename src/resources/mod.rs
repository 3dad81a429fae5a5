//! Redfish resource handlers.
//!
//! # Data Flow
//! ```text
//! Router → Resource::{get, patch, post, delete}
//!     → synchronous pass: seed document, validate body
//!     → AsyncResp::issue (one BusCall per backend read/write)
//!     → continuations fill the document, possibly issuing more calls
//!     → finalized document back to the transport
//! ```
//!
//! # Design Decisions
//! - Handlers are plain structs, registered once at startup
//! - Body validation completes before any write is issued
//! - A failed backend call is recorded in the document; siblings still run

pub mod chassis;
pub mod ethernet;
pub mod managers;
pub mod service_root;
pub mod systems;

use serde_json::{json, Value};
use std::sync::Arc;

use crate::body::ObjectReader;
use crate::bus::{BusError, BusReply};
use crate::error::GatewayError;
use crate::response::{messages, AsyncResp, Response};
use crate::routing::{RequestContext, RouteError, Router};

/// Register every resource of the tree.
pub fn register_all(router: &mut Router) -> Result<(), RouteError> {
    router.register(Arc::new(service_root::RedfishVersions))?;
    router.register(Arc::new(service_root::ServiceRoot::new()))?;
    router.register(Arc::new(systems::SystemCollection))?;
    router.register(Arc::new(systems::System))?;
    router.register(Arc::new(systems::SystemReset))?;
    router.register(Arc::new(chassis::ChassisCollection))?;
    router.register(Arc::new(chassis::Chassis))?;
    router.register(Arc::new(chassis::ChassisSensors::thermal()))?;
    router.register(Arc::new(chassis::ChassisSensors::power()))?;
    router.register(Arc::new(managers::ManagerCollection))?;
    router.register(Arc::new(managers::Manager))?;
    router.register(Arc::new(ethernet::EthernetCollection))?;
    router.register(Arc::new(ethernet::EthernetInterface))?;
    router.register(Arc::new(ethernet::VlanCollection))?;
    router.register(Arc::new(ethernet::VlanInterface))?;
    Ok(())
}

/// `{"@odata.id": path}`
pub fn link(path: &str) -> Value {
    json!({ "@odata.id": path })
}

/// Reader over the request body, or `None` after recording why not.
pub fn body_reader<'a>(req: &'a RequestContext, resp: &AsyncResp) -> Option<ObjectReader<'a>> {
    match ObjectReader::body(&req.body) {
        Ok(reader) => Some(reader),
        Err(err) => {
            resp.fail(&err);
            None
        }
    }
}

/// Finish `reader`, recording every problem. True when the body was clean.
pub fn finish_body(reader: ObjectReader<'_>, resp: &AsyncResp) -> bool {
    match reader.finish() {
        Ok(()) => true,
        Err(errors) => {
            let mut doc = resp.doc();
            for err in &errors {
                messages::record(&mut doc, err);
            }
            false
        }
    }
}

/// Record a failed backend call.
pub fn backend_error(res: &mut Response, err: BusError) {
    tracing::error!(error = %err, "Backend call failed");
    messages::record(res, &GatewayError::BackendCallFailed(err));
}

/// Continuation for a write whose reply carries nothing.
pub fn write_done(
    what: &'static str,
) -> impl FnOnce(Result<BusReply, BusError>, &mut Response, &Arc<AsyncResp>) + Send + 'static {
    move |result: Result<BusReply, BusError>, res: &mut Response, _: &Arc<AsyncResp>| match result {
        Ok(_) => tracing::debug!(operation = what, "Write done"),
        Err(e) => backend_error(res, e),
    }
}

/// Slot `index` of the array at `key`, growing the array with nulls as needed.
pub fn array_slot<'a>(json: &'a mut Value, key: &str, index: usize) -> &'a mut Value {
    let slot = &mut json[key];
    if !slot.is_array() {
        *slot = Value::Array(Vec::new());
    }
    if let Value::Array(items) = slot {
        if items.len() <= index {
            items.resize(index + 1, Value::Null);
        }
    }
    &mut slot[index]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_slot_grows() {
        let mut json = json!({});
        *array_slot(&mut json, "IPv4StaticAddresses", 2) = json!({"Address": "10.0.0.2"});
        assert_eq!(
            json,
            json!({"IPv4StaticAddresses": [null, null, {"Address": "10.0.0.2"}]})
        );
        *array_slot(&mut json, "IPv4StaticAddresses", 0) = json!({});
        assert_eq!(json["IPv4StaticAddresses"][0], json!({}));
    }

    #[test]
    fn test_every_resource_registers() {
        let mut router = Router::new();
        register_all(&mut router).unwrap();
        assert_eq!(router.len(), 15);
    }
}
