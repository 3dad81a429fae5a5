//! Processor and memory summaries, asset data and UUID of the host system,
//! discovered from the inventory tree.
//!
//! Every object found gets its own reads; a failed read leaves its share of
//! the summary out and the rest of the document intact.

use serde_json::{json, Value};
use std::sync::Arc;

use crate::bus::names::*;
use crate::bus::{decode, field, BusCall, BusReply, FieldSpec, PropertyValue, ValueKind};
use crate::error::GatewayError;
use crate::resources::backend_error;
use crate::response::{messages, AsyncResp, Response};

const SUMMARY_INTERFACES: &[&str] = &[
    ASSET_INTERFACE,
    ITEM_CPU_INTERFACE,
    ITEM_DIMM_INTERFACE,
    ITEM_SYSTEM_INTERFACE,
    UUID_INTERFACE,
];

const ASSET_FIELDS: &[FieldSpec] = &[
    field("Manufacturer", ValueKind::Str),
    field("Model", ValueKind::Str),
    field("SerialNumber", ValueKind::Str),
    field("PartNumber", ValueKind::Str),
];

const KIB_PER_GIB: u64 = 1024 * 1024;

/// Summaries before discovery: nothing counted, nothing enabled.
pub(super) fn seed(json: &mut Value) {
    json["ProcessorSummary"] = json!({ "Count": 0, "Status": { "State": "Disabled" } });
    json["MemorySummary"] = json!({ "TotalSystemMemoryGiB": 0, "Status": { "State": "Disabled" } });
}

/// Walk the inventory and fan out one read chain per relevant object.
pub(super) fn discover(resp: &Arc<AsyncResp>) {
    resp.issue(
        BusCall::get_subtree(INVENTORY_ROOT, 0, SUMMARY_INTERFACES),
        |result, res, resp| {
            let tree = match result.and_then(BusReply::into_subtree) {
                Ok(tree) => tree,
                Err(e) => return backend_error(res, e),
            };
            tracing::debug!(objects = tree.len(), "Inventory subtree");
            for (path, services) in &tree {
                for (service, interfaces) in services {
                    for interface in interfaces {
                        match interface.as_str() {
                            ITEM_DIMM_INTERFACE => read_dimm(resp, service, path),
                            ITEM_CPU_INTERFACE => read_cpu(resp, service, path),
                            UUID_INTERFACE => read_uuid(resp, service, path),
                            ITEM_SYSTEM_INTERFACE => read_system_asset(resp, service, path),
                            _ => {}
                        }
                    }
                }
            }
        },
    );
}

fn unexpected(res: &mut Response, property: &str, value: &PropertyValue) {
    messages::record(
        res,
        &GatewayError::InternalError(format!("{} has type {}", property, value.kind())),
    );
}

/// Raise the summary's state to `Enabled` when the part works.
fn fold_functional(summary: &mut Value, functional: bool) {
    if functional && summary["Status"]["State"] == "Disabled" {
        summary["Status"]["State"] = json!("Enabled");
    }
}

/// Follow-up read of one boolean decorator property.
fn read_flag(
    resp: &Arc<AsyncResp>,
    service: &str,
    path: &str,
    interface: &'static str,
    property: &'static str,
    apply: impl FnOnce(&mut Response, bool) + Send + 'static,
) {
    resp.issue(
        BusCall::get_property(service, path, interface, property),
        move |result, res, _| match result.and_then(BusReply::into_value) {
            Ok(PropertyValue::Bool(flag)) => apply(res, flag),
            Ok(other) => unexpected(res, property, &other),
            Err(e) => tracing::warn!(property, error = %e, "Decorator unavailable"),
        },
    );
}

fn read_dimm(resp: &Arc<AsyncResp>, service: &str, path: &str) {
    let (service, path) = (service.to_string(), path.to_string());
    resp.issue(
        BusCall::get_all(service.as_str(), path.as_str(), ITEM_DIMM_INTERFACE),
        move |result, res, resp| {
            let bag = match result.and_then(BusReply::into_properties) {
                Ok(bag) => bag,
                Err(e) => return backend_error(res, e),
            };
            if bag.is_empty() {
                // Inventory without DIMM details still says whether it works.
                read_flag(resp, &service, &path, OPERATIONAL_STATUS_INTERFACE, "Functional", |res, functional| {
                    fold_functional(&mut res.json["MemorySummary"], functional)
                });
                return;
            }
            let dimm = decode(&bag, &[field("MemorySizeInKb", ValueKind::U64)]);
            if dimm.is_set("MemorySizeInKb") {
                let summary = &mut res.json["MemorySummary"];
                let total = summary["TotalSystemMemoryGiB"].as_u64().unwrap_or(0);
                summary["TotalSystemMemoryGiB"] = json!(total + dimm.u64("MemorySizeInKb") / KIB_PER_GIB);
                summary["Status"]["State"] = json!("Enabled");
            }
        },
    );
}

fn count_processor(summary: &mut Value) {
    let count = summary["Count"].as_u64().unwrap_or(0);
    summary["Count"] = json!(count + 1);
}

fn read_cpu(resp: &Arc<AsyncResp>, service: &str, path: &str) {
    let (service, path) = (service.to_string(), path.to_string());
    resp.issue(
        BusCall::get_all(service.as_str(), path.as_str(), ITEM_CPU_INTERFACE),
        move |result, res, resp| {
            let bag = match result.and_then(BusReply::into_properties) {
                Ok(bag) => bag,
                Err(e) => return backend_error(res, e),
            };
            if bag.is_empty() {
                read_flag(resp, &service, &path, ITEM_INTERFACE, "Present", |res, present| {
                    if present {
                        count_processor(&mut res.json["ProcessorSummary"]);
                    }
                });
                read_flag(resp, &service, &path, OPERATIONAL_STATUS_INTERFACE, "Functional", |res, functional| {
                    fold_functional(&mut res.json["ProcessorSummary"], functional)
                });
                return;
            }
            let cpu = decode(&bag, &[field("ProcessorFamily", ValueKind::Str)]);
            if cpu.is_set("ProcessorFamily") {
                let summary = &mut res.json["ProcessorSummary"];
                count_processor(summary);
                summary["Status"]["State"] = json!("Enabled");
                summary["Model"] = json!(cpu.string("ProcessorFamily"));
            }
        },
    );
}

fn read_uuid(resp: &Arc<AsyncResp>, service: &str, path: &str) {
    resp.issue(
        BusCall::get_all(service, path, UUID_INTERFACE),
        |result, res, _| match result.and_then(BusReply::into_properties) {
            Ok(bag) => {
                let uuid = decode(&bag, &[field("UUID", ValueKind::Str)]);
                if uuid.is_set("UUID") {
                    res.json["UUID"] = json!(format_uuid(&uuid.string("UUID")));
                }
            }
            Err(e) => backend_error(res, e),
        },
    );
}

/// Asset data of the system object. Optional: a missing decorator is no error.
fn read_system_asset(resp: &Arc<AsyncResp>, service: &str, path: &str) {
    resp.issue(
        BusCall::get_all(service, path, ASSET_INTERFACE),
        |result, res, _| match result.and_then(BusReply::into_properties) {
            Ok(bag) => {
                let asset = decode(&bag, ASSET_FIELDS);
                for spec in ASSET_FIELDS {
                    if asset.is_set(spec.name) {
                        res.json[spec.name] = json!(asset.string(spec.name));
                    }
                }
            }
            Err(e) => tracing::debug!(error = %e, "System has no asset data"),
        },
    );
    resp.issue(
        BusCall::get_property(service, path, ASSET_TAG_INTERFACE, "AssetTag"),
        |result, res, _| {
            if let Ok(PropertyValue::Str(tag)) = result.and_then(BusReply::into_value) {
                res.json["AssetTag"] = json!(tag);
            }
        },
    );
}

/// Hyphenate a bare 32-digit UUID; anything else passes through.
pub(super) fn format_uuid(raw: &str) -> String {
    if raw.len() != 32 || !raw.chars().all(|c| c.is_ascii_hexdigit()) {
        return raw.to_string();
    }
    format!(
        "{}-{}-{}-{}-{}",
        &raw[0..8],
        &raw[8..12],
        &raw[12..16],
        &raw[16..20],
        &raw[20..32]
    )
}
