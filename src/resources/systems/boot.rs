//! Boot source override: the `Boot` object of the computer system.
//!
//! The settings service keeps two copies of the boot source and mode. The
//! one-time copy applies when its `Enabled` flag is set, the persistent copy
//! otherwise.

use serde_json::{json, Value};
use std::sync::Arc;

use crate::body::{first, ObjectReader};
use crate::bus::names::*;
use crate::bus::{BusCall, BusReply, PropertyValue};
use crate::error::GatewayError;
use crate::resources::{backend_error, write_done};
use crate::response::{messages, AsyncResp, Response};

const SOURCE_PREFIX: &str = "xyz.openbmc_project.Control.Boot.Source.Sources.";
const MODE_PREFIX: &str = "xyz.openbmc_project.Control.Boot.Mode.Modes.";

/// Override target with the source and mode that select it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct BootTarget {
    pub name: &'static str,
    pub source: &'static str,
    pub mode: &'static str,
}

const fn target(name: &'static str, source: &'static str, mode: &'static str) -> BootTarget {
    BootTarget { name, source, mode }
}

pub(super) const TARGETS: [BootTarget; 7] = [
    target("None", "Default", "Regular"),
    target("Pxe", "Network", "Regular"),
    target("Hdd", "Disk", "Regular"),
    target("Cd", "ExternalMedia", "Regular"),
    target("Diags", "Default", "Safe"),
    target("BiosSetup", "Default", "Setup"),
    target("Usb", "RemovableMedia", "Regular"),
];

impl BootTarget {
    fn source_value(&self) -> String {
        format!("{}{}", SOURCE_PREFIX, self.source)
    }

    fn mode_value(&self) -> String {
        format!("{}{}", MODE_PREFIX, self.mode)
    }
}

/// Target selected by a boot source in regular mode.
fn target_for_source(source: &str) -> Option<&'static str> {
    let source = source.strip_prefix(SOURCE_PREFIX)?;
    TARGETS
        .iter()
        .find(|t| t.source == source && t.mode == "Regular")
        .map(|t| t.name)
}

/// Target selected by a boot mode from the default source.
fn target_for_mode(mode: &str) -> Option<&'static str> {
    let mode = mode.strip_prefix(MODE_PREFIX)?;
    TARGETS
        .iter()
        .find(|t| t.source == "Default" && t.mode == mode)
        .map(|t| t.name)
}

fn settings_object(one_time: bool) -> &'static str {
    if one_time {
        BOOT_ONE_TIME_PATH
    } else {
        BOOT_PATH
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum OverrideEnabled {
    Once,
    Continuous,
    Disabled,
}

impl OverrideEnabled {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "Once" => Some(Self::Once),
            "Continuous" => Some(Self::Continuous),
            "Disabled" => Some(Self::Disabled),
            _ => None,
        }
    }
}

/// Validated `Boot` object of a PATCH.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct BootPatch {
    pub target: Option<BootTarget>,
    pub enabled: Option<OverrideEnabled>,
}

impl BootPatch {
    pub fn is_empty(&self) -> bool {
        self.target.is_none() && self.enabled.is_none()
    }
}

pub(super) fn parse(value: &Value) -> Result<BootPatch, GatewayError> {
    let mut reader = ObjectReader::nested(value, "Boot")?;
    let target = reader.string("BootSourceOverrideTarget");
    let enabled = reader.string("BootSourceOverrideEnabled");
    reader.finish().map_err(first)?;

    let target = match target {
        Some(name) => Some(TARGETS.iter().copied().find(|t| t.name == name).ok_or(
            GatewayError::PropertyValueNotInList {
                value: name,
                path: "Boot/BootSourceOverrideTarget".into(),
            },
        )?),
        None => None,
    };
    let enabled = match enabled {
        Some(value) => Some(OverrideEnabled::parse(&value).ok_or(GatewayError::PropertyValueNotInList {
            value,
            path: "Boot/BootSourceOverrideEnabled".into(),
        })?),
        None => None,
    };
    Ok(BootPatch { target, enabled })
}

/// Settings writes for one PATCH.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct BootWrites {
    /// New value of the one-time `Enabled` flag.
    pub one_time: bool,
    /// Source and mode for the copy selected by `one_time`.
    pub target: Option<BootTarget>,
}

/// Plan the writes of `patch` given the current one-time flag.
pub(super) fn plan(patch: BootPatch, one_time_now: bool) -> BootWrites {
    let one_time = match patch.enabled {
        Some(OverrideEnabled::Once) => true,
        Some(OverrideEnabled::Continuous | OverrideEnabled::Disabled) => false,
        None => one_time_now,
    };
    let target = match patch.enabled {
        Some(OverrideEnabled::Disabled) => Some(TARGETS[0]),
        _ => patch.target,
    };
    BootWrites { one_time, target }
}

fn unexpected(res: &mut Response, property: &str, value: &PropertyValue) {
    messages::record(
        res,
        &GatewayError::InternalError(format!("{} has type {}", property, value.kind())),
    );
}

/// Fill `Boot`: enabled flag first, then source and mode of the copy it selects.
pub(super) fn read(resp: &Arc<AsyncResp>) {
    resp.issue(
        BusCall::get_property(SETTINGS_SERVICE, BOOT_ONE_TIME_PATH, ENABLE_INTERFACE, "Enabled"),
        |result, res, resp| {
            let one_time = match result.and_then(BusReply::into_value) {
                Ok(PropertyValue::Bool(one_time)) => one_time,
                Ok(other) => return unexpected(res, "Enabled", &other),
                Err(e) => {
                    tracing::debug!(error = %e, "No boot override settings");
                    return;
                }
            };
            let object = settings_object(one_time);
            res.json["Boot"]["BootSourceOverrideEnabled"] = json!(if one_time { "Once" } else { "Continuous" });

            resp.issue(
                BusCall::get_property(SETTINGS_SERVICE, object, BOOT_SOURCE_INTERFACE, "BootSource"),
                move |result, res, resp| {
                    match result.and_then(BusReply::into_value) {
                        Ok(PropertyValue::Str(source)) => match target_for_source(&source) {
                            Some(target) => res.json["Boot"]["BootSourceOverrideTarget"] = json!(target),
                            None => tracing::warn!(source = %source, "Unmapped boot source"),
                        },
                        Ok(other) => return unexpected(res, "BootSource", &other),
                        Err(e) => return backend_error(res, e),
                    }
                    resp.issue(
                        BusCall::get_property(SETTINGS_SERVICE, object, BOOT_MODE_INTERFACE, "BootMode"),
                        |result, res, _| {
                            let mode = match result.and_then(BusReply::into_value) {
                                Ok(PropertyValue::Str(mode)) => mode,
                                Ok(other) => return unexpected(res, "BootMode", &other),
                                Err(e) => return backend_error(res, e),
                            };
                            let names: Vec<&str> = TARGETS.iter().map(|t| t.name).collect();
                            let boot = &mut res.json["Boot"];
                            boot["BootSourceOverrideMode"] = json!("Legacy");
                            boot["BootSourceOverrideTarget@Redfish.AllowableValues"] = json!(names);
                            if mode != BOOT_MODE_REGULAR {
                                match target_for_mode(&mode) {
                                    Some(target) => boot["BootSourceOverrideTarget"] = json!(target),
                                    None => tracing::warn!(mode = %mode, "Unmapped boot mode"),
                                }
                            }
                            if boot["BootSourceOverrideTarget"] == "None" {
                                boot["BootSourceOverrideEnabled"] = json!("Disabled");
                            }
                        },
                    );
                },
            );
        },
    );
}

/// Apply a validated patch.
pub(super) fn write(resp: &Arc<AsyncResp>, patch: BootPatch) {
    resp.issue(
        BusCall::get_property(SETTINGS_SERVICE, BOOT_ONE_TIME_PATH, ENABLE_INTERFACE, "Enabled"),
        move |result, res, resp| {
            let one_time_now = match result.and_then(BusReply::into_value) {
                Ok(PropertyValue::Bool(one_time)) => one_time,
                Ok(other) => return unexpected(res, "Enabled", &other),
                Err(e) => return backend_error(res, e),
            };
            let writes = plan(patch, one_time_now);
            tracing::info!(
                one_time = writes.one_time,
                boot_target = ?writes.target.map(|t| t.name),
                "Boot override update"
            );

            if let Some(target) = writes.target {
                let object = settings_object(writes.one_time);
                resp.issue(
                    BusCall::set_property(
                        SETTINGS_SERVICE,
                        object,
                        BOOT_SOURCE_INTERFACE,
                        "BootSource",
                        target.source_value(),
                    ),
                    write_done("Boot source update"),
                );
                resp.issue(
                    BusCall::set_property(SETTINGS_SERVICE, object, BOOT_MODE_INTERFACE, "BootMode", target.mode_value()),
                    write_done("Boot mode update"),
                );
            }
            resp.issue(
                BusCall::set_property(
                    SETTINGS_SERVICE,
                    BOOT_ONE_TIME_PATH,
                    ENABLE_INTERFACE,
                    "Enabled",
                    writes.one_time,
                ),
                write_done("Boot override enable update"),
            );
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> BootTarget {
        TARGETS.iter().copied().find(|t| t.name == name).unwrap()
    }

    #[test]
    fn test_source_and_mode_mappings() {
        assert_eq!(target_for_source(BOOT_SOURCE_DEFAULT), Some("None"));
        assert_eq!(target_for_source(&named("Pxe").source_value()), Some("Pxe"));
        assert_eq!(target_for_source(&named("Usb").source_value()), Some("Usb"));
        assert_eq!(target_for_source("xyz.openbmc_project.Control.Boot.Source.Sources.Floppy"), None);
        assert_eq!(target_for_mode(BOOT_MODE_REGULAR), Some("None"));
        assert_eq!(target_for_mode(&named("Diags").mode_value()), Some("Diags"));
        assert_eq!(target_for_mode(&named("BiosSetup").mode_value()), Some("BiosSetup"));
        assert_eq!(named("None").source_value(), BOOT_SOURCE_DEFAULT);
        assert_eq!(named("None").mode_value(), BOOT_MODE_REGULAR);
    }

    #[test]
    fn test_every_target_reads_back() {
        for t in TARGETS {
            let by_source = target_for_source(&t.source_value()).unwrap();
            let by_mode = target_for_mode(&t.mode_value()).unwrap();
            let read = if t.mode == "Regular" { by_source } else { by_mode };
            assert_eq!(read, t.name);
        }
    }

    #[test]
    fn test_parse_rejects_unknown_values() {
        assert_eq!(
            parse(&json!({"BootSourceOverrideTarget": "Floppy"})),
            Err(GatewayError::PropertyValueNotInList {
                value: "Floppy".into(),
                path: "Boot/BootSourceOverrideTarget".into()
            })
        );
        assert_eq!(
            parse(&json!({"BootSourceOverrideEnabled": "Always"})),
            Err(GatewayError::PropertyValueNotInList {
                value: "Always".into(),
                path: "Boot/BootSourceOverrideEnabled".into()
            })
        );
        assert_eq!(
            parse(&json!({"BootSourceOverrideMode": "UEFI"})),
            Err(GatewayError::PropertyUnknown("Boot/BootSourceOverrideMode".into()))
        );
        assert!(matches!(parse(&json!("Pxe")), Err(GatewayError::PropertyValueTypeError { .. })));
    }

    #[test]
    fn test_plan() {
        let pxe_once = BootPatch {
            target: Some(named("Pxe")),
            enabled: Some(OverrideEnabled::Once),
        };
        assert_eq!(
            plan(pxe_once, false),
            BootWrites {
                one_time: true,
                target: Some(named("Pxe"))
            }
        );

        // Target alone keeps the current copy.
        let hdd = BootPatch {
            target: Some(named("Hdd")),
            enabled: None,
        };
        assert!(plan(hdd, true).one_time);
        assert!(!plan(hdd, false).one_time);

        // Disabled resets the persistent copy to the defaults.
        let disabled = BootPatch {
            target: Some(named("Cd")),
            enabled: Some(OverrideEnabled::Disabled),
        };
        assert_eq!(
            plan(disabled, true),
            BootWrites {
                one_time: false,
                target: Some(named("None"))
            }
        );

        let continuous = BootPatch {
            target: None,
            enabled: Some(OverrideEnabled::Continuous),
        };
        assert_eq!(
            plan(continuous, true),
            BootWrites {
                one_time: false,
                target: None
            }
        );
    }
}
