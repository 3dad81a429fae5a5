//! Computer system resources: collection, the host system and its reset action.

mod boot;
mod inventory;

use axum::http::Method;
use serde_json::json;
use std::sync::Arc;

use crate::bus::names::*;
use crate::bus::{decode, field, BusCall, BusError, PropertyValue, ValueKind};
use crate::error::GatewayError;
use crate::resources::{backend_error, body_reader, finish_body, link, write_done};
use crate::response::{messages, AsyncResp};
use crate::routing::{EntityPrivileges, RequestContext, Resource};

const SYSTEM_PATH: &str = "/redfish/v1/Systems/system";
const RESET_TARGET: &str = "/redfish/v1/Systems/system/Actions/ComputerSystem.Reset";

const RESET_TYPES: [&str; 8] = [
    "On",
    "ForceOff",
    "ForceOn",
    "ForceRestart",
    "GracefulRestart",
    "GracefulShutdown",
    "PowerCycle",
    "Nmi",
];

/// `/redfish/v1/Systems`
pub struct SystemCollection;

impl Resource for SystemCollection {
    fn template(&self) -> &'static str {
        "/redfish/v1/Systems"
    }

    fn get(&self, _req: &RequestContext, resp: &Arc<AsyncResp>) {
        resp.doc().json = json!({
            "@odata.type": "#ComputerSystemCollection.ComputerSystemCollection",
            "@odata.id": "/redfish/v1/Systems",
            "Name": "Computer System Collection",
            "Members": [link(SYSTEM_PATH)],
            "Members@odata.count": 1,
        });
    }
}

/// `/redfish/v1/Systems/system`
pub struct System;

impl Resource for System {
    fn template(&self) -> &'static str {
        SYSTEM_PATH
    }

    fn privileges(&self) -> EntityPrivileges {
        EntityPrivileges::standard().only(&[Method::GET, Method::HEAD, Method::PATCH])
    }

    fn get(&self, _req: &RequestContext, resp: &Arc<AsyncResp>) {
        resp.doc().json = json!({
            "@odata.type": "#ComputerSystem.v1_6_0.ComputerSystem",
            "@odata.id": SYSTEM_PATH,
            "Id": "system",
            "Name": "system",
            "Description": "Computer System",
            "SystemType": "Physical",
            "Status": { "Health": "OK", "State": "Enabled" },
            "Actions": {
                "#ComputerSystem.Reset": {
                    "target": RESET_TARGET,
                    "ResetType@Redfish.AllowableValues": RESET_TYPES,
                }
            },
            "Links": { "ManagedBy": [link("/redfish/v1/Managers/bmc")] },
        });
        inventory::seed(&mut resp.doc().json);

        resp.issue(
            BusCall::get_property(HOST_SERVICE, HOST_PATH, HOST_INTERFACE, "CurrentHostState"),
            |result, res, _| match result.and_then(|reply| reply.into_value()) {
                Ok(PropertyValue::Str(state)) => {
                    tracing::debug!(state = %state, "Host state");
                    let running = state == HOST_RUNNING;
                    res.json["PowerState"] = json!(if running { "On" } else { "Off" });
                    res.json["Status"]["State"] = json!(if running { "Enabled" } else { "Disabled" });
                }
                Ok(other) => tracing::warn!(kind = %other.kind(), "Host state has unexpected type"),
                Err(e) => backend_error(res, e),
            },
        );

        inventory::discover(resp);
        boot::read(resp);

        resp.issue(
            BusCall::get_managed_objects(LED_GROUP_SERVICE, LED_GROUPS_ROOT),
            |result, res, resp| {
                let objects = match result.and_then(|reply| reply.into_managed_objects()) {
                    Ok(objects) => objects,
                    Err(e) => return backend_error(res, e),
                };
                let Some(group) = objects
                    .iter()
                    .find(|(path, _)| path.ends_with("enclosure_identify"))
                    .and_then(|(_, interfaces)| interfaces.get(LED_GROUP_INTERFACE))
                else {
                    return;
                };
                let asserted = decode(group, &[field("Asserted", ValueKind::Bool)]).bool("Asserted");
                if !asserted {
                    res.json["IndicatorLED"] = json!("Off");
                    return;
                }

                resp.issue(
                    BusCall::get_all(LED_CONTROLLER_SERVICE, LED_IDENTIFY_PATH, LED_PHYSICAL_INTERFACE),
                    |result, res, _| match result.and_then(|reply| reply.into_properties()) {
                        Ok(bag) => {
                            let state = decode(&bag, &[field("State", ValueKind::Str)]).string("State");
                            if let Some(led) = indicator_from_action(&state) {
                                res.json["IndicatorLED"] = json!(led);
                            }
                        }
                        Err(e) => backend_error(res, e),
                    },
                );
            },
        );
    }

    fn patch(&self, req: &RequestContext, resp: &Arc<AsyncResp>) {
        let Some(mut body) = body_reader(req, resp) else {
            return;
        };
        let indicator = body.string("IndicatorLED");
        let boot = body.value("Boot");
        if !finish_body(body, resp) {
            return;
        }

        let boot = match boot.map(boot::parse).transpose() {
            Ok(boot) => boot,
            Err(err) => {
                resp.fail(&err);
                return;
            }
        };
        let action = match indicator {
            Some(indicator) => match action_from_indicator(&indicator) {
                Some(action) => Some(action),
                None => {
                    resp.fail(&GatewayError::PropertyValueNotInList {
                        value: indicator,
                        path: "IndicatorLED".into(),
                    });
                    return;
                }
            },
            None => None,
        };

        messages::no_content(&mut resp.doc());
        if let Some(boot) = boot.filter(|boot| !boot.is_empty()) {
            boot::write(resp, boot);
        }
        let Some(action) = action else {
            return;
        };

        resp.issue(
            BusCall::set_property(
                LED_GROUP_SERVICE,
                LED_IDENTIFY_GROUP_PATH,
                LED_GROUP_INTERFACE,
                "Asserted",
                action != LED_ACTION_OFF,
            ),
            write_done("Led group update"),
        );
        resp.issue(
            BusCall::set_property(
                LED_CONTROLLER_SERVICE,
                LED_IDENTIFY_PATH,
                LED_PHYSICAL_INTERFACE,
                "State",
                action,
            ),
            write_done("Led state update"),
        );
    }
}

fn action_from_indicator(indicator: &str) -> Option<&'static str> {
    match indicator {
        "Lit" => Some(LED_ACTION_ON),
        "Blinking" => Some(LED_ACTION_BLINK),
        "Off" => Some(LED_ACTION_OFF),
        _ => None,
    }
}

fn indicator_from_action(action: &str) -> Option<&'static str> {
    match action.rsplit('.').next()? {
        "On" => Some("Lit"),
        "Blink" => Some("Blinking"),
        "Off" => Some("Off"),
        _ => None,
    }
}

/// Backend target of one reset type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResetCommand {
    Host(&'static str),
    Chassis(&'static str),
    Nmi,
}

fn reset_command(reset_type: &str) -> Option<ResetCommand> {
    Some(match reset_type {
        "On" | "ForceOn" => ResetCommand::Host("xyz.openbmc_project.State.Host.Transition.On"),
        "GracefulShutdown" => ResetCommand::Host("xyz.openbmc_project.State.Host.Transition.Off"),
        "GracefulRestart" => ResetCommand::Host("xyz.openbmc_project.State.Host.Transition.Reboot"),
        "ForceOff" => ResetCommand::Chassis("xyz.openbmc_project.State.Chassis.Transition.Off"),
        "ForceRestart" => ResetCommand::Chassis("xyz.openbmc_project.State.Chassis.Transition.Reset"),
        "PowerCycle" => ResetCommand::Chassis("xyz.openbmc_project.State.Chassis.Transition.PowerCycle"),
        "Nmi" => ResetCommand::Nmi,
        _ => return None,
    })
}

/// `ComputerSystem.Reset` action.
pub struct SystemReset;

impl Resource for SystemReset {
    fn template(&self) -> &'static str {
        RESET_TARGET
    }

    fn privileges(&self) -> EntityPrivileges {
        EntityPrivileges::standard().only(&[Method::POST])
    }

    fn post(&self, req: &RequestContext, resp: &Arc<AsyncResp>) {
        let Some(mut body) = body_reader(req, resp) else {
            return;
        };
        let reset_type = body.string("ResetType");
        if !finish_body(body, resp) {
            return;
        }
        let Some(reset_type) = reset_type else {
            resp.fail(&GatewayError::PropertyMissing("ResetType".into()));
            return;
        };
        let Some(command) = reset_command(&reset_type) else {
            resp.fail(&GatewayError::ActionParameterUnknown {
                action: "Reset".into(),
                parameter: reset_type,
            });
            return;
        };

        tracing::info!(reset_type = %reset_type, command = ?command, "System reset requested");
        let call = match command {
            ResetCommand::Host(transition) => BusCall::set_property(
                HOST_SERVICE,
                HOST_PATH,
                HOST_INTERFACE,
                "RequestedHostTransition",
                transition,
            ),
            ResetCommand::Chassis(transition) => BusCall::set_property(
                CHASSIS_SERVICE,
                CHASSIS_PATH,
                CHASSIS_INTERFACE,
                "RequestedPowerTransition",
                transition,
            ),
            ResetCommand::Nmi => BusCall::method(NMI_SERVICE, NMI_PATH, NMI_INTERFACE, "NMI"),
        };
        resp.issue(call, move |result, res, _| match result {
            Ok(_) => messages::success(res),
            Err(BusError::InvalidArgs(reason)) => {
                tracing::warn!(reset_type = %reset_type, reason = %reason, "Reset rejected");
                messages::record(
                    res,
                    &GatewayError::ActionParameterNotSupported {
                        action: "Reset".into(),
                        parameter: reset_type,
                    },
                );
            }
            Err(e) => backend_error(res, e),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indicator_mapping_round_trips() {
        for indicator in ["Lit", "Blinking", "Off"] {
            let action = action_from_indicator(indicator).unwrap();
            assert_eq!(indicator_from_action(action), Some(indicator));
        }
        assert_eq!(action_from_indicator("On"), None);
        assert_eq!(indicator_from_action("garbage"), None);
    }

    #[test]
    fn test_reset_command_targets() {
        assert!(matches!(reset_command("On"), Some(ResetCommand::Host(_))));
        assert!(matches!(reset_command("ForceOff"), Some(ResetCommand::Chassis(_))));
        assert_eq!(reset_command("Nmi"), Some(ResetCommand::Nmi));
        assert_eq!(reset_command("Explode"), None);
        for reset_type in RESET_TYPES {
            assert!(reset_command(reset_type).is_some(), "{} has no command", reset_type);
        }
    }
}
