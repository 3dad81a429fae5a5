//! Backend call descriptors and replies.

use thiserror::Error;

use std::collections::BTreeMap;

use crate::bus::value::{ManagedObjects, PropertyBag, PropertyValue};

pub const PROPERTIES_INTERFACE: &str = "org.freedesktop.DBus.Properties";
pub const OBJECT_MANAGER_INTERFACE: &str = "org.freedesktop.DBus.ObjectManager";
pub const DELETE_INTERFACE: &str = "xyz.openbmc_project.Object.Delete";

pub const MAPPER_SERVICE: &str = "xyz.openbmc_project.ObjectMapper";
pub const MAPPER_PATH: &str = "/xyz/openbmc_project/object_mapper";
pub const MAPPER_INTERFACE: &str = "xyz.openbmc_project.ObjectMapper";

/// Object path → service → interfaces, as returned by `GetSubTree`.
pub type SubTree = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// One IPC invocation: target identity plus arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct BusCall {
    pub service: String,
    pub path: String,
    pub interface: String,
    pub member: String,
    pub args: Vec<PropertyValue>,
}

impl BusCall {
    /// Plain method call with no arguments yet.
    pub fn method(
        service: impl Into<String>,
        path: impl Into<String>,
        interface: impl Into<String>,
        member: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            path: path.into(),
            interface: interface.into(),
            member: member.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, value: impl Into<PropertyValue>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn get_property(
        service: impl Into<String>,
        path: impl Into<String>,
        interface: &str,
        property: &str,
    ) -> Self {
        Self::method(service, path, PROPERTIES_INTERFACE, "Get")
            .arg(interface)
            .arg(property)
    }

    pub fn set_property(
        service: impl Into<String>,
        path: impl Into<String>,
        interface: &str,
        property: &str,
        value: impl Into<PropertyValue>,
    ) -> Self {
        Self::method(service, path, PROPERTIES_INTERFACE, "Set")
            .arg(interface)
            .arg(property)
            .arg(value)
    }

    pub fn get_all(service: impl Into<String>, path: impl Into<String>, interface: &str) -> Self {
        Self::method(service, path, PROPERTIES_INTERFACE, "GetAll").arg(interface)
    }

    pub fn get_managed_objects(service: impl Into<String>, path: impl Into<String>) -> Self {
        Self::method(service, path, OBJECT_MANAGER_INTERFACE, "GetManagedObjects")
    }

    pub fn delete(service: impl Into<String>, path: impl Into<String>) -> Self {
        Self::method(service, path, DELETE_INTERFACE, "Delete")
    }

    /// Mapper query for objects below `root` implementing any of `interfaces`.
    ///
    /// `depth` 0 means unlimited.
    pub fn get_subtree(root: &str, depth: i32, interfaces: &[&str]) -> Self {
        Self::mapper_query("GetSubTree", root, depth, interfaces)
    }

    /// Like [`BusCall::get_subtree`] but replies with object paths only.
    pub fn get_subtree_paths(root: &str, depth: i32, interfaces: &[&str]) -> Self {
        Self::mapper_query("GetSubTreePaths", root, depth, interfaces)
    }

    fn mapper_query(member: &str, root: &str, depth: i32, interfaces: &[&str]) -> Self {
        let interfaces: Vec<String> = interfaces.iter().map(|i| i.to_string()).collect();
        Self::method(MAPPER_SERVICE, MAPPER_PATH, MAPPER_INTERFACE, member)
            .arg(root)
            .arg(PropertyValue::I32(depth))
            .arg(interfaces)
    }

    /// `Str` argument at `index`, used by bus implementations.
    pub fn str_arg(&self, index: usize) -> Result<&str, BusError> {
        self.args
            .get(index)
            .and_then(PropertyValue::as_str)
            .ok_or_else(|| BusError::InvalidArgs(format!("argument {} must be a string", index)))
    }
}

/// Typed reply of a successful call.
#[derive(Debug, Clone, PartialEq)]
pub enum BusReply {
    Empty,
    Value(PropertyValue),
    Properties(PropertyBag),
    ManagedObjects(ManagedObjects),
    ObjectPath(String),
    SubTree(SubTree),
    Paths(Vec<String>),
}

impl BusReply {
    fn shape(&self) -> &'static str {
        match self {
            BusReply::Empty => "empty",
            BusReply::Value(_) => "value",
            BusReply::Properties(_) => "properties",
            BusReply::ManagedObjects(_) => "managed objects",
            BusReply::ObjectPath(_) => "object path",
            BusReply::SubTree(_) => "subtree",
            BusReply::Paths(_) => "paths",
        }
    }

    pub fn into_value(self) -> Result<PropertyValue, BusError> {
        match self {
            BusReply::Value(v) => Ok(v),
            other => Err(BusError::UnexpectedReply {
                expected: "value",
                actual: other.shape(),
            }),
        }
    }

    pub fn into_properties(self) -> Result<PropertyBag, BusError> {
        match self {
            BusReply::Properties(bag) => Ok(bag),
            other => Err(BusError::UnexpectedReply {
                expected: "properties",
                actual: other.shape(),
            }),
        }
    }

    pub fn into_managed_objects(self) -> Result<ManagedObjects, BusError> {
        match self {
            BusReply::ManagedObjects(objects) => Ok(objects),
            other => Err(BusError::UnexpectedReply {
                expected: "managed objects",
                actual: other.shape(),
            }),
        }
    }

    pub fn into_object_path(self) -> Result<String, BusError> {
        match self {
            BusReply::ObjectPath(path) => Ok(path),
            other => Err(BusError::UnexpectedReply {
                expected: "object path",
                actual: other.shape(),
            }),
        }
    }

    pub fn into_subtree(self) -> Result<SubTree, BusError> {
        match self {
            BusReply::SubTree(tree) => Ok(tree),
            other => Err(BusError::UnexpectedReply {
                expected: "subtree",
                actual: other.shape(),
            }),
        }
    }

    pub fn into_paths(self) -> Result<Vec<String>, BusError> {
        match self {
            BusReply::Paths(paths) => Ok(paths),
            other => Err(BusError::UnexpectedReply {
                expected: "paths",
                actual: other.shape(),
            }),
        }
    }
}

/// Failure of a single bus call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("call to {member} timed out after {after_ms} ms")]
    Timeout { member: String, after_ms: u64 },

    #[error("unknown service: {0}")]
    UnknownService(String),

    #[error("unknown object: {0}")]
    UnknownObject(String),

    #[error("unknown interface {interface} on {path}")]
    UnknownInterface { path: String, interface: String },

    #[error("unknown method {interface}.{member}")]
    UnknownMethod { interface: String, member: String },

    #[error("unknown property {0}")]
    UnknownProperty(String),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("method failed: {0}")]
    Failed(String),

    #[error("bus disconnected")]
    Disconnected,

    #[error("unexpected reply: expected {expected}, got {actual}")]
    UnexpectedReply {
        expected: &'static str,
        actual: &'static str,
    },
}

impl BusError {
    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            BusError::Timeout { .. } => "timeout",
            BusError::UnknownService(_)
            | BusError::UnknownObject(_)
            | BusError::UnknownInterface { .. }
            | BusError::UnknownMethod { .. }
            | BusError::UnknownProperty(_) => "unknown",
            BusError::InvalidArgs(_) => "invalid_args",
            BusError::Failed(_) => "failed",
            BusError::Disconnected => "disconnected",
            BusError::UnexpectedReply { .. } => "unexpected_reply",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_property_layout() {
        let call = BusCall::set_property(
            "svc",
            "/obj",
            "xyz.openbmc_project.Network.IP",
            "Gateway",
            "10.0.0.1",
        );
        assert_eq!(call.interface, PROPERTIES_INTERFACE);
        assert_eq!(call.member, "Set");
        assert_eq!(call.str_arg(0).unwrap(), "xyz.openbmc_project.Network.IP");
        assert_eq!(call.str_arg(1).unwrap(), "Gateway");
        assert_eq!(call.args[2], PropertyValue::Str("10.0.0.1".into()));
    }

    #[test]
    fn test_subtree_query_layout() {
        let call = BusCall::get_subtree("/xyz/openbmc_project/inventory", 0, &["a.B", "c.D"]);
        assert_eq!(call.service, MAPPER_SERVICE);
        assert_eq!(call.member, "GetSubTree");
        assert_eq!(call.args[1], PropertyValue::I32(0));
        assert_eq!(
            call.args[2],
            PropertyValue::StrList(vec!["a.B".into(), "c.D".into()])
        );
    }

    #[test]
    fn test_reply_shape_mismatch() {
        let err = BusReply::Empty.into_properties().unwrap_err();
        assert_eq!(
            err,
            BusError::UnexpectedReply {
                expected: "properties",
                actual: "empty"
            }
        );
    }
}
