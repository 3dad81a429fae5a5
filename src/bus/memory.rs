//! In-process bus object server.
//!
//! # Responsibilities
//! - Hold a tree of service → object path → interface → properties
//! - Serve the standard Properties / ObjectManager / Delete members
//! - Answer ObjectMapper subtree queries from the same tree
//! - Dispatch registered custom methods (create calls, actions)
//! - Simulate latency and inject faults for tests
//!
//! # Design Decisions
//! - Calls execute against the store when issued; only the reply is delayed,
//!   so mutations apply in issue order while completions interleave
//! - Set requires an existing property with the same value kind

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crate::bus::message::{
    DELETE_INTERFACE, MAPPER_INTERFACE, OBJECT_MANAGER_INTERFACE, PROPERTIES_INTERFACE,
};
use crate::bus::{
    Bus, BusCall, BusError, BusReply, InterfaceMap, ManagedObjects, PropertyBag, PropertyValue, SubTree,
};

/// Custom method implementation.
pub type MethodHandler =
    Arc<dyn Fn(&mut ObjectStore, &BusCall) -> Result<BusReply, BusError> + Send + Sync>;

type FaultPredicate = Arc<dyn Fn(&BusCall) -> bool + Send + Sync>;

/// Object tree backing a [`MemoryBus`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectStore {
    services: BTreeMap<String, ManagedObjects>,
}

/// Error loading a fixture file.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an object tree from a JSON fixture.
    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Insert (or replace) one interface on an object, creating the object as needed.
    pub fn insert(&mut self, service: &str, path: &str, interface: &str, properties: PropertyBag) {
        self.services
            .entry(service.to_string())
            .or_default()
            .entry(path.to_string())
            .or_default()
            .insert(interface.to_string(), properties);
    }

    pub fn contains(&self, service: &str, path: &str) -> bool {
        self.services
            .get(service)
            .is_some_and(|objects| objects.contains_key(path))
    }

    pub fn object(&self, service: &str, path: &str) -> Result<&InterfaceMap, BusError> {
        self.services
            .get(service)
            .ok_or_else(|| BusError::UnknownService(service.to_string()))?
            .get(path)
            .ok_or_else(|| BusError::UnknownObject(path.to_string()))
    }

    pub fn object_mut(&mut self, service: &str, path: &str) -> Result<&mut InterfaceMap, BusError> {
        self.services
            .get_mut(service)
            .ok_or_else(|| BusError::UnknownService(service.to_string()))?
            .get_mut(path)
            .ok_or_else(|| BusError::UnknownObject(path.to_string()))
    }

    pub fn properties(&self, service: &str, path: &str, interface: &str) -> Result<&PropertyBag, BusError> {
        self.object(service, path)?
            .get(interface)
            .ok_or_else(|| BusError::UnknownInterface {
                path: path.to_string(),
                interface: interface.to_string(),
            })
    }

    pub fn remove(&mut self, service: &str, path: &str) -> Result<InterfaceMap, BusError> {
        self.services
            .get_mut(service)
            .ok_or_else(|| BusError::UnknownService(service.to_string()))?
            .remove(path)
            .ok_or_else(|| BusError::UnknownObject(path.to_string()))
    }

    /// Every object strictly below `root` in `service`.
    pub fn managed_objects(&self, service: &str, root: &str) -> Result<ManagedObjects, BusError> {
        let objects = self
            .services
            .get(service)
            .ok_or_else(|| BusError::UnknownService(service.to_string()))?;
        let prefix = if root.ends_with('/') {
            root.to_string()
        } else {
            format!("{}/", root)
        };
        Ok(objects
            .iter()
            .filter(|(path, _)| path.starts_with(&prefix))
            .map(|(path, interfaces)| (path.clone(), interfaces.clone()))
            .collect())
    }

    /// Objects of every service strictly below `root`, at most `depth`
    /// segments down (0 is unlimited), implementing any of `interfaces`
    /// (empty matches all).
    pub fn subtree(&self, root: &str, depth: usize, interfaces: &[String]) -> SubTree {
        let prefix = if root.ends_with('/') {
            root.to_string()
        } else {
            format!("{}/", root)
        };
        let mut tree = SubTree::new();
        for (service, objects) in &self.services {
            for (path, implemented) in objects {
                let Some(relative) = path.strip_prefix(&prefix) else {
                    continue;
                };
                if relative.is_empty() || (depth > 0 && relative.split('/').count() > depth) {
                    continue;
                }
                if !interfaces.is_empty() && !interfaces.iter().any(|i| implemented.contains_key(i)) {
                    continue;
                }
                tree.entry(path.clone())
                    .or_default()
                    .insert(service.clone(), implemented.keys().cloned().collect());
            }
        }
        tree
    }
}

/// In-process implementation of [`Bus`].
pub struct MemoryBus {
    store: RwLock<ObjectStore>,
    methods: HashMap<(String, String), MethodHandler>,
    faults: RwLock<Vec<FaultPredicate>>,
    latency: Duration,
    jitter: Duration,
    calls: AtomicU64,
}

impl std::fmt::Debug for MemoryBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBus")
            .field("methods", &self.methods.len())
            .field("latency", &self.latency)
            .field("jitter", &self.jitter)
            .field("calls", &self.calls.load(Ordering::Relaxed))
            .finish()
    }
}

impl MemoryBus {
    pub fn new(store: ObjectStore) -> Self {
        Self {
            store: RwLock::new(store),
            methods: HashMap::new(),
            faults: RwLock::new(Vec::new()),
            latency: Duration::ZERO,
            jitter: Duration::ZERO,
            calls: AtomicU64::new(0),
        }
    }

    /// Delay every reply by `latency` plus a random share of `jitter`.
    pub fn with_latency(mut self, latency: Duration, jitter: Duration) -> Self {
        self.latency = latency;
        self.jitter = jitter;
        self
    }

    /// Register a custom method.
    pub fn with_method<F>(mut self, interface: &str, member: &str, handler: F) -> Self
    where
        F: Fn(&mut ObjectStore, &BusCall) -> Result<BusReply, BusError> + Send + Sync + 'static,
    {
        self.methods
            .insert((interface.to_string(), member.to_string()), Arc::new(handler));
        self
    }

    /// Make every call matching `predicate` fail.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&BusCall) -> bool + Send + Sync + 'static,
    {
        self.faults
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(predicate));
    }

    /// Make every call of `interface.member` fail.
    pub fn fail_member(&self, interface: &str, member: &str) {
        let interface = interface.to_string();
        let member = member.to_string();
        self.fail_when(move |call| call.interface == interface && call.member == member);
    }

    pub fn clear_faults(&self) {
        self.faults.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Read access to the object tree.
    pub fn inspect<R>(&self, f: impl FnOnce(&ObjectStore) -> R) -> R {
        let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
        f(&store)
    }

    /// Write access to the object tree.
    pub fn modify<R>(&self, f: impl FnOnce(&mut ObjectStore) -> R) -> R {
        let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut store)
    }

    fn is_faulted(&self, call: &BusCall) -> bool {
        self.faults
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|predicate| predicate(call))
    }

    fn reply_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.latency;
        }
        let jitter_ms = fastrand::u64(0..=self.jitter.as_millis() as u64);
        self.latency + Duration::from_millis(jitter_ms)
    }

    fn execute(&self, call: &BusCall) -> Result<BusReply, BusError> {
        if self.is_faulted(call) {
            return Err(BusError::Failed(format!(
                "injected fault on {}.{}",
                call.interface, call.member
            )));
        }

        match (call.interface.as_str(), call.member.as_str()) {
            (PROPERTIES_INTERFACE, "Get") => {
                let interface = call.str_arg(0)?;
                let property = call.str_arg(1)?;
                let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
                store
                    .properties(&call.service, &call.path, interface)?
                    .get(property)
                    .cloned()
                    .map(BusReply::Value)
                    .ok_or_else(|| BusError::UnknownProperty(property.to_string()))
            }
            (PROPERTIES_INTERFACE, "GetAll") => {
                let interface = call.str_arg(0)?;
                let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
                let bag = store.properties(&call.service, &call.path, interface)?;
                Ok(BusReply::Properties(bag.clone()))
            }
            (PROPERTIES_INTERFACE, "Set") => {
                let interface = call.str_arg(0)?;
                let property = call.str_arg(1)?;
                let value = call
                    .args
                    .get(2)
                    .cloned()
                    .ok_or_else(|| BusError::InvalidArgs("missing value".to_string()))?;
                let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
                let bag = store
                    .object_mut(&call.service, &call.path)?
                    .get_mut(interface)
                    .ok_or_else(|| BusError::UnknownInterface {
                        path: call.path.clone(),
                        interface: interface.to_string(),
                    })?;
                let slot = bag
                    .get_mut(property)
                    .ok_or_else(|| BusError::UnknownProperty(property.to_string()))?;
                if slot.kind() != value.kind() {
                    return Err(BusError::InvalidArgs(format!(
                        "{} expects type {}, got {}",
                        property,
                        slot.kind(),
                        value.kind()
                    )));
                }
                *slot = value;
                Ok(BusReply::Empty)
            }
            (OBJECT_MANAGER_INTERFACE, "GetManagedObjects") => {
                let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
                Ok(BusReply::ManagedObjects(
                    store.managed_objects(&call.service, &call.path)?,
                ))
            }
            (DELETE_INTERFACE, "Delete") => {
                let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
                if !store.object(&call.service, &call.path)?.contains_key(DELETE_INTERFACE) {
                    return Err(BusError::UnknownInterface {
                        path: call.path.clone(),
                        interface: DELETE_INTERFACE.to_string(),
                    });
                }
                store.remove(&call.service, &call.path)?;
                Ok(BusReply::Empty)
            }
            (MAPPER_INTERFACE, member @ ("GetSubTree" | "GetSubTreePaths")) => {
                let root = call.str_arg(0)?;
                let depth = match call.args.get(1) {
                    Some(PropertyValue::I32(depth)) => usize::try_from(*depth).unwrap_or(0),
                    _ => return Err(BusError::InvalidArgs("argument 1 must be an i32".to_string())),
                };
                let interfaces = match call.args.get(2) {
                    Some(PropertyValue::StrList(interfaces)) => interfaces.as_slice(),
                    _ => return Err(BusError::InvalidArgs("argument 2 must be a string list".to_string())),
                };
                let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
                let tree = store.subtree(root, depth, interfaces);
                if member == "GetSubTree" {
                    Ok(BusReply::SubTree(tree))
                } else {
                    Ok(BusReply::Paths(tree.into_keys().collect()))
                }
            }
            (interface, member) => {
                let handler = self
                    .methods
                    .get(&(interface.to_string(), member.to_string()))
                    .ok_or_else(|| BusError::UnknownMethod {
                        interface: interface.to_string(),
                        member: member.to_string(),
                    })?;
                let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
                handler(&mut store, call)
            }
        }
    }
}

impl Bus for MemoryBus {
    fn call(&self, call: BusCall) -> BoxFuture<'static, Result<BusReply, BusError>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let result = self.execute(&call);
        tracing::trace!(
            service = %call.service,
            path = %call.path,
            interface = %call.interface,
            member = %call.member,
            ok = result.is_ok(),
            "Memory bus call"
        );
        let delay = self.reply_delay();
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::PropertyValue;

    fn store() -> ObjectStore {
        let mut store = ObjectStore::new();
        let mut ip = PropertyBag::new();
        ip.insert("Address".into(), "10.0.0.5".into());
        ip.insert("PrefixLength".into(), PropertyValue::Byte(24));
        store.insert("net", "/net/eth0/ipv4/a1", "IP", ip);
        store.insert("net", "/net/eth0/ipv4/a1", DELETE_INTERFACE, PropertyBag::new());
        store.insert("net", "/net/eth0", "Eth", PropertyBag::new());
        store.insert("net", "/netfoo", "Eth", PropertyBag::new());
        store
    }

    #[tokio::test]
    async fn test_get_and_set_property() {
        let bus = MemoryBus::new(store());
        let reply = bus
            .call(BusCall::get_property("net", "/net/eth0/ipv4/a1", "IP", "Address"))
            .await
            .unwrap();
        assert_eq!(reply, BusReply::Value("10.0.0.5".into()));

        bus.call(BusCall::set_property("net", "/net/eth0/ipv4/a1", "IP", "Address", "10.0.0.9"))
            .await
            .unwrap();
        let bag = bus
            .call(BusCall::get_all("net", "/net/eth0/ipv4/a1", "IP"))
            .await
            .unwrap()
            .into_properties()
            .unwrap();
        assert_eq!(bag["Address"], PropertyValue::Str("10.0.0.9".into()));
    }

    #[tokio::test]
    async fn test_set_rejects_wrong_kind() {
        let bus = MemoryBus::new(store());
        let err = bus
            .call(BusCall::set_property("net", "/net/eth0/ipv4/a1", "IP", "PrefixLength", "24"))
            .await
            .unwrap_err();
        assert!(matches!(err, BusError::InvalidArgs(_)));
    }

    #[tokio::test]
    async fn test_managed_objects_only_below_root() {
        let bus = MemoryBus::new(store());
        let objects = bus
            .call(BusCall::get_managed_objects("net", "/net"))
            .await
            .unwrap()
            .into_managed_objects()
            .unwrap();
        assert!(objects.contains_key("/net/eth0"));
        assert!(objects.contains_key("/net/eth0/ipv4/a1"));
        assert!(!objects.contains_key("/netfoo"));
    }

    #[tokio::test]
    async fn test_subtree_filters_by_interface_and_depth() {
        let mut store = store();
        store.insert("inv", "/net/eth0/ipv4/a1", "Item", PropertyBag::new());
        let bus = MemoryBus::new(store);

        let tree = bus
            .call(BusCall::get_subtree("/net", 0, &["IP", "Eth"]))
            .await
            .unwrap()
            .into_subtree()
            .unwrap();
        assert_eq!(
            tree.keys().collect::<Vec<_>>(),
            ["/net/eth0", "/net/eth0/ipv4/a1"]
        );
        // Only the service implementing a requested interface is listed.
        assert_eq!(tree["/net/eth0/ipv4/a1"].keys().collect::<Vec<_>>(), ["net"]);

        let paths = bus
            .call(BusCall::get_subtree_paths("/net", 1, &[]))
            .await
            .unwrap()
            .into_paths()
            .unwrap();
        assert_eq!(paths, ["/net/eth0"]);
    }

    #[tokio::test]
    async fn test_delete_requires_interface() {
        let bus = MemoryBus::new(store());
        assert!(bus.call(BusCall::delete("net", "/net/eth0")).await.is_err());
        bus.call(BusCall::delete("net", "/net/eth0/ipv4/a1")).await.unwrap();
        assert!(!bus.inspect(|s| s.contains("net", "/net/eth0/ipv4/a1")));
    }

    #[tokio::test]
    async fn test_fault_injection_and_unknown_method() {
        let bus = MemoryBus::new(store());
        bus.fail_member(PROPERTIES_INTERFACE, "GetAll");
        let err = bus
            .call(BusCall::get_all("net", "/net/eth0", "Eth"))
            .await
            .unwrap_err();
        assert!(matches!(err, BusError::Failed(_)));

        bus.clear_faults();
        let err = bus
            .call(BusCall::method("net", "/net", "Nope", "Nothing"))
            .await
            .unwrap_err();
        assert!(matches!(err, BusError::UnknownMethod { .. }));
        assert_eq!(bus.call_count(), 2);
    }
}
