//! Manager Ethernet interfaces and their VLANs.
//!
//! # Data Flow
//! ```text
//! GET/PATCH .../EthernetInterfaces/{id}
//!     → GetManagedObjects on the network service
//!     → data.rs snapshot (interface, addresses, system configuration)
//!     → GET: render, then nested DHCP configuration read
//!     → PATCH: property writes + reconcile() plans for static address
//!       lists → addresses.rs issues Create / Set / Delete calls
//! ```

pub mod addresses;
pub mod collection;
pub mod data;
pub mod interface;
pub mod vlan;

use axum::http::Method;

use crate::routing::privilege::{CONFIGURE_COMPONENTS, CONFIGURE_MANAGER};
use crate::routing::EntityPrivileges;

pub use collection::EthernetCollection;
pub use interface::EthernetInterface;
pub use vlan::{VlanCollection, VlanInterface};

pub const COLLECTION_URI: &str = "/redfish/v1/Managers/bmc/EthernetInterfaces";

pub fn interface_uri(iface: &str) -> String {
    format!("{}/{}", COLLECTION_URI, iface)
}

pub fn vlan_uri(parent: &str, vlan: &str) -> String {
    format!("{}/{}/VLANs/{}", COLLECTION_URI, parent, vlan)
}

/// Network settings: reads need `Login`, writes need either
/// `ConfigureComponents` or `ConfigureManager`.
pub fn network_privileges(methods: &[Method]) -> EntityPrivileges {
    let writers: &[&[&str]] = &[&[CONFIGURE_COMPONENTS], &[CONFIGURE_MANAGER]];
    [Method::PATCH, Method::PUT, Method::POST, Method::DELETE]
        .into_iter()
        .fold(EntityPrivileges::standard(), |privileges, method| {
            privileges.allow(method, writers)
        })
        .only(methods)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::privilege::{Authorization, LOGIN};
    use crate::routing::PrivilegeSet;

    #[test]
    fn test_either_write_privilege_suffices() {
        let privileges = network_privileges(&[Method::GET, Method::PATCH]);
        let manager: PrivilegeSet = [LOGIN, CONFIGURE_MANAGER].into_iter().collect();
        let components: PrivilegeSet = [CONFIGURE_COMPONENTS].into_iter().collect();
        let reader: PrivilegeSet = [LOGIN].into_iter().collect();
        assert_eq!(privileges.authorize(&Method::PATCH, &manager), Authorization::Granted);
        assert_eq!(privileges.authorize(&Method::PATCH, &components), Authorization::Granted);
        assert_eq!(privileges.authorize(&Method::PATCH, &reader), Authorization::Denied);
        assert_eq!(privileges.authorize(&Method::DELETE, &manager), Authorization::VerbNotAllowed);
    }
}
