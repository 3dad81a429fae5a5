//! Backend IPC bus subsystem.
//!
//! # Data Flow
//! ```text
//! Resource handler
//!     → BusCall (service, path, interface, member, args)
//!     → AsyncResp::issue (counts the call)
//!     → TimeoutBus (deadline per call)
//!     → Bus implementation (MemoryBus in-process object server)
//!     → Result<BusReply, BusError>
//!     → value.rs decode of property bags
//!     → continuation mutates the shared response document
//! ```
//!
//! # Design Decisions
//! - The bus is an explicit `Arc<dyn Bus>` handed down from startup, never a static
//! - Every call resolves, either with a reply or an error; timeouts are errors
//! - Property values are a closed sum type with an exhaustive kind match

pub mod memory;
pub mod message;
pub mod names;
pub mod seed;
pub mod timeout;
pub mod value;

use futures_util::future::BoxFuture;

pub use memory::{MemoryBus, ObjectStore};
pub use message::{BusCall, BusError, BusReply, SubTree};
pub use timeout::TimeoutBus;
pub use value::{
    decode, encode, field, DecodedProperties, FieldSpec, InterfaceMap, ManagedObjects,
    PropertyBag, PropertyValue, ValueKind,
};

/// Capability to issue calls on the backend bus.
pub trait Bus: Send + Sync + 'static {
    /// Dispatch one call. The returned future must always complete.
    fn call(&self, call: BusCall) -> BoxFuture<'static, Result<BusReply, BusError>>;
}

impl<B: Bus + ?Sized> Bus for std::sync::Arc<B> {
    fn call(&self, call: BusCall) -> BoxFuture<'static, Result<BusReply, BusError>> {
        (**self).call(call)
    }
}
