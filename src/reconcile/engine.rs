//! Positional diff of a client-supplied list against backend entries.
//!
//! # Responsibilities
//! - Walk the client list and the backend list in lockstep
//! - Turn each client position into Create, Update, Delete or keep
//! - Stop at the first invalid position, keeping what came before it
//!
//! # Design Decisions
//! - Position is the correlation key; the backend list must already be in
//!   a stable order (identity order)
//! - Backend entries past the end of the client list are left alone
//! - The engine plans only; issuing bus calls is the caller's job

use serde_json::Value;
use std::fmt;

use crate::error::GatewayError;

/// Per-property rules for one kind of list entry.
pub trait EntrySchema {
    /// Validated content of one populated client item.
    type Patch: Clone + fmt::Debug + PartialEq;

    /// Name of the list-valued property, e.g. `IPv4StaticAddresses`.
    fn property(&self) -> &'static str;

    /// Field reported missing when `{}` targets a slot that does not exist.
    fn key_field(&self) -> &'static str {
        "Address"
    }

    /// Validate one populated item found at `path`.
    fn parse(&self, item: &Value, path: &str) -> Result<Self::Patch, GatewayError>;

    /// Check `patch` carries everything needed to create a new entry.
    fn complete(&self, patch: &Self::Patch, path: &str) -> Result<(), GatewayError>;
}

/// One planned change. `index` is the client list position.
#[derive(Debug, Clone, PartialEq)]
pub enum Action<P> {
    Create { index: usize, patch: P },
    Update { index: usize, id: String, patch: P },
    Delete { index: usize, id: String },
}

impl<P> Action<P> {
    pub fn index(&self) -> usize {
        match self {
            Action::Create { index, .. } | Action::Update { index, .. } | Action::Delete { index, .. } => *index,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Action::Create { .. } => "create",
            Action::Update { .. } => "update",
            Action::Delete { .. } => "delete",
        }
    }
}

/// Ordered actions plus the error that stopped planning, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan<P> {
    pub actions: Vec<Action<P>>,
    pub error: Option<GatewayError>,
}

impl<P> Plan<P> {
    fn new() -> Self {
        Self {
            actions: Vec::new(),
            error: None,
        }
    }

    fn stop(mut self, err: GatewayError) -> Self {
        self.error = Some(err);
        self
    }
}

/// Plan the changes that turn `backend` into `client`.
///
/// `backend` holds entry ids in identity order.
pub fn reconcile<S, I>(schema: &S, client: &Value, backend: &[I]) -> Plan<S::Patch>
where
    S: EntrySchema,
    I: AsRef<str>,
{
    let property = schema.property();
    let mut plan = Plan::new();
    let Some(items) = client.as_array() else {
        return plan.stop(GatewayError::PropertyValueTypeError {
            value: client.to_string(),
            path: property.to_string(),
        });
    };

    let mut remaining = backend.iter().map(AsRef::as_ref);
    for (index, item) in items.iter().enumerate() {
        let path = format!("{}/{}", property, index);

        if item.is_null() {
            match remaining.next() {
                Some(id) => plan.actions.push(Action::Delete {
                    index,
                    id: id.to_string(),
                }),
                None => {
                    return plan.stop(GatewayError::PropertyValueFormatError {
                        value: client.to_string(),
                        path,
                    })
                }
            }
            continue;
        }

        if item.as_object().is_some_and(|o| o.is_empty()) {
            if remaining.next().is_none() {
                return plan.stop(GatewayError::PropertyMissing(format!(
                    "{}/{}",
                    path,
                    schema.key_field()
                )));
            }
            continue;
        }

        let patch = match schema.parse(item, &path) {
            Ok(patch) => patch,
            Err(err) => return plan.stop(err),
        };
        match remaining.next() {
            Some(id) => plan.actions.push(Action::Update {
                index,
                id: id.to_string(),
                patch,
            }),
            None => {
                if let Err(err) = schema.complete(&patch, &path) {
                    return plan.stop(err);
                }
                plan.actions.push(Action::Create { index, patch });
            }
        }
    }
    plan
}
