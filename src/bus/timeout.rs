//! Per-call deadline enforcement.
//!
//! # Responsibilities
//! - Wrap every bus call with a timeout
//! - Turn an expired deadline into `BusError::Timeout`
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - A timed-out call still resolves, so its continuation always runs
//!   and the owning response can finalize

use futures_util::future::BoxFuture;
use std::time::Duration;

use crate::bus::{Bus, BusCall, BusError, BusReply};

/// Bus decorator that bounds each call by `deadline`.
#[derive(Debug)]
pub struct TimeoutBus<B> {
    inner: B,
    deadline: Duration,
}

impl<B: Bus> TimeoutBus<B> {
    pub fn new(inner: B, deadline: Duration) -> Self {
        Self { inner, deadline }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }
}

impl<B: Bus> Bus for TimeoutBus<B> {
    fn call(&self, call: BusCall) -> BoxFuture<'static, Result<BusReply, BusError>> {
        let member = format!("{}.{}", call.interface, call.member);
        let deadline = self.deadline;
        let pending = self.inner.call(call);
        Box::pin(async move {
            match tokio::time::timeout(deadline, pending).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(member = %member, after_ms = deadline.as_millis() as u64, "Bus call timed out");
                    Err(BusError::Timeout {
                        member,
                        after_ms: deadline.as_millis() as u64,
                    })
                }
            }
        })
    }
}
