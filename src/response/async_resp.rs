//! Completion-tracked fan-out over the bus.
//!
//! # Responsibilities
//! - Own one request's response document
//! - Count outstanding work: the handler's own synchronous pass plus
//!   every issued bus call
//! - Finalize exactly once, when the count drops to zero
//!
//! # Design Decisions
//! - The count is raised inside `issue`, before the call is dispatched,
//!   so no completion can observe a count that misses it
//! - Every unit of outstanding work is a `PendingGuard`; dropping the
//!   guard (including while unwinding) is the only way to release it
//! - Continuations run with the document lock held, so two continuations
//!   of one request never mutate the document at the same time
//! - Releasing past zero is a bug: debug builds assert, release builds
//!   log and ignore it

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::bus::{Bus, BusCall, BusError, BusReply};
use crate::error::GatewayError;
use crate::observability::metrics;
use crate::response::{messages, Response};

/// Callback run when an issued call settles.
pub type Continuation =
    Box<dyn FnOnce(Result<BusReply, BusError>, &mut Response, &Arc<AsyncResp>) + Send + 'static>;

type FinalHook = Box<dyn FnOnce(&mut Response) + Send + 'static>;

/// A release arrived after the count already reached zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("pending call counter released past zero")]
pub struct Underflow;

/// Shared state of one in-flight request.
pub struct AsyncResp {
    bus: Arc<dyn Bus>,
    doc: Mutex<Response>,
    pending: AtomicUsize,
    sink: Mutex<Option<oneshot::Sender<Response>>>,
    hooks: Mutex<Vec<FinalHook>>,
}

impl fmt::Debug for AsyncResp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncResp")
            .field("pending", &self.pending.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl AsyncResp {
    /// Start a request with `initial` as its document.
    ///
    /// The returned guard stands for the handler's synchronous work and
    /// holds the initial count of one.
    pub fn new(bus: Arc<dyn Bus>, initial: Response) -> (PendingGuard, Completion) {
        let (tx, rx) = oneshot::channel();
        let resp = Arc::new(Self {
            bus,
            doc: Mutex::new(initial),
            pending: AtomicUsize::new(1),
            sink: Mutex::new(Some(tx)),
            hooks: Mutex::new(Vec::new()),
        });
        (PendingGuard { resp }, Completion { rx })
    }

    pub fn bus(&self) -> &Arc<dyn Bus> {
        &self.bus
    }

    /// Exclusive access to the document.
    ///
    /// Must not be held while the last guard is dropped.
    pub fn doc(&self) -> MutexGuard<'_, Response> {
        self.doc.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record an error into the document.
    pub fn fail(&self, err: &GatewayError) {
        messages::record(&mut self.doc(), err);
    }

    /// Outstanding units of work.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Take one more unit of outstanding work.
    pub fn hold(self: &Arc<Self>) -> PendingGuard {
        let previous = self.pending.fetch_add(1, Ordering::AcqRel);
        if previous == 0 {
            tracing::error!("Work added to an already finalized response");
            debug_assert!(previous > 0, "work added to an already finalized response");
        }
        PendingGuard {
            resp: Arc::clone(self),
        }
    }

    /// Issue `call`; `continuation` runs once it settles, success or not.
    ///
    /// Safe to call from inside another continuation. Must be called from
    /// within a Tokio runtime.
    pub fn issue<F>(self: &Arc<Self>, call: BusCall, continuation: F)
    where
        F: FnOnce(Result<BusReply, BusError>, &mut Response, &Arc<AsyncResp>) + Send + 'static,
    {
        let guard = self.hold();
        let interface = call.interface.clone();
        let member = call.member.clone();
        tracing::debug!(
            service = %call.service,
            path = %call.path,
            interface = %interface,
            member = %member,
            pending = self.pending(),
            "Issuing bus call"
        );

        let reply = self.bus.call(call);
        metrics::bus_call_started();
        let started = Instant::now();

        tokio::spawn(async move {
            let result = reply.await;
            let outcome = match &result {
                Ok(_) => "ok",
                Err(e) => e.label(),
            };
            metrics::record_bus_call(&interface, &member, outcome, started);
            if let Err(e) = &result {
                tracing::debug!(interface = %interface, member = %member, error = %e, "Bus call failed");
            }

            let mut doc = guard.doc();
            continuation(result, &mut *doc, &guard.resp);
            drop(doc);
            drop(guard);
        });
    }

    /// Register a hook run once with the final document, before it is
    /// handed to the transport.
    pub fn on_final<F>(&self, hook: F)
    where
        F: FnOnce(&mut Response) + Send + 'static,
    {
        self.hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(hook));
    }

    /// Drop one unit of work. Returns whether this release finalized.
    pub(crate) fn try_release(&self) -> Result<bool, Underflow> {
        match self
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        {
            Ok(1) => {
                self.finalize();
                Ok(true)
            }
            Ok(_) => Ok(false),
            Err(_) => Err(Underflow),
        }
    }

    pub(crate) fn release(&self) {
        if let Err(e) = self.try_release() {
            tracing::error!(error = %e, "Ignoring release of a finalized response");
            debug_assert!(false, "pending call counter released past zero");
        }
    }

    fn finalize(&self) {
        let sink = self
            .sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(sink) = sink else {
            tracing::error!("Response finalized more than once");
            return;
        };

        let hooks = std::mem::take(&mut *self.hooks.lock().unwrap_or_else(PoisonError::into_inner));
        let mut doc = self.doc();
        for hook in hooks {
            hook(&mut *doc);
        }
        let response = std::mem::take(&mut *doc);
        drop(doc);

        tracing::trace!(status = %response.status, "Response finalized");
        if sink.send(response).is_err() {
            tracing::debug!("Response receiver gone before finalization");
        }
    }
}

/// One unit of outstanding work on an [`AsyncResp`]; released on drop.
#[must_use = "dropping the guard releases its unit of work immediately"]
pub struct PendingGuard {
    resp: Arc<AsyncResp>,
}

impl Deref for PendingGuard {
    type Target = Arc<AsyncResp>;

    fn deref(&self) -> &Self::Target {
        &self.resp
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.resp.release();
    }
}

impl fmt::Debug for PendingGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PendingGuard").field(&self.resp).finish()
    }
}

/// Resolves with the finished document.
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<Response>,
}

impl Completion {
    pub async fn wait(self) -> Response {
        match self.rx.await {
            Ok(response) => response,
            Err(_) => {
                tracing::error!("Response dropped without finalization");
                let mut response = Response::default();
                messages::record(
                    &mut response,
                    &GatewayError::InternalError("response dropped before completion".into()),
                );
                response
            }
        }
    }
}
