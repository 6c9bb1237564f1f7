//! Tokio-backed host dispatcher
//!
//! Runs an async host handler per request on a tokio runtime and posts the
//! handler's result back through the request's delivery handle. A handler
//! error abandons the request, and so does a task the runtime drops before
//! the handler finishes.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use otter_bridge_core::HostValue;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::capsule::CallbackToken;
use crate::delivery::DeliveryHandle;
use crate::dispatch::{HostDispatcher, Request};

/// Boxed future produced by a request handler
pub type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<HostValue>> + Send + 'static>>;

/// Abandon reason for a handler task dropped before it finished
pub const HANDLER_CANCELLED: &str = "request handler cancelled";

type Handler = Arc<dyn Fn(Request) -> HandlerFuture + Send + Sync>;

/// Dispatcher that serves requests with an async handler on a tokio runtime.
///
/// Asynchronous requests are spawned and delivered from the runtime's worker
/// threads. Synchronous requests block the engine thread until the handler
/// finishes, then deliver before `dispatch` returns. Blocking requires that
/// the engine thread is not itself driving the runtime, so use a
/// multi-threaded runtime or one running on another thread.
#[derive(Clone)]
pub struct TokioDispatcher {
    handle: Handle,
    handler: Handler,
}

impl TokioDispatcher {
    /// Serve requests with `handler` on the runtime behind `handle`
    pub fn new<F, Fut>(handle: Handle, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<HostValue>> + Send + 'static,
    {
        Self {
            handle,
            handler: Arc::new(move |request| Box::pin(handler(request)) as HandlerFuture),
        }
    }

    /// Use the runtime of the calling context
    pub fn current<F, Fut>(handler: F) -> anyhow::Result<Self>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<HostValue>> + Send + 'static,
    {
        let handle = Handle::try_current().context("TokioDispatcher needs a tokio runtime")?;
        Ok(Self::new(handle, handler))
    }
}

impl HostDispatcher for TokioDispatcher {
    fn dispatch(&self, request: Request, delivery: DeliveryHandle) -> anyhow::Result<()> {
        let token = request.callback();
        let is_async = request.is_async();
        let future = (self.handler)(request);

        if is_async {
            let pending = PendingResponse::new(delivery, token);
            self.handle.spawn(async move {
                pending.settle(future.await);
            });
            return Ok(());
        }

        let (tx, rx) = oneshot::channel();
        self.handle.spawn(async move {
            let _ = tx.send(future.await);
        });
        let response = rx
            .blocking_recv()
            .map_err(|_| anyhow!(HANDLER_CANCELLED))??;
        delivery.deliver(token, response)?;
        Ok(())
    }
}

/// Response owed to a spawned request.
///
/// Dropping it unsettled abandons the request, which covers a task cancelled
/// by runtime shutdown.
struct PendingResponse {
    delivery: DeliveryHandle,
    token: CallbackToken,
    settled: bool,
}

impl PendingResponse {
    fn new(delivery: DeliveryHandle, token: CallbackToken) -> Self {
        Self {
            delivery,
            token,
            settled: false,
        }
    }

    fn settle(mut self, result: anyhow::Result<HostValue>) {
        self.settled = true;
        let token = self.token;
        let posted = match result {
            Ok(response) => self.delivery.deliver(token, response),
            Err(err) => {
                warn!(%token, error = %err, "request handler failed");
                self.delivery.abandon(token, format!("{err:#}"))
            }
        };
        if let Err(err) = posted {
            debug!(%token, error = %err, "response not posted");
        }
    }
}

impl Drop for PendingResponse {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let token = self.token;
        warn!(%token, "request handler cancelled");
        if let Err(err) = self.delivery.abandon(token, HANDLER_CANCELLED) {
            debug!(%token, error = %err, "cancellation not posted");
        }
    }
}
