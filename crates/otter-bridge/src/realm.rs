//! Realm
//!
//! A realm is one engine context together with its bridge state: the handle
//! arena, the host local reference table, the callbacks held for in-flight
//! requests, and the receiving end of the delivery channel.
//!
//! Realms live on the engine thread and are not `Send`:
//!
//! ```compile_fail
//! use otter_bridge::Realm;
//!
//! let realm = Realm::new();
//! std::thread::spawn(move || {
//!     let _ = realm.live_capsules(); // Error: Realm is !Send
//! });
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, unbounded};
use otter_bridge_core::{
    CodecResult, HandleArena, HandleScope, HostValue, LocalRefTable, Marshaler, ScriptFunction,
    ScriptValue,
};
use scopeguard::ScopeGuard;
use tracing::{debug, debug_span, trace, warn};

use crate::capsule::{CallbackCapsule, CallbackToken, CapsuleTable};
use crate::config::BridgeConfig;
use crate::delivery::{DeliveryHandle, DeliveryMessage};
use crate::dispatch::{HostDispatcher, validate};
use crate::error::{BridgeError, BridgeResult};
use crate::stats::{BridgeStats, BridgeStatsSnapshot};

/// What happened to one message taken off the delivery channel
#[derive(Debug)]
pub enum DeliveryOutcome {
    /// The callback ran and returned `result`
    Delivered {
        token: CallbackToken,
        result: ScriptValue,
    },
    /// The host gave up; the callback was released without running
    Abandoned {
        token: CallbackToken,
        reason: String,
    },
    /// Arguments failed to convert, or the callback threw. Either way the
    /// callback has been released.
    Failed {
        token: CallbackToken,
        error: BridgeError,
    },
    /// The callback was already released when the message arrived
    Orphaned { token: CallbackToken },
}

impl DeliveryOutcome {
    /// Token of the request this outcome belongs to
    pub fn token(&self) -> CallbackToken {
        match self {
            Self::Delivered { token, .. }
            | Self::Abandoned { token, .. }
            | Self::Failed { token, .. }
            | Self::Orphaned { token } => *token,
        }
    }

    /// Check if the callback ran to completion
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

/// Builder for a [`Realm`]
#[derive(Default)]
pub struct RealmBuilder {
    config: BridgeConfig,
    dispatcher: Option<Rc<dyn HostDispatcher>>,
}

impl RealmBuilder {
    /// Use `config` for limits, local table size and projections
    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    /// Install the host dispatcher requests are sent to
    pub fn dispatcher(mut self, dispatcher: impl HostDispatcher + 'static) -> Self {
        self.dispatcher = Some(Rc::new(dispatcher));
        self
    }

    /// Size of the host local reference table
    pub fn local_ref_capacity(mut self, capacity: usize) -> Self {
        self.config.local_ref_capacity = capacity;
        self
    }

    /// Create the realm and its delivery channel
    pub fn build(self) -> Realm {
        let (sender, receiver) = unbounded();
        let stats = Arc::new(BridgeStats::new());
        debug!(
            local_ref_capacity = self.config.local_ref_capacity,
            has_dispatcher = self.dispatcher.is_some(),
            "realm created"
        );
        Realm {
            handles: HandleArena::new(self.config.limits),
            locals: LocalRefTable::new(self.config.local_ref_capacity),
            capsules: CapsuleTable::default(),
            dispatcher: RefCell::new(self.dispatcher),
            delivery: DeliveryHandle::new(sender, stats.clone()),
            receiver,
            parked: RefCell::default(),
            stats,
            config: self.config,
        }
    }
}

/// One engine context and the bridge state attached to it
pub struct Realm {
    config: BridgeConfig,
    handles: HandleArena,
    locals: LocalRefTable,
    capsules: CapsuleTable,
    dispatcher: RefCell<Option<Rc<dyn HostDispatcher>>>,
    delivery: DeliveryHandle,
    receiver: Receiver<DeliveryMessage>,
    /// Outcomes settled inside a synchronous drain that belong to another
    /// request; handed out by the next `run_pending`
    parked: RefCell<Vec<DeliveryOutcome>>,
    stats: Arc<BridgeStats>,
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}

impl Realm {
    /// Create a realm with default configuration and no dispatcher
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start configuring a realm
    pub fn builder() -> RealmBuilder {
        RealmBuilder::default()
    }

    /// Configuration the realm was built with
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Engine handle arena
    pub fn handles(&self) -> &HandleArena {
        &self.handles
    }

    /// Host local reference table
    pub fn local_refs(&self) -> &LocalRefTable {
        &self.locals
    }

    /// Value converter bound to this realm's scopes and options
    pub fn marshaler(&self) -> Marshaler<'_> {
        Marshaler::new(&self.handles, &self.locals).with_options(self.config.codec_options())
    }

    /// Replace the host dispatcher
    pub fn install_dispatcher(&self, dispatcher: impl HostDispatcher + 'static) {
        *self.dispatcher.borrow_mut() = Some(Rc::new(dispatcher));
    }

    /// Remove the host dispatcher, returning whether one was installed
    pub fn remove_dispatcher(&self) -> bool {
        self.dispatcher.borrow_mut().take().is_some()
    }

    /// A handle host threads can deliver through
    pub fn delivery_handle(&self) -> DeliveryHandle {
        self.delivery.clone()
    }

    /// Hold a callback until it is delivered, abandoned or released
    pub fn capture(&self, callback: &ScriptValue) -> BridgeResult<CallbackToken> {
        let token = self.capsules.insert(CallbackCapsule::capture(callback)?);
        self.delivery.register(token);
        Ok(token)
    }

    /// Release a held callback without invoking it.
    ///
    /// Returns `false` when the token was not live. Any message the host
    /// already posted for it is reported as orphaned.
    pub fn release(&self, token: CallbackToken) -> bool {
        self.delivery.forget(token);
        match self.capsules.take(token) {
            Some(capsule) => {
                capsule.release();
                true
            }
            None => false,
        }
    }

    /// Check if `token` still holds a callback
    pub fn is_live(&self, token: CallbackToken) -> bool {
        self.capsules.contains(token)
    }

    /// Number of callbacks currently held
    pub fn live_capsules(&self) -> usize {
        self.capsules.len()
    }

    /// Snapshot of the delivery counters
    pub fn stats(&self) -> BridgeStatsSnapshot {
        self.stats.snapshot(self.capsules.len())
    }

    /// `httpSend(method, url, headers, async, callback)`.
    ///
    /// Validation failures return before the host is involved and before the
    /// callback is captured. Once captured, the callback is released on every
    /// path where the dispatcher does not accept the request.
    ///
    /// Returns `undefined` for asynchronous requests. With `async == false`
    /// the delivery queue is drained before returning, so a dispatcher that
    /// delivers in-line has its callback run inside this call and the
    /// callback's return value comes back here. If that callback throws, the
    /// error is returned instead.
    pub fn http_send(&self, args: &[ScriptValue]) -> BridgeResult<ScriptValue> {
        let call = validate(args).inspect_err(|err| debug!(error = %err, "httpSend rejected"))?;
        let dispatcher = self
            .dispatcher
            .borrow()
            .clone()
            .ok_or_else(|| BridgeError::dispatch_unavailable("no host dispatcher installed"))?;

        let token = self.capture(call.callback)?;
        let pending = scopeguard::guard(token, |token| {
            self.release(token);
        });

        let is_async = call.is_async;
        let request = call.into_request(token);
        let span = debug_span!(
            "http_send",
            %token,
            method = request.method(),
            url = request.url(),
            is_async
        );
        let _enter = span.enter();
        trace!(headers = request.headers().len(), "dispatching request");

        if let Err(err) = dispatcher.dispatch(request, self.delivery.clone()) {
            warn!(error = %err, "host dispatch failed");
            return Err(BridgeError::dispatch_unavailable(format!("{err:#}")));
        }
        let token = ScopeGuard::into_inner(pending);
        BridgeStats::record(&self.stats.dispatched);

        if is_async {
            return Ok(ScriptValue::Undefined);
        }
        self.drain_sync(token)
    }

    /// `httpSend` as a callable script function.
    ///
    /// The function holds the realm weakly; calling it after the realm is
    /// dropped throws.
    pub fn http_send_function(self: &Rc<Self>) -> ScriptFunction {
        let realm = Rc::downgrade(self);
        ScriptFunction::new("httpSend", move |args| {
            let realm = realm
                .upgrade()
                .ok_or_else(|| BridgeError::RealmClosed.into_pending_exception())?;
            realm.http_send(args).map_err(BridgeError::into_pending_exception)
        })
    }

    /// Settle every message currently queued, including ones posted by
    /// callbacks while the queue drains.
    ///
    /// Outcomes a synchronous `http_send` settled on behalf of other requests
    /// are returned here too.
    pub fn run_pending(&self) -> Vec<DeliveryOutcome> {
        let mut outcomes = self.take_parked();
        while let Ok(message) = self.receiver.try_recv() {
            let outcome = self.settle(message);
            outcomes.append(&mut self.take_parked());
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Settle messages until no callback is held or `timeout` passes.
    ///
    /// A timeout too large to represent as a deadline waits without limit.
    pub fn run_until_idle(&self, timeout: Duration) -> Vec<DeliveryOutcome> {
        let deadline = Instant::now().checked_add(timeout);
        let mut outcomes = self.run_pending();
        while !self.capsules.is_empty() {
            let received = match deadline {
                Some(deadline) => self
                    .receiver
                    .recv_timeout(deadline.saturating_duration_since(Instant::now()))
                    .ok(),
                None => self.receiver.recv().ok(),
            };
            let Some(message) = received else {
                debug!(live = self.capsules.len(), "run_until_idle timed out");
                break;
            };
            let outcome = self.settle(message);
            outcomes.append(&mut self.take_parked());
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Settle queued messages until `token` has an outcome.
    ///
    /// Callbacks settled along the way may send synchronously themselves, so
    /// the outcome can turn up parked by a nested drain rather than from this
    /// loop. Everything that is not ours stays parked for `run_pending`.
    fn drain_sync(&self, token: CallbackToken) -> BridgeResult<ScriptValue> {
        loop {
            if let Some(outcome) = self.unpark(token) {
                return match outcome {
                    DeliveryOutcome::Delivered { result, .. } => Ok(result),
                    DeliveryOutcome::Failed { error, .. } => Err(error),
                    DeliveryOutcome::Abandoned { .. } | DeliveryOutcome::Orphaned { .. } => {
                        Ok(ScriptValue::Undefined)
                    }
                };
            }
            let Ok(message) = self.receiver.try_recv() else {
                break;
            };
            let outcome = self.settle(message);
            self.parked.borrow_mut().push(outcome);
        }
        debug!(%token, "synchronous request not delivered during dispatch");
        Ok(ScriptValue::Undefined)
    }

    fn unpark(&self, token: CallbackToken) -> Option<DeliveryOutcome> {
        let mut parked = self.parked.borrow_mut();
        let index = parked.iter().position(|outcome| outcome.token() == token)?;
        Some(parked.remove(index))
    }

    fn take_parked(&self) -> Vec<DeliveryOutcome> {
        std::mem::take(&mut *self.parked.borrow_mut())
    }

    fn settle(&self, message: DeliveryMessage) -> DeliveryOutcome {
        let token = message.token();
        let Some(capsule) = self.capsules.take(token) else {
            debug!(%token, "message for a released callback");
            return DeliveryOutcome::Orphaned { token };
        };

        match message {
            DeliveryMessage::Abandon { reason, .. } => {
                debug!(%token, %reason, "request abandoned by host");
                capsule.release();
                BridgeStats::record(&self.stats.abandoned);
                DeliveryOutcome::Abandoned { token, reason }
            }
            DeliveryMessage::Deliver { args, .. } => {
                let _scope = HandleScope::new(&self.handles);
                let converted = match self.convert_args(&args) {
                    Ok(converted) => converted,
                    Err(err) => {
                        warn!(%token, error = %err, "response conversion failed");
                        capsule.release();
                        BridgeStats::record(&self.stats.failed);
                        return DeliveryOutcome::Failed {
                            token,
                            error: err.into(),
                        };
                    }
                };
                match capsule.invoke(&converted) {
                    Ok(result) => {
                        BridgeStats::record(&self.stats.delivered);
                        DeliveryOutcome::Delivered { token, result }
                    }
                    Err(exc) => {
                        warn!(%token, exception = %exc, "callback threw");
                        BridgeStats::record(&self.stats.failed);
                        DeliveryOutcome::Failed {
                            token,
                            error: BridgeError::CallbackThrew(exc),
                        }
                    }
                }
            }
        }
    }

    fn convert_args(&self, args: &[HostValue]) -> CodecResult<Vec<ScriptValue>> {
        let marshaler = self.marshaler();
        args.iter().map(|arg| marshaler.to_script(arg)).collect()
    }
}

impl Drop for Realm {
    fn drop(&mut self) {
        let live = self.capsules.len();
        if live > 0 {
            debug!(live, "realm dropped with callbacks still held");
        }
    }
}

impl std::fmt::Debug for Realm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Realm")
            .field("config", &self.config)
            .field("live_capsules", &self.capsules.len())
            .field("has_dispatcher", &self.dispatcher.borrow().is_some())
            .finish()
    }
}
