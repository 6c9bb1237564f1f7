//! Async request bridge between a script engine and a host.
//!
//! This crate is the runtime half of the otter bridge. It builds on the value
//! codecs of [`otter_bridge_core`] and adds the one operation that crosses
//! the boundary twice: `httpSend`, which dispatches a request into host code
//! and later delivers the response back to a script callback, possibly from
//! another thread.
//!
//! ```text
//!   engine thread                         host threads
//!   ─────────────                         ────────────
//!   Realm::http_send ──validate──capture──► HostDispatcher::dispatch
//!        │                                       │
//!        │          DeliveryHandle::deliver ◄────┘
//!        │                  │
//!   Realm::run_pending ◄────┘ (channel)
//!        │
//!   callback(response)
//! ```
//!
//! # Example
//!
//! ```
//! use otter_bridge::{DeliveryHandle, HostValue, Realm, Request, ScriptValue, dispatcher_fn};
//! use std::time::Duration;
//!
//! let realm = Realm::builder()
//!     .dispatcher(dispatcher_fn(|request: Request, delivery: DeliveryHandle| {
//!         std::thread::spawn(move || {
//!             let _ = delivery.deliver(request.callback(), HostValue::from("200 OK"));
//!         });
//!         Ok(())
//!     }))
//!     .build();
//!
//! realm
//!     .http_send(&[
//!         ScriptValue::from("GET"),
//!         ScriptValue::from("http://localhost/"),
//!         ScriptValue::object([("Accept", ScriptValue::from("text/plain"))]),
//!         ScriptValue::Bool(true),
//!         ScriptValue::function("onResponse", |args| Ok(args[0].clone())),
//!     ])
//!     .unwrap();
//!
//! let outcomes = realm.run_until_idle(Duration::from_secs(5));
//! assert!(outcomes[0].is_delivered());
//! assert_eq!(realm.live_capsules(), 0);
//! ```

mod capsule;
mod config;
mod delivery;
mod dispatch;
mod error;
mod realm;
mod stats;
mod tokio_dispatcher;

pub use capsule::{CallbackCapsule, CallbackToken};
pub use config::BridgeConfig;
pub use delivery::DeliveryHandle;
pub use dispatch::{FnDispatcher, HostDispatcher, MIN_ARGUMENTS, Request, dispatcher_fn};
pub use error::{BridgeError, BridgeResult};
pub use realm::{DeliveryOutcome, Realm, RealmBuilder};
pub use stats::{BridgeStats, BridgeStatsSnapshot};
pub use tokio_dispatcher::{HANDLER_CANCELLED, HandlerFuture, TokioDispatcher};

// Re-export the value model
pub use otter_bridge_core::{
    CodecError, CodecOptions, EngineLimits, HostValue, LongProjection, PendingException,
    ScriptFunction, ScriptObject, ScriptValue, ValueKind,
};
