//! Thread-safety boundaries of the bridge
//!
//! Callbacks and realms stay on the engine thread; delivery handles and
//! tokens go anywhere.

use otter_bridge::{CallbackToken, DeliveryHandle, HostValue, Request, TokioDispatcher};

/// ```compile_fail
/// use otter_bridge::{CallbackCapsule, ScriptValue};
///
/// let f = ScriptValue::function("cb", |_| Ok(ScriptValue::Undefined));
/// let capsule = CallbackCapsule::capture(&f).unwrap();
/// std::thread::spawn(move || {
///     // This should fail to compile: CallbackCapsule is !Send
///     capsule.release();
/// });
/// ```
fn _capsule_not_send() {}

/// ```compile_fail
/// use otter_bridge::Realm;
/// use std::sync::Arc;
///
/// let realm = Arc::new(Realm::new());
/// std::thread::spawn(move || {
///     // This should fail to compile: Realm is !Sync
///     let _ = realm.live_capsules();
/// });
/// ```
fn _realm_not_sync() {}

fn assert_send<T: Send>() {}
fn assert_sync<T: Sync>() {}

#[test]
fn test_host_side_types_cross_threads() {
    assert_send::<DeliveryHandle>();
    assert_sync::<DeliveryHandle>();
    assert_send::<CallbackToken>();
    assert_send::<Request>();
    assert_send::<HostValue>();
    assert_send::<TokioDispatcher>();
    assert_sync::<TokioDispatcher>();
}
