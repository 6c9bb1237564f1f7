//! Request dispatch protocol
//!
//! `httpSend(method, url, headers, async, callback)` is checked argument by
//! argument before anything reaches the host. A call that passes validation
//! becomes a [`Request`] handed to the installed [`HostDispatcher`] together
//! with a [`DeliveryHandle`] for the response.

use otter_bridge_core::{ScriptValue, ValueKind};
use tracing::warn;

use crate::capsule::CallbackToken;
use crate::delivery::DeliveryHandle;
use crate::error::{BridgeError, BridgeResult};

/// Arguments `httpSend` requires; extra arguments are ignored
pub const MIN_ARGUMENTS: usize = 5;

/// A validated request as the host sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: String,
    url: String,
    headers: Vec<(String, String)>,
    is_async: bool,
    callback: CallbackToken,
}

impl Request {
    /// HTTP method
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Header pairs in the script object's property order
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Headers as two-element `[name, value]` rows
    pub fn header_rows(&self) -> Vec<[&str; 2]> {
        self.headers
            .iter()
            .map(|(name, value)| [name.as_str(), value.as_str()])
            .collect()
    }

    /// Check if the script asked for an asynchronous request
    pub fn is_async(&self) -> bool {
        self.is_async
    }

    /// Token to settle the request with
    pub fn callback(&self) -> CallbackToken {
        self.callback
    }
}

/// Host side of the bridge.
///
/// `dispatch` runs on the engine thread. Returning `Ok` hands ownership of
/// the callback to the host: it must eventually deliver or abandon the token
/// through `delivery`. Returning `Err` leaves the callback with the realm,
/// which releases it.
///
/// In synchronous mode (`request.is_async() == false`) the host is expected
/// to have delivered before returning.
pub trait HostDispatcher {
    fn dispatch(&self, request: Request, delivery: DeliveryHandle) -> anyhow::Result<()>;
}

/// Build a dispatcher from a closure
pub fn dispatcher_fn<F>(f: F) -> FnDispatcher<F>
where
    F: Fn(Request, DeliveryHandle) -> anyhow::Result<()>,
{
    FnDispatcher(f)
}

/// Dispatcher returned by [`dispatcher_fn`]
#[derive(Clone)]
pub struct FnDispatcher<F>(F);

impl<F> HostDispatcher for FnDispatcher<F>
where
    F: Fn(Request, DeliveryHandle) -> anyhow::Result<()>,
{
    fn dispatch(&self, request: Request, delivery: DeliveryHandle) -> anyhow::Result<()> {
        (self.0)(request, delivery)
    }
}

/// Borrowed, type-checked `httpSend` arguments
#[derive(Debug)]
pub(crate) struct SendArgs<'a> {
    pub(crate) method: &'a str,
    pub(crate) url: &'a str,
    pub(crate) headers: &'a ScriptValue,
    pub(crate) is_async: bool,
    pub(crate) callback: &'a ScriptValue,
}

impl SendArgs<'_> {
    pub(crate) fn into_request(self, callback: CallbackToken) -> Request {
        Request {
            method: self.method.to_owned(),
            url: self.url.to_owned(),
            headers: collect_headers(self.headers),
            is_async: self.is_async,
            callback,
        }
    }
}

/// Check arity, then each argument in order; the first mismatch wins
pub(crate) fn validate(args: &[ScriptValue]) -> BridgeResult<SendArgs<'_>> {
    if args.len() < MIN_ARGUMENTS {
        return Err(BridgeError::Arity {
            expected: MIN_ARGUMENTS,
            actual: args.len(),
        });
    }
    let mismatch = |index, expected| BridgeError::TypeError { index, expected };

    let method = args[0].as_str().ok_or(mismatch(0, ValueKind::String))?;
    let url = args[1].as_str().ok_or(mismatch(1, ValueKind::String))?;
    if !args[2].is_object() {
        return Err(mismatch(2, ValueKind::Object));
    }
    let is_async = args[3].as_bool().ok_or(mismatch(3, ValueKind::Boolean))?;
    if !args[4].is_function() {
        return Err(mismatch(4, ValueKind::Function));
    }

    Ok(SendArgs {
        method,
        url,
        headers: &args[2],
        is_async,
        callback: &args[4],
    })
}

/// Flatten a header object to `(name, value)` pairs.
///
/// Values that cannot be stringified are sent as empty strings.
pub(crate) fn collect_headers(headers: &ScriptValue) -> Vec<(String, String)> {
    headers
        .own_property_names()
        .into_iter()
        .map(|name| {
            let value = headers
                .get_property(&name)
                .map(|value| {
                    value.to_js_string().unwrap_or_else(|exc| {
                        warn!(header = %name, error = %exc, "header value not stringifiable");
                        String::new()
                    })
                })
                .unwrap_or_default();
            (name, value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use otter_bridge_core::{PendingException, ScriptObject};

    fn empty() -> ScriptValue {
        ScriptValue::from(ScriptObject::new())
    }

    fn callback() -> ScriptValue {
        ScriptValue::function("cb", |_| Ok(ScriptValue::Undefined))
    }

    fn args(headers: ScriptValue) -> Vec<ScriptValue> {
        vec![
            ScriptValue::from("GET"),
            ScriptValue::from("http://example.test/"),
            headers,
            ScriptValue::Bool(true),
            callback(),
        ]
    }

    fn type_error_index(args: &[ScriptValue]) -> usize {
        match validate(args).unwrap_err() {
            BridgeError::TypeError { index, .. } => index,
            other => panic!("expected TypeError, got {other:?}"),
        }
    }

    #[test]
    fn test_arity() {
        let err = validate(&[ScriptValue::from("GET")]).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Arity {
                expected: 5,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_each_argument_checked_in_order() {
        let mut bad = args(empty());
        bad[0] = ScriptValue::Int32(1);
        bad[1] = ScriptValue::Int32(1);
        assert_eq!(type_error_index(&bad), 0);

        let mut bad = args(empty());
        bad[1] = ScriptValue::Null;
        assert_eq!(type_error_index(&bad), 1);

        let mut bad = args(ScriptValue::from("not an object"));
        assert_eq!(type_error_index(&bad), 2);
        bad[2] = empty();

        bad[3] = ScriptValue::from("true");
        assert_eq!(type_error_index(&bad), 3);
        bad[3] = ScriptValue::Bool(false);

        bad[4] = ScriptValue::Null;
        assert_eq!(type_error_index(&bad), 4);
    }

    #[test]
    fn test_extra_arguments_ignored() {
        let mut extra = args(empty());
        extra.push(ScriptValue::from("ignored"));
        let checked = validate(&extra).unwrap();
        assert_eq!(checked.method, "GET");
        assert!(checked.is_async);
    }

    #[test]
    fn test_arrays_count_as_header_objects() {
        let call = args(ScriptValue::Array(vec![ScriptValue::from("x")]));
        let checked = validate(&call).unwrap();
        assert_eq!(
            collect_headers(checked.headers),
            vec![("0".to_string(), "x".to_string())]
        );
    }

    #[test]
    fn test_headers_keep_order_and_stringify() {
        let headers = ScriptValue::object([
            ("Accept", ScriptValue::from("text/plain")),
            ("X-Count", ScriptValue::Int32(3)),
            ("X-Flag", ScriptValue::Bool(true)),
        ]);
        let request = validate(&args(headers))
            .unwrap()
            .into_request(CallbackToken::from_raw(1));
        assert_eq!(
            request.header_rows(),
            vec![
                ["Accept", "text/plain"],
                ["X-Count", "3"],
                ["X-Flag", "true"],
            ]
        );
    }

    #[test]
    fn test_throwing_header_value_becomes_empty() {
        let hostile = ScriptValue::object([(
            "toString",
            ScriptValue::function("toString", |_| {
                Err(PendingException::engine("Error", "no"))
            }),
        )]);
        let headers = ScriptValue::object([("X-Bad", hostile), ("X-Good", ScriptValue::from("1"))]);
        assert_eq!(
            collect_headers(&headers),
            vec![
                ("X-Bad".to_string(), String::new()),
                ("X-Good".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_closure_dispatcher() {
        let (tx, _rx) = crossbeam_channel::unbounded();
        let delivery = DeliveryHandle::new(tx, Default::default());
        let request = validate(&args(empty()))
            .unwrap()
            .into_request(CallbackToken::from_raw(2));
        let dispatcher = dispatcher_fn(|request, _delivery| {
            anyhow::ensure!(request.method() == "GET", "unexpected method");
            Ok(())
        });
        assert!(dispatcher.dispatch(request, delivery).is_ok());
    }
}
