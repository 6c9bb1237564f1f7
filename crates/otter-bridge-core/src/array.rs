//! Array codec
//!
//! Element-wise conversion that keeps order and length. Host-to-script
//! conversion allocates the target array at full length up front, fills it by
//! index, and abandons the whole array on the first element that raises.

use tracing::debug;

use crate::codec::{Marshaler, to_host};
use crate::error::CodecResult;
use crate::host::HostValue;
use crate::scope::HandleScope;
use crate::script::ScriptValue;

/// Convert script array elements to a host array
pub fn array_to_host(items: &[ScriptValue]) -> HostValue {
    HostValue::Array(items.iter().map(to_host).collect())
}

pub(crate) fn array_to_script(
    marshaler: &Marshaler<'_>,
    scope: &HandleScope<'_>,
    items: &[HostValue],
) -> CodecResult<ScriptValue> {
    let mut out = scope.array(items.len())?;
    for (index, item) in items.iter().enumerate() {
        // Element reference lives for this iteration only.
        let element = marshaler.locals().acquire()?;
        let converted = marshaler.to_script(item).inspect_err(|err| {
            debug!(index, len = items.len(), error = %err, "array element conversion aborted");
        })?;
        drop(element);
        out[index] = converted;
    }
    Ok(ScriptValue::Array(out))
}
