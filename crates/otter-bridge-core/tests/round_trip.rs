//! Round-trip properties of the value codec

use otter_bridge_core::{
    HandleArena, HostValue, LocalRefTable, Marshaler, ScriptValue, to_host,
};

fn round_trip(value: &ScriptValue) -> ScriptValue {
    let handles = HandleArena::default();
    let locals = LocalRefTable::default();
    Marshaler::new(&handles, &locals)
        .to_script(&to_host(value))
        .expect("conversion should not abort")
}

#[test]
fn test_primitives_round_trip() {
    let values = [
        ScriptValue::Null,
        ScriptValue::Bool(true),
        ScriptValue::Bool(false),
        ScriptValue::Int32(0),
        ScriptValue::Int32(i32::MIN),
        ScriptValue::Int32(i32::MAX),
        ScriptValue::Number(1.25),
        ScriptValue::Number(-1e300),
        ScriptValue::from(""),
        ScriptValue::from("héllo wörld ✓"),
        ScriptValue::date(1_700_000_000_000.0),
    ];
    for value in &values {
        let back = round_trip(value);
        assert!(back.equivalent(value), "{value:?} came back as {back:?}");
    }
}

#[test]
fn test_undefined_collapses_to_null() {
    assert_eq!(round_trip(&ScriptValue::Undefined), ScriptValue::Null);
}

#[test]
fn test_uint32_round_trips_with_same_value() {
    for v in [0_u32, 7, i32::MAX as u32, i32::MAX as u32 + 1, u32::MAX] {
        let value = ScriptValue::Uint32(v);
        let host = to_host(&value);
        assert_eq!(host, HostValue::Long(i64::from(v)));
        let back = round_trip(&value);
        assert!(back.equivalent(&value), "{v} came back as {back:?}");
        assert!(back.as_number().is_some_and(|n| n >= 0.0));
    }
}

#[test]
fn test_date_loses_sub_millisecond_precision() {
    let value = ScriptValue::date(1_234.987);
    assert_eq!(round_trip(&value), ScriptValue::date(1_234.0));

    let whole = ScriptValue::date(86_400_000.0);
    assert_eq!(round_trip(&whole), whole);
}

#[test]
fn test_arrays_keep_length_and_order() {
    let arrays = [
        Vec::new(),
        vec![ScriptValue::Int32(1)],
        vec![
            ScriptValue::from("a"),
            ScriptValue::Int32(2),
            ScriptValue::Bool(true),
            ScriptValue::Null,
            ScriptValue::Number(0.5),
        ],
        (0..257).map(ScriptValue::Int32).collect(),
        vec![
            ScriptValue::Array(vec![ScriptValue::Int32(1), ScriptValue::Int32(2)]),
            ScriptValue::Array(Vec::new()),
        ],
    ];
    for items in arrays {
        let value = ScriptValue::Array(items.clone());
        match round_trip(&value) {
            ScriptValue::Array(back) => {
                assert_eq!(back.len(), items.len());
                assert!(back.iter().zip(&items).all(|(b, a)| b.equivalent(a)));
            }
            other => panic!("expected array, got {other:?}"),
        }
    }
}

#[test]
fn test_unsupported_values_do_not_round_trip() {
    let obj = ScriptValue::object([("k", ScriptValue::from("v"))]);
    assert_eq!(round_trip(&obj), ScriptValue::Null);

    let arr = ScriptValue::Array(vec![obj, ScriptValue::Int32(1)]);
    assert_eq!(
        round_trip(&arr),
        ScriptValue::Array(vec![ScriptValue::Null, ScriptValue::Int32(1)])
    );
}
