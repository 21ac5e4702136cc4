//! The proto3 default value for a field, and the predicate the [`crate::printer::Printer`]
//! uses to decide whether a singular scalar is still at that default.

use prost_reflect::{DynamicMessage, FieldDescriptor, Kind, Value};

/// The proto3 default value for a field's kind: numeric zero, empty string,
/// empty bytes, the enum's first value, an empty message, or (for
/// repeated/map fields) an empty list/map.
pub fn default_value(kind: &Kind) -> Value {
    match kind {
        Kind::Double => Value::F64(0.0),
        Kind::Float => Value::F32(0.0),
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => Value::I32(0),
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => Value::I64(0),
        Kind::Uint32 | Kind::Fixed32 => Value::U32(0),
        Kind::Uint64 | Kind::Fixed64 => Value::U64(0),
        Kind::Bool => Value::Bool(false),
        Kind::String => Value::String(String::new()),
        Kind::Bytes => Value::Bytes(Default::default()),
        Kind::Enum(e) => Value::EnumNumber(e.default_value().number()),
        Kind::Message(m) => Value::Message(DynamicMessage::new(m.clone())),
    }
}

/// Whether `value` is a field's unmodified proto3 default.
///
/// Only meaningful for singular scalar/enum fields; callers are expected to
/// have already branched on `field.is_list()`/`field.is_map()` before asking
/// this, since an empty repeated field is governed by a separate rule
/// (§3 "A repeated/map field is omitted when empty...").
pub fn is_default(value: &Value, field: &FieldDescriptor) -> bool {
    match (value, field.kind()) {
        (Value::F64(v), Kind::Double) => *v == 0.0,
        (Value::F32(v), Kind::Float) => *v == 0.0,
        (Value::I32(v), Kind::Int32 | Kind::Sint32 | Kind::Sfixed32) => *v == 0,
        (Value::I64(v), Kind::Int64 | Kind::Sint64 | Kind::Sfixed64) => *v == 0,
        (Value::U32(v), Kind::Uint32 | Kind::Fixed32) => *v == 0,
        (Value::U64(v), Kind::Uint64 | Kind::Fixed64) => *v == 0,
        (Value::Bool(v), Kind::Bool) => !*v,
        (Value::String(v), Kind::String) => v.is_empty(),
        (Value::Bytes(v), Kind::Bytes) => v.is_empty(),
        (Value::EnumNumber(v), Kind::Enum(e)) => *v == e.default_value().number(),
        _ => false,
    }
}
