//! Per-scalar-type JSON <-> proto value rules.
//!
//! This module is deliberately descriptor-agnostic beyond a single [`Kind`]:
//! it never consults the [`crate::registry::FormatRegistry`] and never
//! recurses into messages. The [`crate::printer::Printer`] and
//! [`crate::parser::Parser`] own that dispatch; this module only knows how
//! to turn one scalar [`Value`] into one [`serde_json::Value`] and back.

use base64::Engine;
use prost_reflect::{EnumDescriptor, Kind, MapKey, Value};
use serde_json::{Number, Value as Json};

use crate::error::{JsonFormatError, Result};

fn base64_engine() -> &'static base64::engine::GeneralPurpose {
    &base64::engine::general_purpose::STANDARD
}

pub(crate) fn unexpected(field: &str, expected: &'static str, got: &Json) -> JsonFormatError {
    let got = match got {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    };
    JsonFormatError::UnexpectedType {
        field: field.to_owned(),
        expected,
        got,
    }
}

fn invalid_number(field: &str, detail: impl Into<String>) -> JsonFormatError {
    JsonFormatError::InvalidNumber {
        field: field.to_owned(),
        detail: detail.into(),
    }
}

/// Encode a non-enum, non-message scalar value as its canonical JSON form.
///
/// `long_as_number` controls whether 64-bit integers and unsigned 32-bit
/// integers are emitted as JSON numbers instead of decimal strings.
pub fn encode_scalar(value: &Value, kind: &Kind, long_as_number: bool) -> Json {
    match (kind, value) {
        (Kind::Double, Value::F64(v)) => encode_float(*v),
        (Kind::Float, Value::F32(v)) => encode_float(*v as f64),
        (Kind::Int32 | Kind::Sint32 | Kind::Sfixed32, Value::I32(v)) => Json::Number((*v).into()),
        // uint32/fixed32 are always plain numbers; only the 64-bit families
        // and the `long_as_number` toggle affect string-vs-number choice.
        (Kind::Uint32 | Kind::Fixed32, Value::U32(v)) => Json::Number((*v).into()),
        (Kind::Int64 | Kind::Sint64 | Kind::Sfixed64, Value::I64(v)) => {
            if long_as_number {
                Json::Number((*v).into())
            } else {
                Json::String(v.to_string())
            }
        }
        (Kind::Uint64 | Kind::Fixed64, Value::U64(v)) => {
            if long_as_number {
                Json::Number((*v).into())
            } else {
                Json::String(v.to_string())
            }
        }
        (Kind::Bool, Value::Bool(v)) => Json::Bool(*v),
        (Kind::String, Value::String(v)) => Json::String(v.clone()),
        (Kind::Bytes, Value::Bytes(v)) => Json::String(base64_engine().encode(v)),
        // Defensive: a caller handed us a value that doesn't match the
        // field's declared kind. This never happens for values obtained from
        // a DynamicMessage built against the same descriptor, so fall back to
        // the kind's own zero value rather than panicking.
        _ => encode_scalar(&crate::defaults::default_value(kind), kind, long_as_number),
    }
}

/// uint32/fixed32 are always unsigned already held in `Value::U32`, so
/// unlike uint64 there is no sign-bit reinterpretation needed: the value
/// arrives already correct and only the JSON representation (number vs
/// string) is a choice. uint32 is still printed as a plain number either
/// way per the canonical mapping; kept as its own case above for clarity
/// with uint64, which does switch representation.
fn encode_float(v: f64) -> Json {
    if v.is_nan() {
        Json::String("NaN".to_owned())
    } else if v.is_infinite() {
        Json::String(if v > 0.0 { "Infinity" } else { "-Infinity" }.to_owned())
    } else {
        Number::from_f64(v)
            .map(Json::Number)
            .unwrap_or_else(|| Json::String("NaN".to_owned()))
    }
}

/// Decode a non-enum, non-message scalar from its canonical JSON form.
pub fn decode_scalar(json: &Json, kind: &Kind, field: &str) -> Result<Value> {
    match kind {
        Kind::Double => decode_float(json, field).map(Value::F64),
        Kind::Float => decode_float(json, field).map(|v| Value::F32(v as f32)),
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => {
            decode_signed(json, field, i32::MIN as i64, i32::MAX as i64).map(|v| Value::I32(v as i32))
        }
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => {
            decode_signed(json, field, i64::MIN, i64::MAX).map(Value::I64)
        }
        Kind::Uint32 | Kind::Fixed32 => {
            decode_unsigned(json, field, u32::MAX as u64).map(|v| Value::U32(v as u32))
        }
        Kind::Uint64 | Kind::Fixed64 => decode_unsigned(json, field, u64::MAX).map(Value::U64),
        Kind::Bool => match json {
            Json::Bool(v) => Ok(Value::Bool(*v)),
            other => Err(unexpected(field, "bool", other)),
        },
        Kind::String => match json {
            Json::String(v) => Ok(Value::String(v.clone())),
            other => Err(unexpected(field, "string", other)),
        },
        Kind::Bytes => match json {
            Json::String(v) => base64_engine()
                .decode(v)
                .map(|bytes| Value::Bytes(bytes.into()))
                .map_err(|source| JsonFormatError::InvalidBase64 {
                    field: field.to_owned(),
                    source,
                }),
            other => Err(unexpected(field, "string", other)),
        },
        Kind::Message(_) | Kind::Enum(_) => {
            unreachable!("decode_scalar called with a non-scalar kind")
        }
    }
}

fn decode_float(json: &Json, field: &str) -> Result<f64> {
    match json {
        Json::Number(n) => n
            .as_f64()
            .ok_or_else(|| invalid_number(field, format!("{n} is not representable as f64"))),
        Json::String(s) => match s.as_str() {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            other => other
                .parse::<f64>()
                .map_err(|e| invalid_number(field, e.to_string())),
        },
        other => Err(unexpected(field, "number or string", other)),
    }
}

fn decode_signed(json: &Json, field: &str, min: i64, max: i64) -> Result<i64> {
    let n = match json {
        Json::Number(n) => n
            .as_i64()
            .ok_or_else(|| invalid_number(field, format!("{n} is not an integer")))?,
        Json::String(s) => s
            .parse::<i64>()
            .map_err(|e| invalid_number(field, e.to_string()))?,
        other => return Err(unexpected(field, "number or string", other)),
    };
    if n < min || n > max {
        return Err(invalid_number(field, format!("{n} is out of range")));
    }
    Ok(n)
}

fn decode_unsigned(json: &Json, field: &str, max: u64) -> Result<u64> {
    let n = match json {
        Json::Number(n) => n
            .as_u64()
            .ok_or_else(|| invalid_number(field, format!("{n} is not an unsigned integer")))?,
        Json::String(s) => s
            .parse::<u64>()
            .map_err(|e| invalid_number(field, e.to_string()))?,
        other => return Err(unexpected(field, "number or string", other)),
    };
    if n > max {
        return Err(invalid_number(field, format!("{n} is out of range")));
    }
    Ok(n)
}

/// Encode an enum value as its canonical JSON form: the value's name by
/// default, or its number when `as_number` is set. A number is always used
/// as a fallback when the underlying number has no matching value (an
/// unrecognized enum value is valid in proto3 and still needs to round-trip).
pub fn encode_enum(value: &Value, enum_desc: &EnumDescriptor, as_number: bool) -> Json {
    let number = match value {
        Value::EnumNumber(n) => *n,
        _ => 0,
    };
    if as_number {
        return Json::Number(number.into());
    }
    match enum_desc.get_value(number) {
        Some(v) => Json::String(v.name().to_owned()),
        None => Json::Number(number.into()),
    }
}

/// Decode an enum value from a JSON number (by number) or string (by name).
pub fn decode_enum(json: &Json, enum_desc: &EnumDescriptor, field: &str) -> Result<Value> {
    match json {
        Json::Number(n) => {
            let number = n
                .as_i64()
                .ok_or_else(|| invalid_number(field, format!("{n} is not a valid enum number")))?;
            Ok(Value::EnumNumber(number as i32))
        }
        Json::String(s) => enum_desc
            .get_value_by_name(s)
            .map(|v| Value::EnumNumber(v.number()))
            .ok_or_else(|| JsonFormatError::UnknownEnumValue {
                field: field.to_owned(),
                value: s.clone(),
            }),
        other => Err(unexpected(field, "string or number", other)),
    }
}

/// Stringify a map key for its JSON object key, regardless of the key's
/// declared proto type.
pub fn encode_map_key(key: &MapKey) -> String {
    match key {
        MapKey::Bool(v) => v.to_string(),
        MapKey::I32(v) => v.to_string(),
        MapKey::I64(v) => v.to_string(),
        MapKey::U32(v) => v.to_string(),
        MapKey::U64(v) => v.to_string(),
        MapKey::String(v) => v.clone(),
    }
}

/// Parse a JSON object key back into a [`MapKey`] of the declared kind.
pub fn decode_map_key(raw: &str, kind: &Kind, field: &str) -> Result<MapKey> {
    let map_key_err = |detail: String| JsonFormatError::MapKeyError {
        field: field.to_owned(),
        detail,
    };
    match kind {
        Kind::Bool => raw
            .parse::<bool>()
            .map(MapKey::Bool)
            .map_err(|e| map_key_err(e.to_string())),
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => raw
            .parse::<i32>()
            .map(MapKey::I32)
            .map_err(|e| map_key_err(e.to_string())),
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => raw
            .parse::<i64>()
            .map(MapKey::I64)
            .map_err(|e| map_key_err(e.to_string())),
        Kind::Uint32 | Kind::Fixed32 => raw
            .parse::<u32>()
            .map(MapKey::U32)
            .map_err(|e| map_key_err(e.to_string())),
        Kind::Uint64 | Kind::Fixed64 => raw
            .parse::<u64>()
            .map(MapKey::U64)
            .map_err(|e| map_key_err(e.to_string())),
        Kind::String => Ok(MapKey::String(raw.to_owned())),
        other => Err(map_key_err(format!("{other:?} is not a valid map key type"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int32_round_trips_through_number() {
        let json = encode_scalar(&Value::I32(-42), &Kind::Int32, false);
        assert_eq!(json, Json::Number((-42).into()));
        let back = decode_scalar(&json, &Kind::Int32, "x").unwrap();
        assert_eq!(back, Value::I32(-42));
    }

    #[test]
    fn int64_strings_by_default_numbers_when_long_as_number() {
        let v = Value::I64(9_223_372_036_854_775_807);
        let as_string = encode_scalar(&v, &Kind::Int64, false);
        assert_eq!(as_string, Json::String("9223372036854775807".to_owned()));
        let as_number = encode_scalar(&v, &Kind::Int64, true);
        assert_eq!(
            as_number,
            Json::Number(9_223_372_036_854_775_807_i64.into())
        );
        assert_eq!(decode_scalar(&as_string, &Kind::Int64, "x").unwrap(), v);
        assert_eq!(decode_scalar(&as_number, &Kind::Int64, "x").unwrap(), v);
    }

    #[test]
    fn uint64_decodes_from_either_form() {
        let json_str = Json::String("18446744073709551615".to_owned());
        let json_num = Json::Number(18_446_744_073_709_551_615_u64.into());
        assert_eq!(
            decode_scalar(&json_str, &Kind::Uint64, "x").unwrap(),
            Value::U64(u64::MAX)
        );
        assert_eq!(
            decode_scalar(&json_num, &Kind::Uint64, "x").unwrap(),
            Value::U64(u64::MAX)
        );
    }

    #[test]
    fn non_finite_floats_are_reserved_strings() {
        assert_eq!(encode_float(f64::NAN), Json::String("NaN".to_owned()));
        assert_eq!(
            encode_float(f64::INFINITY),
            Json::String("Infinity".to_owned())
        );
        assert_eq!(
            encode_float(f64::NEG_INFINITY),
            Json::String("-Infinity".to_owned())
        );

        assert!(decode_float(&Json::String("NaN".to_owned()), "x")
            .unwrap()
            .is_nan());
        assert_eq!(
            decode_float(&Json::String("Infinity".to_owned()), "x").unwrap(),
            f64::INFINITY
        );
    }

    #[test]
    fn bytes_round_trip_through_base64() {
        let bytes: bytes::Bytes = vec![0u8, 1, 2, 255].into();
        let json = encode_scalar(&Value::Bytes(bytes.clone()), &Kind::Bytes, false);
        assert_eq!(json, Json::String("AAEC/w==".to_owned()));
        let back = decode_scalar(&json, &Kind::Bytes, "x").unwrap();
        assert_eq!(back, Value::Bytes(bytes));
    }

    #[test]
    fn bytes_reject_invalid_base64() {
        let err = decode_scalar(&Json::String("not base64!!".to_owned()), &Kind::Bytes, "x")
            .unwrap_err();
        assert!(matches!(err, JsonFormatError::InvalidBase64 { .. }));
    }

    #[test]
    fn map_key_round_trips_for_int_and_bool() {
        let key = MapKey::I32(-2);
        let raw = encode_map_key(&key);
        assert_eq!(raw, "-2");
        assert_eq!(decode_map_key(&raw, &Kind::Int32, "m").unwrap(), key);

        let key = MapKey::Bool(true);
        assert_eq!(encode_map_key(&key), "true");
        assert_eq!(
            decode_map_key("true", &Kind::Bool, "m").unwrap(),
            MapKey::Bool(true)
        );
    }
}
