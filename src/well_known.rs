//! Registered formatters for the `google.protobuf` well-known types: these
//! are the non-generic JSON representations that the [`crate::registry::FormatRegistry`]
//! intercepts before the descriptor-driven [`crate::printer::Printer`]/[`crate::parser::Parser`]
//! walk would otherwise apply the generic message-object mapping.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use prost::Message as _;
use prost_reflect::{DynamicMessage, FieldDescriptor, Kind, MapKey, MessageDescriptor, Value};
use serde_json::{Map as JsonMap, Value as Json};

use crate::error::{JsonFormatError, Result};
use crate::primitive;
use crate::registry::{EnumFormatter, FormatRegistry, MessageFormatter};

/// The default [`FormatRegistry`], pre-populated with every well-known type
/// listed in the proto3 JSON mapping.
pub fn default_registry() -> FormatRegistry {
    FormatRegistry::empty()
        .register_message("google.protobuf.Duration", duration_formatter())
        .register_message("google.protobuf.Timestamp", timestamp_formatter())
        .register_message("google.protobuf.FieldMask", field_mask_formatter())
        .register_message("google.protobuf.DoubleValue", wrapper_formatter())
        .register_message("google.protobuf.FloatValue", wrapper_formatter())
        .register_message("google.protobuf.Int32Value", wrapper_formatter())
        .register_message("google.protobuf.Int64Value", wrapper_formatter())
        .register_message("google.protobuf.UInt32Value", wrapper_formatter())
        .register_message("google.protobuf.UInt64Value", wrapper_formatter())
        .register_message("google.protobuf.BoolValue", wrapper_formatter())
        .register_message("google.protobuf.StringValue", wrapper_formatter())
        .register_message("google.protobuf.BytesValue", wrapper_formatter())
        .register_message("google.protobuf.Value", value_formatter())
        .register_message("google.protobuf.Struct", struct_formatter())
        .register_message("google.protobuf.ListValue", list_value_formatter())
        .register_message("google.protobuf.Any", any_formatter())
        .register_enum("google.protobuf.NullValue", null_value_formatter())
}

fn wk_err(type_name: &'static str, detail: impl Into<String>) -> JsonFormatError {
    JsonFormatError::InvalidWellKnownFormat {
        type_name,
        detail: detail.into(),
    }
}

fn field(desc: &MessageDescriptor, name: &str) -> FieldDescriptor {
    desc.get_field_by_name(name)
        .unwrap_or_else(|| panic!("well-known type {} missing field {name}", desc.full_name()))
}

fn get_i64(msg: &DynamicMessage, f: &FieldDescriptor) -> i64 {
    match msg.get_field(f).as_ref() {
        Value::I64(v) => *v,
        _ => 0,
    }
}

fn get_i32(msg: &DynamicMessage, f: &FieldDescriptor) -> i32 {
    match msg.get_field(f).as_ref() {
        Value::I32(v) => *v,
        _ => 0,
    }
}

// --- Duration ---------------------------------------------------------

fn duration_formatter() -> MessageFormatter {
    MessageFormatter {
        write: Arc::new(|msg, _printer| {
            let desc = msg.descriptor();
            let seconds = get_i64(msg, &field(&desc, "seconds"));
            let nanos = get_i32(msg, &field(&desc, "nanos"));
            Ok(Json::String(format_duration(seconds, nanos)))
        }),
        read: Arc::new(|json, desc, _parser| {
            let s = json
                .as_str()
                .ok_or_else(|| wk_err("Duration", "expected a string"))?;
            let (seconds, nanos) = parse_duration(s)?;
            let mut message = DynamicMessage::new(desc.clone());
            message.set_field(&field(desc, "seconds"), Value::I64(seconds));
            message.set_field(&field(desc, "nanos"), Value::I32(nanos));
            Ok(message)
        }),
    }
}

fn format_duration(seconds: i64, nanos: i32) -> String {
    let negative = seconds < 0 || nanos < 0;
    let abs_seconds = seconds.unsigned_abs();
    let abs_nanos = nanos.unsigned_abs();
    let mut out = format!("{}{}", if negative { "-" } else { "" }, abs_seconds);
    if abs_nanos != 0 {
        let digits = format!("{abs_nanos:09}");
        let trimmed = if abs_nanos % 1_000_000 == 0 {
            &digits[0..3]
        } else if abs_nanos % 1_000 == 0 {
            &digits[0..6]
        } else {
            &digits[0..9]
        };
        out.push('.');
        out.push_str(trimmed);
    }
    out.push('s');
    out
}

fn parse_duration(s: &str) -> Result<(i64, i32)> {
    let body = s
        .strip_suffix('s')
        .ok_or_else(|| wk_err("Duration", "must end with 's'"))?;
    let negative = body.starts_with('-');
    let (int_part, frac_part) = match body.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (body, None),
    };
    let seconds: i64 = int_part
        .parse()
        .map_err(|_| wk_err("Duration", format!("invalid seconds in {s:?}")))?;
    let nanos = match frac_part {
        Some(f) if !f.is_empty() && f.len() <= 9 => {
            let padded = format!("{f:0<9}");
            let mut n: i32 = padded
                .parse()
                .map_err(|_| wk_err("Duration", format!("invalid fractional seconds in {s:?}")))?;
            if negative {
                n = -n;
            }
            n
        }
        Some(_) => return Err(wk_err("Duration", "fractional seconds must be 1-9 digits")),
        None => 0,
    };
    Ok((seconds, nanos))
}

// --- Timestamp ----------------------------------------------------------

fn timestamp_formatter() -> MessageFormatter {
    MessageFormatter {
        write: Arc::new(|msg, _printer| {
            let desc = msg.descriptor();
            let seconds = get_i64(msg, &field(&desc, "seconds"));
            let nanos = get_i32(msg, &field(&desc, "nanos"));
            Ok(Json::String(format_timestamp(seconds, nanos)?))
        }),
        read: Arc::new(|json, desc, _parser| {
            let s = json
                .as_str()
                .ok_or_else(|| wk_err("Timestamp", "expected a string"))?;
            let (seconds, nanos) = parse_timestamp(s)?;
            let mut message = DynamicMessage::new(desc.clone());
            message.set_field(&field(desc, "seconds"), Value::I64(seconds));
            message.set_field(&field(desc, "nanos"), Value::I32(nanos));
            Ok(message)
        }),
    }
}

fn format_timestamp(seconds: i64, nanos: i32) -> Result<String> {
    let dt = DateTime::<Utc>::from_timestamp(seconds, nanos.max(0) as u32).ok_or_else(|| {
        wk_err(
            "Timestamp",
            format!("{seconds}s/{nanos}ns is out of range"),
        )
    })?;
    let frac = if nanos == 0 {
        String::new()
    } else if nanos % 1_000_000 == 0 {
        format!(".{:03}", nanos / 1_000_000)
    } else if nanos % 1_000 == 0 {
        format!(".{:06}", nanos / 1_000)
    } else {
        format!(".{nanos:09}")
    };
    Ok(format!("{}{}Z", dt.format("%Y-%m-%dT%H:%M:%S"), frac))
}

fn parse_timestamp(s: &str) -> Result<(i64, i32)> {
    let body = s
        .strip_suffix('Z')
        .ok_or_else(|| wk_err("Timestamp", "must end with 'Z'"))?;
    let (date_time, frac) = match body.split_once('.') {
        Some((a, b)) => (a, Some(b)),
        None => (body, None),
    };
    let naive = NaiveDateTime::parse_from_str(date_time, "%Y-%m-%dT%H:%M:%S")
        .map_err(|e| wk_err("Timestamp", e.to_string()))?;
    let nanos: u32 = match frac {
        Some(f) if !f.is_empty() && f.len() <= 9 => format!("{f:0<9}")
            .parse()
            .map_err(|_| wk_err("Timestamp", format!("invalid fractional seconds in {s:?}")))?,
        Some(_) => {
            return Err(wk_err(
                "Timestamp",
                "fractional seconds must be 1-9 digits",
            ))
        }
        None => 0,
    };
    Ok((naive.and_utc().timestamp(), nanos as i32))
}

// --- FieldMask ------------------------------------------------------------

fn field_mask_formatter() -> MessageFormatter {
    MessageFormatter {
        write: Arc::new(|msg, _printer| {
            let desc = msg.descriptor();
            let paths_field = field(&desc, "paths");
            let value = msg.get_field(&paths_field);
            let joined = match value.as_ref() {
                Value::List(paths) => paths
                    .iter()
                    .map(|p| match p {
                        Value::String(s) => snake_to_camel(s),
                        _ => String::new(),
                    })
                    .collect::<Vec<_>>()
                    .join(","),
                _ => String::new(),
            };
            Ok(Json::String(joined))
        }),
        read: Arc::new(|json, desc, _parser| {
            let s = json
                .as_str()
                .ok_or_else(|| wk_err("FieldMask", "expected a string"))?;
            let paths = if s.is_empty() {
                Vec::new()
            } else {
                s.split(',').map(|p| Value::String(camel_to_snake(p))).collect()
            };
            let mut message = DynamicMessage::new(desc.clone());
            message.set_field(&field(desc, "paths"), Value::List(paths));
            Ok(message)
        }),
    }
}

fn snake_to_camel(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper_next = false;
    for c in s.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn camel_to_snake(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for c in s.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

// --- Primitive wrappers ---------------------------------------------------

/// Shared by all nine wrapper types (`DoubleValue`..`BytesValue`): each has
/// exactly one field, `value`, of the wrapped scalar kind.
fn wrapper_formatter() -> MessageFormatter {
    MessageFormatter {
        write: Arc::new(|msg, printer| {
            let value_field = field(&msg.descriptor(), "value");
            let value = msg.get_field(&value_field);
            let kind = value_field.kind();
            Ok(primitive::encode_scalar(&value, &kind, printer.long_as_number()))
        }),
        read: Arc::new(|json, desc, _parser| {
            let value_field = field(desc, "value");
            let value = primitive::decode_scalar(json, &value_field.kind(), "value")?;
            let mut message = DynamicMessage::new(desc.clone());
            message.set_field(&value_field, value);
            Ok(message)
        }),
    }
}

// --- google.protobuf.Value / Struct / ListValue ---------------------------

const VALUE_ONEOF_FIELDS: [&str; 6] = [
    "null_value",
    "number_value",
    "string_value",
    "bool_value",
    "struct_value",
    "list_value",
];

fn value_formatter() -> MessageFormatter {
    MessageFormatter {
        write: Arc::new(|msg, printer| {
            let desc = msg.descriptor();
            for name in VALUE_ONEOF_FIELDS {
                let f = field(&desc, name);
                if !msg.has_field(&f) {
                    continue;
                }
                let value = msg.get_field(&f);
                return match name {
                    "null_value" => Ok(Json::Null),
                    "number_value" => Ok(primitive::encode_scalar(&value, &Kind::Double, false)),
                    "string_value" => Ok(primitive::encode_scalar(&value, &Kind::String, false)),
                    "bool_value" => Ok(primitive::encode_scalar(&value, &Kind::Bool, false)),
                    "struct_value" | "list_value" => match value.as_ref() {
                        Value::Message(m) => printer.to_json(m),
                        _ => Ok(Json::Null),
                    },
                    _ => unreachable!(),
                };
            }
            Ok(Json::Null)
        }),
        read: Arc::new(|json, desc, parser| {
            let mut message = DynamicMessage::new(desc.clone());
            match json {
                Json::Null => {
                    message.set_field(&field(desc, "null_value"), Value::EnumNumber(0));
                }
                Json::Bool(b) => {
                    message.set_field(&field(desc, "bool_value"), Value::Bool(*b));
                }
                Json::Number(n) => {
                    let v = n
                        .as_f64()
                        .ok_or_else(|| wk_err("Value", "number not representable as f64"))?;
                    message.set_field(&field(desc, "number_value"), Value::F64(v));
                }
                Json::String(s) => {
                    message.set_field(&field(desc, "string_value"), Value::String(s.clone()));
                }
                Json::Array(_) => {
                    let f = field(desc, "list_value");
                    let nested_desc = match f.kind() {
                        Kind::Message(d) => d,
                        _ => unreachable!("list_value field has message kind"),
                    };
                    let inner = parser.parse(json, &nested_desc)?;
                    message.set_field(&f, Value::Message(inner));
                }
                Json::Object(_) => {
                    let f = field(desc, "struct_value");
                    let nested_desc = match f.kind() {
                        Kind::Message(d) => d,
                        _ => unreachable!("struct_value field has message kind"),
                    };
                    let inner = parser.parse(json, &nested_desc)?;
                    message.set_field(&f, Value::Message(inner));
                }
            }
            Ok(message)
        }),
    }
}

fn struct_formatter() -> MessageFormatter {
    MessageFormatter {
        write: Arc::new(|msg, printer| {
            let fields_field = field(&msg.descriptor(), "fields");
            let value = msg.get_field(&fields_field);
            let map = match value.as_ref() {
                Value::Map(m) => m,
                _ => return Ok(Json::Object(JsonMap::new())),
            };
            let mut object = JsonMap::with_capacity(map.len());
            for (key, value) in map.iter() {
                let key = primitive::encode_map_key(key);
                let inner = match value {
                    Value::Message(m) => printer.to_json(m)?,
                    _ => Json::Null,
                };
                object.insert(key, inner);
            }
            Ok(Json::Object(object))
        }),
        read: Arc::new(|json, desc, parser| {
            let object = json
                .as_object()
                .ok_or_else(|| wk_err("Struct", "expected an object"))?;
            let fields_field = field(desc, "fields");
            let entry_desc = match fields_field.kind() {
                Kind::Message(m) => m,
                _ => unreachable!("fields field has message kind"),
            };
            let value_field = entry_desc.get_field(2).expect("map entry has value field");
            let value_desc = match value_field.kind() {
                Kind::Message(d) => d,
                _ => unreachable!("Struct.fields value is google.protobuf.Value"),
            };
            let mut map = HashMap::with_capacity(object.len());
            for (key, value) in object {
                let inner = parser.parse(value, &value_desc)?;
                map.insert(MapKey::String(key.clone()), Value::Message(inner));
            }
            let mut message = DynamicMessage::new(desc.clone());
            message.set_field(&fields_field, Value::Map(map));
            Ok(message)
        }),
    }
}

fn list_value_formatter() -> MessageFormatter {
    MessageFormatter {
        write: Arc::new(|msg, printer| {
            let values_field = field(&msg.descriptor(), "values");
            let value = msg.get_field(&values_field);
            let list = match value.as_ref() {
                Value::List(l) => l,
                _ => return Ok(Json::Array(Vec::new())),
            };
            let mut array = Vec::with_capacity(list.len());
            for item in list {
                match item {
                    Value::Message(m) => array.push(printer.to_json(m)?),
                    _ => array.push(Json::Null),
                }
            }
            Ok(Json::Array(array))
        }),
        read: Arc::new(|json, desc, parser| {
            let array = json
                .as_array()
                .ok_or_else(|| wk_err("ListValue", "expected an array"))?;
            let values_field = field(desc, "values");
            let value_desc = match values_field.kind() {
                Kind::Message(d) => d,
                _ => unreachable!("ListValue.values is google.protobuf.Value"),
            };
            let mut list = Vec::with_capacity(array.len());
            for item in array {
                let inner = parser.parse(item, &value_desc)?;
                list.push(Value::Message(inner));
            }
            let mut message = DynamicMessage::new(desc.clone());
            message.set_field(&values_field, Value::List(list));
            Ok(message)
        }),
    }
}

// --- NullValue -------------------------------------------------------------

fn null_value_formatter() -> EnumFormatter {
    EnumFormatter {
        write: Arc::new(|_value, _desc, _printer| Json::Null),
        read: Arc::new(|json, desc, _parser| {
            if json.is_null() {
                Ok(Value::EnumNumber(desc.default_value().number()))
            } else {
                Err(wk_err("NullValue", "expected null"))
            }
        }),
    }
}

// --- Any --------------------------------------------------------------

const TYPE_URL_PREFIX: &str = "type.googleapis.com/";

/// Well-known types whose canonical JSON form is not an object, so packing
/// one into `Any` needs the `{"@type": ..., "value": ...}` envelope instead
/// of spreading fields at the top level. `Struct` is deliberately absent:
/// its canonical form is already an object, so it spreads like any other
/// message (including a `Value` that happens to hold a `struct_value`).
fn any_uses_value_envelope(full_name: &str) -> bool {
    matches!(
        full_name,
        "google.protobuf.Duration"
            | "google.protobuf.Timestamp"
            | "google.protobuf.DoubleValue"
            | "google.protobuf.FloatValue"
            | "google.protobuf.Int32Value"
            | "google.protobuf.Int64Value"
            | "google.protobuf.UInt32Value"
            | "google.protobuf.UInt64Value"
            | "google.protobuf.BoolValue"
            | "google.protobuf.StringValue"
            | "google.protobuf.BytesValue"
            | "google.protobuf.Value"
            | "google.protobuf.ListValue"
    )
}

fn any_formatter() -> MessageFormatter {
    MessageFormatter {
        write: Arc::new(|msg, printer| {
            let desc = msg.descriptor();
            let type_url = match msg.get_field(&field(&desc, "type_url")).as_ref() {
                Value::String(s) => s.clone(),
                _ => String::new(),
            };
            let full_name = any_full_name(&type_url);
            let inner_desc = printer
                .type_registry()
                .get_by_name(full_name)
                .ok_or_else(|| JsonFormatError::UnknownType {
                    type_url: type_url.clone(),
                })?;
            let bytes = match msg.get_field(&field(&desc, "value")).as_ref() {
                Value::Bytes(b) => b.clone(),
                _ => Default::default(),
            };
            let inner = DynamicMessage::decode(inner_desc, bytes.as_ref()).map_err(|e| {
                wk_err("Any", format!("decoding the packed message: {e}"))
            })?;
            let inner_json = printer.to_json(&inner)?;

            let mut object = JsonMap::new();
            object.insert("@type".to_owned(), Json::String(type_url));
            if any_uses_value_envelope(full_name) {
                object.insert("value".to_owned(), inner_json);
            } else if let Json::Object(inner_fields) = inner_json {
                object.extend(inner_fields);
            } else {
                // Defensive: a custom-registered formatter produced a
                // non-object form without being in the envelope list above.
                object.insert("value".to_owned(), inner_json);
            }
            Ok(Json::Object(object))
        }),
        read: Arc::new(|json, desc, parser| {
            let object = json
                .as_object()
                .ok_or_else(|| wk_err("Any", "expected an object"))?;
            let type_url = object
                .get("@type")
                .and_then(Json::as_str)
                .ok_or(JsonFormatError::MissingTypeUrl)?
                .to_owned();
            let full_name = any_full_name(&type_url);
            let inner_desc = parser
                .type_registry()
                .get_by_name(full_name)
                .ok_or_else(|| JsonFormatError::UnknownType {
                    type_url: type_url.clone(),
                })?;

            let inner_json = if any_uses_value_envelope(full_name) {
                object.get("value").cloned().unwrap_or(Json::Null)
            } else {
                let mut rest = JsonMap::with_capacity(object.len());
                for (k, v) in object {
                    if k != "@type" {
                        rest.insert(k.clone(), v.clone());
                    }
                }
                Json::Object(rest)
            };
            let inner = parser.parse(&inner_json, &inner_desc)?;
            let bytes = inner.encode_to_vec();

            let mut message = DynamicMessage::new(desc.clone());
            message.set_field(&field(desc, "type_url"), Value::String(type_url));
            message.set_field(&field(desc, "value"), Value::Bytes(bytes.into()));
            Ok(message)
        }),
    }
}

fn any_full_name(type_url: &str) -> &str {
    type_url
        .strip_prefix(TYPE_URL_PREFIX)
        .unwrap_or_else(|| type_url.rsplit('/').next().unwrap_or(type_url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::printer::Printer;
    use prost_types::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet};

    #[test]
    fn duration_formats_match_the_reference_examples() {
        assert_eq!(format_duration(3, 500_000_000), "3.500s");
        assert_eq!(format_duration(-1, -250_000_000), "-1.250s");
        assert_eq!(format_duration(0, 0), "0s");
    }

    #[test]
    fn duration_round_trips() {
        let (s, n) = parse_duration("3.500s").unwrap();
        assert_eq!((s, n), (3, 500_000_000));
        let (s, n) = parse_duration("-1.250s").unwrap();
        assert_eq!((s, n), (-1, -250_000_000));
    }

    #[test]
    fn timestamp_epoch_formats_without_fraction() {
        assert_eq!(format_timestamp(0, 0).unwrap(), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn timestamp_round_trips_with_fraction() {
        let formatted = format_timestamp(1_000_000_000, 123_000_000).unwrap();
        let (s, n) = parse_timestamp(&formatted).unwrap();
        assert_eq!((s, n), (1_000_000_000, 123_000_000));
    }

    #[test]
    fn field_mask_paths_are_camel_cased_and_joined() {
        let set = FileDescriptorSet {
            file: vec![FileDescriptorProto {
                name: Some("fm.proto".into()),
                package: Some("google.protobuf".into()),
                message_type: vec![DescriptorProto {
                    name: Some("FieldMask".into()),
                    field: vec![FieldDescriptorProto {
                        name: Some("paths".into()),
                        number: Some(1),
                        r#type: Some(9), // string
                        label: Some(3),  // repeated
                        json_name: Some("paths".into()),
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                syntax: Some("proto3".into()),
                ..Default::default()
            }],
        };
        let desc = prost_reflect::DescriptorPool::from_file_descriptor_set(set)
            .unwrap()
            .get_message_by_name("google.protobuf.FieldMask")
            .unwrap();

        let registry = default_registry();
        let printer = Printer::new().with_format_registry(registry.clone());
        let parser = Parser::new().with_format_registry(registry);

        let mut msg = DynamicMessage::new(desc.clone());
        msg.set_field(
            &desc.get_field_by_name("paths").unwrap(),
            Value::List(vec![
                Value::String("user_id".into()),
                Value::String("display_name".into()),
            ]),
        );
        let json = printer.to_json(&msg).unwrap();
        assert_eq!(json, Json::String("userId,displayName".into()));

        let parsed = parser.parse(&json, &desc).unwrap();
        let paths = parsed.get_field(&desc.get_field_by_name("paths").unwrap());
        assert_eq!(
            paths.as_ref(),
            &Value::List(vec![
                Value::String("user_id".into()),
                Value::String("display_name".into()),
            ])
        );
    }

    #[test]
    fn null_value_enum_round_trips_through_json_null() {
        use prost_types::EnumDescriptorProto;
        use prost_types::EnumValueDescriptorProto;

        let set = FileDescriptorSet {
            file: vec![FileDescriptorProto {
                name: Some("nv.proto".into()),
                package: Some("google.protobuf".into()),
                enum_type: vec![EnumDescriptorProto {
                    name: Some("NullValue".into()),
                    value: vec![EnumValueDescriptorProto {
                        name: Some("NULL_VALUE".into()),
                        number: Some(0),
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                syntax: Some("proto3".into()),
                ..Default::default()
            }],
        };
        let desc = prost_reflect::DescriptorPool::from_file_descriptor_set(set)
            .unwrap()
            .get_enum_by_name("google.protobuf.NullValue")
            .unwrap();

        let formatter = null_value_formatter();
        let value = Value::EnumNumber(0);
        let printer = Printer::new();
        let json = (formatter.write)(&value, &desc, &printer);
        assert_eq!(json, Json::Null);

        let parser = Parser::new();
        let parsed = (formatter.read)(&Json::Null, &desc, &parser).unwrap();
        assert_eq!(parsed, Value::EnumNumber(0));

        let err = (formatter.read)(&Json::String("x".into()), &desc, &parser);
        assert!(err.is_err());
    }

    /// Builds `google.protobuf.{NullValue,Value,Struct,ListValue,Any}` with
    /// the same field layout as the real `struct.proto`/`any.proto`.
    fn wkt_pool() -> prost_reflect::DescriptorPool {
        use prost_types::{
            EnumDescriptorProto, EnumValueDescriptorProto, MessageOptions, OneofDescriptorProto,
        };

        fn f(name: &str, json_name: &str, number: i32, ty: i32, label: i32) -> FieldDescriptorProto {
            FieldDescriptorProto {
                name: Some(name.to_owned()),
                number: Some(number),
                r#type: Some(ty),
                label: Some(label),
                json_name: Some(json_name.to_owned()),
                ..Default::default()
            }
        }

        let file = FileDescriptorProto {
            name: Some("struct.proto".into()),
            package: Some("google.protobuf".into()),
            enum_type: vec![EnumDescriptorProto {
                name: Some("NullValue".into()),
                value: vec![EnumValueDescriptorProto {
                    name: Some("NULL_VALUE".into()),
                    number: Some(0),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            message_type: vec![
                DescriptorProto {
                    name: Some("Value".into()),
                    field: vec![
                        {
                            let mut field = f("null_value", "nullValue", 1, 14, 1);
                            field.type_name = Some(".google.protobuf.NullValue".into());
                            field.oneof_index = Some(0);
                            field
                        },
                        {
                            let mut field = f("number_value", "numberValue", 2, 1, 1);
                            field.oneof_index = Some(0);
                            field
                        },
                        {
                            let mut field = f("string_value", "stringValue", 3, 9, 1);
                            field.oneof_index = Some(0);
                            field
                        },
                        {
                            let mut field = f("bool_value", "boolValue", 4, 8, 1);
                            field.oneof_index = Some(0);
                            field
                        },
                        {
                            let mut field = f("struct_value", "structValue", 5, 11, 1);
                            field.type_name = Some(".google.protobuf.Struct".into());
                            field.oneof_index = Some(0);
                            field
                        },
                        {
                            let mut field = f("list_value", "listValue", 6, 11, 1);
                            field.type_name = Some(".google.protobuf.ListValue".into());
                            field.oneof_index = Some(0);
                            field
                        },
                    ],
                    oneof_decl: vec![OneofDescriptorProto {
                        name: Some("kind".into()),
                        ..Default::default()
                    }],
                    ..Default::default()
                },
                DescriptorProto {
                    name: Some("Struct".into()),
                    field: vec![{
                        let mut field = f("fields", "fields", 1, 11, 3);
                        field.type_name = Some(".google.protobuf.Struct.FieldsEntry".into());
                        field
                    }],
                    nested_type: vec![DescriptorProto {
                        name: Some("FieldsEntry".into()),
                        field: vec![
                            f("key", "key", 1, 9, 1),
                            {
                                let mut field = f("value", "value", 2, 11, 1);
                                field.type_name = Some(".google.protobuf.Value".into());
                                field
                            },
                        ],
                        options: Some(MessageOptions {
                            map_entry: Some(true),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }],
                    ..Default::default()
                },
                DescriptorProto {
                    name: Some("ListValue".into()),
                    field: vec![{
                        let mut field = f("values", "values", 1, 11, 3);
                        field.type_name = Some(".google.protobuf.Value".into());
                        field
                    }],
                    ..Default::default()
                },
                DescriptorProto {
                    name: Some("Any".into()),
                    field: vec![
                        f("type_url", "typeUrl", 1, 9, 1),
                        f("value", "value", 2, 12, 1),
                    ],
                    ..Default::default()
                },
            ],
            syntax: Some("proto3".into()),
            ..Default::default()
        };

        prost_reflect::DescriptorPool::from_file_descriptor_set(FileDescriptorSet { file: vec![file] })
            .unwrap()
    }

    /// `Struct`'s canonical form is a JSON object, so packing one into `Any`
    /// must spread its fields at the top level rather than use the
    /// `{"value": ...}` envelope reserved for non-object well-known types —
    /// and the reverse must parse that same shape back.
    #[test]
    fn any_wrapping_struct_spreads_fields_instead_of_using_value_envelope() {
        let pool = wkt_pool();
        let struct_desc = pool.get_message_by_name("google.protobuf.Struct").unwrap();
        let value_desc = pool.get_message_by_name("google.protobuf.Value").unwrap();
        let any_desc = pool.get_message_by_name("google.protobuf.Any").unwrap();

        let mut inner_value = DynamicMessage::new(value_desc.clone());
        inner_value.set_field(
            &value_desc.get_field_by_name("string_value").unwrap(),
            Value::String("x".into()),
        );
        let mut fields = HashMap::new();
        fields.insert(
            prost_reflect::MapKey::String("a".into()),
            Value::Message(inner_value),
        );
        let mut inner_struct = DynamicMessage::new(struct_desc.clone());
        inner_struct.set_field(
            &struct_desc.get_field_by_name("fields").unwrap(),
            Value::Map(fields),
        );

        let type_url = "type.googleapis.com/google.protobuf.Struct".to_owned();
        let mut any = DynamicMessage::new(any_desc.clone());
        any.set_field(
            &any_desc.get_field_by_name("type_url").unwrap(),
            Value::String(type_url.clone()),
        );
        any.set_field(
            &any_desc.get_field_by_name("value").unwrap(),
            Value::Bytes(inner_struct.encode_to_vec().into()),
        );

        let type_registry = crate::type_registry::TypeRegistry::new()
            .register(struct_desc)
            .register(value_desc);
        let registry = default_registry().with_type_registry(type_registry.clone());
        let printer = Printer::new().with_format_registry(registry.clone());
        let parser = Parser::new().with_format_registry(registry);

        let json = printer.to_json(&any).unwrap();
        assert_eq!(json, serde_json::json!({"@type": type_url, "a": "x"}));

        let parsed = parser.parse(&json, &any_desc).unwrap();
        assert_eq!(parsed, any);
    }
}
