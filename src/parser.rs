//! Consumes a JSON value tree against a target message descriptor and
//! materializes a reflected message via the reverse mapping.

use std::collections::HashMap;

use prost_reflect::{DynamicMessage, FieldDescriptor, Kind, MessageDescriptor, Value};
use serde_json::Value as Json;

use crate::error::{JsonFormatError, Result};
use crate::primitive::{self, unexpected};
use crate::registry::FormatRegistry;
use crate::type_registry::TypeRegistry;

/// Parses canonical proto3 JSON into [`DynamicMessage`]s.
///
/// A `Parser` is immutable once constructed via the builder methods below,
/// cheap to clone, and safe to share across threads.
#[derive(Clone)]
pub struct Parser {
    preserving_proto_field_names: bool,
    format_registry: FormatRegistry,
    type_registry: TypeRegistry,
}

impl Default for Parser {
    fn default() -> Self {
        Parser::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Parser {
            preserving_proto_field_names: false,
            format_registry: FormatRegistry::default(),
            type_registry: TypeRegistry::new(),
        }
    }

    /// Look fields up by their proto (`snake_case`) name instead of their
    /// JSON (`lowerCamelCase`) name.
    pub fn preserving_proto_field_names(mut self, value: bool) -> Self {
        self.preserving_proto_field_names = value;
        self
    }

    /// Replace the format registry (default: the well-known-type formatters
    /// from [`crate::well_known`]).
    pub fn with_format_registry(mut self, registry: FormatRegistry) -> Self {
        self.format_registry = registry;
        self
    }

    /// Replace the type registry used to resolve `Any.type_url` while
    /// parsing.
    pub fn with_type_registry(mut self, registry: TypeRegistry) -> Self {
        self.type_registry = registry.clone();
        self.format_registry = self.format_registry.with_type_registry(registry);
        self
    }

    pub(crate) fn format_registry(&self) -> &FormatRegistry {
        &self.format_registry
    }

    pub(crate) fn type_registry(&self) -> &TypeRegistry {
        &self.type_registry
    }

    /// Parse a JSON-text document against `descriptor`.
    pub fn parse_str(&self, json: &str, descriptor: &MessageDescriptor) -> Result<DynamicMessage> {
        let value: Json =
            serde_json::from_str(json).map_err(|e| JsonFormatError::MalformedJson(e.to_string()))?;
        self.parse(&value, descriptor)
    }

    /// Parse a [`serde_json::Value`] tree against `descriptor`.
    pub fn parse(&self, json: &Json, descriptor: &MessageDescriptor) -> Result<DynamicMessage> {
        if let Some(formatter) = self.format_registry.message_formatter(descriptor.full_name()) {
            return (formatter.read)(json, descriptor, self);
        }

        let object = json
            .as_object()
            .ok_or_else(|| unexpected(descriptor.full_name(), "object", json))?;

        let mut message = DynamicMessage::new(descriptor.clone());
        for (key, raw) in object {
            let Some(field) = self.lookup_field(descriptor, key) else {
                // Unknown field name: forward-compatibility, silently ignored.
                continue;
            };
            // Null is treated as "field absent" everywhere except a singular
            // field whose type has a registered formatter that explicitly
            // accepts null (`NullValue`, `Value`); those dispatch through
            // `parse_single` just like any other value.
            if raw.is_null() && !(!field.is_map() && !field.is_list() && self.accepts_null(&field))
            {
                continue;
            }
            if field.is_map() {
                self.parse_map_field(raw, &field, &mut message)?;
            } else if field.is_list() {
                self.parse_list_field(raw, &field, &mut message)?;
            } else {
                let value = self.parse_single(raw, &field)?;
                message.set_field(&field, value);
            }
        }
        Ok(message)
    }

    fn lookup_field(&self, descriptor: &MessageDescriptor, key: &str) -> Option<FieldDescriptor> {
        if self.preserving_proto_field_names {
            descriptor.get_field_by_name(key)
        } else {
            descriptor.get_field_by_json_name(key)
        }
    }

    /// Whether `field`'s kind has a registered formatter that explicitly
    /// accepts a JSON `null` (`NullValue`'s enum formatter, `Value`'s message
    /// formatter), rather than the generic "null means absent" rule.
    fn accepts_null(&self, field: &FieldDescriptor) -> bool {
        match field.kind() {
            Kind::Message(m) => self.format_registry.message_formatter(m.full_name()).is_some(),
            Kind::Enum(e) => self.format_registry.enum_formatter(e.full_name()).is_some(),
            _ => false,
        }
    }

    fn parse_map_field(
        &self,
        raw: &Json,
        field: &FieldDescriptor,
        message: &mut DynamicMessage,
    ) -> Result<()> {
        let object = raw
            .as_object()
            .ok_or_else(|| unexpected(field.name(), "object", raw))?;
        let entry_desc = match field.kind() {
            Kind::Message(m) => m,
            _ => unreachable!("map field must have message kind"),
        };
        let key_field = entry_desc.get_field(1).expect("map entry has key field");
        let value_field = entry_desc.get_field(2).expect("map entry has value field");

        let mut map = HashMap::with_capacity(object.len());
        for (raw_key, raw_value) in object {
            if raw_value.is_null() && !self.accepts_null(&value_field) {
                continue;
            }
            let key = primitive::decode_map_key(raw_key, &key_field.kind(), field.name())?;
            let value = self.parse_single(raw_value, &value_field)?;
            map.insert(key, value);
        }
        message.set_field(field, Value::Map(map));
        Ok(())
    }

    fn parse_list_field(
        &self,
        raw: &Json,
        field: &FieldDescriptor,
        message: &mut DynamicMessage,
    ) -> Result<()> {
        let array = raw
            .as_array()
            .ok_or_else(|| unexpected(field.name(), "array", raw))?;
        let mut list = Vec::with_capacity(array.len());
        for item in array {
            list.push(self.parse_single(item, field)?);
        }
        message.set_field(field, Value::List(list));
        Ok(())
    }

    /// Decode one value (scalar, enum, or message) per `field`'s kind. Used
    /// for singular fields, each element of a repeated field, and each
    /// value of a map field.
    fn parse_single(&self, raw: &Json, field: &FieldDescriptor) -> Result<Value> {
        match field.kind() {
            Kind::Message(nested_desc) => {
                let nested = self.parse(raw, &nested_desc)?;
                Ok(Value::Message(nested))
            }
            Kind::Enum(enum_desc) => {
                if let Some(formatter) = self.format_registry.enum_formatter(enum_desc.full_name())
                {
                    (formatter.read)(raw, &enum_desc, self)
                } else {
                    primitive::decode_enum(raw, &enum_desc, field.name())
                }
            }
            scalar_kind => primitive::decode_scalar(raw, &scalar_kind, field.name()),
        }
    }
}
