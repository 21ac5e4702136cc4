//! Walks a message reflectively and produces a canonical proto3 JSON tree.

use prost_reflect::{DynamicMessage, FieldDescriptor, Kind, Value};
use serde_json::{Map as JsonMap, Value as Json};

use crate::defaults;
use crate::error::Result;
use crate::primitive;
use crate::registry::FormatRegistry;
use crate::type_registry::TypeRegistry;

/// Prints [`DynamicMessage`]s to canonical proto3 JSON.
///
/// A `Printer` is immutable once constructed via the builder methods below,
/// cheap to clone, and safe to share across threads.
#[derive(Clone)]
pub struct Printer {
    including_default_value_fields: bool,
    preserving_proto_field_names: bool,
    formatting_long_as_number: bool,
    formatting_enums_as_number: bool,
    format_registry: FormatRegistry,
    type_registry: TypeRegistry,
}

impl Default for Printer {
    fn default() -> Self {
        Printer::new()
    }
}

impl Printer {
    pub fn new() -> Self {
        Printer {
            including_default_value_fields: false,
            preserving_proto_field_names: false,
            formatting_long_as_number: false,
            formatting_enums_as_number: false,
            format_registry: FormatRegistry::default(),
            type_registry: TypeRegistry::new(),
        }
    }

    /// Emit proto3 default-valued singular scalars and empty repeated/map
    /// fields instead of omitting them.
    pub fn including_default_value_fields(mut self, value: bool) -> Self {
        self.including_default_value_fields = value;
        self
    }

    /// Emit proto field names (`snake_case`) instead of JSON names
    /// (`lowerCamelCase`).
    pub fn preserving_proto_field_names(mut self, value: bool) -> Self {
        self.preserving_proto_field_names = value;
        self
    }

    /// Emit 64-bit integers and unsigned 32-bit integers as JSON numbers
    /// instead of decimal strings.
    pub fn formatting_long_as_number(mut self, value: bool) -> Self {
        self.formatting_long_as_number = value;
        self
    }

    /// Emit enum values as their numbers instead of their names.
    pub fn formatting_enums_as_number(mut self, value: bool) -> Self {
        self.formatting_enums_as_number = value;
        self
    }

    /// Replace the format registry (default: the well-known-type formatters
    /// from [`crate::well_known`]).
    pub fn with_format_registry(mut self, registry: FormatRegistry) -> Self {
        self.format_registry = registry;
        self
    }

    /// Replace the type registry used to resolve `Any.type_url` while
    /// printing.
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

    pub(crate) fn long_as_number(&self) -> bool {
        self.formatting_long_as_number
    }

    pub(crate) fn emits_defaults(&self) -> bool {
        self.including_default_value_fields
    }

    /// Print `message` as a compact JSON string.
    pub fn print(&self, message: &DynamicMessage) -> Result<String> {
        Ok(self.to_json(message)?.to_string())
    }

    /// Print `message` as a [`serde_json::Value`] tree.
    pub fn to_json(&self, message: &DynamicMessage) -> Result<Json> {
        let descriptor = message.descriptor();
        if let Some(formatter) = self.format_registry.message_formatter(descriptor.full_name()) {
            return (formatter.write)(message, self);
        }

        let mut object = JsonMap::with_capacity(descriptor.fields().len());
        for field in descriptor.fields() {
            let name = self.field_name(&field);
            if field.is_map() {
                self.print_map_field(message, &field, &name, &mut object)?;
            } else if field.is_list() {
                self.print_list_field(message, &field, &name, &mut object)?;
            } else if matches!(field.kind(), Kind::Message(_)) {
                self.print_message_field(message, &field, &name, &mut object)?;
            } else {
                self.print_scalar_field(message, &field, &name, &mut object)?;
            }
        }
        Ok(Json::Object(object))
    }

    fn field_name(&self, field: &FieldDescriptor) -> String {
        if self.preserving_proto_field_names {
            field.name().to_owned()
        } else {
            field.json_name().to_owned()
        }
    }

    /// A `null`/unset singular message field is never emitted, even under
    /// `including_default_value_fields`: a sentinel default would recurse
    /// forever on a self-referential schema.
    fn print_message_field(
        &self,
        message: &DynamicMessage,
        field: &FieldDescriptor,
        name: &str,
        object: &mut JsonMap<String, Json>,
    ) -> Result<()> {
        if !message.has_field(field) {
            return Ok(());
        }
        let value = message.get_field(field);
        let inner = match value.as_ref() {
            Value::Message(m) => m,
            _ => return Ok(()),
        };
        object.insert(name.to_owned(), self.to_json(inner)?);
        Ok(())
    }

    fn print_scalar_field(
        &self,
        message: &DynamicMessage,
        field: &FieldDescriptor,
        name: &str,
        object: &mut JsonMap<String, Json>,
    ) -> Result<()> {
        let in_oneof = field.containing_oneof().is_some();
        if in_oneof && !message.has_field(field) {
            return Ok(());
        }
        let value = message.get_field(field);
        if !in_oneof && !self.including_default_value_fields && defaults::is_default(&value, field)
        {
            return Ok(());
        }
        object.insert(name.to_owned(), self.encode_single(&value, field, name)?);
        Ok(())
    }

    fn print_list_field(
        &self,
        message: &DynamicMessage,
        field: &FieldDescriptor,
        name: &str,
        object: &mut JsonMap<String, Json>,
    ) -> Result<()> {
        let value = message.get_field(field);
        let list = match value.as_ref() {
            Value::List(l) => l,
            _ => return Ok(()),
        };
        if list.is_empty() {
            if self.including_default_value_fields {
                object.insert(name.to_owned(), Json::Array(Vec::new()));
            }
            return Ok(());
        }
        let mut array = Vec::with_capacity(list.len());
        for item in list {
            array.push(self.encode_single(item, field, name)?);
        }
        object.insert(name.to_owned(), Json::Array(array));
        Ok(())
    }

    /// Map keys are always stringified, regardless of the map's declared key
    /// type; values recurse through whichever encoder fits the value type.
    fn print_map_field(
        &self,
        message: &DynamicMessage,
        field: &FieldDescriptor,
        name: &str,
        object: &mut JsonMap<String, Json>,
    ) -> Result<()> {
        let value = message.get_field(field);
        let map = match value.as_ref() {
            Value::Map(m) => m,
            _ => return Ok(()),
        };
        if map.is_empty() {
            if self.including_default_value_fields {
                object.insert(name.to_owned(), Json::Object(JsonMap::new()));
            }
            return Ok(());
        }
        let entry_desc = match field.kind() {
            Kind::Message(m) => m,
            _ => unreachable!("map field must have message kind"),
        };
        let value_field = entry_desc.get_field(2).expect("map entry has value field");
        let mut entries = JsonMap::with_capacity(map.len());
        for (key, value) in map.iter() {
            let key_str = primitive::encode_map_key(key);
            entries.insert(key_str, self.encode_single(value, &value_field, name)?);
        }
        object.insert(name.to_owned(), Json::Object(entries));
        Ok(())
    }

    /// Encode one value (scalar, enum, or message) per `field`'s kind. Used
    /// for singular fields and for each element of a repeated/map field.
    fn encode_single(&self, value: &Value, field: &FieldDescriptor, _name: &str) -> Result<Json> {
        match field.kind() {
            Kind::Message(_) => {
                let inner = match value {
                    Value::Message(m) => m,
                    _ => return Ok(Json::Null),
                };
                self.to_json(inner)
            }
            Kind::Enum(enum_desc) => {
                if let Some(formatter) = self.format_registry.enum_formatter(enum_desc.full_name())
                {
                    Ok((formatter.write)(value, &enum_desc, self))
                } else {
                    Ok(primitive::encode_enum(
                        value,
                        &enum_desc,
                        self.formatting_enums_as_number,
                    ))
                }
            }
            scalar_kind => Ok(primitive::encode_scalar(
                value,
                &scalar_kind,
                self.formatting_long_as_number,
            )),
        }
    }
}
