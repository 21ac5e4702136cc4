//! A pluggable, persistent lookup table from message/enum type identity to a
//! custom `(write, read)` formatter pair. This is how well-known types get
//! their non-generic JSON representations (see [`crate::well_known`]).

use std::sync::Arc;

use prost_reflect::{DynamicMessage, EnumDescriptor, MessageDescriptor, Value};
use serde_json::Value as Json;

use crate::error::Result;
use crate::parser::Parser;
use crate::printer::Printer;
use crate::type_registry::TypeRegistry;

/// Writes a message to JSON, given the printer driving the encode (so a
/// formatter can recurse into nested messages with the same options).
pub type MessageWriter = Arc<dyn Fn(&DynamicMessage, &Printer) -> Result<Json> + Send + Sync>;

/// Reads a message from JSON against its descriptor, given the parser
/// driving the decode.
pub type MessageReader =
    Arc<dyn Fn(&Json, &MessageDescriptor, &Parser) -> Result<DynamicMessage> + Send + Sync>;

/// Writes an enum value to JSON.
pub type EnumWriter = Arc<dyn Fn(&Value, &EnumDescriptor, &Printer) -> Json + Send + Sync>;

/// Reads an enum value from JSON.
pub type EnumReader =
    Arc<dyn Fn(&Json, &EnumDescriptor, &Parser) -> Result<Value> + Send + Sync>;

/// A registered `(write, read)` pair for one message type.
#[derive(Clone)]
pub struct MessageFormatter {
    pub write: MessageWriter,
    pub read: MessageReader,
}

/// A registered `(write, read)` pair for one enum type.
#[derive(Clone)]
pub struct EnumFormatter {
    pub write: EnumWriter,
    pub read: EnumReader,
}

/// A singly-linked overlay of named entries, so that registering on top of a
/// shared base registry is O(1) and never mutates or copies the base.
enum Layer<T> {
    Empty,
    Entry {
        name: String,
        value: T,
        parent: Arc<Layer<T>>,
    },
}

impl<T> Layer<T> {
    fn get(&self, name: &str) -> Option<&T> {
        match self {
            Layer::Empty => None,
            Layer::Entry {
                name: n,
                value,
                parent,
            } => {
                if n == name {
                    Some(value)
                } else {
                    parent.get(name)
                }
            }
        }
    }
}

/// An immutable registry of custom message/enum formatters plus the
/// [`TypeRegistry`] used to resolve `Any.type_url`.
///
/// Cloning a `FormatRegistry` is O(1): the overlay chains are `Arc`-backed,
/// and `register_message`/`register_enum` return a new registry that shares
/// every prior entry with its predecessor rather than copying them.
#[derive(Clone)]
pub struct FormatRegistry {
    messages: Arc<Layer<MessageFormatter>>,
    enums: Arc<Layer<EnumFormatter>>,
    type_registry: TypeRegistry,
}

impl Default for FormatRegistry {
    /// The default registry, pre-populated with the well-known-type
    /// formatters from [`crate::well_known`].
    fn default() -> Self {
        crate::well_known::default_registry()
    }
}

impl FormatRegistry {
    /// A registry with no formatters at all, not even the well-known types.
    /// Most callers want [`FormatRegistry::default`] instead.
    pub fn empty() -> Self {
        FormatRegistry {
            messages: Arc::new(Layer::Empty),
            enums: Arc::new(Layer::Empty),
            type_registry: TypeRegistry::new(),
        }
    }

    /// Register a writer/reader pair for the message type named `full_name`,
    /// returning a new registry. Shadows any existing formatter for the same
    /// name.
    pub fn register_message(&self, full_name: impl Into<String>, formatter: MessageFormatter) -> Self {
        FormatRegistry {
            messages: Arc::new(Layer::Entry {
                name: full_name.into(),
                value: formatter,
                parent: self.messages.clone(),
            }),
            enums: self.enums.clone(),
            type_registry: self.type_registry.clone(),
        }
    }

    /// Register a writer/reader pair for the enum type named `full_name`,
    /// returning a new registry.
    pub fn register_enum(&self, full_name: impl Into<String>, formatter: EnumFormatter) -> Self {
        FormatRegistry {
            messages: self.messages.clone(),
            enums: Arc::new(Layer::Entry {
                name: full_name.into(),
                value: formatter,
                parent: self.enums.clone(),
            }),
            type_registry: self.type_registry.clone(),
        }
    }

    /// Replace the `TypeRegistry` used for `Any` resolution, returning a new
    /// registry.
    pub fn with_type_registry(&self, type_registry: TypeRegistry) -> Self {
        FormatRegistry {
            messages: self.messages.clone(),
            enums: self.enums.clone(),
            type_registry,
        }
    }

    pub fn message_formatter(&self, full_name: &str) -> Option<&MessageFormatter> {
        self.messages.get(full_name)
    }

    pub fn enum_formatter(&self, full_name: &str) -> Option<&EnumFormatter> {
        self.enums.get(full_name)
    }

    pub fn type_registry(&self) -> &TypeRegistry {
        &self.type_registry
    }
}
