//! Maps a fully-qualified proto type name to its descriptor, for resolving
//! `Any.type_url` during both printing and parsing.

use std::collections::HashMap;
use std::sync::Arc;

use prost_reflect::{FileDescriptor, MessageDescriptor};

/// An immutable, cheaply-clonable map from full message name to descriptor.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    descriptors: Arc<HashMap<String, MessageDescriptor>>,
}

impl TypeRegistry {
    /// An empty registry. `Any` values will fail to resolve until messages
    /// are registered.
    pub fn new() -> Self {
        TypeRegistry::default()
    }

    /// Register one message descriptor, returning a new registry.
    pub fn register(&self, descriptor: MessageDescriptor) -> Self {
        let mut descriptors = (*self.descriptors).clone();
        descriptors.insert(descriptor.full_name().to_owned(), descriptor);
        TypeRegistry {
            descriptors: Arc::new(descriptors),
        }
    }

    /// Register every message type declared in `file`, returning a new
    /// registry. Does not recurse into the file's dependencies.
    pub fn register_file(&self, file: &FileDescriptor) -> Self {
        let mut registry = self.clone();
        for message in file.messages() {
            registry = registry.register(message);
        }
        registry
    }

    /// Look up a descriptor by its fully-qualified proto type name (without
    /// the `type.googleapis.com/` prefix).
    pub fn get_by_name(&self, full_name: &str) -> Option<MessageDescriptor> {
        self.descriptors.get(full_name).cloned()
    }
}
