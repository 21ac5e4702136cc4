//! Bidirectional codec between protobuf messages and JSON, implementing the
//! canonical proto3 JSON mapping over [`prost_reflect`] descriptors rather
//! than generated code.
//!
//! ```no_run
//! use prost_json_format::{Parser, Printer};
//! # fn example(message: &prost_reflect::DynamicMessage, descriptor: &prost_reflect::MessageDescriptor) -> prost_json_format::Result<()> {
//! let json = Printer::new().print(message)?;
//! let round_tripped = Parser::new().parse_str(&json, descriptor)?;
//! # let _ = round_tripped;
//! # Ok(())
//! # }
//! ```

mod defaults;
mod error;
mod parser;
mod primitive;
mod printer;
mod registry;
mod type_registry;
mod well_known;

pub use error::{JsonFormatError, Result};
pub use parser::Parser;
pub use printer::Printer;
pub use registry::{EnumFormatter, FormatRegistry, MessageFormatter};
pub use type_registry::TypeRegistry;
