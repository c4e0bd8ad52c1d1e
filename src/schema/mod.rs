//! Schema system - file validation and page rendering

pub mod registry;
pub mod template;
pub mod validator;

pub use registry::{DocumentKind, SchemaRegistry};
pub use template::{PageRenderer, TemplateError};
pub use validator::{ValidationError, Validator};
