//! Tool system for function calling.

pub mod arguments;
pub mod invoker;
pub mod registry;
pub mod response;
pub mod schema;
pub mod tool;
pub mod transform;
pub mod validation;

pub use arguments::ToolArguments;
pub use invoker::{invoke_all, invoke_tool};
pub use registry::ToolRegistry;
pub use response::ToolResponse;
pub use schema::{render_definition, ParameterBuilder, ToolSchema};
pub use tool::{FnTool, Tool};
pub use transform::{
    resolve_path, ArgumentTransformer, ArgumentValidator, DateNormalizer, JsonExtractor, PathRule,
    SortPairs,
};
pub use validation::{format_violations, validate_arguments, ValidationMode, Violation};
