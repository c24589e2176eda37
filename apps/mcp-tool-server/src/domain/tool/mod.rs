//! Tool Schema Types
//!
//! A tool is described once at startup by a [`ToolDescriptor`] (name,
//! description, ordered parameters). Incoming arguments are checked and
//! coerced against that schema into [`ToolArguments`] before any handler
//! runs.

mod arguments;
mod descriptor;

pub use arguments::{ToolArguments, ValidationError};
pub use descriptor::{MAX_TOOL_NAME_LEN, ParamSpec, ParamType, RegistrationError, ToolDescriptor};
