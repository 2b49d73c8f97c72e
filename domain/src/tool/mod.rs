//! Tool domain module
//!
//! Static description of the tool catalog and the values that flow through
//! a single tool call.
//!
//! ```text
//! ┌──────────────┐    ┌─────────────────┐    ┌──────────────┐
//! │ ToolRegistry │───▶│ ToolCallRequest │───▶│ ToolResult   │
//! │ (catalog)    │    │ (per turn)      │    │ (per request)│
//! └──────────────┘    └─────────────────┘    └──────────────┘
//! ```
//!
//! Every tool is described by a [`ToolDescriptor`] carrying its
//! [`PermissionClass`](descriptor::PermissionClass), argument schema and
//! scheduling flags (`concurrency_safe`, `session_scoped`). Descriptors are
//! immutable once registered.
//!
//! | Class | Examples | Policy |
//! |-------|----------|--------|
//! | **ReadOnly** | `read_file`, `glob_search`, `agent` | always allowed |
//! | **Mutating** | `write_file`, `edit_file` | confirm in interactive mode |
//! | **Dangerous** | `bash` | allow-list only |

pub mod call;
pub mod descriptor;
pub mod registry;
pub mod result;
pub mod validation;

pub use call::{ToolArguments, ToolCallRequest};
pub use descriptor::{ParamType, PermissionClass, ToolDescriptor, ToolParameter};
pub use registry::ToolRegistry;
pub use result::{ToolResult, ToolResultStatus};
pub use validation::{ArgumentValidator, DefaultArgumentValidator};
