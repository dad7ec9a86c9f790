//! Stackscope Core - Resource records and stack state
//!
//! This crate holds the data model every other Stackscope crate consumes:
//! the resource record as found in a stack checkpoint, plus loaders for
//! checkpoint files and local state directories.
//!
//! # Example
//!
//! ```no_run
//! use stackscope_core::Stack;
//! use std::path::Path;
//!
//! let stack = Stack::load(Path::new(".pulumi/stacks/web/dev.json")).unwrap();
//! for resource in &stack.resources {
//!     println!("{} ({})", resource.display_name(), resource.kind);
//! }
//! ```

mod error;
mod resource;
mod stack;
mod state;

pub use error::{Result, StateError};
pub use resource::{display_name, Resource, STACK_RESOURCE_TYPE, URN_SEPARATOR};
pub use stack::{stack_outputs, Stack};
pub use state::{list_projects, load_stack, stack_path, Project, StackInfo, STACKS_DIR};
