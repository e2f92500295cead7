//! Type system utilities and aliases.
//!
//! ## Modules
//!
//! - [`aliases`]: Type aliases for shared registry and collaborator handles.

pub mod aliases;

pub use aliases::*;
