//! Shared types for the Quill compiler front end.
//!
//! - [`span`]: byte-offset spans and on-demand line/column lookup
//! - [`sym`]: module-qualified symbol names

pub mod span;
pub mod sym;
