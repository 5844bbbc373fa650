//! Key Module
//!
//! Derives concrete cache keys from templates and call arguments.

mod params;
mod template;

pub use params::ParamNames;
pub use template::{resolve_key, KeyTemplate};
