//! Zone assembly and rendering: from store rows to BIND zone-file text.

pub mod assemble;
pub mod render;
pub mod reverse;
