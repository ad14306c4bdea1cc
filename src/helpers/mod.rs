//! Helper functions shared by the compiler, templates and generators

mod date;
mod html;
mod url;

pub use date::*;
pub use html::*;
pub use url::*;
