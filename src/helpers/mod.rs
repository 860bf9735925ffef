//! Helper functions for templates
//!
//! URL generation, HTML tags, dates and listings used while building the
//! template context.

mod date;
mod html;
mod list;
mod url;

pub use date::*;
pub use html::*;
pub use list::*;
pub use url::*;
