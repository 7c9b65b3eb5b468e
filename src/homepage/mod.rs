//! Homepage content: sources and the read-through loader.

mod loader;
mod source;

pub use loader::{HomepageData, HomepageLoader};
pub use source::{ContentSource, EmptySource, RestContentSource};
