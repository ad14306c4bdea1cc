//! Content module - blog posts, front-matter, reading time and MDX compilation

mod category;
pub mod components;
mod frontmatter;
mod mdx;
mod post;
mod reading_time;
mod store;

pub use category::Category;
pub use components::{Component, ComponentRegistry};
pub use frontmatter::{parse_date_string, FrontMatter, FrontMatterError};
pub use mdx::{CompileError, MdxCompiler};
pub use post::{Author, Post};
pub use reading_time::{count_words, ReadingTime};
pub use store::{ContentError, PostStore};
