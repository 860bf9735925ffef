//! Content module - posts, block maps, post-processing and rendering

mod blocks;
mod post;
pub mod process;
mod render;

pub use blocks::{Block, BlockMap, BlockRecord, BlockTable};
pub use post::{find_by_slug, Post, PostKind};
pub use process::{contact_hash, process_blocks, process_post, ProcessOptions, ProcessedPost};
pub use render::{plain_text, BlockRenderer};
