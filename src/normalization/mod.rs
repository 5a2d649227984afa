pub mod title;

pub use title::{clean_tag, clean_title, is_likely_base_game, slugify, SlugDialect};
