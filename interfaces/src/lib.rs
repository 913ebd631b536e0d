pub mod defs;
pub mod state;

pub use defs::{null_as_default, ArticleRecord, EnrichedArticle, EnrichedNewsletter, Section, SectionKey, EXTERNAL_NEWS};
pub use state::DocumentStore;
