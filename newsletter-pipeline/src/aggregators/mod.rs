pub mod recency;

pub use recency::rank_by_recency;
