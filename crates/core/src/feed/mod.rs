//! Syndication feed ingestion.
//!
//! Fetches a feed over HTTP with a bounded retry budget and parses the
//! document into release candidates. Network and parse failures degrade to
//! an empty candidate list; they never propagate to the poll cycle.

mod fetcher;
mod parser;
mod types;

pub use fetcher::FeedFetcher;
pub use parser::parse_feed;
pub use types::{Candidate, FeedError};
