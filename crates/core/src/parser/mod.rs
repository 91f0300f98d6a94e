//! Release title parsing and series matching.
//!
//! `parse_title` turns a free-text release title into structured attributes
//! using an ordered rule set; a field no rule matches stays `None` rather
//! than being guessed. `match_series` compares parsed attributes against
//! subscribed series records.

mod matcher;
mod title;
mod types;

pub use matcher::match_series;
pub use title::parse_title;
pub use types::ParsedTitle;
