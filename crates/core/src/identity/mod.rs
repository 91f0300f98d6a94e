//! Canonical torrent identity resolution.
//!
//! Turns a candidate's torrent URL into a canonical magnet identity by
//! decoding the metainfo it points at. The content-derived info-hash is
//! reconciled against the hash embedded in the URL; disagreement is carried
//! as a structured pair, not an error. Resolution never fails outward: any
//! fetch or decode problem leaves the original URL untouched.

mod resolver;
mod types;

pub use resolver::{extract_url_hash, magnet_from_bytes, IdentityResolver};
pub use types::{HashMismatch, IdentityError, ResolvedIdentity};
