#![warn(missing_docs)]

//! netloom-uri: allocation-light URI parsing and synthesis.
//!
//! A [`Uri`] owns exactly one contiguous byte buffer holding the full URI
//! text; every component accessor returns a view into that buffer, valid
//! for as long as the `Uri` is alive. Synthesis through [`UriBuilder`]
//! always round-trips the result through the parser, so built and parsed
//! URIs behave identically.
//!
//! The accepted grammar is `[scheme "://"] authority [path] ["?" query]`
//! where authority is `host [":" port]` and port is 1 to 5 decimal digits
//! no greater than 65535. There is no normalization, percent-decoding or
//! IPv6 bracket handling.

mod builder;
mod parser;
mod query;
mod uri;

pub use builder::UriBuilder;
pub use query::QueryParam;
pub use uri::Uri;
