//! tickcap-metadata: Feed configuration shared by the connector and its binary

pub mod error;
pub mod feed;

pub use error::MetadataError;
pub use feed::{FeedConfig, DEFAULT_ENDPOINT, SYMBOL_PLACEHOLDER};
