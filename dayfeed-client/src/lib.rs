//! dayfeed-client library
//!
//! Resilient HTTP access to a dayfeed server: request signing, bounded
//! retries with exponential backoff, and typed failure classification so
//! a tablet UI can decide between "try again" and "call for help".

pub mod fetcher;

pub use fetcher::{ErrorKind, FetchError, FetcherConfig, ResilientFetcher};
