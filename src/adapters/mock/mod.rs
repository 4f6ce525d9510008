//! Mock implementations for testing.
//!
//! - [`MockHttpClient`] - HTTP client with canned responses and request
//!   recording

pub mod http;

pub use http::{MockHttpClient, MockResponse, RecordedRequest};
