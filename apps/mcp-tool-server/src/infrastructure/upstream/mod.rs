//! Upstream HTTP adapters.

mod http_client;

pub use http_client::HttpUpstreamClient;
