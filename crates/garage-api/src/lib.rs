// garage-api: Async client for the realtime database (whole-document writes + change feeds)

pub mod client;
pub mod document;
pub mod error;
pub mod feed;
pub mod transport;

pub use client::RealtimeClient;
pub use error::Error;
pub use feed::FeedEvent;
pub use transport::TransportConfig;
