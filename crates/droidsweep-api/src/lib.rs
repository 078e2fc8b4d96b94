// droidsweep-api: Async Rust client for the Android Debug Bridge host protocol

pub mod client;
pub mod error;
pub mod models;
pub mod protocol;
pub mod stream;
pub mod sync;
pub mod transport;

pub use client::AdbClient;
pub use error::Error;
pub use models::DeviceEntry;
pub use stream::{EventStream, StreamEvent};
pub use transport::TransportConfig;
