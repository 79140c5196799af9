//! Services around the compiler: transports and logging

pub mod client;
pub mod logging;
pub mod memory;

pub use client::{ClientError, GraphqlRequest, GraphqlResponse, GraphqlTransport, HttpTransport};
pub use memory::MemoryBackend;
