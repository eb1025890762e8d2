pub mod client;
pub mod envelope;
pub mod error;

#[cfg(test)]
pub(crate) mod mock;

pub use client::*;
pub use envelope::{RpcRequest, RpcResponse};
pub use error::*;
