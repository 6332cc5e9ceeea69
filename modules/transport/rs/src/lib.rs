pub use client::{Client, Response};
pub use codec::{Reply, Request};
pub use server::{Server, ServerConfig};

mod client;
pub mod codec;
mod server;
