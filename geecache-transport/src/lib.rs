//! Inter-peer contracts and the HTTP-shaped wire protocol that
//! implements them.

mod client;
mod peer;
mod server;
mod wire;

pub use client::HttpPeerGetter;
pub use peer::{GroupResolver, PeerGetter, PeerPicker};
pub use server::{serve, PeerServerAdapter, DEFAULT_BASE_PATH};
pub use wire::{decode_response, encode_response};
