// Network adapter: websocket connections bridged to the hub.

pub mod client;

pub use client::ws_handler;
