// Network adapter for viewer WebSocket connections.

pub mod client;

pub use client::ws_handler;
