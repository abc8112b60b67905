pub mod client;
pub mod entertainment;
pub mod models;
pub mod register;

pub use client::BridgeClient;
