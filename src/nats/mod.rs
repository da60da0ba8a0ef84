//! NATS messaging

pub mod client;
pub mod producer;

pub use client::NatsClient;
pub use producer::{DeedEvent, Producer};
