use crate::use_cases::types::ServerEvent;
use axum::extract::ws::Utf8Bytes;
use std::fmt::Display;

// Port for turning hub events into wire frames, encoded once per fan-out.
pub trait EventEncoder: Send + 'static {
    type Error: Display;

    fn encode(&self, event: &ServerEvent) -> Result<Utf8Bytes, Self::Error>;
}
