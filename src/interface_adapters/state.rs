use crate::use_cases::HubHandle;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    // Single hub shared by every connection.
    pub hub: HubHandle,
    // Per-connection outbound queue depth before a client counts as backlogged.
    pub outbound_capacity: usize,
    // Upper bound on a single socket write.
    pub write_timeout: Duration,
}
