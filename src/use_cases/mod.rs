// Use cases layer: the hub, its connection registry and the countdown.

pub mod countdown;
pub mod hub;
pub mod ports;
pub mod registry;
pub mod types;

pub use countdown::CountdownSettings;
pub use hub::{EchoPolicy, HubError, HubHandle, HubSettings, spawn_hub};
pub use ports::EventEncoder;
pub use registry::ConnectionRegistry;
pub use types::{ClientCommand, ConnId, Connection, GameSnapshot, HubEvent, ServerEvent};
