use crate::use_cases::{CountdownSettings, EchoPolicy, HubSettings};
use std::{env, time::Duration};

// Runtime/server constants.

pub const HUB_EVENT_CHANNEL_CAPACITY: usize = 1024;
pub const OUTBOUND_CHANNEL_CAPACITY: usize = 64;

pub fn http_port() -> u16 {
    env::var("HUB_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(1337)
}

pub fn countdown_ticks() -> u32 {
    env::var("COUNTDOWN_TICKS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(29)
}

pub fn countdown_tick_interval() -> Duration {
    let millis = env::var("COUNTDOWN_TICK_INTERVAL_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(1000);
    Duration::from_millis(millis)
}

pub fn echo_policy() -> EchoPolicy {
    let echo = env::var("ECHO_TO_SENDER")
        .ok()
        .and_then(|value| parse_flag(&value))
        .unwrap_or(false);
    if echo {
        EchoPolicy::IncludeSender
    } else {
        EchoPolicy::ExcludeSender
    }
}

pub fn write_timeout() -> Duration {
    let millis = env::var("WRITE_TIMEOUT_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(2000);
    Duration::from_millis(millis)
}

pub fn hub_settings() -> HubSettings {
    HubSettings {
        event_channel_capacity: HUB_EVENT_CHANNEL_CAPACITY,
        countdown: CountdownSettings {
            ticks: countdown_ticks(),
            interval: countdown_tick_interval(),
        },
        echo_policy: echo_policy(),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
