mod support;

use serde_json::json;
use std::time::Duration;
use support::{
    connect, join, next_envelope, next_of_type, send_json, send_raw, settings, spawn_server,
    stays_silent_about,
};

const QUIET: Duration = Duration::from_millis(300);

#[tokio::test]
async fn first_client_gets_its_id_then_the_countdown() {
    let url = spawn_server(settings(3, Duration::from_millis(20))).await;
    let mut client = connect(&url).await;

    let hello = next_envelope(&mut client).await;
    assert_eq!(hello["type"], "connect");
    let player_id = hello["playerID"].as_str().expect("playerID is a string");
    assert!(uuid::Uuid::parse_str(player_id).is_ok());
    assert!(hello.get("countdown").is_none());

    for expected in [3, 2, 1] {
        let tick = next_envelope(&mut client).await;
        assert_eq!(tick, json!({"type": "countdown", "countdown": expected}));
    }
    assert_eq!(next_envelope(&mut client).await, json!({"type": "playing"}));
}

#[tokio::test]
async fn jump_is_relayed_to_others_but_not_echoed() {
    let url = spawn_server(settings(0, Duration::from_millis(10))).await;
    let (mut a, a_id) = join(&url).await;
    let (mut b, _b_id) = join(&url).await;

    send_json(&mut a, json!({"type": "jump"})).await;

    let jump = next_of_type(&mut b, "jump").await;
    assert_eq!(jump, json!({"type": "jump", "playerID": a_id}));
    assert!(stays_silent_about(&mut a, "jump", QUIET).await);
    assert!(stays_silent_about(&mut b, "jump", QUIET).await);
}

#[tokio::test]
async fn everyone_dying_ends_the_game() {
    let url = spawn_server(settings(0, Duration::from_millis(10))).await;
    let (mut a, a_id) = join(&url).await;
    let (mut b, b_id) = join(&url).await;

    send_json(&mut a, json!({"type": "die"})).await;
    let death = next_of_type(&mut b, "die").await;
    assert_eq!(death["playerID"], a_id.as_str());

    send_json(&mut b, json!({"type": "die"})).await;
    let death = next_of_type(&mut a, "die").await;
    assert_eq!(death["playerID"], b_id.as_str());
    assert_eq!(next_envelope(&mut a).await, json!({"type": "gameover"}));
    assert_eq!(
        next_of_type(&mut b, "gameover").await,
        json!({"type": "gameover"})
    );

    // A new connection after game over starts the next cycle.
    let (mut c, _c_id) = join(&url).await;
    next_of_type(&mut c, "playing").await;
}

#[tokio::test]
async fn malformed_messages_do_not_drop_the_connection() {
    let url = spawn_server(settings(0, Duration::from_millis(10))).await;
    let (mut a, a_id) = join(&url).await;
    let (mut b, _b_id) = join(&url).await;

    send_raw(&mut a, "definitely not json").await;
    send_raw(&mut a, r#"{"playerID":"missing type"}"#).await;
    send_json(&mut a, json!({"type": "moonwalk"})).await;
    send_json(&mut a, json!({"type": "jump"})).await;

    let jump = next_of_type(&mut b, "jump").await;
    assert_eq!(jump["playerID"], a_id.as_str());
}

#[tokio::test]
async fn remaining_clients_keep_receiving_after_a_disconnect() {
    let url = spawn_server(settings(0, Duration::from_millis(10))).await;
    let (a, _a_id) = join(&url).await;
    let (mut b, _b_id) = join(&url).await;
    drop(a);

    let (mut c, c_id) = join(&url).await;
    let announced = next_of_type(&mut b, "connect").await;
    assert_eq!(announced["playerID"], c_id.as_str());

    send_json(&mut c, json!({"type": "jump"})).await;
    let jump = next_of_type(&mut b, "jump").await;
    assert_eq!(jump["playerID"], c_id.as_str());
}
