// The hub: single serialization point for connection lifecycle, game state and fan-out.

use crate::domain::{DeathOutcome, GamePhase, GameState, JoinOutcome, PlayerId};
use crate::use_cases::countdown::{CountdownHandle, CountdownSettings, spawn_countdown};
use crate::use_cases::ports::EventEncoder;
use crate::use_cases::registry::ConnectionRegistry;
use crate::use_cases::types::{
    ClientCommand, ConnId, Connection, GameSnapshot, HubEvent, ServerEvent,
};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Whether `jump`/`die` relays go back to the connection that sent them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoPolicy {
    ExcludeSender,
    IncludeSender,
}

#[derive(Debug, Clone)]
pub struct HubSettings {
    // Capacity of the hub's inbound event queue.
    pub event_channel_capacity: usize,
    // Countdown length and pacing for each cycle.
    pub countdown: CountdownSettings,
    // Relay policy for sender-originated events.
    pub echo_policy: EchoPolicy,
}

#[derive(Debug, Error)]
pub enum HubError {
    #[error("hub is no longer running")]
    Closed,
}

/// Cloneable front door to the hub task.
#[derive(Debug, Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubEvent>,
}

impl HubHandle {
    pub async fn connect(&self, connection: Connection) -> Result<(), HubError> {
        self.send(HubEvent::Connect(connection)).await
    }

    pub async fn disconnect(&self, conn_id: ConnId) -> Result<(), HubError> {
        self.send(HubEvent::Disconnect { conn_id }).await
    }

    pub async fn message(&self, conn_id: ConnId, command: ClientCommand) -> Result<(), HubError> {
        self.send(HubEvent::Message { conn_id, command }).await
    }

    pub async fn snapshot(&self) -> Result<GameSnapshot, HubError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(HubEvent::Snapshot(reply_tx)).await?;
        reply_rx.await.map_err(|_| HubError::Closed)
    }

    async fn send(&self, event: HubEvent) -> Result<(), HubError> {
        self.tx.send(event).await.map_err(|_| HubError::Closed)
    }
}

/// Spawns the hub task. It runs until every `HubHandle` is dropped.
pub fn spawn_hub<E: EventEncoder>(settings: HubSettings, encoder: E) -> HubHandle {
    let (tx, rx) = mpsc::channel::<HubEvent>(settings.event_channel_capacity);
    let hub = Hub {
        settings,
        encoder,
        hub_tx: tx.downgrade(),
        game: GameState::new(),
        registry: ConnectionRegistry::new(),
        countdown: None,
        generation: 0,
    };
    tokio::spawn(hub.run(rx));
    HubHandle { tx }
}

struct Hub<E> {
    settings: HubSettings,
    encoder: E,
    // Weak so the countdown never keeps the queue open.
    hub_tx: mpsc::WeakSender<HubEvent>,
    game: GameState,
    registry: ConnectionRegistry,
    countdown: Option<CountdownHandle>,
    // Bumped on every reset; countdown events from older cycles are stale.
    generation: u64,
}

impl<E: EventEncoder> Hub<E> {
    async fn run(mut self, mut rx: mpsc::Receiver<HubEvent>) {
        info!("hub started");
        // Each event is handled to completion before the next one is taken.
        while let Some(event) = rx.recv().await {
            self.handle(event);
        }
        if let Some(countdown) = self.countdown.take() {
            countdown.cancel();
        }
        info!("hub stopped");
    }

    fn handle(&mut self, event: HubEvent) {
        match event {
            HubEvent::Connect(connection) => self.on_connect(connection),
            HubEvent::Disconnect { conn_id } => self.on_disconnect(conn_id),
            HubEvent::Message { conn_id, command } => self.on_message(conn_id, command),
            HubEvent::CountdownTick {
                generation,
                remaining,
            } => self.on_countdown_tick(generation, remaining),
            HubEvent::CountdownFinished { generation } => self.on_countdown_finished(generation),
            HubEvent::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn on_connect(&mut self, connection: Connection) {
        let conn_id = connection.conn_id;
        let player_id = connection.player_id;
        self.registry.add(connection);

        if self.game.join(player_id) == JoinOutcome::FirstPlayer {
            self.start_countdown();
        }
        info!(
            conn_id,
            %player_id,
            players = self.game.player_count(),
            connections = self.registry.len(),
            "player connected"
        );

        // The newcomer is included so it learns its own id.
        self.fan_out(&ServerEvent::Connect { player_id }, &[]);
    }

    fn on_disconnect(&mut self, conn_id: ConnId) {
        let Some(connection) = self.registry.remove(conn_id) else {
            debug!(conn_id, "disconnect for connection already removed");
            return;
        };
        let player_id = connection.player_id;
        drop(connection);

        self.release_player(player_id);
        info!(
            conn_id,
            %player_id,
            players = self.game.player_count(),
            connections = self.registry.len(),
            "player disconnected"
        );
    }

    fn on_message(&mut self, conn_id: ConnId, command: ClientCommand) {
        let Some(player_id) = self.registry.get(conn_id).map(|c| c.player_id) else {
            debug!(conn_id, "message from unregistered connection dropped");
            return;
        };

        match command {
            ClientCommand::Jump => {
                debug!(conn_id, %player_id, "player jumped");
                let exclude = self.sender_filter(conn_id);
                self.fan_out(&ServerEvent::Jump { player_id }, exclude.as_slice());
            }
            ClientCommand::Die => self.on_die(conn_id, player_id),
            ClientCommand::Other(kind) => {
                debug!(conn_id, %player_id, kind = %kind, "ignoring unhandled message type");
            }
        }
    }

    fn on_die(&mut self, conn_id: ConnId, player_id: PlayerId) {
        match self.game.mark_dead(&player_id) {
            DeathOutcome::UnknownPlayer => {
                debug!(conn_id, %player_id, "death from player outside the current cycle");
            }
            DeathOutcome::AlreadyDead => {
                debug!(conn_id, %player_id, "duplicate death ignored");
            }
            DeathOutcome::Died { game_over } => {
                info!(conn_id, %player_id, "player died");
                let exclude = self.sender_filter(conn_id);
                self.fan_out(&ServerEvent::Die { player_id }, exclude.as_slice());

                if game_over {
                    info!(generation = self.generation, "game over");
                    self.fan_out(&ServerEvent::GameOver, &[]);
                    self.reset_cycle();
                }
            }
        }
    }

    fn on_countdown_tick(&mut self, generation: u64, remaining: u32) {
        if !self.is_current_countdown(generation) {
            debug!(generation, remaining, "stale countdown tick ignored");
            return;
        }
        debug!(remaining, "countdown");
        self.fan_out(&ServerEvent::Countdown { remaining }, &[]);
    }

    fn on_countdown_finished(&mut self, generation: u64) {
        if !self.is_current_countdown(generation) {
            debug!(generation, "stale countdown completion ignored");
            return;
        }
        // The timer task has already returned; dropping the handle detaches it.
        self.countdown = None;

        if self.game.start_playing() {
            info!(players = self.game.player_count(), "game started");
            self.fan_out(&ServerEvent::Playing, &[]);
        } else {
            warn!(phase = ?self.game.phase(), "countdown finished outside countdown phase");
        }
    }

    fn start_countdown(&mut self) {
        if let Some(running) = &self.countdown {
            warn!(
                generation = running.generation(),
                "countdown already running; not restarting"
            );
            return;
        }
        info!(
            generation = self.generation,
            ticks = self.settings.countdown.ticks,
            "countdown started"
        );
        self.countdown = Some(spawn_countdown(
            self.hub_tx.clone(),
            self.generation,
            self.settings.countdown,
        ));
    }

    fn is_current_countdown(&self, generation: u64) -> bool {
        self.countdown
            .as_ref()
            .is_some_and(|c| c.generation() == generation)
    }

    // Drops a player whose connection is gone. An empty roster ends the cycle.
    fn release_player(&mut self, player_id: PlayerId) {
        self.game.leave(&player_id);
        if self.game.is_empty() && self.game.phase() != GamePhase::Waiting {
            info!(generation = self.generation, "last player left; resetting");
            self.reset_cycle();
        }
    }

    fn reset_cycle(&mut self) {
        if let Some(countdown) = self.countdown.take() {
            countdown.cancel();
        }
        self.generation += 1;
        self.game.reset();
    }

    fn sender_filter(&self, conn_id: ConnId) -> Option<ConnId> {
        match self.settings.echo_policy {
            EchoPolicy::ExcludeSender => Some(conn_id),
            EchoPolicy::IncludeSender => None,
        }
    }

    // Encodes once, enqueues everywhere, and drops connections that cannot keep up.
    fn fan_out(&mut self, event: &ServerEvent, exclude: &[ConnId]) {
        let frame = match self.encoder.encode(event) {
            Ok(frame) => frame,
            Err(e) => {
                error!(error = %e, ?event, "failed to encode event; skipping fan-out");
                return;
            }
        };

        // Pruning counts as a disconnect: no game-over check, even if only dead players remain.
        for connection in self.registry.broadcast_except(&frame, exclude) {
            warn!(
                conn_id = connection.conn_id,
                player_id = %connection.player_id,
                "connection not accepting frames; removing"
            );
            let player_id = connection.player_id;
            drop(connection);
            self.release_player(player_id);
        }
    }

    fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            phase: self.game.phase(),
            players: self.game.players().cloned().collect(),
            connections: self.registry.len(),
        }
    }
}
