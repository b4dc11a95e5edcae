// Domain-level game state: phase machine and the player roster for one cycle.

use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Opaque player identity, assigned once per connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(Uuid);

impl PlayerId {
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for PlayerId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub alive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Waiting,
    Countdown,
    Playing,
    GameOver,
}

/// Result of adding a player to the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    // Roster was empty; the cycle moved from Waiting to Countdown.
    FirstPlayer,
    Joined,
}

/// Result of applying a death to the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathOutcome {
    UnknownPlayer,
    AlreadyDead,
    Died { game_over: bool },
}

/// Shared record of one game cycle. Callers must serialize access.
#[derive(Debug, Clone)]
pub struct GameState {
    phase: GamePhase,
    players: HashMap<PlayerId, Player>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    pub fn new() -> Self {
        Self {
            phase: GamePhase::Waiting,
            players: HashMap::new(),
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Adds an alive player. The first player of a waiting cycle starts the countdown.
    pub fn join(&mut self, id: PlayerId) -> JoinOutcome {
        let first = self.players.is_empty() && self.phase == GamePhase::Waiting;
        self.players.insert(id, Player { id, alive: true });
        if first {
            self.phase = GamePhase::Countdown;
            JoinOutcome::FirstPlayer
        } else {
            JoinOutcome::Joined
        }
    }

    /// Drops a player without touching anyone's alive flag.
    pub fn leave(&mut self, id: &PlayerId) -> bool {
        self.players.remove(id).is_some()
    }

    /// Marks a player dead and evaluates the game-over condition in the same step.
    pub fn mark_dead(&mut self, id: &PlayerId) -> DeathOutcome {
        let Some(player) = self.players.get_mut(id) else {
            return DeathOutcome::UnknownPlayer;
        };
        if !player.alive {
            return DeathOutcome::AlreadyDead;
        }
        player.alive = false;

        let game_over = self.players.values().all(|p| !p.alive);
        if game_over {
            self.phase = GamePhase::GameOver;
        }
        DeathOutcome::Died { game_over }
    }

    /// Countdown finished; only valid from the Countdown phase.
    pub fn start_playing(&mut self) -> bool {
        if self.phase != GamePhase::Countdown {
            return false;
        }
        self.phase = GamePhase::Playing;
        true
    }

    /// Back to `{Waiting, {}}`.
    pub fn reset(&mut self) {
        self.phase = GamePhase::Waiting;
        self.players.clear();
    }
}
