// Domain layer: game phase machine and player roster.

pub mod state;

pub use state::{DeathOutcome, GamePhase, GameState, JoinOutcome, Player, PlayerId};
