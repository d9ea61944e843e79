//! Ping-pong tournament engine: library with models and business logic.

pub mod config;
pub mod logic;
pub mod models;
pub mod store;
pub mod wire;

pub use config::{EngineConfig, GroupPartition};
pub use logic::{
    advance, apply_change, apply_changes, generate, generate_with, group_standings,
    knockout_rounds, knockout_seeds, maybe_advance, partition_groups, record_result, set_winner,
    standings, start, Advance, ApplyOutcome, Ignored, Standing,
};
pub use models::{
    find_tournament, find_tournament_mut, MatchId, MatchResult, MatchSlot, MatchStatus, Player,
    PlayerId, SetScore, Tournament, TournamentError, TournamentFormat, TournamentId, TournamentMatch,
    TournamentStatus,
};
pub use store::{MemoryStore, RatingCalculator, Store, StoreError};
pub use wire::{ChangeEvent, MalformedRow, MatchRow, Operation, RowChange, TournamentRow};
