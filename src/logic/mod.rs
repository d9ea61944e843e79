//! Tournament business logic: bracket generation, standings, progression, realtime sync.

mod bracket;
mod progression;
mod realtime;
mod standings;

pub use bracket::{generate, generate_with, knockout_rounds, partition_groups};
pub use progression::{
    advance, knockout_seeds, maybe_advance, record_result, set_winner, start, Advance,
};
pub use realtime::{apply_change, apply_changes, ApplyOutcome, Ignored};
pub use standings::{group_standings, standings, Standing};
