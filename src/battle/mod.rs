//! Head-to-head match resolution.
//!
//! A match is one contest between two participants, resolved across an
//! ordered question sequence. The presenter drives it request/response:
//! start, collect answers, reveal, advance, complete. Nothing in here
//! runs on a clock; time limits are advisory values checked only when
//! the presenter asks for a reveal.

pub mod models;
pub mod state_machine;

pub use models::{AnswerRecord, Match, MatchId, MatchStatus, Side};
