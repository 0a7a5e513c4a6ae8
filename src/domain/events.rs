//! Domain events emitted by match state transitions.
//!
//! A transition never performs side effects itself; it returns the events
//! below and the caller hands them to the matching handler (settlement for
//! `MatchFinalized`) inside the same transaction.

use serde::Serialize;

use super::{MatchId, MatchStatus, Scoreline};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum DomainEvent {
    /// A match crossed from a non-finished state into `Finished`.
    MatchFinalized { match_id: MatchId, score: Scoreline },

    /// A scheduled match was postponed or canceled. Its predictions stay unsettled.
    MatchWithdrawn {
        match_id: MatchId,
        status: MatchStatus,
    },
}
