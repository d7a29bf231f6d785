use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::ids::{BetId, EventId};

/// An entry in the pending-match set. The matching worker is the sole
/// consumer; admission and the liquidity engine are the sole producers
/// (spec §5).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QueueEntry {
    pub bet_id: BetId,
    pub event_id: EventId,
    pub created_at: DateTime<Utc>,
}
