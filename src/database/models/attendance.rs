use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Written by the external attendance collaborator; its presence for an
/// enrollment is the attendance signal, absence after shift end means no-show.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AttendanceRecord {
    pub id: i64,
    pub enrollment_id: i64,
    pub checked_in_at: NaiveDateTime,
}
