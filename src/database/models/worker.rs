use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Worker {
    pub id: i64,
    pub name: String,
    pub suspended: bool,
    pub suspended_until: Option<NaiveDate>,
    pub suspension_reason: Option<String>,
    pub boarding_point_id: Option<i64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Worker {
    /// A worker with no end date is suspended indefinitely.
    pub fn is_suspended_on(&self, date: NaiveDate) -> bool {
        self.suspended && self.suspended_until.is_none_or(|until| until >= date)
    }
}
