use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::shift::{window_end, window_start};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Enrollment {
    pub id: i64,
    pub worker_id: i64,
    pub shift_id: i64,
    pub status: EnrollmentStatus,
    pub version: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Flat view of an active enrollment's shift window, loaded by a single
/// join so the rest-interval check never walks entity graphs.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EnrollmentWindow {
    pub shift_id: i64,
    pub shift_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}

impl EnrollmentWindow {
    pub fn start_datetime(&self) -> NaiveDateTime {
        window_start(self.shift_date, self.start_time)
    }

    pub fn end_datetime(&self) -> NaiveDateTime {
        window_end(self.shift_date, self.end_time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnrollmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Rejected,
    Completed,
    NoShow,
}

impl EnrollmentStatus {
    /// Pending and confirmed enrollments hold a seat.
    pub fn is_active(&self) -> bool {
        matches!(self, EnrollmentStatus::Pending | EnrollmentStatus::Confirmed)
    }
}

impl std::fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnrollmentStatus::Pending => write!(f, "pending"),
            EnrollmentStatus::Confirmed => write!(f, "confirmed"),
            EnrollmentStatus::Cancelled => write!(f, "cancelled"),
            EnrollmentStatus::Rejected => write!(f, "rejected"),
            EnrollmentStatus::Completed => write!(f, "completed"),
            EnrollmentStatus::NoShow => write!(f, "no_show"),
        }
    }
}

impl std::str::FromStr for EnrollmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(EnrollmentStatus::Pending),
            "confirmed" => Ok(EnrollmentStatus::Confirmed),
            "cancelled" => Ok(EnrollmentStatus::Cancelled),
            "rejected" => Ok(EnrollmentStatus::Rejected),
            "completed" => Ok(EnrollmentStatus::Completed),
            "no_show" => Ok(EnrollmentStatus::NoShow),
            _ => Err(format!("Invalid enrollment status: {}", s)),
        }
    }
}

impl sqlx::Type<sqlx::Postgres> for EnrollmentStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for EnrollmentStatus {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        let s = self.to_string();
        <String as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&s, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for EnrollmentStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        s.parse::<EnrollmentStatus>().map_err(|e| e.into())
    }
}

impl Default for EnrollmentStatus {
    fn default() -> Self {
        EnrollmentStatus::Pending
    }
}
