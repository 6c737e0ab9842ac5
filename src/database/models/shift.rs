use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Shift {
    pub id: i64,
    pub title: String,
    pub shift_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub seat_count: i32,
    pub rate: Option<BigDecimal>,
    pub status: ShiftStatus,
    pub company_id: i64,
    pub supervisor_id: Option<i64>,
    pub version: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Start of the shift window; a shift without a start time counts from midnight.
pub fn window_start(date: NaiveDate, start_time: Option<NaiveTime>) -> NaiveDateTime {
    NaiveDateTime::new(date, start_time.unwrap_or(NaiveTime::MIN))
}

/// End of the shift window; a shift without an end time runs to end of day.
pub fn window_end(date: NaiveDate, end_time: Option<NaiveTime>) -> NaiveDateTime {
    let eod = NaiveTime::from_hms_opt(23, 59, 59).unwrap();
    NaiveDateTime::new(date, end_time.unwrap_or(eod))
}

impl Shift {
    pub fn start_datetime(&self) -> NaiveDateTime {
        window_start(self.shift_date, self.start_time)
    }

    pub fn end_datetime(&self) -> NaiveDateTime {
        window_end(self.shift_date, self.end_time)
    }

    /// Open seats never go negative, even if enrollments over-filled the shift.
    pub fn open_seats(&self, active_enrollments: i64) -> i64 {
        (self.seat_count as i64 - active_enrollments).max(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShiftStatus {
    Open,
    Closed,
    InProgress,
    Completed,
    Cancelled,
}

impl std::fmt::Display for ShiftStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShiftStatus::Open => write!(f, "open"),
            ShiftStatus::Closed => write!(f, "closed"),
            ShiftStatus::InProgress => write!(f, "in_progress"),
            ShiftStatus::Completed => write!(f, "completed"),
            ShiftStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for ShiftStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(ShiftStatus::Open),
            "closed" => Ok(ShiftStatus::Closed),
            "in_progress" => Ok(ShiftStatus::InProgress),
            "completed" => Ok(ShiftStatus::Completed),
            "cancelled" => Ok(ShiftStatus::Cancelled),
            _ => Err(format!("Invalid shift status: {}", s)),
        }
    }
}

impl sqlx::Type<sqlx::Postgres> for ShiftStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for ShiftStatus {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        let s = self.to_string();
        <String as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&s, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for ShiftStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        s.parse::<ShiftStatus>().map_err(|e| e.into())
    }
}

impl Default for ShiftStatus {
    fn default() -> Self {
        ShiftStatus::Open
    }
}
