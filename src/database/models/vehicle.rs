use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vehicle {
    pub id: i64,
    pub plate: String,
    pub model: Option<String>,
    pub driver_name: Option<String>,
    pub driver_phone: Option<String>,
    pub capacity: i32,
    pub active: bool,
}
