use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BoardingPoint {
    pub id: i64,
    pub route_id: i64,
    pub name: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub route_order: Option<i32>,
}

impl BoardingPoint {
    /// Points without a route order sort after every ordered point.
    pub fn order_key(&self) -> i32 {
        self.route_order.unwrap_or(i32::MAX)
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }
}
