use anyhow::Result;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub directions_base_url: String,
    pub directions_api_key: String,
    pub directions_timeout_secs: u64,
    pub fallback_leg_minutes: i64,
    pub dwell_minutes: i64,
    pub reconcile_interval_minutes: u64,
    pub close_lookahead_hours: i64,
    pub suspension_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://@localhost:5432/rotalink".to_string()),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            directions_base_url: env::var("DIRECTIONS_BASE_URL").unwrap_or_else(|_| {
                "https://maps.googleapis.com/maps/api/directions/json".to_string()
            }),
            directions_api_key: env::var("DIRECTIONS_API_KEY").unwrap_or_default(),
            directions_timeout_secs: env::var("DIRECTIONS_TIMEOUT_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),
            fallback_leg_minutes: env::var("FALLBACK_LEG_MINUTES")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            dwell_minutes: env::var("DWELL_MINUTES")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .unwrap_or(0),
            reconcile_interval_minutes: env::var("RECONCILE_INTERVAL_MINUTES")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
            close_lookahead_hours: env::var("CLOSE_LOOKAHEAD_HOURS")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .unwrap_or(4),
            suspension_days: env::var("SUSPENSION_DAYS")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .unwrap_or(2),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
