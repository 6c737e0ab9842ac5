use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirectionsError {
    #[error("directions request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("directions provider returned status {0}")]
    Provider(String),

    #[error("directions response contained no route")]
    EmptyRoute,
}

/// Best-effort point-to-point travel estimation. One call per consecutive
/// pair of occupied boarding points; failures degrade to a fallback
/// duration upstream, they never abort a planning run.
#[async_trait]
pub trait DirectionsProvider: Send + Sync {
    /// Estimated driving duration in minutes between two (lat, lng) pairs.
    async fn travel_duration(
        &self,
        origin: (f64, f64),
        destination: (f64, f64),
    ) -> Result<f64, DirectionsError>;
}

#[derive(Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Deserialize)]
struct DirectionsRoute {
    #[serde(default)]
    legs: Vec<DirectionsLeg>,
}

#[derive(Deserialize)]
struct DirectionsLeg {
    duration: LegDuration,
}

#[derive(Deserialize)]
struct LegDuration {
    /// Seconds.
    value: i64,
}

pub struct GoogleDirectionsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GoogleDirectionsClient {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }
}

#[async_trait]
impl DirectionsProvider for GoogleDirectionsClient {
    async fn travel_duration(
        &self,
        origin: (f64, f64),
        destination: (f64, f64),
    ) -> Result<f64, DirectionsError> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("origin", format!("{},{}", origin.0, origin.1)),
                ("destination", format!("{},{}", destination.0, destination.1)),
                ("mode", "driving".to_string()),
                ("key", self.api_key.clone()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<DirectionsResponse>()
            .await?;

        if response.status != "OK" {
            return Err(DirectionsError::Provider(response.status));
        }

        let route = response
            .routes
            .first()
            .ok_or(DirectionsError::EmptyRoute)?;
        let total_seconds: i64 = route.legs.iter().map(|leg| leg.duration.value).sum();

        Ok(total_seconds as f64 / 60.0)
    }
}
