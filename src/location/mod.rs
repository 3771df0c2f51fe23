//! IP-based geolocation lookup.
//!
//! Asks an ipinfo-style service for the server's approximate coordinates.
//! The service answers with a `loc` field formatted as `"lat,lng"`.

use std::time::Duration;

use serde::Deserialize;

use crate::errors::AppError;
use crate::models::Location;

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct IpInfo {
    #[serde(default)]
    loc: Option<String>,
}

/// Client for the configured geolocation endpoint.
#[derive(Debug, Clone)]
pub struct GeoLocator {
    client: reqwest::Client,
    url: String,
}

impl GeoLocator {
    pub fn new(url: impl Into<String>) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(LOOKUP_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Look up the current location. Any failure maps to `Unavailable`.
    pub async fn locate(&self) -> Result<Location, AppError> {
        let info: IpInfo = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| {
                tracing::warn!("Geolocation request failed: {}", e);
                unavailable()
            })?
            .json()
            .await
            .map_err(|e| {
                tracing::warn!("Geolocation response unreadable: {}", e);
                unavailable()
            })?;

        info.loc.as_deref().and_then(parse_loc).ok_or_else(|| {
            tracing::warn!("Location information not available in response");
            unavailable()
        })
    }
}

fn unavailable() -> AppError {
    AppError::Unavailable("Location unavailable".to_string())
}

/// Parse `"12.97,77.59"` into coordinates.
fn parse_loc(loc: &str) -> Option<Location> {
    let (lat, lng) = loc.split_once(',')?;
    Some(Location {
        lat: lat.trim().parse().ok()?,
        lng: lng.trim().parse().ok()?,
    })
}
