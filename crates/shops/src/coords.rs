use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShopError};

/// A validated WGS84 position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Result<Self> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(ShopError::InvalidCoordinates(format!("{}, {} is not a finite position", lat, lng)));
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(ShopError::InvalidCoordinates(format!("latitude {} is out of range", lat)));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(ShopError::InvalidCoordinates(format!("longitude {} is out of range", lng)));
        }
        Ok(Self { lat, lng })
    }

    /// Parse raw query parameters.
    ///
    /// A missing or blank value is [`ShopError::MissingCoordinates`]; anything
    /// that is not a number in range is [`ShopError::InvalidCoordinates`].
    pub fn parse(lat: Option<&str>, lng: Option<&str>) -> Result<Self> {
        let (Some(lat), Some(lng)) = (non_blank(lat), non_blank(lng)) else {
            return Err(ShopError::MissingCoordinates);
        };

        let parse = |raw: &str| {
            raw.parse::<f64>()
                .map_err(|_| ShopError::InvalidCoordinates(format!("{:?} is not a number", raw)))
        };
        Self::new(parse(lat)?, parse(lng)?)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}
