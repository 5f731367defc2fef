use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

pub const MIN_RADIUS_KM: u8 = 1;
pub const MAX_RADIUS_KM: u8 = 10;
const DEFAULT_RADIUS_KM: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RadiusError {
    #[error("radius must be between {min} and {max} km, got {value}")]
    OutOfRange { value: i64, min: u8, max: u8 },
    #[error("invalid radius '{0}', expected a whole number of kilometres")]
    Invalid(String),
}

/// Search radius in whole kilometres, one of the values the filter offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct SearchRadius(u8);

impl SearchRadius {
    pub fn new(km: i64) -> Result<Self, RadiusError> {
        if km < MIN_RADIUS_KM as i64 || km > MAX_RADIUS_KM as i64 {
            return Err(RadiusError::OutOfRange {
                value: km,
                min: MIN_RADIUS_KM,
                max: MAX_RADIUS_KM,
            });
        }
        Ok(Self(km as u8))
    }

    pub fn km(&self) -> u8 {
        self.0
    }

    pub fn as_km_f64(&self) -> f64 {
        self.0 as f64
    }

    /// Every selectable radius, smallest first.
    pub fn all() -> impl Iterator<Item = SearchRadius> {
        (MIN_RADIUS_KM..=MAX_RADIUS_KM).map(SearchRadius)
    }
}

impl Default for SearchRadius {
    fn default() -> Self {
        Self(DEFAULT_RADIUS_KM)
    }
}

impl TryFrom<i64> for SearchRadius {
    type Error = RadiusError;

    fn try_from(km: i64) -> Result<Self, Self::Error> {
        Self::new(km)
    }
}

impl From<SearchRadius> for u8 {
    fn from(r: SearchRadius) -> u8 {
        r.0
    }
}

impl FromStr for SearchRadius {
    type Err = RadiusError;

    // "5", "5km" and "5 km" are all accepted
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let number = trimmed
            .strip_suffix("km")
            .map(str::trim_end)
            .unwrap_or(trimmed);
        let km: i64 = number
            .parse()
            .map_err(|_| RadiusError::Invalid(s.to_string()))?;
        Self::new(km)
    }
}

impl std::fmt::Display for SearchRadius {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} km", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        assert!(SearchRadius::new(0).is_err());
        assert!(SearchRadius::new(11).is_err());
        assert!(SearchRadius::new(-3).is_err());
        assert_eq!(SearchRadius::new(1).unwrap().km(), 1);
        assert_eq!(SearchRadius::new(10).unwrap().km(), 10);
        assert_eq!(SearchRadius::all().count(), 10);
    }

    #[test]
    fn test_default_is_two_km() {
        assert_eq!(SearchRadius::default().km(), 2);
    }

    #[test]
    fn test_parse() {
        assert_eq!("5".parse::<SearchRadius>().unwrap().km(), 5);
        assert_eq!("7km".parse::<SearchRadius>().unwrap().km(), 7);
        assert_eq!(" 3 km ".parse::<SearchRadius>().unwrap().km(), 3);
        assert!(matches!("five".parse::<SearchRadius>(), Err(RadiusError::Invalid(_))));
        assert!(matches!("12".parse::<SearchRadius>(), Err(RadiusError::OutOfRange { value: 12, .. })));
    }

    #[test]
    fn test_serde_as_integer() {
        let r = SearchRadius::new(4).unwrap();
        assert_eq!(serde_json::to_string(&r).unwrap(), "4");
        assert_eq!(serde_json::from_str::<SearchRadius>("4").unwrap(), r);
        assert!(serde_json::from_str::<SearchRadius>("40").is_err());
    }
}
