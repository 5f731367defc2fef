use thiserror::Error;

/// Failures talking to the marketplace HTTP API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Non-2xx response. `message` is the server's own text when it sent one.
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Request timeout - please check your internet connection and try again")]
    Timeout,

    #[error("Unable to connect to server ({0}). Check your internet connection and server availability")]
    Connect(String),

    #[error("request failed: {0}")]
    Transport(String),

    /// Success status but the body was not the payload the endpoint promises.
    #[error("unexpected response payload: {0}")]
    Decode(String),

    #[error("invalid API base URL '{0}'")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_connect() {
            ApiError::Connect(e.to_string())
        } else if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("location unavailable: {0}")]
    Unavailable(String),
    #[error("timed out waiting for a location fix")]
    Timeout,
}

/// Why a nearby-job search ended without results.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NearbyError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("could not determine current location: {0}")]
    LocationUnavailable(String),

    #[error("job search failed: {0}")]
    RemoteSearchFailed(String),

    #[error("malformed job search response: {0}")]
    MalformedResponse(String),

    #[error("search cancelled")]
    Cancelled,
}

impl NearbyError {
    /// A malformed response means client and server disagree on the
    /// contract; asking again will not help.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, NearbyError::MalformedResponse(_))
    }
}

impl From<LocationError> for NearbyError {
    fn from(e: LocationError) -> Self {
        match e {
            LocationError::Unavailable(reason) => NearbyError::LocationUnavailable(reason),
            LocationError::Timeout => NearbyError::LocationUnavailable(e.to_string()),
        }
    }
}

impl From<ApiError> for NearbyError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Decode(reason) => NearbyError::MalformedResponse(reason),
            other => NearbyError::RemoteSearchFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_maps_to_malformed() {
        let e: NearbyError = ApiError::Decode("expected array".into()).into();
        assert_eq!(e, NearbyError::MalformedResponse("expected array".into()));
        assert!(!e.is_retryable());
    }

    #[test]
    fn test_status_maps_to_remote_failure_with_message() {
        let e: NearbyError = ApiError::Status { status: 500, message: "db down".into() }.into();
        assert_eq!(e, NearbyError::RemoteSearchFailed("db down".into()));
        assert!(e.is_retryable());
    }

    #[test]
    fn test_location_timeout_is_unavailable() {
        let e: NearbyError = LocationError::Timeout.into();
        assert!(matches!(e, NearbyError::LocationUnavailable(ref m) if m.contains("timed out")));
    }
}
