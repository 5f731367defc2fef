use async_trait::async_trait;

use common::Coordinate;

use crate::error::LocationError;

/// Device location service.
///
/// Asking for permission and obtaining a fix are separate steps that can
/// fail independently.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Returns `false` if the user declined access.
    async fn request_permission(&self) -> bool;

    async fn current_position(&self) -> Result<Coordinate, LocationError>;
}

/// Location supplied up front, for hosts without a positioning service.
#[derive(Debug, Clone, Default)]
pub struct ManualLocation {
    position: Option<Coordinate>,
}

impl ManualLocation {
    pub fn new(position: Option<Coordinate>) -> Self {
        Self { position }
    }
}

#[async_trait]
impl LocationProvider for ManualLocation {
    async fn request_permission(&self) -> bool {
        true
    }

    async fn current_position(&self) -> Result<Coordinate, LocationError> {
        self.position.ok_or_else(|| {
            LocationError::Unavailable("no position configured; pass --lat and --lon or set [location]".to_string())
        })
    }
}
