//! Client side of the farm labour marketplace: talks to the HTTP API,
//! finds jobs near the user and keeps the signed-in session.

pub mod api;
pub mod config;
pub mod error;
pub mod location;
pub mod nearby;
pub mod session;

pub use api::{ApiClient, JobSearch};
pub use config::Config;
pub use error::{ApiError, LocationError, NearbyError};
pub use location::{LocationProvider, ManualLocation};
pub use nearby::{NearbyJobRetriever, NearbyJobs, RetrieverSettings, Stage};
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionStore};
