pub mod api;
pub mod auth;
pub mod geo;
pub mod job;
pub mod radius;

pub use api::{extract_error_message, status_message, NearbyJobsQuery};
pub use auth::{is_valid_otp, EmailLoginRequest, EmailOtpVerification, LoginResponse,
               PhoneOtpVerification, Role, SignupRequest, User, OTP_LENGTH};
pub use geo::{distance_km, Coordinate, GeoError, EARTH_RADIUS_KM};
pub use job::{parse_tags, CreateJobRequest, Job, JobFieldError, JobId, JobStatus,
              JobValidationErrors, MAX_TITLE_CHARS};
pub use radius::{RadiusError, SearchRadius, MAX_RADIUS_KM, MIN_RADIUS_KM};

// Server endpoint used when neither config nor environment names one
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const API_URL_ENV: &str = "FIELDHAND_API_URL";
pub const LOG_FILE_ENV: &str = "FIELDHAND_LOG";

// System-wide paths
pub const DEFAULT_CONFIG_PATH: &str = "/etc/fieldhand/config.yaml";

// Per-user paths, relative to $HOME
pub const USER_CONFIG_PATH: &str = ".config/fieldhand/config.yaml";
pub const USER_SESSION_PATH: &str = ".config/fieldhand/session.json";
pub const USER_LOG_FILE: &str = ".local/state/fieldhand/fieldhand.log";
