use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::{Coordinate, GeoError};

pub const MAX_TITLE_CHARS: usize = 30;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct JobId(pub i64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status code assigned by the server. The client never interprets it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct JobStatus(pub i32);

/// A posted job as returned by the job-search endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub title: String,
    pub description: String,
    pub number_of_labourers: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_skills: Option<Vec<String>>,
    pub latitude: f64,
    pub longitude: f64,
    pub daily_wage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perks: Option<Vec<String>>,
    #[serde(with = "calendar_date")]
    pub start_date: NaiveDate,
    #[serde(default, with = "calendar_date::optional", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farmer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>, // Server timestamp, passed through untouched
    /// Kilometres from the searcher. Computed locally for each result set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl Job {
    pub fn coordinate(&self) -> Result<Coordinate, GeoError> {
        Coordinate::new(self.latitude, self.longitude)
    }

    pub fn with_distance(self, km: f64) -> Self {
        Self {
            distance: Some(km),
            ..self
        }
    }
}

/// Payload a farmer submits to post a new job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateJobRequest {
    pub title: String,
    pub description: String,
    pub number_of_labourers: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_skills: Option<Vec<String>>,
    pub latitude: f64,
    pub longitude: f64,
    pub daily_wage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perks: Option<Vec<String>>,
    #[serde(with = "calendar_date")]
    pub start_date: NaiveDate,
    #[serde(default, with = "calendar_date::optional", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobFieldError {
    #[error("Job title is required")]
    TitleRequired,
    #[error("Job title must be 30 characters or less")]
    TitleTooLong,
    #[error("Job description is required")]
    DescriptionRequired,
    #[error("Please enter a valid number of labourers")]
    InvalidLabourerCount,
    #[error("Please enter a valid daily wage")]
    InvalidDailyWage,
    #[error("End date must not be before the start date")]
    EndBeforeStart,
    #[error("Location is invalid: {0}")]
    InvalidLocation(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
pub struct JobValidationErrors(pub Vec<JobFieldError>);

impl CreateJobRequest {
    /// Trims free-text fields in place.
    pub fn normalize(&mut self) {
        self.title = self.title.trim().to_string();
        self.description = self.description.trim().to_string();
    }

    /// Checks every field and reports all problems at once.
    pub fn validate(&self) -> Result<(), JobValidationErrors> {
        let mut errors = Vec::new();

        let title = self.title.trim();
        if title.is_empty() {
            errors.push(JobFieldError::TitleRequired);
        } else if title.chars().count() > MAX_TITLE_CHARS {
            errors.push(JobFieldError::TitleTooLong);
        }

        if self.description.trim().is_empty() {
            errors.push(JobFieldError::DescriptionRequired);
        }

        if self.number_of_labourers < 1 {
            errors.push(JobFieldError::InvalidLabourerCount);
        }

        if !self.daily_wage.is_finite() || self.daily_wage < 0.0 {
            errors.push(JobFieldError::InvalidDailyWage);
        }

        if let Some(end) = self.end_date {
            if end < self.start_date {
                errors.push(JobFieldError::EndBeforeStart);
            }
        }

        if let Err(e) = Coordinate::new(self.latitude, self.longitude) {
            errors.push(JobFieldError::InvalidLocation(e.to_string()));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(JobValidationErrors(errors))
        }
    }
}

/// Splits comma-separated tag input. Blank input yields `None`.
pub fn parse_tags(s: &str) -> Option<Vec<String>> {
    let tags: Vec<String> = s
        .split(',')
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect();
    if tags.is_empty() {
        None
    } else {
        Some(tags)
    }
}

/// Dates travel as ISO timestamps but only the calendar day matters.
/// Accepts `2024-03-01` as well as `2024-03-01T00:00:00.000Z`.
mod calendar_date {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    const WIRE_FORMAT: &str = "%Y-%m-%dT00:00:00.000Z";

    pub fn parse(s: &str) -> Result<NaiveDate, String> {
        let day = s.get(..10).unwrap_or(s);
        NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| format!("invalid date '{}': {}", s, e))
    }

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(WIRE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(de::Error::custom)
    }

    pub mod optional {
        use chrono::NaiveDate;
        use serde::{de, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error> {
            match date {
                Some(d) => super::serialize(d, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(s) if !s.trim().is_empty() => super::parse(&s).map(Some).map_err(de::Error::custom),
                _ => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateJobRequest {
        CreateJobRequest {
            title: "Wheat Harvesting".to_string(),
            description: "Harvest 4 acres of wheat".to_string(),
            number_of_labourers: 5,
            required_skills: parse_tags("harvesting, sickle"),
            latitude: 30.901,
            longitude: 75.8573,
            daily_wage: 600.0,
            perks: None,
            start_date: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            end_date: Some(NaiveDate::from_ymd_opt(2025, 4, 3).unwrap()),
        }
    }

    #[test]
    fn test_decode_server_job() {
        let json = r#"{
            "id": 17,
            "title": "Rice Plantation",
            "description": "Transplanting paddy",
            "number_of_labourers": 8,
            "required_skills": ["transplanting"],
            "latitude": 31.634,
            "longitude": 74.8723,
            "daily_wage": 550,
            "start_date": "2025-06-10T00:00:00.000Z",
            "end_date": "2025-06-15",
            "status": 1,
            "farmer_name": "Priya Singh",
            "created_at": "2025-06-01T09:30:00"
        }"#;
        let job: Job = serde_json::from_str(json).unwrap();
        assert_eq!(job.id, JobId(17));
        assert_eq!(job.start_date, NaiveDate::from_ymd_opt(2025, 6, 10).unwrap());
        assert_eq!(job.end_date, NaiveDate::from_ymd_opt(2025, 6, 15));
        assert_eq!(job.status, JobStatus(1));
        assert_eq!(job.perks, None);
        assert_eq!(job.distance, None);
    }

    #[test]
    fn test_minimal_job_defaults() {
        let json = r#"{"id": 1, "title": "Weeding", "description": "d", "number_of_labourers": 1,
                       "latitude": 0, "longitude": 0, "daily_wage": 0, "start_date": "2025-01-01",
                       "end_date": null}"#;
        let job: Job = serde_json::from_str(json).unwrap();
        assert_eq!(job.end_date, None);
        assert_eq!(job.status, JobStatus::default());
    }

    #[test]
    fn test_with_distance_keeps_fields() {
        let json = r#"{"id": 3, "title": "Irrigation", "description": "d", "number_of_labourers": 2,
                       "latitude": 31.326, "longitude": 75.5762, "daily_wage": 400, "start_date": "2025-01-01"}"#;
        let job: Job = serde_json::from_str(json).unwrap();
        let annotated = job.clone().with_distance(2.5);
        assert_eq!(annotated.distance, Some(2.5));
        assert_eq!(annotated.title, job.title);
        assert!(annotated.coordinate().is_ok());
    }

    #[test]
    fn test_create_request_wire_format() {
        let value = serde_json::to_value(request()).unwrap();
        assert_eq!(value["start_date"], "2025-04-01T00:00:00.000Z");
        assert_eq!(value["required_skills"][1], "sickle");
        assert!(value.get("perks").is_none());
    }

    #[test]
    fn test_valid_request_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut req = request();
        req.title = "   ".to_string();
        req.description = String::new();
        req.number_of_labourers = 0;
        req.daily_wage = -1.0;
        req.end_date = NaiveDate::from_ymd_opt(2025, 3, 1);
        req.latitude = 91.0;

        let errors = req.validate().unwrap_err().0;
        assert_eq!(errors.len(), 6);
        assert_eq!(errors[0], JobFieldError::TitleRequired);
        assert!(errors.contains(&JobFieldError::EndBeforeStart));
    }

    #[test]
    fn test_title_limit_counts_characters() {
        let mut req = request();
        req.title = "क".repeat(MAX_TITLE_CHARS);
        assert!(req.validate().is_ok());
        req.title.push('x');
        assert_eq!(req.validate().unwrap_err().0, vec![JobFieldError::TitleTooLong]);
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_tags("a, b,,c "), Some(vec!["a".into(), "b".into(), "c".into()]));
        assert_eq!(parse_tags(" , "), None);
        assert_eq!(parse_tags(""), None);
    }
}
