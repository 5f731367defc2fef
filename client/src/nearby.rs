//! Nearby job discovery.
//!
//! A search runs strictly in sequence: ask for location permission, get a
//! fix, query the job-search endpoint, then annotate every result with its
//! distance from the fix and sort. Nothing is kept between calls.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use common::{distance_km, Coordinate, Job, SearchRadius};

use crate::api::JobSearch;
use crate::config::SearchConfig;
use crate::error::{LocationError, NearbyError};
use crate::location::LocationProvider;

/// Progress of a single search. Every call begins at `Idle` and ends in
/// exactly one of `Sorted` or `Failed`.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Idle,
    AcquiringPermission,
    AcquiringLocation,
    QueryingRemote,
    Annotating,
    Sorted,
    Failed(NearbyError),
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Sorted | Stage::Failed(_))
    }
}

#[derive(Debug, Clone)]
pub struct RetrieverSettings {
    pub location_timeout: Duration,
    pub strict_radius: bool,
}

impl Default for RetrieverSettings {
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

impl From<&SearchConfig> for RetrieverSettings {
    fn from(config: &SearchConfig) -> Self {
        Self {
            location_timeout: Duration::from_secs(config.location_timeout_secs),
            strict_radius: config.strict_radius,
        }
    }
}

/// Result of a successful search, closest job first.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyJobs {
    pub origin: Coordinate,
    pub radius: SearchRadius,
    pub jobs: Vec<Job>,
}

pub struct NearbyJobRetriever<L, S> {
    location: L,
    search: S,
    settings: RetrieverSettings,
}

impl<L: LocationProvider, S: JobSearch> NearbyJobRetriever<L, S> {
    pub fn new(location: L, search: S, settings: RetrieverSettings) -> Self {
        Self {
            location,
            search,
            settings,
        }
    }

    pub async fn fetch(&self, radius: SearchRadius) -> Result<NearbyJobs, NearbyError> {
        self.fetch_cancellable(radius, &CancellationToken::new()).await
    }

    pub async fn fetch_cancellable(
        &self,
        radius: SearchRadius,
        cancel: &CancellationToken,
    ) -> Result<NearbyJobs, NearbyError> {
        self.fetch_observed(radius, cancel, |_| {}).await
    }

    /// Runs one search, reporting each stage to `observer`.
    pub async fn fetch_observed<F>(
        &self,
        radius: SearchRadius,
        cancel: &CancellationToken,
        mut observer: F,
    ) -> Result<NearbyJobs, NearbyError>
    where
        F: FnMut(&Stage) + Send,
    {
        observer(&Stage::Idle);
        let result = self.run(radius, cancel, &mut observer).await;
        let terminal = match &result {
            Ok(found) => {
                log::info!("Found {} jobs within {} of {}", found.jobs.len(), radius, found.origin);
                Stage::Sorted
            }
            Err(e) => {
                log::warn!("Nearby job search failed: {}", e);
                Stage::Failed(e.clone())
            }
        };
        observer(&terminal);
        result
    }

    async fn run<F>(
        &self,
        radius: SearchRadius,
        cancel: &CancellationToken,
        observer: &mut F,
    ) -> Result<NearbyJobs, NearbyError>
    where
        F: FnMut(&Stage) + Send,
    {
        enter(observer, Stage::AcquiringPermission);
        if !until_cancelled(cancel, self.location.request_permission()).await? {
            return Err(NearbyError::PermissionDenied);
        }

        enter(observer, Stage::AcquiringLocation);
        let fix = tokio::time::timeout(self.settings.location_timeout, self.location.current_position());
        let origin = until_cancelled(cancel, fix)
            .await?
            .map_err(|_| LocationError::Timeout)??;

        enter(observer, Stage::QueryingRemote);
        let raw = until_cancelled(cancel, self.search.search_nearby(origin, radius)).await??;

        enter(observer, Stage::Annotating);
        let mut jobs = annotate(origin, raw)?;
        if self.settings.strict_radius {
            let limit = radius.as_km_f64();
            jobs.retain(|job| job.distance.map_or(false, |d| d <= limit));
        }
        sort_by_distance(&mut jobs);

        Ok(NearbyJobs {
            origin,
            radius,
            jobs,
        })
    }
}

fn enter<F: FnMut(&Stage)>(observer: &mut F, stage: Stage) {
    log::debug!("nearby search: {:?}", stage);
    observer(&stage);
}

async fn until_cancelled<T>(cancel: &CancellationToken, fut: impl Future<Output = T>) -> Result<T, NearbyError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(NearbyError::Cancelled),
        out = fut => Ok(out),
    }
}

/// Attaches the distance from `origin` to each job, consuming the raw list.
pub fn annotate(origin: Coordinate, jobs: Vec<Job>) -> Result<Vec<Job>, NearbyError> {
    jobs.into_iter()
        .map(|job| {
            let at = job
                .coordinate()
                .map_err(|e| NearbyError::MalformedResponse(format!("job {}: {}", job.id, e)))?;
            let km = distance_km(origin, at);
            Ok(job.with_distance(km))
        })
        .collect()
}

/// Stable ascending sort; equal distances keep the server's order.
pub fn sort_by_distance(jobs: &mut [Job]) {
    jobs.sort_by(|a, b| {
        let da = a.distance.unwrap_or(f64::INFINITY);
        let db = b.distance.unwrap_or(f64::INFINITY);
        da.total_cmp(&db)
    });
}
