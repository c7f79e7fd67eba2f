//! Fake completion clients and a recording observer.

use crate::fixtures;
use async_trait::async_trait;
use loyalty_core::{
    ChatRequest, CompletionClient, CompletionError, DriverCatalog, PipelineEvent,
    PipelineObserver, RequestScope, Stage,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Completion client that replays a fixed script.
///
/// Responses are returned in order regardless of scope. Once the script
/// runs out every call fails with [`CompletionError::EmptyResponse`].
///
/// # Example
///
/// ```
/// use loyalty_testing::mocks::ScriptedCompletion;
/// use loyalty_core::CompletionError;
///
/// let client = ScriptedCompletion::new(vec![
///     Err(CompletionError::Timeout),
///     Ok("{\"ok\": true}".to_string()),
/// ]);
/// assert_eq!(client.remaining(), 2);
/// ```
#[derive(Debug, Default)]
pub struct ScriptedCompletion {
    script: Mutex<VecDeque<Result<String, CompletionError>>>,
    requests: Mutex<Vec<(RequestScope, ChatRequest)>>,
}

impl ScriptedCompletion {
    /// Create a client replaying `script`
    #[must_use]
    pub fn new(script: Vec<Result<String, CompletionError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Responses not yet consumed
    #[must_use]
    pub fn remaining(&self) -> usize {
        lock(&self.script).len()
    }

    /// Number of calls made
    #[must_use]
    pub fn calls(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Every request received, in order
    #[must_use]
    pub fn requests(&self) -> Vec<(RequestScope, ChatRequest)> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn complete(
        &self,
        request: ChatRequest,
        scope: &RequestScope,
    ) -> Result<String, CompletionError> {
        lock(&self.requests).push((scope.clone(), request));
        lock(&self.script)
            .pop_front()
            .unwrap_or(Err(CompletionError::EmptyResponse))
    }
}

/// Completion client that answers each stage with a valid fixture.
///
/// Scripted responses for a scope take precedence over the fixture, and
/// failing drivers always return their error. Every request is recorded
/// along with the highest number of calls that were in flight at once.
#[derive(Debug)]
pub struct StageCompletion {
    business_name: String,
    catalog: Arc<DriverCatalog>,
    driver_score: f64,
    fence: bool,
    delay: Option<Duration>,
    failing_drivers: HashMap<String, CompletionError>,
    scripts: Mutex<HashMap<RequestScope, VecDeque<Result<String, CompletionError>>>>,
    calls: Mutex<Vec<(RequestScope, ChatRequest)>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl StageCompletion {
    /// Fixture-backed client for the standard catalog
    #[must_use]
    pub fn new(business_name: impl Into<String>) -> Self {
        Self::with_catalog(business_name, Arc::new(DriverCatalog::standard().clone()))
    }

    /// Fixture-backed client for `catalog`
    #[must_use]
    pub fn with_catalog(business_name: impl Into<String>, catalog: Arc<DriverCatalog>) -> Self {
        Self {
            business_name: business_name.into(),
            catalog,
            driver_score: 7.0,
            fence: false,
            delay: None,
            failing_drivers: HashMap::new(),
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Wrap every fixture response in a markdown fence
    #[must_use]
    pub const fn fenced(mut self) -> Self {
        self.fence = true;
        self
    }

    /// Sleep before answering each call
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Score every fixture driver evaluation with `score`
    #[must_use]
    pub const fn with_driver_score(mut self, score: f64) -> Self {
        self.driver_score = score;
        self
    }

    /// Make every evaluation of `driver_key` fail with `error`
    #[must_use]
    pub fn fail_driver(mut self, driver_key: impl Into<String>, error: CompletionError) -> Self {
        self.failing_drivers.insert(driver_key.into(), error);
        self
    }

    /// Answer the next calls for `scope` from `responses` before using fixtures
    #[must_use]
    pub fn script(
        self,
        scope: RequestScope,
        responses: Vec<Result<String, CompletionError>>,
    ) -> Self {
        lock(&self.scripts)
            .entry(scope)
            .or_default()
            .extend(responses);
        self
    }

    /// Every scope called, in order
    #[must_use]
    pub fn calls(&self) -> Vec<RequestScope> {
        lock(&self.calls).iter().map(|(scope, _)| scope.clone()).collect()
    }

    /// Calls made for `scope`
    #[must_use]
    pub fn calls_for(&self, scope: &RequestScope) -> usize {
        lock(&self.calls).iter().filter(|(call, _)| call == scope).count()
    }

    /// Requests received for `scope`, in order
    #[must_use]
    pub fn requests_for(&self, scope: &RequestScope) -> Vec<ChatRequest> {
        lock(&self.calls)
            .iter()
            .filter(|(call, _)| call == scope)
            .map(|(_, request)| request.clone())
            .collect()
    }

    /// Distinct drivers that were asked for an evaluation
    #[must_use]
    pub fn evaluated_drivers(&self) -> HashSet<String> {
        lock(&self.calls)
            .iter()
            .filter_map(|(call, _)| call.driver.clone())
            .collect()
    }

    /// Highest number of calls that were awaiting an answer at the same time
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn fixture(&self, scope: &RequestScope) -> Result<String, CompletionError> {
        let value = match (scope.stage, scope.driver.as_deref()) {
            (Stage::GeneratingInitial, _) => fixtures::sample_program(&self.business_name),
            (Stage::AnalyzingGeneral, _) => fixtures::sample_analysis(),
            (Stage::EvaluatingDrivers, Some(key)) => {
                if let Some(error) = self.failing_drivers.get(key) {
                    return Err(error.clone());
                }
                let driver = self
                    .catalog
                    .get(key)
                    .ok_or_else(|| CompletionError::BadRequest(format!("unknown driver {key}")))?;
                fixtures::evaluation_for(driver, self.driver_score)
            }
            (Stage::GeneratingImproved, _) => fixtures::improved_program(&self.business_name),
            (stage, _) => {
                return Err(CompletionError::BadRequest(format!(
                    "no fixture for stage {stage}"
                )));
            }
        };

        let text = value.to_string();
        Ok(if self.fence { fixtures::fenced(&text) } else { text })
    }
}

#[async_trait]
impl CompletionClient for StageCompletion {
    async fn complete(
        &self,
        request: ChatRequest,
        scope: &RequestScope,
    ) -> Result<String, CompletionError> {
        lock(&self.calls).push((scope.clone(), request));
        let _in_flight = InFlight::enter(&self.in_flight, &self.peak_in_flight);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = lock(&self.scripts)
            .get_mut(scope)
            .and_then(VecDeque::pop_front);
        match scripted {
            Some(response) => response,
            None => self.fixture(scope),
        }
    }
}

/// Counts a call as in flight until dropped, even if the caller gives up.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(current: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = current.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self(current)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Observer that stores every event for later assertions.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingObserver {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event, in order
    #[must_use]
    pub fn events(&self) -> Vec<PipelineEvent> {
        lock(&self.events).clone()
    }

    /// Stages entered, in order
    #[must_use]
    pub fn stages(&self) -> Vec<Stage> {
        lock(&self.events)
            .iter()
            .filter_map(|event| match event {
                PipelineEvent::StageEntered { stage } => Some(*stage),
                _ => None,
            })
            .collect()
    }

    /// Failed attempts as `(scope, attempt, retrying)`
    #[must_use]
    pub fn failed_attempts(&self) -> Vec<(RequestScope, u32, bool)> {
        lock(&self.events)
            .iter()
            .filter_map(|event| match event {
                PipelineEvent::AttemptFailed {
                    scope,
                    attempt,
                    retry_in,
                    ..
                } => Some((scope.clone(), *attempt, retry_in.is_some())),
                _ => None,
            })
            .collect()
    }
}

impl PipelineObserver for RecordingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        lock(&self.events).push(event.clone());
    }
}
