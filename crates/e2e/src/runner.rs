//! Suite runner: scenario registration, tenant hooks and the run summary
//!
//! Each scenario runs on its own tokio task with its own session and its own
//! tenant. Shared groups trade that for one expensive setup: their scenarios
//! run in order inside one session and one tenant, and a failed setup skips
//! the whole group. Teardown is attempted exactly once for every tenant that
//! was created, whatever the body did, and never changes a test's outcome.

use std::any::Any;
use std::collections::BTreeSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::config::HarnessConfig;
use crate::error::{E2eError, E2eResult, FailureKind};
use crate::fixtures::Fixtures;
use crate::pages::DashboardPage;
use crate::session::{Session, SessionFactory};
use crate::tenant::{TeamSpec, Tenant, TenantManager};

pub type ScenarioFuture = BoxFuture<'static, E2eResult<()>>;
type Body = Arc<dyn Fn(ScenarioContext) -> ScenarioFuture + Send + Sync>;

fn boxed<F, Fut>(body: F) -> Body
where
    F: Fn(ScenarioContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = E2eResult<()>> + Send + 'static,
{
    Arc::new(move |ctx| body(ctx).boxed())
}

/// Everything a scenario body gets; cheap to clone
#[derive(Clone)]
pub struct ScenarioContext {
    session: Option<Session>,
    tenant: Option<Arc<Tenant>>,
    config: Arc<HarnessConfig>,
    fixtures: Fixtures,
}

impl ScenarioContext {
    pub fn session(&self) -> E2eResult<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| E2eError::Config("scenario was registered without a browser".into()))
    }

    pub fn tenant(&self) -> E2eResult<&Arc<Tenant>> {
        self.tenant
            .as_ref()
            .ok_or_else(|| E2eError::Config("scenario was registered without a team".into()))
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn fixtures(&self) -> &Fixtures {
        &self.fixtures
    }

    pub fn tenants(&self) -> E2eResult<TenantManager> {
        Ok(TenantManager::new(self.session()?.clone()))
    }

    pub fn dashboard(&self) -> E2eResult<DashboardPage> {
        Ok(DashboardPage::new(self.session()?.clone()))
    }
}

pub struct Scenario {
    name: String,
    tags: Vec<String>,
    team: Option<TeamSpec>,
    needs_browser: bool,
    body: Body,
}

impl Scenario {
    /// A browser scenario inside a randomly named team
    pub fn new<F, Fut>(name: &str, body: F) -> Self
    where
        F: Fn(ScenarioContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = E2eResult<()>> + Send + 'static,
    {
        Self {
            name: name.to_string(),
            tags: Vec::new(),
            team: Some(TeamSpec::Random),
            needs_browser: true,
            body: boxed(body),
        }
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    pub fn team(mut self, spec: TeamSpec) -> Self {
        self.team = Some(spec);
        self
    }

    pub fn without_team(mut self) -> Self {
        self.team = None;
        self
    }

    /// Needs neither a browser nor a team
    pub fn offline(mut self) -> Self {
        self.needs_browser = false;
        self.team = None;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn needs_browser(&self) -> bool {
        self.needs_browser
    }
}

enum Isolation {
    PerScenario,
    Shared { setup: Body, team: TeamSpec },
}

pub struct Group {
    name: String,
    isolation: Isolation,
    scenarios: Vec<Scenario>,
}

impl Group {
    /// Every scenario gets its own session and team
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            isolation: Isolation::PerScenario,
            scenarios: Vec::new(),
        }
    }

    /// One session, one team and one `setup` for the whole group
    pub fn shared<F, Fut>(name: &str, setup: F) -> Self
    where
        F: Fn(ScenarioContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = E2eResult<()>> + Send + 'static,
    {
        Self {
            name: name.to_string(),
            isolation: Isolation::Shared {
                setup: boxed(setup),
                team: TeamSpec::Random,
            },
            scenarios: Vec::new(),
        }
    }

    pub fn scenario(mut self, scenario: Scenario) -> Self {
        self.scenarios.push(scenario);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn is_shared(&self) -> bool {
        matches!(self.isolation, Isolation::Shared { .. })
    }
}

#[derive(Default)]
pub struct Suite {
    groups: Vec<Group>,
}

impl Suite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group(mut self, group: Group) -> Self {
        self.groups.push(group);
        self
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// `(group, scenario)` pairs matching `filter`, in registration order
    pub fn list(&self, filter: &Filter) -> Vec<(&Group, &Scenario)> {
        self.groups
            .iter()
            .flat_map(|group| group.scenarios.iter().map(move |s| (group, s)))
            .filter(|(_, s)| filter.matches(s))
            .collect()
    }
}

/// Name substrings and tags; empty lists match everything
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub names: Vec<String>,
    pub tags: Vec<String>,
}

impl Filter {
    pub fn matches(&self, scenario: &Scenario) -> bool {
        let name_ok =
            self.names.is_empty() || self.names.iter().any(|n| scenario.name.contains(n.as_str()));
        let tag_ok = self.tags.is_empty() || self.tags.iter().any(|t| scenario.tags.contains(t));
        name_ok && tag_ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub group: String,
    pub status: TestStatus,
    pub skip_reason: Option<String>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub team: Option<String>,
    pub error: Option<String>,
    pub failure_kind: Option<FailureKind>,
    pub artifacts: Vec<PathBuf>,
    pub teardown_error: Option<String>,
}

impl TestResult {
    fn new(group: &str, name: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            name: name.to_string(),
            group: group.to_string(),
            status: TestStatus::Passed,
            skip_reason: None,
            started_at,
            duration_ms: 0,
            team: None,
            error: None,
            failure_kind: None,
            artifacts: Vec::new(),
            teardown_error: None,
        }
    }

    fn record(&mut self, outcome: &E2eResult<()>) {
        if let Err(err) = outcome {
            self.status = TestStatus::Failed;
            self.error = Some(err.to_string());
            self.failure_kind = Some(err.kind());
            self.artifacts = err.artifacts();
        }
    }

    fn skip(&mut self, reason: &str, cause: &E2eError) {
        self.status = TestStatus::Skipped;
        self.skip_reason = Some(reason.to_string());
        self.error = Some(cause.to_string());
        self.failure_kind = Some(FailureKind::SetupFailed);
    }
}

/// Result of running all scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub browser: String,
    pub base_url: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
    /// Teams whose teardown failed and need out-of-band cleanup
    pub leaked_teams: Vec<String>,
}

impl TestSuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Shared by all worker tasks
#[derive(Clone)]
struct Worker {
    config: Arc<HarnessConfig>,
    sessions: Arc<dyn SessionFactory>,
    fixtures: Fixtures,
}

impl Worker {
    fn context(&self, session: Option<Session>, tenant: Option<Arc<Tenant>>) -> ScenarioContext {
        ScenarioContext {
            session,
            tenant,
            config: self.config.clone(),
            fixtures: self.fixtures.clone(),
        }
    }

    async fn open_session(&self, needed: bool) -> E2eResult<Option<Session>> {
        if needed {
            Ok(Some(self.sessions.open().await?))
        } else {
            Ok(None)
        }
    }

    /// One scenario with its own session and team
    async fn run_isolated(&self, group: &str, scenario: &Scenario) -> TestResult {
        let mut result = TestResult::new(group, &scenario.name, Utc::now());
        let start = Instant::now();
        info!("▶ {}", scenario.name);

        let session = match self.open_session(scenario.needs_browser).await {
            Ok(session) => session,
            Err(err) => {
                result.record(&Err(err));
                return finish(result, start);
            }
        };

        let tenant = match (&session, &scenario.team) {
            (Some(session), Some(spec)) => {
                match TenantManager::new(session.clone()).create(spec).await {
                    Ok(tenant) => {
                        result.team = Some(tenant.name().to_string());
                        Some(Arc::new(tenant))
                    }
                    Err(err) => {
                        if let Some(team) = unconfirmed_team(&err) {
                            result.team = Some(team.to_string());
                            result.teardown_error = discard(session, team).await;
                        }
                        result.record(&Err(err));
                        close(session).await;
                        return finish(result, start);
                    }
                }
            }
            _ => None,
        };

        let outcome = run_body(&scenario.body, self.context(session.clone(), tenant.clone())).await;
        result.record(&outcome);

        if let (Some(session), Some(tenant)) = (&session, &tenant) {
            result.teardown_error = teardown(session, tenant).await;
        }
        if let Some(session) = &session {
            close(session).await;
        }
        finish(result, start)
    }

    /// A shared group: one session, one team, one setup, scenarios in order
    async fn run_shared(
        &self,
        group: &str,
        setup: &Body,
        team: &TeamSpec,
        scenarios: &[(usize, Scenario)],
    ) -> Vec<(usize, TestResult)> {
        let started_at = Utc::now();
        let start = Instant::now();
        info!("▶ group {} ({} scenarios, shared setup)", group, scenarios.len());

        let skip_all = |cause: E2eError, team: Option<String>, teardown_error: Option<String>| {
            let cause = E2eError::SetupFailed {
                group: group.to_string(),
                reason: cause.to_string(),
            };
            error!("{}", cause);
            scenarios
                .iter()
                .map(|(index, scenario)| {
                    let mut result = TestResult::new(group, &scenario.name, started_at);
                    result.skip("setup failed", &cause);
                    result.team = team.clone();
                    result.teardown_error = teardown_error.clone();
                    (*index, finish(result, start))
                })
                .collect::<Vec<_>>()
        };

        let session = match self.sessions.open().await {
            Ok(session) => session,
            Err(err) => return skip_all(err, None, None),
        };
        let tenant = match TenantManager::new(session.clone()).create(team).await {
            Ok(tenant) => Arc::new(tenant),
            Err(err) => {
                let (team, teardown_error) = match unconfirmed_team(&err) {
                    Some(team) => (Some(team.to_string()), discard(&session, team).await),
                    None => (None, None),
                };
                close(&session).await;
                return skip_all(err, team, teardown_error);
            }
        };
        let team_name = tenant.name().to_string();
        let ctx = self.context(Some(session.clone()), Some(tenant.clone()));

        if let Err(err) = run_body(setup, ctx.clone()).await {
            let teardown_error = teardown(&session, &tenant).await;
            close(&session).await;
            return skip_all(err, Some(team_name), teardown_error);
        }

        let mut results = Vec::with_capacity(scenarios.len());
        for (index, scenario) in scenarios {
            let mut result = TestResult::new(group, &scenario.name, Utc::now());
            let scenario_start = Instant::now();
            info!("▶ {}", scenario.name);
            result.team = Some(team_name.clone());
            result.record(&run_body(&scenario.body, ctx.clone()).await);
            results.push((*index, finish(result, scenario_start)));
        }

        let teardown_error = teardown(&session, &tenant).await;
        close(&session).await;
        for (_, result) in results.iter_mut() {
            result.teardown_error = teardown_error.clone();
        }
        results
    }
}

/// Run a body on its own task so a panic fails the scenario, not the worker
async fn run_body(body: &Body, ctx: ScenarioContext) -> E2eResult<()> {
    match tokio::spawn(body(ctx)).await {
        Ok(outcome) => outcome,
        Err(join) if join.is_panic() => {
            Err(E2eError::Panicked(panic_message(join.into_panic())))
        }
        Err(join) => Err(E2eError::Panicked(join.to_string())),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Failed result for a scenario whose worker crashed outside its body
fn crashed(group: &str, name: &str, message: &str) -> TestResult {
    let mut result = TestResult::new(group, name, Utc::now());
    result.record(&Err(E2eError::Panicked(message.to_string())));
    finish(result, Instant::now())
}

/// Delete `tenant` unless a delete was already attempted; never fails
async fn teardown(session: &Session, tenant: &Tenant) -> Option<String> {
    if tenant.is_deleted() {
        return None;
    }
    match TenantManager::new(session.clone()).delete_team(tenant).await {
        Ok(()) => None,
        Err(err) => {
            warn!("{}", err);
            Some(err.to_string())
        }
    }
}

fn unconfirmed_team(err: &E2eError) -> Option<&str> {
    match err {
        E2eError::TeamUnconfirmed { team, .. } => Some(team),
        _ => None,
    }
}

/// Delete a team the product may have created without confirming it
async fn discard(session: &Session, team: &str) -> Option<String> {
    match TenantManager::new(session.clone())
        .discard_unconfirmed(team)
        .await
    {
        Ok(()) => None,
        Err(err) => {
            warn!("{}", err);
            Some(err.to_string())
        }
    }
}

async fn close(session: &Session) {
    if let Err(err) = session.close().await {
        warn!("Failed to close browser session: {}", err);
    }
}

fn finish(mut result: TestResult, start: Instant) -> TestResult {
    result.duration_ms = start.elapsed().as_millis() as u64;
    match result.status {
        TestStatus::Passed => info!("✓ {} ({} ms)", result.name, result.duration_ms),
        TestStatus::Failed => error!(
            "✗ {} - {}",
            result.name,
            result.error.as_deref().unwrap_or("unknown error")
        ),
        TestStatus::Skipped => warn!(
            "- {} skipped: {}",
            result.name,
            result.skip_reason.as_deref().unwrap_or("")
        ),
    }
    result
}

/// Runs a [`Suite`] on up to `workers` concurrent tasks
pub struct SuiteRunner {
    worker: Worker,
    filter: Filter,
}

impl SuiteRunner {
    pub fn new(config: Arc<HarnessConfig>, sessions: Arc<dyn SessionFactory>) -> Self {
        let fixtures = Fixtures::from_config(&config);
        Self {
            worker: Worker {
                config,
                sessions,
                fixtures,
            },
            filter: Filter::default(),
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub async fn run(&self, suite: Suite) -> E2eResult<TestSuiteResult> {
        let config = &self.worker.config;
        let started_at = Utc::now();
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(config.workers.max(1)));
        let mut tasks: JoinSet<Vec<(usize, TestResult)>> = JoinSet::new();
        let mut next_index = 0usize;

        for group in suite.groups {
            let scenarios: Vec<(usize, Scenario)> = group
                .scenarios
                .into_iter()
                .filter(|s| self.filter.matches(s))
                .map(|s| {
                    next_index += 1;
                    (next_index - 1, s)
                })
                .collect();
            if scenarios.is_empty() {
                continue;
            }
            let group_name = group.name;

            match group.isolation {
                Isolation::PerScenario => {
                    for (index, scenario) in scenarios {
                        let worker = self.worker.clone();
                        let semaphore = semaphore.clone();
                        let group_name = group_name.clone();
                        tasks.spawn(async move {
                            let _permit = semaphore.acquire_owned().await;
                            let run = worker.run_isolated(&group_name, &scenario);
                            let result = match AssertUnwindSafe(run).catch_unwind().await {
                                Ok(result) => result,
                                Err(payload) => {
                                    crashed(&group_name, &scenario.name, &panic_message(payload))
                                }
                            };
                            vec![(index, result)]
                        });
                    }
                }
                Isolation::Shared { setup, team } => {
                    let worker = self.worker.clone();
                    let semaphore = semaphore.clone();
                    tasks.spawn(async move {
                        let _permit = semaphore.acquire_owned().await;
                        let run = worker.run_shared(&group_name, &setup, &team, &scenarios);
                        match AssertUnwindSafe(run).catch_unwind().await {
                            Ok(results) => results,
                            Err(payload) => {
                                let message = panic_message(payload);
                                scenarios
                                    .iter()
                                    .map(|(index, s)| (*index, crashed(&group_name, &s.name, &message)))
                                    .collect()
                            }
                        }
                    });
                }
            }
        }

        info!("Running {} scenario(s) on {} worker(s)...", next_index, config.workers.max(1));

        let mut indexed = Vec::with_capacity(next_index);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(results) => indexed.extend(results),
                Err(e) => error!("Worker task failed: {}", e),
            }
        }
        indexed.sort_by_key(|(index, _)| *index);
        let results: Vec<TestResult> = indexed.into_iter().map(|(_, r)| r).collect();

        let count = |status: TestStatus| results.iter().filter(|r| r.status == status).count();
        let (passed, failed, skipped) = (
            count(TestStatus::Passed),
            count(TestStatus::Failed),
            count(TestStatus::Skipped),
        );
        let leaked_teams: Vec<String> = results
            .iter()
            .filter(|r| r.teardown_error.is_some())
            .filter_map(|r| r.team.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!(
            "Test Results: {} passed, {} failed, {} skipped ({} ms)",
            passed, failed, skipped, duration_ms
        );
        for team in &leaked_teams {
            warn!("Leaked team needs manual cleanup: {}", team);
        }

        Ok(TestSuiteResult {
            started_at,
            finished_at: Utc::now(),
            browser: config.browser.to_string(),
            base_url: config.base_url.clone(),
            total: results.len(),
            passed,
            failed,
            skipped,
            duration_ms,
            results,
            leaked_teams,
        })
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        let output_dir = &self.worker.config.output_dir;
        std::fs::create_dir_all(output_dir)?;

        let path = output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_matches_names_and_tags() {
        let scenario = Scenario::new("rename file", |_| async { Ok(()) }).tag("dashboard");
        assert!(Filter::default().matches(&scenario));
        assert!(Filter {
            names: vec!["rename".into()],
            tags: vec![],
        }
        .matches(&scenario));
        assert!(!Filter {
            names: vec![],
            tags: vec!["tokens".into()],
        }
        .matches(&scenario));
    }

    #[tokio::test]
    async fn offline_scenarios_run_without_sessions() {
        struct NoBrowser;

        #[async_trait::async_trait]
        impl SessionFactory for NoBrowser {
            async fn open(&self) -> E2eResult<Session> {
                Err(E2eError::DriverNotFound)
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let mut config = HarnessConfig::default();
        config.output_dir = dir.path().to_path_buf();
        let runner = SuiteRunner::new(Arc::new(config), Arc::new(NoBrowser));
        let suite = Suite::new().group(
            Group::new("offline")
                .scenario(Scenario::new("passes", |_| async { Ok(()) }).offline())
                .scenario(
                    Scenario::new("fails", |_| async {
                        Err(E2eError::Timeout("nothing".into()))
                    })
                    .offline(),
                )
                .scenario(
                    Scenario::new("panics", |_| async {
                        let broken = true;
                        assert!(!broken, "boom");
                        Ok(())
                    })
                    .offline(),
                )
                .scenario(Scenario::new("needs browser", |_| async { Ok(()) })),
        );

        let summary = runner.run(suite).await.unwrap();
        assert_eq!((summary.passed, summary.failed, summary.skipped), (1, 3, 0));
        assert_eq!(summary.results[0].name, "passes");
        assert_eq!(
            summary.results[2].error.as_deref(),
            Some("Scenario panicked: boom")
        );
        assert_eq!(summary.results[3].failure_kind, Some(FailureKind::Driver));

        let path = runner.write_results(&summary).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written["total"], 4);
        assert_eq!(written["results"][1]["status"], "failed");
    }

    #[tokio::test]
    async fn worker_crash_outside_the_body_still_reports_every_scenario() {
        struct CrashingBrowser;

        #[async_trait::async_trait]
        impl SessionFactory for CrashingBrowser {
            async fn open(&self) -> E2eResult<Session> {
                panic!("browser launch crashed")
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let mut config = HarnessConfig::default();
        config.output_dir = dir.path().to_path_buf();
        let runner = SuiteRunner::new(Arc::new(config), Arc::new(CrashingBrowser));
        let suite = Suite::new()
            .group(Group::new("isolated").scenario(Scenario::new("alone", |_| async { Ok(()) })))
            .group(
                Group::shared("shared", |_| async { Ok(()) })
                    .scenario(Scenario::new("first", |_| async { Ok(()) }))
                    .scenario(Scenario::new("second", |_| async { Ok(()) })),
            );

        let summary = runner.run(suite).await.unwrap();
        assert_eq!((summary.total, summary.failed), (3, 3));
        assert!(!summary.success());
        let names: Vec<&str> = summary.results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["alone", "first", "second"]);
        for result in &summary.results {
            assert_eq!(
                result.error.as_deref(),
                Some("Scenario panicked: browser launch crashed")
            );
        }
    }
}
