//! Tenant isolation
//!
//! Every test (or shared group) works inside its own team. Teams are created
//! and deleted through the dashboard UI, never through a backend API, and
//! their names carry a process-unique suffix so concurrent tests cannot
//! collide.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};
use crate::pages::DashboardPage;
use crate::session::Session;

/// Attempts `create_unique_team` makes before giving up
pub const MAX_NAME_ATTEMPTS: usize = 3;

static NAME_COUNTER: AtomicU64 = AtomicU64::new(0);

const WORDS: &[&str] = &[
    "amber", "birch", "cedar", "delta", "ember", "fjord", "grove", "harbor", "iris", "juniper",
    "kestrel", "lumen", "maple", "nova", "onyx", "pine", "quartz", "raven", "sable", "tundra",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TeamName(String);

impl TeamName {
    /// `prefix-<word>-<pid>-<counter>-<rand>`
    ///
    /// Pid and the process-wide counter make the name unique within a run on
    /// one host; the random tail separates hosts sharing one backend.
    pub fn random(prefix: &str) -> Self {
        let mut rng = rand::thread_rng();
        let word = WORDS.choose(&mut rng).copied().unwrap_or("team");
        let counter = NAME_COUNTER.fetch_add(1, Ordering::Relaxed);
        let tail: u32 = rng.gen_range(0..0x10000);
        Self(format!(
            "{prefix}-{word}-{}-{counter}-{tail:04x}",
            std::process::id()
        ))
    }

    /// A literal name; uniqueness is the caller's problem
    pub fn exact(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TeamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a scenario wants its team named
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeamSpec {
    /// Random name from the configured prefix
    Random,
    /// Literal name
    Exact(String),
}

/// A workspace created inside a tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceRecord {
    pub name: String,
    pub url: String,
}

/// One live team and the workspaces created in it
#[derive(Debug)]
pub struct Tenant {
    name: TeamName,
    workspaces: Mutex<Vec<WorkspaceRecord>>,
    deleted: AtomicBool,
}

impl Tenant {
    fn new(name: TeamName) -> Self {
        Self {
            name,
            workspaces: Mutex::new(Vec::new()),
            deleted: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &TeamName {
        &self.name
    }

    pub fn record_workspace(&self, name: &str, url: &str) {
        self.workspaces.lock().push(WorkspaceRecord {
            name: name.to_string(),
            url: url.to_string(),
        });
    }

    pub fn workspaces(&self) -> Vec<WorkspaceRecord> {
        self.workspaces.lock().clone()
    }

    /// A delete has been attempted; teardown must not try again
    pub fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::SeqCst)
    }

    fn mark_deleted(&self) -> bool {
        !self.deleted.swap(true, Ordering::SeqCst)
    }
}

/// Creates and deletes teams through one session's dashboard
pub struct TenantManager {
    dashboard: DashboardPage,
    prefix: String,
}

impl TenantManager {
    pub fn new(session: Session) -> Self {
        let prefix = session.config().team_prefix.clone();
        Self {
            dashboard: DashboardPage::new(session),
            prefix,
        }
    }

    pub fn dashboard(&self) -> &DashboardPage {
        &self.dashboard
    }

    pub async fn create(&self, spec: &TeamSpec) -> E2eResult<Tenant> {
        match spec {
            TeamSpec::Random => self.create_unique_team().await,
            TeamSpec::Exact(name) => self.create_team(TeamName::exact(name.clone())).await,
        }
    }

    /// Create `name` and block until it is the active team
    pub async fn create_team(&self, name: TeamName) -> E2eResult<Tenant> {
        info!("Creating team {}", name);
        self.dashboard.open().await?;
        self.dashboard.team_menu.create_team(name.as_str()).await?;
        Ok(Tenant::new(name))
    }

    /// Create a randomly named team, drawing a new name on collision
    pub async fn create_unique_team(&self) -> E2eResult<Tenant> {
        let mut last_taken = None;
        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let name = TeamName::random(&self.prefix);
            match self.create_team(name).await {
                Err(E2eError::TeamNameTaken(taken)) => {
                    warn!(
                        "Team name {} already taken (attempt {}/{})",
                        taken, attempt, MAX_NAME_ATTEMPTS
                    );
                    last_taken = Some(taken);
                }
                other => return other,
            }
        }
        Err(E2eError::TeamNameTaken(last_taken.unwrap_or_default()))
    }

    /// Delete `tenant` and everything in it.
    ///
    /// Marks the tenant deleted before trying, so a second call is a no-op
    /// whatever the outcome of the first.
    pub async fn delete_team(&self, tenant: &Tenant) -> E2eResult<()> {
        if !tenant.mark_deleted() {
            return Ok(());
        }
        info!("Deleting team {}", tenant.name());
        let result = async {
            self.dashboard.open().await?;
            self.dashboard
                .team_menu
                .select_team(tenant.name().as_str())
                .await?;
            self.dashboard.team_menu.delete_current_team().await
        }
        .await;
        result.map_err(|err| E2eError::TeardownFailure {
            team: tenant.name().to_string(),
            reason: err.to_string(),
        })
    }

    /// Best-effort delete of a team whose creation was never confirmed
    pub async fn discard_unconfirmed(&self, name: &str) -> E2eResult<()> {
        warn!("Discarding unconfirmed team {}", name);
        self.delete_team(&Tenant::new(TeamName::exact(name))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn random_names_are_process_unique() {
        let names: HashSet<TeamName> = (0..500).map(|_| TeamName::random("autotest")).collect();
        assert_eq!(names.len(), 500);

        let sample = TeamName::random("autotest");
        let parts: Vec<&str> = sample.as_str().split('-').collect();
        assert_eq!(parts.len(), 5);
        assert_eq!(parts[0], "autotest");
        assert!(WORDS.contains(&parts[1]));
        assert_eq!(parts[2], std::process::id().to_string());
        assert_eq!(parts[4].len(), 4);
    }

    #[test]
    fn names_from_concurrent_threads_do_not_collide() {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(|| {
                    (0..100)
                        .map(|_| TeamName::random("w"))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let mut seen = HashSet::new();
        for handle in handles {
            for name in handle.join().unwrap() {
                assert!(seen.insert(name), "duplicate team name");
            }
        }
    }

    #[test]
    fn tenant_records_workspaces_and_deletes_once() {
        let tenant = Tenant::new(TeamName::exact("alpha-autotest"));
        tenant.record_workspace("one", "http://localhost:3449/#/workspace/1");
        tenant.record_workspace("two", "http://localhost:3449/#/workspace/2");
        assert_eq!(tenant.workspaces().len(), 2);

        assert!(!tenant.is_deleted());
        assert!(tenant.mark_deleted());
        assert!(!tenant.mark_deleted());
        assert!(tenant.is_deleted());
    }
}
