//! Save-state synchronization
//!
//! The product persists edits in the background and only shows a status
//! indicator. Scenarios follow `mutate → (wait_for_unsaved) → wait_for_saved
//! → assert` so assertions never race the persistence pipeline; [`SaveSync::persist`]
//! packages that sequence.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::driver::Probe;
use crate::error::{E2eError, E2eResult};
use crate::query::Query;
use crate::session::{output_path, Session};
use crate::wait::{Polled, Poller};

/// Test id of the status indicator in the workspace header
pub const SAVE_STATUS_TEST_ID: &str = "save-status";

/// Attribute carrying the indicator's state
pub const SAVE_STATUS_ATTRIBUTE: &str = "data-status";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    Saved,
    Unsaved,
    Saving,
    Unknown,
}

impl SaveState {
    pub fn from_indicator(status: Option<&str>) -> Self {
        match status.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("saved") => SaveState::Saved,
            Some("unsaved") | Some("pending") => SaveState::Unsaved,
            Some("saving") => SaveState::Saving,
            _ => SaveState::Unknown,
        }
    }
}

impl fmt::Display for SaveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SaveState::Saved => "saved",
            SaveState::Unsaved => "unsaved",
            SaveState::Saving => "saving",
            SaveState::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// How strictly [`SaveSync::persist`] treats the `unsaved` transition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncPolicy {
    /// Wait briefly for `unsaved`; carry on if the product skipped it
    #[default]
    Advisory,
    /// The `unsaved` transition must be observed
    Strict,
    /// Only wait for `saved`
    SavedOnly,
}

/// Observes the save indicator of one session
#[derive(Clone)]
pub struct SaveSync {
    session: Session,
    indicator: Query,
}

impl SaveSync {
    pub fn new(session: Session) -> Self {
        let indicator = session
            .test_id(SAVE_STATUS_TEST_ID)
            .describe("save status indicator");
        Self { session, indicator }
    }

    pub fn indicator(&self) -> &Query {
        &self.indicator
    }

    /// Current state; `Unknown` when the indicator is absent
    pub async fn state(&self) -> E2eResult<SaveState> {
        let driver = self.session.driver();
        let chain = self.indicator.chain();
        if driver.count(chain).await? != 1 {
            return Ok(SaveState::Unknown);
        }
        let value = driver
            .inspect(
                chain,
                &Probe::Attribute {
                    name: SAVE_STATUS_ATTRIBUTE.to_string(),
                },
            )
            .await?;
        Ok(SaveState::from_indicator(value.as_str()))
    }

    async fn wait_for(&self, target: SaveState, poller: Poller) -> E2eResult<Result<(), SaveState>> {
        let outcome = poller
            .until(|| async {
                let state = self.state().await?;
                Ok((state == target).then_some(()))
            })
            .await?;
        match outcome {
            Polled::Ready(()) => Ok(Ok(())),
            Polled::TimedOut { .. } => Ok(Err(self.state().await?)),
        }
    }

    /// Block until the indicator shows `saved`.
    ///
    /// Returns immediately when already saved. Fails with `SyncTimeout` after
    /// the save timeout, with a viewport screenshot attached.
    pub async fn wait_for_saved(&self) -> E2eResult<()> {
        let timeouts = self.session.timeouts();
        let poller = Poller::new(timeouts.save(), timeouts.poll_interval());
        match self.wait_for(SaveState::Saved, poller).await? {
            Ok(()) => {
                debug!("save state: saved");
                Ok(())
            }
            Err(last_seen) => {
                let artifact = self.capture("save-timeout").await;
                Err(E2eError::SyncTimeout {
                    expected: SaveState::Saved.to_string(),
                    last_seen: last_seen.to_string(),
                    waited_ms: timeouts.save_ms,
                    artifact,
                })
            }
        }
    }

    /// Wait briefly for the indicator to leave `saved` after a mutation.
    ///
    /// Returns whether the transition was observed. The product may skip the
    /// visible `unsaved` state on fast edits, so a miss is not an error here;
    /// use [`SaveSync::expect_unsaved`] where the transition is guaranteed.
    pub async fn wait_for_unsaved(&self) -> E2eResult<bool> {
        let timeouts = self.session.timeouts();
        let poller = Poller::new(timeouts.unsaved(), timeouts.poll_interval());
        let observed = self.wait_for(SaveState::Unsaved, poller).await?.is_ok();
        if !observed {
            debug!("save state: unsaved transition not observed");
        }
        Ok(observed)
    }

    pub async fn expect_unsaved(&self) -> E2eResult<()> {
        let timeouts = self.session.timeouts();
        let poller = Poller::new(timeouts.unsaved(), timeouts.poll_interval());
        match self.wait_for(SaveState::Unsaved, poller).await? {
            Ok(()) => Ok(()),
            Err(last_seen) => Err(E2eError::SyncTimeout {
                expected: SaveState::Unsaved.to_string(),
                last_seen: last_seen.to_string(),
                waited_ms: timeouts.unsaved_ms,
                artifact: self.capture("unsaved-timeout").await,
            }),
        }
    }

    /// Run `mutation`, then block until the product has persisted it
    pub async fn persist<T, F, Fut>(&self, policy: SyncPolicy, mutation: F) -> E2eResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = E2eResult<T>>,
    {
        let value = mutation().await?;
        match policy {
            SyncPolicy::Advisory => {
                self.wait_for_unsaved().await?;
            }
            SyncPolicy::Strict => self.expect_unsaved().await?,
            SyncPolicy::SavedOnly => {}
        }
        self.wait_for_saved().await?;
        Ok(value)
    }

    async fn capture(&self, label: &str) -> Option<PathBuf> {
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.3f");
        let relative = PathBuf::from("sync").join(format!("{stamp}-{label}.png"));
        let result = async {
            let path = output_path(&self.session, &relative)?;
            let png = self.session.driver().screenshot(None).await?;
            std::fs::write(&path, png)?;
            E2eResult::Ok(path)
        }
        .await;
        match result {
            Ok(path) => Some(path),
            Err(err) => {
                warn!("could not capture save-state artifact: {}", err);
                None
            }
        }
    }
}
