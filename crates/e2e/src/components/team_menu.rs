//! Dashboard team switcher
//!
//! Teams are created and deleted through the same dropdown a user would use.

use tracing::debug;

use super::ConfirmDialog;
use crate::error::{E2eError, E2eResult};
use crate::query::{step, Query};
use crate::session::Session;
use crate::wait::{Polled, Poller};

#[derive(Clone)]
pub struct TeamMenu {
    session: Session,
    confirm: ConfirmDialog,
}

/// What the product did with a submitted team name
enum Submitted {
    Created,
    Rejected(String),
}

impl TeamMenu {
    pub fn new(session: Session, confirm: ConfirmDialog) -> Self {
        Self { session, confirm }
    }

    pub fn current_team(&self) -> Query {
        self.session
            .test_id("current-team")
            .describe("current team name")
    }

    pub fn team_list(&self) -> Query {
        self.session
            .test_id("teams-selector")
            .describe("team list")
    }

    pub fn team_item(&self, name: &str) -> Query {
        self.team_list()
            .role("menuitem", name)
            .describe(format!("team \"{name}\""))
    }

    pub fn create_team_item(&self) -> Query {
        self.team_list()
            .test_id("create-new-team")
            .describe("create team entry")
    }

    pub fn create_modal(&self) -> Query {
        self.session
            .test_id("create-team-modal")
            .describe("create team dialog")
    }

    pub fn name_input(&self) -> Query {
        self.create_modal()
            .test_id("team-name-input")
            .describe("team name input")
    }

    pub fn submit_button(&self) -> Query {
        self.create_modal()
            .test_id("create-team-submit")
            .describe("create team button")
    }

    pub fn name_error(&self) -> Query {
        self.create_modal()
            .test_id("team-name-error")
            .describe("team name error")
    }

    pub fn options_button(&self) -> Query {
        self.session
            .test_id("team-options")
            .describe("team options")
    }

    pub fn delete_item(&self) -> Query {
        self.session
            .test_id("delete-team")
            .describe("delete team entry")
    }

    pub async fn open_switcher(&self) -> E2eResult<()> {
        step("open team switcher", async {
            self.current_team().click().await?;
            self.team_list().expect().to_be_visible().await
        })
        .await
    }

    pub async fn select_team(&self, name: &str) -> E2eResult<()> {
        step(&format!("select team {name}"), async {
            if self.current_name().await?.as_deref() == Some(name) {
                return Ok(());
            }
            self.open_switcher().await?;
            self.team_item(name).click().await?;
            self.expect_current(name).await
        })
        .await
    }

    /// Name of the selected team, if the switcher is rendered
    pub async fn current_name(&self) -> E2eResult<Option<String>> {
        let current = self.current_team();
        if current.count().await? != 1 {
            return Ok(None);
        }
        Ok(Some(current.text_content().await?.trim().to_string()))
    }

    pub async fn expect_current(&self, name: &str) -> E2eResult<()> {
        self.current_team().expect().to_have_text(name).await
    }

    /// Create `name` and block until it is the selected team.
    ///
    /// Fails with `TeamNameTaken` when the dialog rejects the name, and with
    /// `TeamUnconfirmed` when the submitted team never shows up as current.
    pub async fn create_team(&self, name: &str) -> E2eResult<()> {
        step(&format!("create team {name}"), async {
            self.open_switcher().await?;
            self.create_team_item().click().await?;
            self.name_input().fill(name).await?;
            self.submit_button().click().await?;

            let submitted = self.await_submission(name).await.map_err(|err| {
                E2eError::TeamUnconfirmed {
                    team: name.to_string(),
                    reason: err.to_string(),
                }
            })?;
            match submitted {
                Submitted::Created => Ok(()),
                Submitted::Rejected(reason) => {
                    debug!("team name {} rejected: {}", name, reason);
                    // Leave the dialog so the next attempt starts clean.
                    self.session.press("Escape").await?;
                    Err(E2eError::TeamNameTaken(name.to_string()))
                }
            }
        })
        .await
    }

    async fn await_submission(&self, name: &str) -> E2eResult<Submitted> {
        let timeouts = self.session.timeouts();
        let poller = Poller::new(timeouts.action(), timeouts.poll_interval());
        let outcome = poller
            .until(|| async {
                let error = self.name_error();
                if error.count().await? == 1 && error.is_visible().await? {
                    return Ok(Some(Submitted::Rejected(error.text_content().await?)));
                }
                if self.current_name().await?.as_deref() == Some(name) {
                    return Ok(Some(Submitted::Created));
                }
                Ok(None)
            })
            .await?;
        match outcome {
            Polled::Ready(submitted) => Ok(submitted),
            // Surfaces the name actually shown as the assertion failure.
            Polled::TimedOut { .. } => self.expect_current(name).await.map(|_| Submitted::Created),
        }
    }

    /// Delete the selected team through its options menu
    pub async fn delete_current_team(&self) -> E2eResult<()> {
        step("delete current team", async {
            let deleted = self.current_name().await?;
            self.options_button().click().await?;
            self.delete_item().click().await?;
            self.confirm.accept().await?;
            if let Some(name) = deleted {
                self.expect_not_current(&name).await?;
            }
            Ok(())
        })
        .await
    }

    pub async fn expect_not_current(&self, name: &str) -> E2eResult<()> {
        let timeouts = self.session.timeouts();
        let poller = Poller::new(timeouts.action(), timeouts.poll_interval());
        let outcome = poller
            .until(|| async {
                let current = self.current_name().await?;
                Ok((current.as_deref() != Some(name)).then_some(()))
            })
            .await?;
        match outcome {
            Polled::Ready(()) => Ok(()),
            Polled::TimedOut { .. } => Err(E2eError::AssertionFailed {
                action: "expect team switched away".into(),
                query: self.current_team().label(),
                expected: format!("a team other than \"{name}\""),
                actual: name.to_string(),
            }),
        }
    }
}
