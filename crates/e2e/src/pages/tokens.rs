//! Tokens feature screen: the editor with the tokens sidebar open

use crate::components::{TokenKind, TokensPanel};
use crate::error::E2eResult;
use crate::query::step;
use crate::save::SyncPolicy;
use crate::shortcuts::Command;

use super::WorkspacePage;

#[derive(Clone)]
pub struct TokensPage {
    pub workspace: WorkspacePage,
    pub tokens: TokensPanel,
}

impl TokensPage {
    pub fn new(workspace: WorkspacePage) -> Self {
        let tokens = TokensPanel::new(workspace.session().clone());
        Self { workspace, tokens }
    }

    pub async fn open_panel(&self) -> E2eResult<()> {
        step("open tokens panel", async {
            if self.tokens.sidebar().count().await? == 0 {
                self.workspace.press_shortcut(Command::ToggleTokens).await?;
            }
            self.tokens.sidebar().expect().to_be_visible().await
        })
        .await
    }

    pub async fn create_token(&self, kind: TokenKind, name: &str, value: &str) -> E2eResult<()> {
        self.workspace
            .persist(SyncPolicy::Advisory, || {
                self.tokens.create_token(kind, name, value)
            })
            .await
    }

    /// Apply token `name` to the current selection and wait for it to save
    pub async fn apply_token(&self, name: &str) -> E2eResult<()> {
        self.workspace
            .persist(SyncPolicy::Advisory, || async {
                self.tokens.apply(name).await?;
                self.tokens.expect_applied(name).await
            })
            .await
    }
}
