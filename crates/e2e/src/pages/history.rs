//! History feature screen: the editor with the undo history open

use crate::components::HistoryPanel;
use crate::error::E2eResult;
use crate::query::step;
use crate::shortcuts::Command;

use super::WorkspacePage;

#[derive(Clone)]
pub struct HistoryPage {
    pub workspace: WorkspacePage,
    pub history: HistoryPanel,
}

impl HistoryPage {
    pub fn new(workspace: WorkspacePage) -> Self {
        let history = HistoryPanel::new(workspace.session().clone());
        Self { workspace, history }
    }

    pub async fn open_panel(&self) -> E2eResult<()> {
        step("open history panel", async {
            if self.history.panel().count().await? == 0 {
                self.workspace.press_shortcut(Command::ToggleHistory).await?;
            }
            self.history.panel().expect().to_be_visible().await
        })
        .await
    }

    /// Undo once and wait for the entry list to shrink to `remaining`
    pub async fn undo_to(&self, remaining: usize) -> E2eResult<()> {
        step("undo", async {
            self.workspace.undo().await?;
            self.history.expect_entries(remaining).await
        })
        .await
    }
}
