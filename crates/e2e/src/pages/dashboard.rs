//! Dashboard: teams, projects, files and fonts

use std::ops::Deref;

use super::{BasePage, WorkspacePage};
use crate::components::{ConfirmDialog, ContextMenu, FileGrid, FontsPanel, TeamMenu};
use crate::error::E2eResult;
use crate::query::step;
use crate::session::Session;

#[derive(Clone)]
pub struct DashboardPage {
    base: BasePage,
    pub team_menu: TeamMenu,
    pub file_grid: FileGrid,
    pub fonts: FontsPanel,
    pub context_menu: ContextMenu,
    pub confirm: ConfirmDialog,
}

impl DashboardPage {
    pub fn new(session: Session) -> Self {
        let base = BasePage::new(session.clone());
        let context_menu = ContextMenu::new(session.clone());
        let confirm = ConfirmDialog::new(session.clone());
        Self {
            team_menu: TeamMenu::new(session.clone(), confirm.clone()),
            file_grid: FileGrid::new(session.clone(), context_menu.clone()),
            fonts: FontsPanel::new(session),
            context_menu,
            confirm,
            base,
        }
    }

    pub async fn open(&self) -> E2eResult<()> {
        self.goto("/#/dashboard").await
    }

    pub async fn open_fonts(&self) -> E2eResult<()> {
        step("open fonts section", async {
            self.session().test_id("nav-fonts").click().await?;
            self.fonts.panel().expect().to_be_visible().await
        })
        .await
    }

    pub async fn open_drafts(&self) -> E2eResult<()> {
        step("open drafts", async {
            self.session().test_id("nav-drafts").click().await?;
            self.file_grid.grid().expect().to_be_visible().await
        })
        .await
    }

    /// Double-click file `name` and wait for the editor
    pub async fn open_file(&self, name: &str) -> E2eResult<WorkspacePage> {
        self.file_grid.open_file(name).await?;
        let workspace = WorkspacePage::new(self.session().clone());
        workspace.wait_until_loaded().await?;
        Ok(workspace)
    }
}

impl Deref for DashboardPage {
    type Target = BasePage;

    fn deref(&self) -> &BasePage {
        &self.base
    }
}
