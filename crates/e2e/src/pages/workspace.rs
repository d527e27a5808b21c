//! File editor

use std::future::Future;
use std::ops::Deref;

use super::{BasePage, DashboardPage};
use crate::components::{
    ContextMenu, DesignPanel, Header, LayersPanel, Tool, Toolbar, Viewport,
};
use crate::error::E2eResult;
use crate::query::{step, Query};
use crate::save::{SaveSync, SyncPolicy};
use crate::session::Session;
use crate::shortcuts::Command;

#[derive(Clone)]
pub struct WorkspacePage {
    base: BasePage,
    pub header: Header,
    pub toolbar: Toolbar,
    pub viewport: Viewport,
    pub layers: LayersPanel,
    pub design: DesignPanel,
    pub context_menu: ContextMenu,
    save: SaveSync,
}

impl WorkspacePage {
    pub fn new(session: Session) -> Self {
        Self {
            header: Header::new(session.clone()),
            toolbar: Toolbar::new(session.clone()),
            viewport: Viewport::new(session.clone()),
            layers: LayersPanel::new(session.clone()),
            design: DesignPanel::new(session.clone()),
            context_menu: ContextMenu::new(session.clone()),
            save: SaveSync::new(session.clone()),
            base: BasePage::new(session),
        }
    }

    pub fn save_sync(&self) -> &SaveSync {
        &self.save
    }

    pub fn not_found(&self) -> Query {
        self.session()
            .test_id("not-found")
            .describe("not found page")
    }

    pub async fn wait_until_loaded(&self) -> E2eResult<()> {
        let navigation = self.session().timeouts().navigation();
        self.viewport
            .root()
            .expect()
            .within(navigation)
            .to_be_visible()
            .await
    }

    /// Open a file by URL, e.g. one recorded on a tenant
    pub async fn open_url(&self, url: &str) -> E2eResult<()> {
        step(&format!("open {url}"), async {
            self.session().goto(url).await?;
            self.wait_until_loaded().await
        })
        .await
    }

    /// The product shows its not-found screen instead of the editor
    pub async fn expect_unavailable(&self) -> E2eResult<()> {
        let navigation = self.session().timeouts().navigation();
        self.not_found()
            .expect()
            .within(navigation)
            .to_be_visible()
            .await?;
        self.viewport.root().expect().to_be_hidden().await
    }

    /// Run `mutation` and block until the product has saved it
    pub async fn persist<T, F, Fut>(&self, policy: SyncPolicy, mutation: F) -> E2eResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = E2eResult<T>>,
    {
        self.save.persist(policy, mutation).await
    }

    /// Draw a rectangle between two viewport-relative points
    pub async fn create_rectangle(&self, from: (f64, f64), to: (f64, f64)) -> E2eResult<()> {
        step(
            "create rectangle",
            self.persist(SyncPolicy::Advisory, || async {
                let before = self.layers.layer_count().await?;
                self.toolbar.select(Tool::Rectangle).await?;
                self.viewport.draw(from, to).await?;
                self.layers.expect_count(before + 1).await
            }),
        )
        .await
    }

    pub async fn set_fill_hex(&self, hex: &str) -> E2eResult<()> {
        self.persist(SyncPolicy::Advisory, || self.design.set_fill_hex(hex))
            .await
    }

    pub async fn undo(&self) -> E2eResult<()> {
        self.persist(SyncPolicy::SavedOnly, || {
            self.session().press_shortcut(Command::Undo)
        })
        .await
    }

    pub async fn redo(&self) -> E2eResult<()> {
        self.persist(SyncPolicy::SavedOnly, || {
            self.session().press_shortcut(Command::Redo)
        })
        .await
    }

    pub async fn rename_file(&self, name: &str) -> E2eResult<()> {
        self.persist(SyncPolicy::Advisory, || self.header.rename(name))
            .await
    }

    pub async fn back_to_dashboard(&self) -> E2eResult<DashboardPage> {
        self.save.wait_for_saved().await?;
        self.header.back_to_dashboard().click().await?;
        let dashboard = DashboardPage::new(self.session().clone());
        dashboard.wait_for_app_ready().await?;
        Ok(dashboard)
    }
}

impl Deref for WorkspacePage {
    type Target = BasePage;

    fn deref(&self) -> &BasePage {
        &self.base
    }
}
