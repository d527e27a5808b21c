//! Right-click context menu

use crate::error::E2eResult;
use crate::query::{step, Query};
use crate::session::Session;

#[derive(Clone)]
pub struct ContextMenu {
    session: Session,
}

impl ContextMenu {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn menu(&self) -> Query {
        self.session.test_id("context-menu").describe("context menu")
    }

    pub fn item(&self, label: &str) -> Query {
        self.menu()
            .role("menuitem", label)
            .describe(format!("context menu item \"{label}\""))
    }

    /// Right-click `target` and pick `label`
    pub async fn choose_on(&self, target: &Query, label: &str) -> E2eResult<()> {
        step(&format!("context menu › {label}"), async {
            target.right_click().await?;
            self.menu().expect().to_be_visible().await?;
            self.choose(label).await
        })
        .await
    }

    /// Pick `label` from the already open menu
    pub async fn choose(&self, label: &str) -> E2eResult<()> {
        self.item(label).click().await?;
        self.menu().expect().to_be_hidden().await
    }
}
