//! Layers tree in the left sidebar

use crate::error::E2eResult;
use crate::query::{step, Query};
use crate::session::Session;

#[derive(Clone)]
pub struct LayersPanel {
    session: Session,
}

impl LayersPanel {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn tree(&self) -> Query {
        self.session.test_id("layer-tree").describe("layers panel")
    }

    pub fn items(&self) -> Query {
        self.tree().test_id("layer-item").describe("layers")
    }

    pub fn item(&self, name: &str) -> Query {
        self.items()
            .filter_text(name)
            .describe(format!("layer \"{name}\""))
    }

    pub fn name_input(&self) -> Query {
        self.tree()
            .test_id("layer-name-input")
            .describe("layer name input")
    }

    pub async fn layer_count(&self) -> E2eResult<usize> {
        self.items().count().await
    }

    pub async fn select(&self, name: &str) -> E2eResult<()> {
        step(&format!("select layer {name}"), async {
            self.item(name).click().await?;
            self.expect_selected(name).await
        })
        .await
    }

    pub async fn rename(&self, from: &str, to: &str) -> E2eResult<()> {
        step(&format!("rename layer {from} to {to}"), async {
            self.item(from).double_click().await?;
            let input = self.name_input();
            input.fill(to).await?;
            input.press("Enter").await?;
            self.expect_layer(to).await
        })
        .await
    }

    pub async fn expect_layer(&self, name: &str) -> E2eResult<()> {
        self.item(name).expect().to_be_visible().await
    }

    pub async fn expect_selected(&self, name: &str) -> E2eResult<()> {
        self.item(name)
            .expect()
            .to_have_attribute("aria-selected", "true")
            .await
    }

    pub async fn expect_count(&self, count: usize) -> E2eResult<()> {
        self.items().expect().to_have_count(count).await
    }
}
