//! Dashboard file grid

use super::ContextMenu;
use crate::error::E2eResult;
use crate::query::{step, Query};
use crate::session::Session;

#[derive(Clone)]
pub struct FileGrid {
    session: Session,
    context_menu: ContextMenu,
}

impl FileGrid {
    pub fn new(session: Session, context_menu: ContextMenu) -> Self {
        Self {
            session,
            context_menu,
        }
    }

    pub fn grid(&self) -> Query {
        self.session.test_id("dashboard-grid").describe("file grid")
    }

    /// Empty-project placeholder that creates a file
    pub fn new_file_placeholder(&self) -> Query {
        self.grid()
            .test_id("new-file-placeholder")
            .describe("new file placeholder")
    }

    pub fn cards(&self) -> Query {
        self.grid().test_id("file-card").describe("file cards")
    }

    pub fn card(&self, name: &str) -> Query {
        self.cards()
            .filter_text(name)
            .describe(format!("file card \"{name}\""))
    }

    pub fn card_title(&self, name: &str) -> Query {
        self.card(name)
            .test_id("file-name")
            .describe(format!("file name \"{name}\""))
    }

    pub fn last_card_title(&self) -> Query {
        self.cards()
            .last()
            .test_id("file-name")
            .describe("newest file name")
    }

    /// Inline editor shown while a card is renamed
    pub fn rename_input(&self) -> Query {
        self.grid()
            .test_id("file-name-input")
            .describe("file rename input")
    }

    pub async fn file_count(&self) -> E2eResult<usize> {
        self.cards().count().await
    }

    /// Create a file from the placeholder and return its generated name
    pub async fn create_file(&self) -> E2eResult<String> {
        step("create file", async {
            let before = self.file_count().await?;
            self.new_file_placeholder().click().await?;
            self.cards().expect().to_have_count(before + 1).await?;
            Ok(self
                .last_card_title()
                .text_content()
                .await?
                .trim()
                .to_string())
        })
        .await
    }

    pub async fn rename_file(&self, from: &str, to: &str) -> E2eResult<()> {
        step(&format!("rename file {from} to {to}"), async {
            self.context_menu
                .choose_on(&self.card(from), "Rename")
                .await?;
            let input = self.rename_input();
            input.fill(to).await?;
            input.press("Enter").await?;
            self.expect_file_name(to).await
        })
        .await
    }

    pub async fn open_file(&self, name: &str) -> E2eResult<()> {
        step(&format!("open file {name}"), self.card(name).double_click()).await
    }

    pub async fn delete_file(&self, name: &str) -> E2eResult<()> {
        step(&format!("delete file {name}"), async {
            self.context_menu.choose_on(&self.card(name), "Delete").await?;
            self.expect_no_file(name).await
        })
        .await
    }

    /// The displayed name of the card equals `name`
    pub async fn expect_file_name(&self, name: &str) -> E2eResult<()> {
        self.card_title(name).expect().to_have_text(name).await
    }

    pub async fn expect_no_file(&self, name: &str) -> E2eResult<()> {
        self.card(name).expect().to_have_count(0).await
    }
}
