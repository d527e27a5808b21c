//! Workspace header: file name, save indicator and main menu

use crate::error::E2eResult;
use crate::query::{step, Query};
use crate::save::SAVE_STATUS_TEST_ID;
use crate::session::Session;

#[derive(Clone)]
pub struct Header {
    session: Session,
}

impl Header {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn root(&self) -> Query {
        self.session
            .test_id("workspace-header")
            .describe("workspace header")
    }

    pub fn file_name(&self) -> Query {
        self.root().test_id("file-name").describe("file name")
    }

    pub fn rename_input(&self) -> Query {
        self.root()
            .test_id("file-name-input")
            .describe("file name input")
    }

    pub fn save_indicator(&self) -> Query {
        self.session
            .test_id(SAVE_STATUS_TEST_ID)
            .describe("save status indicator")
    }

    pub fn main_menu(&self) -> Query {
        self.root().test_id("main-menu").describe("main menu")
    }

    pub fn back_to_dashboard(&self) -> Query {
        self.root()
            .test_id("back-to-dashboard")
            .describe("back to dashboard")
    }

    pub async fn rename(&self, name: &str) -> E2eResult<()> {
        step(&format!("rename file to {name}"), async {
            self.file_name().double_click().await?;
            let input = self.rename_input();
            input.fill(name).await?;
            input.press("Enter").await?;
            self.expect_file_name(name).await
        })
        .await
    }

    pub async fn expect_file_name(&self, name: &str) -> E2eResult<()> {
        self.file_name().expect().to_have_text(name).await
    }

    pub async fn open_main_menu(&self) -> E2eResult<()> {
        step("open main menu", self.main_menu().click()).await
    }
}
