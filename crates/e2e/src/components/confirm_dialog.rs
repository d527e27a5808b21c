//! Destructive-action confirmation modal

use crate::error::E2eResult;
use crate::query::{step, Query};
use crate::session::Session;

#[derive(Clone)]
pub struct ConfirmDialog {
    session: Session,
}

impl ConfirmDialog {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn dialog(&self) -> Query {
        self.session
            .test_id("confirm-dialog")
            .describe("confirmation dialog")
    }

    pub fn message(&self) -> Query {
        self.dialog().test_id("confirm-message")
    }

    pub fn accept_button(&self) -> Query {
        self.dialog()
            .test_id("confirm-accept")
            .describe("confirm button")
    }

    pub fn cancel_button(&self) -> Query {
        self.dialog()
            .test_id("confirm-cancel")
            .describe("cancel button")
    }

    pub async fn accept(&self) -> E2eResult<()> {
        step("confirm", async {
            self.dialog().expect().to_be_visible().await?;
            self.accept_button().click().await?;
            self.dialog().expect().to_be_hidden().await
        })
        .await
    }

    pub async fn cancel(&self) -> E2eResult<()> {
        step("cancel confirmation", async {
            self.cancel_button().click().await?;
            self.dialog().expect().to_be_hidden().await
        })
        .await
    }

    pub async fn expect_message(&self, text: &str) -> E2eResult<()> {
        self.message().expect().to_contain_text(text).await
    }
}
