//! Undo history panel

use crate::error::E2eResult;
use crate::query::Query;
use crate::session::Session;

#[derive(Clone)]
pub struct HistoryPanel {
    session: Session,
}

impl HistoryPanel {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn panel(&self) -> Query {
        self.session
            .test_id("history-toolbox")
            .describe("history panel")
    }

    pub fn entries(&self) -> Query {
        self.panel()
            .test_id("history-entry")
            .describe("history entries")
    }

    pub fn entry(&self, text: &str) -> Query {
        self.entries()
            .filter_text(text)
            .describe(format!("history entry \"{text}\""))
    }

    pub async fn expect_entry(&self, text: &str) -> E2eResult<()> {
        self.entry(text).expect().to_be_visible().await
    }

    pub async fn expect_entries(&self, count: usize) -> E2eResult<()> {
        self.entries().expect().to_have_count(count).await
    }
}
