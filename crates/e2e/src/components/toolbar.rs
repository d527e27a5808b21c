//! Drawing tools

use crate::error::E2eResult;
use crate::query::{step, Query};
use crate::session::Session;
use crate::shortcuts::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Rectangle,
    Ellipse,
    Board,
    Text,
}

impl Tool {
    fn test_id(&self) -> &'static str {
        match self {
            Tool::Rectangle => "rect-btn",
            Tool::Ellipse => "ellipse-btn",
            Tool::Board => "board-btn",
            Tool::Text => "text-btn",
        }
    }

    pub fn command(&self) -> Command {
        match self {
            Tool::Rectangle => Command::RectangleTool,
            Tool::Ellipse => Command::EllipseTool,
            Tool::Board => Command::BoardTool,
            Tool::Text => Command::TextTool,
        }
    }
}

#[derive(Clone)]
pub struct Toolbar {
    session: Session,
}

impl Toolbar {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn root(&self) -> Query {
        self.session.test_id("toolbar").describe("toolbar")
    }

    pub fn tool(&self, tool: Tool) -> Query {
        self.root()
            .test_id(tool.test_id())
            .describe(format!("{tool:?} tool"))
    }

    pub async fn select(&self, tool: Tool) -> E2eResult<()> {
        step(&format!("select {tool:?} tool"), async {
            self.tool(tool).click().await?;
            self.expect_selected(tool).await
        })
        .await
    }

    pub async fn select_with_shortcut(&self, tool: Tool) -> E2eResult<()> {
        step(&format!("select {tool:?} tool by shortcut"), async {
            self.session.press_shortcut(tool.command()).await?;
            self.expect_selected(tool).await
        })
        .await
    }

    pub async fn expect_selected(&self, tool: Tool) -> E2eResult<()> {
        self.tool(tool)
            .expect()
            .to_have_attribute("aria-pressed", "true")
            .await
    }
}
