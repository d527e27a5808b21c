//! Canvas viewport

use crate::driver::BoundingBox;
use crate::error::E2eResult;
use crate::query::{step, Query};
use crate::session::Session;
use crate::shortcuts::Command;
use crate::visual::Mask;

#[derive(Clone)]
pub struct Viewport {
    session: Session,
}

impl Viewport {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn root(&self) -> Query {
        self.session.test_id("viewport").describe("canvas viewport")
    }

    pub fn selection_handles(&self) -> Query {
        self.root()
            .test_id("selection-handlers")
            .describe("selection handles")
    }

    /// Remote cursors of other users on the same file
    pub fn presence_cursors(&self) -> Query {
        self.root()
            .class_contains("presence-cursor")
            .describe("presence cursors")
    }

    pub fn guides(&self) -> Query {
        self.root()
            .class_contains("snap-guide")
            .describe("snap guides")
    }

    /// Regions that change between otherwise identical renders
    pub fn volatile_masks(&self) -> Vec<Mask> {
        vec![
            Mask::Region(self.presence_cursors()),
            Mask::Region(self.guides()),
        ]
    }

    async fn origin(&self) -> E2eResult<BoundingBox> {
        self.root().bounding_box().await
    }

    /// Drag from `from` to `to`, both relative to the viewport's top-left
    pub async fn draw(&self, from: (f64, f64), to: (f64, f64)) -> E2eResult<()> {
        step("draw on canvas", async {
            let origin = self.origin().await?;
            self.session
                .drag(
                    (origin.x + from.0, origin.y + from.1),
                    (origin.x + to.0, origin.y + to.1),
                )
                .await
        })
        .await
    }

    pub async fn click(&self, at: (f64, f64)) -> E2eResult<()> {
        step("click on canvas", async {
            let origin = self.origin().await?;
            self.session.click_at(origin.x + at.0, origin.y + at.1).await
        })
        .await
    }

    pub async fn clear_selection(&self) -> E2eResult<()> {
        step("clear selection", async {
            self.session.press_shortcut(Command::Escape).await?;
            self.selection_handles().expect().to_be_hidden().await
        })
        .await
    }
}
