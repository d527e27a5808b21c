//! Behaviour shared by every authenticated screen

use crate::error::E2eResult;
use crate::query::{step, Query};
use crate::session::Session;
use crate::shortcuts::Command;
use crate::visual::{Mask, Tolerance, VisualDiff, VisualTester};

#[derive(Clone)]
pub struct BasePage {
    session: Session,
}

impl BasePage {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Root element rendered once the app has booted
    pub fn app_root(&self) -> Query {
        self.session.test_id("app-ready").describe("application root")
    }

    pub fn toast(&self) -> Query {
        self.session.test_id("toast").describe("toast notification")
    }

    pub fn loader(&self) -> Query {
        self.session.test_id("loader").describe("loading indicator")
    }

    pub async fn goto(&self, path: &str) -> E2eResult<()> {
        step(&format!("navigate to {path}"), async {
            self.session.goto(path).await?;
            self.wait_for_app_ready().await
        })
        .await
    }

    /// Block until the app root is visible and no loader is shown
    pub async fn wait_for_app_ready(&self) -> E2eResult<()> {
        let navigation = self.session.timeouts().navigation();
        self.app_root().expect().within(navigation).to_be_visible().await?;
        self.loader().expect().within(navigation).to_be_hidden().await
    }

    pub async fn expect_toast(&self, text: &str) -> E2eResult<()> {
        self.toast().expect().to_contain_text(text).await
    }

    pub async fn press_shortcut(&self, command: Command) -> E2eResult<()> {
        self.session.press_shortcut(command).await
    }

    /// Regions masked in every screenshot: timestamps, avatars, toasts
    pub fn default_masks(&self) -> Vec<Mask> {
        vec![
            Mask::Region(self.session.test_id("timestamp").describe("timestamps")),
            Mask::Region(
                self.session
                    .class_contains("presence-avatar")
                    .describe("presence avatars"),
            ),
            Mask::Region(self.toast()),
        ]
    }

    /// Compare `target` (or the viewport) against baseline `name`
    pub async fn assert_screenshot(
        &self,
        name: &str,
        target: Option<&Query>,
        extra_masks: Vec<Mask>,
        tolerance: Option<Tolerance>,
    ) -> E2eResult<VisualDiff> {
        let mut masks = self.default_masks();
        masks.extend(extra_masks);
        let tester = VisualTester::for_session(&self.session)?;
        step(
            &format!("screenshot {name}"),
            tester.assert_matches(&self.session, name, target, &masks, tolerance),
        )
        .await
    }
}
