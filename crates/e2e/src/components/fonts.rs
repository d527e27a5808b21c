//! Dashboard custom fonts panel

use std::path::Path;

use crate::error::E2eResult;
use crate::query::{step, Query};
use crate::session::Session;

#[derive(Clone)]
pub struct FontsPanel {
    session: Session,
}

impl FontsPanel {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn panel(&self) -> Query {
        self.session.test_id("fonts-panel").describe("fonts panel")
    }

    pub fn upload_button(&self) -> Query {
        self.panel()
            .test_id("upload-font")
            .describe("upload font button")
    }

    pub fn fonts(&self) -> Query {
        self.panel().test_id("font-item").describe("installed fonts")
    }

    pub fn font(&self, family: &str) -> Query {
        self.fonts()
            .filter_text(family)
            .describe(format!("font \"{family}\""))
    }

    /// Upload a font file through the file chooser and wait for `family`
    pub async fn upload(&self, path: &Path, family: &str) -> E2eResult<()> {
        step(&format!("upload font {family}"), async {
            self.upload_button()
                .set_input_files(vec![path.to_path_buf()])
                .await?;
            self.font(family).expect().to_be_visible().await
        })
        .await
    }

    /// Families listed in the panel, in display order
    pub async fn list(&self) -> E2eResult<Vec<String>> {
        let fonts = self.fonts();
        let count = fonts.count().await?;
        let mut families = Vec::with_capacity(count);
        for index in 0..count {
            let item = if count == 1 {
                fonts.clone()
            } else {
                fonts.nth(index as i32)
            };
            families.push(item.text_content().await?.trim().to_string());
        }
        Ok(families)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{Action, MockDriver};

    #[tokio::test]
    async fn upload_passes_fixture_path() {
        let mock = MockDriver::new();
        let panel = FontsPanel::new(mock.session_with_timeouts(300));
        let button = panel.upload_button().to_string();
        mock.set_count(&button, 1);
        let font = panel.font("Inter").to_string();
        mock.on_action(&button, "set_input_files", move |dom, _| {
            dom.set_count(&font, 1);
        });
        mock.set_text(&panel.fonts().to_string(), "Inter");

        panel
            .upload(Path::new("fixtures/fonts/Inter.ttf"), "Inter")
            .await
            .unwrap();
        assert_eq!(panel.list().await.unwrap(), vec!["Inter".to_string()]);
        let uploaded = mock.events().into_iter().any(|event| {
            matches!(event, crate::driver::mock::MockEvent::Action {
                action: Action::SetInputFiles { paths }, ..
            } if paths == vec![std::path::PathBuf::from("fixtures/fonts/Inter.ttf")])
        });
        assert!(uploaded);
    }
}
