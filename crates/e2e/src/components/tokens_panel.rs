//! Design tokens sidebar

use std::fmt;

use super::ColorPicker;
use crate::error::E2eResult;
use crate::query::{step, Query};
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Color,
    BorderRadius,
    Dimensions,
    Opacity,
    Spacing,
    StrokeWidth,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Color => "color",
            TokenKind::BorderRadius => "border-radius",
            TokenKind::Dimensions => "dimensions",
            TokenKind::Opacity => "opacity",
            TokenKind::Spacing => "spacing",
            TokenKind::StrokeWidth => "stroke-width",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
pub struct TokensPanel {
    session: Session,
}

impl TokensPanel {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn sidebar(&self) -> Query {
        self.session
            .test_id("tokens-sidebar")
            .describe("tokens sidebar")
    }

    pub fn add_button(&self, kind: TokenKind) -> Query {
        self.sidebar()
            .test_id(&format!("add-token-{kind}"))
            .describe(format!("add {kind} token"))
    }

    pub fn form(&self) -> Query {
        self.session.test_id("token-form").describe("token form")
    }

    pub fn name_input(&self) -> Query {
        self.form()
            .test_id("token-name-input")
            .describe("token name input")
    }

    pub fn value_input(&self) -> Query {
        self.form()
            .test_id("token-value-input")
            .describe("token value input")
    }

    pub fn save_button(&self) -> Query {
        self.form()
            .test_id("token-save")
            .describe("save token button")
    }

    /// Picker inside the form, for color tokens
    pub fn form_color(&self) -> ColorPicker {
        ColorPicker::new(self.session.clone(), self.form())
    }

    pub fn pill(&self, name: &str) -> Query {
        self.sidebar()
            .test_id("token-pill")
            .filter_text(name)
            .describe(format!("token \"{name}\""))
    }

    /// Marker a pill shows while its token is applied to the selection
    pub fn applied_indicator(&self, name: &str) -> Query {
        self.pill(name)
            .test_id("token-applied")
            .describe(format!("applied marker of \"{name}\""))
    }

    pub async fn create_token(&self, kind: TokenKind, name: &str, value: &str) -> E2eResult<()> {
        step(&format!("create {kind} token {name}"), async {
            self.add_button(kind).click().await?;
            self.form().expect().to_be_visible().await?;
            self.name_input().fill(name).await?;
            self.value_input().fill(value).await?;
            self.save_button().click().await?;
            self.form().expect().to_be_hidden().await?;
            self.pill(name).expect().to_be_visible().await
        })
        .await
    }

    /// Apply `name` to the current selection
    pub async fn apply(&self, name: &str) -> E2eResult<()> {
        step(&format!("apply token {name}"), self.pill(name).click()).await
    }

    pub async fn expect_applied(&self, name: &str) -> E2eResult<()> {
        self.applied_indicator(name).expect().to_be_visible().await
    }
}
