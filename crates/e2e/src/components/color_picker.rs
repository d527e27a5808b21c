//! Color picker shared by the fill, stroke and token sections

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{E2eError, E2eResult};
use crate::query::{step, Query};
use crate::session::Session;
use crate::wait::Poller;

static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#?([0-9a-fA-F]{6}|[0-9a-fA-F]{3})$").expect("hex color regex"));

/// Normalise a hex color to six lowercase digits without `#`.
///
/// `#FF0000`, `ff0000` and `#f00` all become `ff0000`.
pub fn normalize_hex(raw: &str) -> Option<String> {
    let caps = HEX_COLOR.captures(raw.trim())?;
    let digits = caps.get(1)?.as_str().to_ascii_lowercase();
    if digits.len() == 3 {
        Some(digits.chars().flat_map(|c| [c, c]).collect())
    } else {
        Some(digits)
    }
}

/// Picker bound to the section that opens it
#[derive(Clone)]
pub struct ColorPicker {
    session: Session,
    scope: Query,
}

impl ColorPicker {
    pub fn new(session: Session, scope: Query) -> Self {
        Self { session, scope }
    }

    /// Swatch that opens the picker
    pub fn swatch(&self) -> Query {
        self.scope
            .class_contains("color-bullet")
            .describe("color swatch")
    }

    /// Inline hex value shown next to the swatch
    pub fn inline_hex(&self) -> Query {
        self.scope.test_id("color-input").describe("inline hex value")
    }

    pub fn popover(&self) -> Query {
        self.session.test_id("colorpicker").describe("color picker")
    }

    pub fn hex_input(&self) -> Query {
        self.popover().test_id("hex-input").describe("picker hex input")
    }

    pub async fn open(&self) -> E2eResult<()> {
        step("open color picker", async {
            self.swatch().click().await?;
            self.popover().expect().to_be_visible().await
        })
        .await
    }

    pub async fn close(&self) -> E2eResult<()> {
        step("close color picker", async {
            self.session.press("Escape").await?;
            self.popover().expect().to_be_hidden().await
        })
        .await
    }

    /// Open the picker, type `hex` and commit it
    pub async fn set_hex(&self, hex: &str) -> E2eResult<()> {
        let digits = normalize_hex(hex)
            .ok_or_else(|| E2eError::Config(format!("not a hex color: {hex}")))?;
        step("set color", async {
            self.open().await?;
            let input = self.hex_input();
            input.fill(&digits).await?;
            input.press("Enter").await?;
            self.close().await
        })
        .await
    }

    /// Current color as six lowercase digits
    pub async fn hex(&self) -> E2eResult<String> {
        let raw = self.inline_hex().input_value().await?;
        normalize_hex(&raw).ok_or_else(|| E2eError::AssertionFailed {
            action: "read color".into(),
            query: self.inline_hex().label(),
            expected: "a hex color".into(),
            actual: raw,
        })
    }

    pub async fn expect_hex(&self, expected: &str) -> E2eResult<()> {
        let digits = normalize_hex(expected).unwrap_or_else(|| expected.to_ascii_lowercase());
        // The input may echo the value with `#` or in upper case.
        let input = self.inline_hex();
        let outcome = Poller::new(
            self.session.timeouts().assertion(),
            self.session.timeouts().poll_interval(),
        )
        .until(|| async {
            let seen = input.input_value().await?;
            Ok(normalize_hex(&seen)
                .filter(|hex| *hex == digits)
                .map(|_| ()))
        })
        .await?;
        if outcome.is_ready() {
            return Ok(());
        }
        Err(E2eError::AssertionFailed {
            action: "expect color".into(),
            query: input.label(),
            expected: digits,
            actual: input.input_value().await?,
        })
    }
}
