//! Browser automation boundary
//!
//! Nothing outside this module talks to a browser. The query layer and the
//! visual layer call into a [`Driver`]; everything above them goes through
//! those two.

pub mod mock;
pub mod playwright;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};
use crate::shortcuts::Modifier;

pub use mock::MockDriver;
pub use playwright::{PlaywrightConfig, PlaywrightDriver};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" | "safari" => Ok(Browser::Webkit),
            other => Err(E2eError::Config(format!("unknown browser engine '{other}'"))),
        }
    }
}

/// One step of an element query chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Locator {
    Role {
        role: String,
        name: Option<String>,
        exact: bool,
    },
    Text {
        text: String,
        exact: bool,
    },
    TestId {
        id: String,
    },
    Css {
        selector: String,
    },
    /// Elements whose class attribute contains a stable fragment
    ClassContains {
        fragment: String,
    },
    Label {
        text: String,
    },
    Placeholder {
        text: String,
    },
    /// Filter the previous step to elements containing text
    HasText {
        text: String,
    },
    /// Pick one element of the previous step; negative counts from the end
    Nth {
        index: i32,
    },
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Role { role, name: None, .. } => write!(f, "role={role}"),
            Locator::Role {
                role,
                name: Some(name),
                exact,
            } => {
                if *exact {
                    write!(f, "role={role}[name=\"{name}\" exact]")
                } else {
                    write!(f, "role={role}[name=\"{name}\"]")
                }
            }
            Locator::Text { text, exact: true } => write!(f, "text=\"{text}\""),
            Locator::Text { text, exact: false } => write!(f, "text={text}"),
            Locator::TestId { id } => write!(f, "testid={id}"),
            Locator::Css { selector } => write!(f, "css={selector}"),
            Locator::ClassContains { fragment } => write!(f, "css=[class*=\"{fragment}\"]"),
            Locator::Label { text } => write!(f, "label={text}"),
            Locator::Placeholder { text } => write!(f, "placeholder={text}"),
            Locator::HasText { text } => write!(f, "has-text=\"{text}\""),
            Locator::Nth { index } => write!(f, "nth={index}"),
        }
    }
}

/// Canonical string form of a chain, e.g. `testid=layers >> has-text="Rect" >> nth=0`
pub fn chain_key(chain: &[Locator]) -> String {
    chain
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" >> ")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

/// An input applied to a single resolved element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Click {
        button: MouseButton,
        click_count: u32,
        modifiers: Vec<Modifier>,
    },
    Fill {
        value: String,
    },
    Clear,
    Hover,
    Focus,
    Press {
        key: String,
    },
    Type {
        text: String,
        delay_ms: u64,
    },
    Check,
    Uncheck,
    SelectOption {
        value: String,
    },
    /// Answer the file chooser the element opens
    SetInputFiles {
        paths: Vec<PathBuf>,
    },
    DragTo {
        target: Vec<Locator>,
    },
    ScrollIntoView,
}

impl Action {
    pub fn click() -> Self {
        Action::Click {
            button: MouseButton::Left,
            click_count: 1,
            modifiers: Vec::new(),
        }
    }

    pub fn right_click() -> Self {
        Action::Click {
            button: MouseButton::Right,
            click_count: 1,
            modifiers: Vec::new(),
        }
    }

    pub fn double_click() -> Self {
        Action::Click {
            button: MouseButton::Left,
            click_count: 2,
            modifiers: Vec::new(),
        }
    }

    /// Short name used in logs and by the mock driver's hooks
    pub fn name(&self) -> &'static str {
        match self {
            Action::Click {
                button: MouseButton::Right,
                ..
            } => "right_click",
            Action::Click { click_count: 2, .. } => "double_click",
            Action::Click { .. } => "click",
            Action::Fill { .. } => "fill",
            Action::Clear => "clear",
            Action::Hover => "hover",
            Action::Focus => "focus",
            Action::Press { .. } => "press",
            Action::Type { .. } => "type",
            Action::Check => "check",
            Action::Uncheck => "uncheck",
            Action::SelectOption { .. } => "select_option",
            Action::SetInputFiles { .. } => "set_input_files",
            Action::DragTo { .. } => "drag_to",
            Action::ScrollIntoView => "scroll_into_view",
        }
    }
}

/// A read of live element state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Probe {
    Text,
    InputValue,
    Attribute { name: String },
    Visible,
    Enabled,
    BoundingBox,
    ComputedStyle { property: String },
}

/// Page-level keyboard input, independent of any element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KeyInput {
    /// A combination in `Modifier+Key` form, e.g. `Meta+C`
    Press { combo: String },
    Type { text: String },
    Down { key: String },
    Up { key: String },
}

/// Page-level mouse input in viewport coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MouseInput {
    Move { x: f64, y: f64, steps: u32 },
    Down { button: MouseButton },
    Up { button: MouseButton },
    Click { x: f64, y: f64, button: MouseButton },
    Wheel { delta_x: f64, delta_y: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Live browser session primitives.
///
/// Implementations resolve chains lazily at call time. `count` never waits;
/// waiting is the caller's job (see [`crate::wait::Poller`]). `inspect` on a
/// chain that matches nothing returns `Value::Null` (or `false` for
/// [`Probe::Visible`]).
#[async_trait]
pub trait Driver: Send + Sync {
    /// Engine behind this session
    fn browser(&self) -> Browser;

    async fn goto(&self, url: &str, timeout: Duration) -> E2eResult<()>;

    async fn current_url(&self) -> E2eResult<String>;

    async fn count(&self, chain: &[Locator]) -> E2eResult<usize>;

    async fn perform(&self, chain: &[Locator], action: &Action) -> E2eResult<()>;

    async fn inspect(&self, chain: &[Locator], probe: &Probe) -> E2eResult<serde_json::Value>;

    async fn keyboard(&self, input: &KeyInput) -> E2eResult<()>;

    async fn mouse(&self, input: &MouseInput) -> E2eResult<()>;

    /// PNG bytes of the element (or the viewport when `chain` is None)
    async fn screenshot(&self, chain: Option<&[Locator]>) -> E2eResult<Vec<u8>>;

    async fn close(&self) -> E2eResult<()>;
}
