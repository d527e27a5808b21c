//! Logical keyboard commands resolved per platform and browser engine
//!
//! Resolution order is always "engine override for this platform, else the
//! platform default". WebKit on macOS swallows a few Option/Command chords
//! (Option+letter composes a character, Command+Shift+R opens Reader), so
//! those commands carry WebKit-specific overrides.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::driver::Browser;
use crate::error::{E2eError, E2eResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    MacOs,
    Linux,
    Windows,
}

impl Platform {
    /// Platform of the machine running the browser
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Linux
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::MacOs => "macos",
            Platform::Linux => "linux",
            Platform::Windows => "windows",
        }
    }

    /// The modifier behind copy/paste/undo on this platform
    pub fn primary_modifier(&self) -> Modifier {
        match self {
            Platform::MacOs => Modifier::Meta,
            Platform::Linux | Platform::Windows => Modifier::Control,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "macos" | "darwin" | "mac" => Ok(Platform::MacOs),
            "linux" => Ok(Platform::Linux),
            "windows" | "win32" => Ok(Platform::Windows),
            other => Err(E2eError::Config(format!("unknown platform '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modifier {
    Control,
    Alt,
    Shift,
    Meta,
}

impl Modifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modifier::Control => "Control",
            Modifier::Alt => "Alt",
            Modifier::Shift => "Shift",
            Modifier::Meta => "Meta",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "Control" | "Ctrl" => Some(Modifier::Control),
            "Alt" | "Option" => Some(Modifier::Alt),
            "Shift" => Some(Modifier::Shift),
            "Meta" | "Cmd" | "Command" => Some(Modifier::Meta),
            _ => None,
        }
    }
}

/// A physical key combination in Playwright's `Modifier+Key` notation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub modifiers: Vec<Modifier>,
    pub key: String,
}

impl KeyCombo {
    pub fn new(modifiers: Vec<Modifier>, key: impl Into<String>) -> Self {
        Self {
            modifiers,
            key: key.into(),
        }
    }

    pub fn parse(combo: &str) -> E2eResult<Self> {
        let mut parts: Vec<&str> = combo.split('+').map(str::trim).collect();
        let key = match parts.pop() {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => return Err(E2eError::Config(format!("empty key in combo '{combo}'"))),
        };
        let modifiers = parts
            .into_iter()
            .map(|m| {
                Modifier::parse(m)
                    .ok_or_else(|| E2eError::Config(format!("unknown modifier '{m}' in '{combo}'")))
            })
            .collect::<E2eResult<Vec<_>>>()?;
        Ok(Self { modifiers, key })
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            write!(f, "{}+", modifier.as_str())?;
        }
        f.write_str(&self.key)
    }
}

/// Editor commands that scenarios trigger from the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Copy,
    Paste,
    Cut,
    Undo,
    Redo,
    SelectAll,
    Duplicate,
    Delete,
    Group,
    Ungroup,
    CreateComponent,
    ToggleRulers,
    ToggleLayers,
    ToggleHistory,
    ToggleAssets,
    ToggleTokens,
    Escape,
    RectangleTool,
    EllipseTool,
    BoardTool,
    TextTool,
}

impl Command {
    pub const ALL: [Command; 21] = [
        Command::Copy,
        Command::Paste,
        Command::Cut,
        Command::Undo,
        Command::Redo,
        Command::SelectAll,
        Command::Duplicate,
        Command::Delete,
        Command::Group,
        Command::Ungroup,
        Command::CreateComponent,
        Command::ToggleRulers,
        Command::ToggleLayers,
        Command::ToggleHistory,
        Command::ToggleAssets,
        Command::ToggleTokens,
        Command::Escape,
        Command::RectangleTool,
        Command::EllipseTool,
        Command::BoardTool,
        Command::TextTool,
    ];

    /// Default combination on a platform, before engine overrides
    fn platform_default(self, platform: Platform) -> KeyCombo {
        use Modifier::{Alt, Shift};

        let primary = platform.primary_modifier();
        match self {
            Command::Copy => KeyCombo::new(vec![primary], "C"),
            Command::Paste => KeyCombo::new(vec![primary], "V"),
            Command::Cut => KeyCombo::new(vec![primary], "X"),
            Command::Undo => KeyCombo::new(vec![primary], "Z"),
            Command::Redo => KeyCombo::new(vec![primary, Shift], "Z"),
            Command::SelectAll => KeyCombo::new(vec![primary], "A"),
            Command::Duplicate => KeyCombo::new(vec![primary], "D"),
            Command::Delete => KeyCombo::new(vec![], "Delete"),
            Command::Group => KeyCombo::new(vec![primary], "G"),
            Command::Ungroup => KeyCombo::new(vec![Shift], "G"),
            Command::CreateComponent => KeyCombo::new(vec![primary], "K"),
            Command::ToggleRulers => KeyCombo::new(vec![primary, Shift], "R"),
            Command::ToggleLayers => KeyCombo::new(vec![Alt], "L"),
            Command::ToggleHistory => KeyCombo::new(vec![Alt], "H"),
            Command::ToggleAssets => KeyCombo::new(vec![Alt], "I"),
            Command::ToggleTokens => KeyCombo::new(vec![Alt], "T"),
            Command::Escape => KeyCombo::new(vec![], "Escape"),
            Command::RectangleTool => KeyCombo::new(vec![], "R"),
            Command::EllipseTool => KeyCombo::new(vec![], "E"),
            Command::BoardTool => KeyCombo::new(vec![], "B"),
            Command::TextTool => KeyCombo::new(vec![], "T"),
        }
    }
}

static ENGINE_OVERRIDES: Lazy<HashMap<(Platform, Browser, Command), KeyCombo>> = Lazy::new(|| {
    use Modifier::{Alt, Meta};

    let webkit_mac = |command, combo| ((Platform::MacOs, Browser::Webkit, command), combo);
    HashMap::from([
        webkit_mac(Command::ToggleRulers, KeyCombo::new(vec![Meta, Alt], "R")),
        webkit_mac(Command::ToggleLayers, KeyCombo::new(vec![Meta, Alt], "L")),
        webkit_mac(Command::ToggleHistory, KeyCombo::new(vec![Meta, Alt], "H")),
        webkit_mac(Command::ToggleAssets, KeyCombo::new(vec![Meta, Alt], "I")),
        webkit_mac(Command::ToggleTokens, KeyCombo::new(vec![Meta, Alt], "T")),
    ])
});

/// Resolve `command` for the given platform and engine
pub fn resolve(command: Command, platform: Platform, browser: Browser) -> KeyCombo {
    ENGINE_OVERRIDES
        .get(&(platform, browser, command))
        .cloned()
        .unwrap_or_else(|| command.platform_default(platform))
}
