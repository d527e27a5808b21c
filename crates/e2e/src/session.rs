//! Per-test browser session handle

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::config::{HarnessConfig, Timeouts};
use crate::driver::{Browser, Driver, KeyInput, Locator, MouseButton, MouseInput, PlaywrightConfig, PlaywrightDriver};
use crate::error::E2eResult;
use crate::query::Query;
use crate::shortcuts::{self, Command, KeyCombo, Platform};

/// The active browser session plus the configuration it was opened with.
///
/// Cheap to clone; every component and facade holds one. Constructed once per
/// test by a [`SessionFactory`] and never shared across tests.
#[derive(Clone)]
pub struct Session {
    driver: Arc<dyn Driver>,
    config: Arc<HarnessConfig>,
}

impl Session {
    pub fn new(driver: Arc<dyn Driver>, config: Arc<HarnessConfig>) -> Self {
        Self { driver, config }
    }

    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.config.timeouts
    }

    pub fn browser(&self) -> Browser {
        self.driver.browser()
    }

    pub fn platform(&self) -> Platform {
        self.config.platform()
    }

    // Query roots

    pub fn locate(&self, locator: Locator) -> Query {
        Query::new(self.clone(), locator)
    }

    pub fn test_id(&self, id: &str) -> Query {
        self.locate(Locator::TestId { id: id.to_string() })
    }

    pub fn role(&self, role: &str, name: &str) -> Query {
        self.locate(Locator::Role {
            role: role.to_string(),
            name: Some(name.to_string()),
            exact: true,
        })
    }

    pub fn text(&self, text: &str) -> Query {
        self.locate(Locator::Text {
            text: text.to_string(),
            exact: true,
        })
    }

    pub fn css(&self, selector: &str) -> Query {
        self.locate(Locator::Css {
            selector: selector.to_string(),
        })
    }

    /// Last-resort lookup by a stable fragment of a generated class name
    pub fn class_contains(&self, fragment: &str) -> Query {
        self.locate(Locator::ClassContains {
            fragment: fragment.to_string(),
        })
    }

    pub fn label(&self, text: &str) -> Query {
        self.locate(Locator::Label {
            text: text.to_string(),
        })
    }

    pub fn placeholder(&self, text: &str) -> Query {
        self.locate(Locator::Placeholder {
            text: text.to_string(),
        })
    }

    // Page-level input

    /// Navigate to a path relative to the product base URL (or an absolute URL)
    pub async fn goto(&self, path: &str) -> E2eResult<()> {
        let url = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!(
                "{}/{}",
                self.config.base_url.trim_end_matches('/'),
                path.trim_start_matches('/')
            )
        };
        debug!("goto {}", url);
        self.driver.goto(&url, self.timeouts().navigation()).await
    }

    pub async fn current_url(&self) -> E2eResult<String> {
        self.driver.current_url().await
    }

    /// Combination `command` resolves to in this session
    pub fn shortcut(&self, command: Command) -> KeyCombo {
        shortcuts::resolve(command, self.platform(), self.browser())
    }

    pub async fn press_shortcut(&self, command: Command) -> E2eResult<()> {
        let combo = self.shortcut(command);
        debug!("shortcut {:?} -> {}", command, combo);
        self.press(&combo.to_string()).await
    }

    pub async fn press(&self, combo: &str) -> E2eResult<()> {
        self.driver
            .keyboard(&KeyInput::Press {
                combo: combo.to_string(),
            })
            .await
    }

    pub async fn type_text(&self, text: &str) -> E2eResult<()> {
        self.driver
            .keyboard(&KeyInput::Type {
                text: text.to_string(),
            })
            .await
    }

    /// Press, move in steps, release; used to draw on the canvas
    pub async fn drag(&self, from: (f64, f64), to: (f64, f64)) -> E2eResult<()> {
        let driver = self.driver();
        driver
            .mouse(&MouseInput::Move {
                x: from.0,
                y: from.1,
                steps: 1,
            })
            .await?;
        driver
            .mouse(&MouseInput::Down {
                button: MouseButton::Left,
            })
            .await?;
        driver
            .mouse(&MouseInput::Move {
                x: to.0,
                y: to.1,
                steps: 10,
            })
            .await?;
        driver
            .mouse(&MouseInput::Up {
                button: MouseButton::Left,
            })
            .await
    }

    pub async fn click_at(&self, x: f64, y: f64) -> E2eResult<()> {
        self.driver
            .mouse(&MouseInput::Click {
                x,
                y,
                button: MouseButton::Left,
            })
            .await
    }

    pub async fn close(&self) -> E2eResult<()> {
        self.driver.close().await
    }
}

/// Opens one fresh session per test
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> E2eResult<Session>;
}

/// Launches a Playwright-driven browser for every session
pub struct PlaywrightSessions {
    config: Arc<HarnessConfig>,
}

impl PlaywrightSessions {
    pub fn new(config: Arc<HarnessConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionFactory for PlaywrightSessions {
    async fn open(&self) -> E2eResult<Session> {
        let driver = PlaywrightDriver::launch(PlaywrightConfig::from_harness(&self.config)).await?;
        Ok(Session::new(Arc::new(driver), self.config.clone()))
    }
}

/// Resolve a path under the configured output directory, creating parents
pub(crate) fn output_path(session: &Session, relative: &Path) -> E2eResult<std::path::PathBuf> {
    let path = session.config().output_dir.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(path)
}
