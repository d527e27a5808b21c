//! Studio E2E Harness
//!
//! Drives a real browser against a running Studio instance and asserts on
//! rendered state. The harness makes scenarios safe to run concurrently
//! against one shared multi-tenant backend:
//! - every test works inside its own disposable team
//! - assertions wait for the product's save indicator instead of racing it
//! - UI regions are modelled once as components and composed into pages
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 SuiteRunner (workers × tasks)               │
//! │    ├── SessionFactory::open() -> Session                    │
//! │    ├── TenantManager::create() / delete_team()              │
//! │    └── Scenario(ScenarioContext) -> E2eResult<()>           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Page facades        BasePage ─ DashboardPage / Workspace   │
//! │                      TokensPage, HistoryPage (has-a)        │
//! │  Components          TeamMenu, FileGrid, ColorPicker, ...   │
//! │  Protocols           SaveSync, VisualTester, shortcuts      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Query / Expect      deferred locator chains, polling       │
//! │  Driver              Playwright (node, JSON lines) | Mock   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod components;
pub mod config;
pub mod driver;
pub mod env;
pub mod error;
pub mod expect;
pub mod fixtures;
pub mod pages;
pub mod query;
pub mod runner;
pub mod save;
pub mod scenarios;
pub mod server;
pub mod session;
pub mod shortcuts;
pub mod tenant;
pub mod visual;
pub mod wait;

pub use config::HarnessConfig;
pub use driver::{Browser, Driver, MockDriver, PlaywrightDriver};
pub use error::{E2eError, E2eResult, FailureKind};
pub use query::{step, Query};
pub use runner::{Filter, Group, Scenario, ScenarioContext, Suite, SuiteRunner, TestSuiteResult};
pub use save::{SaveState, SaveSync, SyncPolicy};
pub use session::{PlaywrightSessions, Session, SessionFactory};
pub use shortcuts::{Command, KeyCombo, Platform};
pub use tenant::{TeamName, TeamSpec, Tenant, TenantManager};
pub use visual::{Mask, Tolerance, VisualTester};
