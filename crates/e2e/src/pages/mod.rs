//! Page facades
//!
//! ```text
//! BasePage ─┬─ DashboardPage   (Deref: is-a authenticated screen)
//!           └─ WorkspacePage   (Deref: is-a authenticated screen)
//!                 ├─ TokensPage   (has-a WorkspacePage)
//!                 └─ HistoryPage  (has-a WorkspacePage)
//! LoginPage                      (has-a Session)
//! ```
//!
//! Facades are built fresh per test from that test's [`Session`](crate::session::Session).

mod base;
mod dashboard;
mod history;
mod login;
mod tokens;
mod workspace;

pub use base::BasePage;
pub use dashboard::DashboardPage;
pub use history::HistoryPage;
pub use login::LoginPage;
pub use tokens::TokensPage;
pub use workspace::WorkspacePage;
