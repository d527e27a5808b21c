//! Login screen

use crate::env::Credentials;
use crate::error::E2eResult;
use crate::query::{step, Query};
use crate::session::Session;

/// Login is not an authenticated screen, so it holds the session directly
#[derive(Clone)]
pub struct LoginPage {
    session: Session,
}

impl LoginPage {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn email_input(&self) -> Query {
        self.session.test_id("email-input").describe("email input")
    }

    pub fn password_input(&self) -> Query {
        self.session
            .test_id("password-input")
            .describe("password input")
    }

    pub fn submit_button(&self) -> Query {
        self.session.test_id("login-submit").describe("login button")
    }

    pub fn error_banner(&self) -> Query {
        self.session.test_id("login-banner").describe("login error")
    }

    pub async fn open(&self) -> E2eResult<()> {
        step("open login page", async {
            self.session.goto("/#/auth/login").await?;
            self.email_input().expect().to_be_visible().await
        })
        .await
    }

    pub async fn login(&self, credentials: &Credentials) -> E2eResult<()> {
        step(&format!("log in as {}", credentials.email), async {
            self.email_input().fill(&credentials.email).await?;
            self.password_input().fill(&credentials.password).await?;
            self.submit_button().click().await?;
            self.email_input()
                .expect()
                .within(self.session.timeouts().navigation())
                .to_be_hidden()
                .await
        })
        .await
    }

    /// Log in as preprovisioned user `slot`, reading its credentials now
    pub async fn login_as(&self, slot: u8) -> E2eResult<()> {
        let credentials = Credentials::from_env(slot)?;
        self.open().await?;
        self.login(&credentials).await
    }

    pub async fn expect_error(&self, text: &str) -> E2eResult<()> {
        self.error_banner().expect().to_contain_text(text).await
    }
}
