//! Element Query Layer
//!
//! A [`Query`] is a deferred description of how to find elements. Building
//! one never touches the page; only actions and reads resolve it. Actions
//! require exactly one match: zero matches after the action timeout is
//! `NotFound`, more than one is `Ambiguous` unless the caller indexed the
//! query with [`Query::nth`], [`Query::first`] or [`Query::last`].

use std::fmt;
use std::future::Future;
use std::path::PathBuf;

use serde_json::Value;
use tracing::{debug, Instrument};

use crate::driver::{chain_key, Action, BoundingBox, Locator, Probe};
use crate::error::{E2eError, E2eResult};
use crate::expect::Expect;
use crate::session::Session;
use crate::shortcuts::Modifier;
use crate::wait::{Polled, Poller};

#[derive(Clone)]
pub struct Query {
    session: Session,
    chain: Vec<Locator>,
    description: Option<String>,
}

impl Query {
    pub fn new(session: Session, root: Locator) -> Self {
        Self {
            session,
            chain: vec![root],
            description: None,
        }
    }

    /// Attach a human description used in failure reports
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn chain(&self) -> &[Locator] {
        &self.chain
    }

    /// Description plus the underlying chain
    pub fn label(&self) -> String {
        match &self.description {
            Some(description) => format!("{} [{}]", description, chain_key(&self.chain)),
            None => chain_key(&self.chain),
        }
    }

    fn push_step(&self, step: Locator) -> Query {
        let mut chain = self.chain.clone();
        chain.push(step);
        Query {
            session: self.session.clone(),
            chain,
            description: None,
        }
    }

    // Composition

    /// Scope a locator to this query's subtree
    pub fn locate(&self, locator: Locator) -> Query {
        self.push_step(locator)
    }

    pub fn test_id(&self, id: &str) -> Query {
        self.push_step(Locator::TestId { id: id.to_string() })
    }

    pub fn role(&self, role: &str, name: &str) -> Query {
        self.push_step(Locator::Role {
            role: role.to_string(),
            name: Some(name.to_string()),
            exact: true,
        })
    }

    pub fn role_any(&self, role: &str) -> Query {
        self.push_step(Locator::Role {
            role: role.to_string(),
            name: None,
            exact: false,
        })
    }

    pub fn text(&self, text: &str) -> Query {
        self.push_step(Locator::Text {
            text: text.to_string(),
            exact: true,
        })
    }

    pub fn css(&self, selector: &str) -> Query {
        self.push_step(Locator::Css {
            selector: selector.to_string(),
        })
    }

    pub fn class_contains(&self, fragment: &str) -> Query {
        self.push_step(Locator::ClassContains {
            fragment: fragment.to_string(),
        })
    }

    /// Keep only elements containing `text`
    pub fn filter_text(&self, text: &str) -> Query {
        self.push_step(Locator::HasText {
            text: text.to_string(),
        })
    }

    pub fn nth(&self, index: i32) -> Query {
        self.push_step(Locator::Nth { index })
    }

    pub fn first(&self) -> Query {
        self.nth(0)
    }

    pub fn last(&self) -> Query {
        self.nth(-1)
    }

    // Resolution

    /// Number of elements matching right now; never waits
    pub async fn count(&self) -> E2eResult<usize> {
        self.session.driver().count(&self.chain).await
    }

    /// Wait until exactly one element matches
    pub async fn resolve_one(&self, action: &str) -> E2eResult<()> {
        let timeouts = self.session.timeouts();
        let poller = Poller::new(timeouts.action(), timeouts.poll_interval());
        let driver = self.session.driver();
        let chain = &self.chain;

        let outcome = poller
            .until(|| async move {
                let count = driver.count(chain).await?;
                Ok((count > 0).then_some(count))
            })
            .await?;

        match outcome {
            Polled::Ready(1) => Ok(()),
            Polled::Ready(count) => Err(E2eError::Ambiguous {
                action: action.to_string(),
                query: self.label(),
                count,
            }),
            Polled::TimedOut { .. } => Err(E2eError::NotFound {
                action: action.to_string(),
                query: self.label(),
                timeout_ms: timeouts.action_ms,
            }),
        }
    }

    async fn perform(&self, action: Action) -> E2eResult<()> {
        let name = action.name();
        self.resolve_one(name).await?;
        debug!("{} {}", name, self.label());
        self.session.driver().perform(&self.chain, &action).await
    }

    async fn probe(&self, action: &str, probe: Probe) -> E2eResult<Value> {
        self.resolve_one(action).await?;
        self.session.driver().inspect(&self.chain, &probe).await
    }

    // Actions

    pub async fn click(&self) -> E2eResult<()> {
        self.perform(Action::click()).await
    }

    pub async fn right_click(&self) -> E2eResult<()> {
        self.perform(Action::right_click()).await
    }

    pub async fn double_click(&self) -> E2eResult<()> {
        self.perform(Action::double_click()).await
    }

    pub async fn click_with(&self, modifiers: Vec<Modifier>) -> E2eResult<()> {
        self.perform(Action::Click {
            button: Default::default(),
            click_count: 1,
            modifiers,
        })
        .await
    }

    pub async fn fill(&self, value: &str) -> E2eResult<()> {
        self.perform(Action::Fill {
            value: value.to_string(),
        })
        .await
    }

    pub async fn clear(&self) -> E2eResult<()> {
        self.perform(Action::Clear).await
    }

    pub async fn hover(&self) -> E2eResult<()> {
        self.perform(Action::Hover).await
    }

    pub async fn focus(&self) -> E2eResult<()> {
        self.perform(Action::Focus).await
    }

    pub async fn press(&self, key: &str) -> E2eResult<()> {
        self.perform(Action::Press {
            key: key.to_string(),
        })
        .await
    }

    pub async fn type_text(&self, text: &str) -> E2eResult<()> {
        self.perform(Action::Type {
            text: text.to_string(),
            delay_ms: 20,
        })
        .await
    }

    pub async fn check(&self) -> E2eResult<()> {
        self.perform(Action::Check).await
    }

    pub async fn uncheck(&self) -> E2eResult<()> {
        self.perform(Action::Uncheck).await
    }

    pub async fn select_option(&self, value: &str) -> E2eResult<()> {
        self.perform(Action::SelectOption {
            value: value.to_string(),
        })
        .await
    }

    /// Answer the file chooser this element opens with `paths`
    pub async fn set_input_files(&self, paths: Vec<PathBuf>) -> E2eResult<()> {
        self.perform(Action::SetInputFiles { paths }).await
    }

    pub async fn drag_to(&self, target: &Query) -> E2eResult<()> {
        target.resolve_one("drag target").await?;
        self.perform(Action::DragTo {
            target: target.chain.clone(),
        })
        .await
    }

    pub async fn scroll_into_view(&self) -> E2eResult<()> {
        self.perform(Action::ScrollIntoView).await
    }

    // Reads

    pub async fn text_content(&self) -> E2eResult<String> {
        let value = self.probe("read text", Probe::Text).await?;
        Ok(value_to_string(&value))
    }

    pub async fn input_value(&self) -> E2eResult<String> {
        let value = self.probe("read value", Probe::InputValue).await?;
        Ok(value_to_string(&value))
    }

    pub async fn attribute(&self, name: &str) -> E2eResult<Option<String>> {
        let value = self
            .probe(
                "read attribute",
                Probe::Attribute {
                    name: name.to_string(),
                },
            )
            .await?;
        Ok(match value {
            Value::Null => None,
            other => Some(value_to_string(&other)),
        })
    }

    /// Whether exactly one match exists and is visible; never waits
    pub async fn is_visible(&self) -> E2eResult<bool> {
        let driver = self.session.driver();
        if driver.count(&self.chain).await? != 1 {
            return Ok(false);
        }
        let value = driver.inspect(&self.chain, &Probe::Visible).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    pub async fn is_enabled(&self) -> E2eResult<bool> {
        let value = self.probe("read enabled", Probe::Enabled).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    pub async fn bounding_box(&self) -> E2eResult<BoundingBox> {
        let value = self.probe("measure", Probe::BoundingBox).await?;
        serde_json::from_value(value.clone()).map_err(|_| {
            E2eError::Driver(format!("{} has no bounding box (got {})", self.label(), value))
        })
    }

    pub async fn computed_style(&self, property: &str) -> E2eResult<String> {
        let value = self
            .probe(
                "read style",
                Probe::ComputedStyle {
                    property: property.to_string(),
                },
            )
            .await?;
        Ok(value_to_string(&value))
    }

    /// Polling assertions with the session's assertion timeout
    pub fn expect(&self) -> Expect {
        Expect::new(self.clone())
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&chain_key(&self.chain))
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("chain", &chain_key(&self.chain))
            .field("description", &self.description)
            .finish()
    }
}

pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Run one semantic operation; failures inside it report `action` first.
pub async fn step<T, F>(action: &str, fut: F) -> E2eResult<T>
where
    F: Future<Output = E2eResult<T>>,
{
    debug!("step: {}", action);
    fut.instrument(tracing::debug_span!("step", action))
        .await
        .map_err(|err| within_step(action, err))
}

fn within_step(outer: &str, err: E2eError) -> E2eError {
    let nest = |inner: String| format!("{outer} › {inner}");
    match err {
        E2eError::NotFound {
            action,
            query,
            timeout_ms,
        } => E2eError::NotFound {
            action: nest(action),
            query,
            timeout_ms,
        },
        E2eError::Ambiguous {
            action,
            query,
            count,
        } => E2eError::Ambiguous {
            action: nest(action),
            query,
            count,
        },
        E2eError::AssertionFailed {
            action,
            query,
            expected,
            actual,
        } => E2eError::AssertionFailed {
            action: nest(action),
            query,
            expected,
            actual,
        },
        other => other,
    }
}
