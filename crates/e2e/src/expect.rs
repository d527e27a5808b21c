//! Polling assertions
//!
//! Every assertion re-reads the page until its condition holds or the
//! timeout passes. The timeout is part of the call: it defaults to the
//! session's assertion timeout and is overridden with [`Expect::within`].
//! On expiry the assertion fails with `AssertionFailed` carrying the last
//! value it observed.

use std::future::Future;
use std::time::Duration;

use crate::driver::Probe;
use crate::error::{E2eError, E2eResult};
use crate::query::{value_to_string, Query};
use crate::wait::{Polled, Poller};

/// What one poll saw
struct Observation {
    holds: bool,
    actual: String,
}

pub struct Expect {
    query: Query,
    timeout: Duration,
    interval: Duration,
}

impl Expect {
    pub fn new(query: Query) -> Self {
        let timeouts = query.session().timeouts();
        Self {
            timeout: timeouts.assertion(),
            interval: timeouts.poll_interval(),
            query,
        }
    }

    pub fn within(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn poll<F, Fut>(&self, assertion: &str, expected: String, observe: F) -> E2eResult<()>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = E2eResult<Observation>>,
    {
        let poller = Poller::new(self.timeout, self.interval);
        let outcome = poller
            .until(|| {
                let next = observe();
                async move {
                    let observation = next.await?;
                    Ok(observation.holds.then_some(()))
                }
            })
            .await?;

        match outcome {
            Polled::Ready(()) => Ok(()),
            Polled::TimedOut { .. } => {
                let last = observe().await?;
                Err(E2eError::AssertionFailed {
                    action: assertion.to_string(),
                    query: self.query.label(),
                    expected,
                    actual: last.actual,
                })
            }
        }
    }

    /// Single-element probe; reports the match count while it is not one
    async fn observe_one(&self, probe: &Probe) -> E2eResult<Result<String, String>> {
        let driver = self.query.session().driver();
        let chain = self.query.chain();
        match driver.count(chain).await? {
            1 => {
                let value = driver.inspect(chain, probe).await?;
                Ok(Ok(value_to_string(&value)))
            }
            count => Ok(Err(format!("{count} matching elements"))),
        }
    }

    /// Visibility of the single match; `None` when the count is not one
    async fn observe_visible(&self) -> E2eResult<(usize, Option<bool>)> {
        let driver = self.query.session().driver();
        let chain = self.query.chain();
        let count = driver.count(chain).await?;
        if count != 1 {
            return Ok((count, None));
        }
        let value = driver.inspect(chain, &Probe::Visible).await?;
        Ok((1, Some(value.as_bool().unwrap_or(false))))
    }

    pub async fn to_be_visible(&self) -> E2eResult<()> {
        self.poll("expect visible", "visible".into(), || async {
            let (count, visible) = self.observe_visible().await?;
            Ok(match visible {
                Some(visible) => Observation {
                    holds: visible,
                    actual: if visible { "visible" } else { "not visible" }.into(),
                },
                None => Observation {
                    holds: false,
                    actual: format!("{count} matching elements"),
                },
            })
        })
        .await
    }

    /// Holds when nothing matches or the single match is hidden.
    ///
    /// Several matches never hold, whatever their visibility.
    pub async fn to_be_hidden(&self) -> E2eResult<()> {
        self.poll("expect hidden", "hidden".into(), || async {
            let (count, visible) = self.observe_visible().await?;
            Ok(match (count, visible) {
                (0, _) => Observation {
                    holds: true,
                    actual: "0 matching elements".into(),
                },
                (_, Some(visible)) => Observation {
                    holds: !visible,
                    actual: if visible { "visible" } else { "not visible" }.into(),
                },
                (count, None) => Observation {
                    holds: false,
                    actual: format!("{count} matching elements"),
                },
            })
        })
        .await
    }

    pub async fn to_have_count(&self, expected: usize) -> E2eResult<()> {
        self.poll("expect count", expected.to_string(), || async {
            let count = self.query.count().await?;
            Ok(Observation {
                holds: count == expected,
                actual: count.to_string(),
            })
        })
        .await
    }

    pub async fn to_have_text(&self, expected: &str) -> E2eResult<()> {
        self.poll("expect text", format!("text \"{expected}\""), || async {
            Ok(match self.observe_one(&Probe::Text).await? {
                Ok(text) => Observation {
                    holds: text.trim() == expected,
                    actual: format!("text \"{}\"", text.trim()),
                },
                Err(actual) => Observation {
                    holds: false,
                    actual,
                },
            })
        })
        .await
    }

    pub async fn to_contain_text(&self, expected: &str) -> E2eResult<()> {
        self.poll("expect text", format!("text containing \"{expected}\""), || async {
            Ok(match self.observe_one(&Probe::Text).await? {
                Ok(text) => Observation {
                    holds: text.contains(expected),
                    actual: format!("text \"{text}\""),
                },
                Err(actual) => Observation {
                    holds: false,
                    actual,
                },
            })
        })
        .await
    }

    pub async fn to_have_value(&self, expected: &str) -> E2eResult<()> {
        self.poll("expect value", format!("value \"{expected}\""), || async {
            Ok(match self.observe_one(&Probe::InputValue).await? {
                Ok(value) => Observation {
                    holds: value == expected,
                    actual: format!("value \"{value}\""),
                },
                Err(actual) => Observation {
                    holds: false,
                    actual,
                },
            })
        })
        .await
    }

    pub async fn to_have_attribute(&self, name: &str, expected: &str) -> E2eResult<()> {
        let probe = Probe::Attribute {
            name: name.to_string(),
        };
        self.poll("expect attribute", format!("{name}=\"{expected}\""), || async {
            Ok(match self.observe_one(&probe).await? {
                Ok(value) => Observation {
                    holds: value == expected,
                    actual: format!("{name}=\"{value}\""),
                },
                Err(actual) => Observation {
                    holds: false,
                    actual,
                },
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::MockDriver;

    #[tokio::test]
    async fn text_assertion_waits_for_update() {
        let mock = MockDriver::new();
        let session = mock.session_with_timeouts(1_000);
        let name = session.test_id("file-name");
        let key = name.to_string();
        mock.set_text(&key, "New File 1");
        mock.push_attribute_timeline(&key, "title", &[Some("a"), Some("b")]);

        let renamer = mock.clone();
        let rename_key = key.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            renamer.set_text(&rename_key, "test");
        });

        name.expect().to_have_text("test").await.unwrap();
        name.expect().to_have_attribute("title", "b").await.unwrap();
    }

    #[tokio::test]
    async fn failure_reports_last_observed_value() {
        let mock = MockDriver::new();
        let session = mock.session_with_timeouts(100);
        let name = session.test_id("file-name").describe("displayed file name");
        mock.set_text(&name.to_string(), "draft");

        let err = name.expect().to_have_text("test").await.unwrap_err();
        match err {
            E2eError::AssertionFailed {
                expected, actual, ..
            } => {
                assert_eq!(expected, "text \"test\"");
                assert_eq!(actual, "text \"draft\"");
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[tokio::test]
    async fn hidden_holds_for_missing_element() {
        let mock = MockDriver::new();
        let session = mock.session_with_timeouts(100);
        session.test_id("modal").expect().to_be_hidden().await.unwrap();
        session
            .test_id("modal")
            .expect()
            .to_have_count(0)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn hidden_fails_while_several_elements_match() {
        let mock = MockDriver::new();
        let session = mock.session_with_timeouts(100);
        let loaders = session.test_id("loader").describe("loading indicator");
        mock.set_count(&loaders.to_string(), 2);

        let err = loaders.expect().to_be_hidden().await.unwrap_err();
        match err {
            E2eError::AssertionFailed { actual, .. } => {
                assert_eq!(actual, "2 matching elements")
            }
            other => panic!("unexpected {other}"),
        }

        let err = loaders.expect().to_be_visible().await.unwrap_err();
        match err {
            E2eError::AssertionFailed { actual, .. } => {
                assert_eq!(actual, "2 matching elements")
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[tokio::test]
    async fn hidden_holds_for_single_invisible_match() {
        let mock = MockDriver::new();
        let session = mock.session_with_timeouts(100);
        let modal = session.test_id("modal");
        let key = modal.to_string();
        mock.set_count(&key, 1);
        mock.with_dom(|dom| dom.set_visible(&key, false));

        modal.expect().to_be_hidden().await.unwrap();
        assert!(modal.expect().to_be_visible().await.is_err());
    }
}
