//! Scripted in-memory driver
//!
//! Elements are keyed by the canonical chain string (see
//! [`chain_key`](super::chain_key)), so tests build the key from the same
//! query a component uses: `mock.set_count(&header.save_indicator().to_string(), 1)`.
//! Hooks mutate the fake DOM in response to actions, which is enough to
//! exercise the harness's own protocols without a browser.

use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::{ImageOutputFormat, Rgba, RgbaImage};
use parking_lot::Mutex;
use serde_json::Value;

use super::{chain_key, Action, BoundingBox, Browser, Driver, KeyInput, Locator, MouseInput, Probe};
use crate::config::HarnessConfig;
use crate::error::{E2eError, E2eResult};
use crate::session::Session;

/// Key used for viewport screenshots
pub const VIEWPORT: &str = "viewport";

#[derive(Debug, Clone)]
pub struct MockElement {
    pub count: usize,
    pub text: String,
    pub value: String,
    pub visible: bool,
    pub enabled: bool,
    pub attributes: HashMap<String, String>,
    pub styles: HashMap<String, String>,
    pub bounding_box: Option<BoundingBox>,
}

impl Default for MockElement {
    fn default() -> Self {
        Self {
            count: 1,
            text: String::new(),
            value: String::new(),
            visible: true,
            enabled: true,
            attributes: HashMap::new(),
            styles: HashMap::new(),
            bounding_box: None,
        }
    }
}

/// Everything the mock observed, in order
#[derive(Debug, Clone, PartialEq)]
pub enum MockEvent {
    Goto(String),
    Action { target: String, action: Action },
    Key(KeyInput),
    Mouse(MouseInput),
    Screenshot(String),
    Close,
}

/// The fake page state hooks operate on
#[derive(Default)]
pub struct MockDom {
    elements: HashMap<String, MockElement>,
    pending: HashMap<String, (usize, usize)>,
    timelines: HashMap<(String, String), VecDeque<Option<String>>>,
    screenshots: HashMap<String, Vec<u8>>,
    url: String,
    events: Vec<MockEvent>,
}

impl MockDom {
    pub fn element(&self, key: &str) -> Option<&MockElement> {
        self.elements.get(key).filter(|e| e.count > 0)
    }

    pub fn element_mut(&mut self, key: &str) -> &mut MockElement {
        self.elements.entry(key.to_string()).or_default()
    }

    pub fn set_count(&mut self, key: &str, count: usize) {
        self.element_mut(key).count = count;
    }

    pub fn set_text(&mut self, key: &str, text: &str) {
        self.element_mut(key).text = text.to_string();
    }

    pub fn set_value(&mut self, key: &str, value: &str) {
        self.element_mut(key).value = value.to_string();
    }

    pub fn set_attribute(&mut self, key: &str, name: &str, value: &str) {
        self.element_mut(key)
            .attributes
            .insert(name.to_string(), value.to_string());
    }

    pub fn set_visible(&mut self, key: &str, visible: bool) {
        self.element_mut(key).visible = visible;
    }

    pub fn remove(&mut self, key: &str) {
        self.elements.remove(key);
    }

    pub fn exists(&self, key: &str) -> bool {
        self.element(key).is_some()
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.element(key).map(|e| e.text.as_str())
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.element(key).map(|e| e.value.as_str())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn set_url(&mut self, url: &str) {
        self.url = url.to_string();
    }

    /// Queue successive values returned by reads of an attribute.
    ///
    /// Each read consumes one entry and the last one sticks.
    pub fn push_attribute_timeline(&mut self, key: &str, name: &str, values: &[Option<&str>]) {
        let queue = self
            .timelines
            .entry((key.to_string(), name.to_string()))
            .or_default();
        queue.extend(values.iter().map(|v| v.map(str::to_string)));
    }

    fn read_attribute(&mut self, key: &str, name: &str) -> Value {
        let slot = (key.to_string(), name.to_string());
        if let Some(next) = self.timelines.get_mut(&slot).and_then(VecDeque::pop_front) {
            let element = self.element_mut(key);
            match next {
                Some(value) => {
                    element.attributes.insert(name.to_string(), value);
                }
                None => {
                    element.attributes.remove(name);
                }
            }
        }
        self.element(key)
            .and_then(|e| e.attributes.get(name))
            .map(|v| Value::String(v.clone()))
            .unwrap_or(Value::Null)
    }

    fn count(&mut self, key: &str) -> usize {
        if let Some((count, remaining)) = self.pending.get_mut(key) {
            if *remaining > 0 {
                *remaining -= 1;
                return 0;
            }
            let count = *count;
            self.pending.remove(key);
            self.set_count(key, count);
        }
        self.element(key).map(|e| e.count).unwrap_or(0)
    }
}

type ActionHook = Arc<dyn Fn(&mut MockDom, &Action) + Send + Sync>;
type KeyHook = Arc<dyn Fn(&mut MockDom) + Send + Sync>;
type GotoHook = Arc<dyn Fn(&mut MockDom, &str) + Send + Sync>;
type MouseHook = Arc<dyn Fn(&mut MockDom, &MouseInput) + Send + Sync>;

#[derive(Default)]
struct Inner {
    dom: MockDom,
    action_hooks: Vec<(String, &'static str, ActionHook)>,
    key_hooks: Vec<(String, KeyHook)>,
    goto_hooks: Vec<GotoHook>,
    mouse_hooks: Vec<MouseHook>,
}

/// In-memory [`Driver`]; clones share the same page
#[derive(Clone)]
pub struct MockDriver {
    inner: Arc<Mutex<Inner>>,
    browser: Browser,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    pub fn new() -> Self {
        Self::with_browser(Browser::Chromium)
    }

    pub fn with_browser(browser: Browser) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            browser,
        }
    }

    /// Session over this driver with fast polling
    pub fn session(&self) -> Session {
        self.session_with_config(Self::fast_config(5_000))
    }

    /// Session whose every bounded wait is `timeout_ms`
    pub fn session_with_timeouts(&self, timeout_ms: u64) -> Session {
        self.session_with_config(Self::fast_config(timeout_ms))
    }

    pub fn session_with_config(&self, config: HarnessConfig) -> Session {
        Session::new(Arc::new(self.clone()), Arc::new(config))
    }

    pub fn fast_config(timeout_ms: u64) -> HarnessConfig {
        let mut config = HarnessConfig::default();
        config.timeouts.action_ms = timeout_ms;
        config.timeouts.assertion_ms = timeout_ms;
        config.timeouts.save_ms = timeout_ms;
        config.timeouts.unsaved_ms = timeout_ms.min(300);
        config.timeouts.poll_interval_ms = 10;
        config
    }

    /// Inspect or mutate the fake DOM directly
    pub fn with_dom<R>(&self, f: impl FnOnce(&mut MockDom) -> R) -> R {
        f(&mut self.inner.lock().dom)
    }

    pub fn set_count(&self, key: &str, count: usize) {
        self.with_dom(|dom| dom.set_count(key, count));
    }

    /// Element appears with `count` matches after `polls` empty reads
    pub fn set_count_after(&self, key: &str, count: usize, polls: usize) {
        self.with_dom(|dom| {
            dom.remove(key);
            dom.pending.insert(key.to_string(), (count, polls));
        });
    }

    pub fn set_text(&self, key: &str, text: &str) {
        self.with_dom(|dom| dom.set_text(key, text));
    }

    pub fn set_value(&self, key: &str, value: &str) {
        self.with_dom(|dom| dom.set_value(key, value));
    }

    pub fn set_attribute(&self, key: &str, name: &str, value: &str) {
        self.with_dom(|dom| dom.set_attribute(key, name, value));
    }

    pub fn set_bounding_box(&self, key: &str, bounding_box: BoundingBox) {
        self.with_dom(|dom| dom.element_mut(key).bounding_box = Some(bounding_box));
    }

    pub fn set_screenshot(&self, key: &str, png: Vec<u8>) {
        self.with_dom(|dom| {
            dom.screenshots.insert(key.to_string(), png);
        });
    }

    pub fn push_attribute_timeline(&self, key: &str, name: &str, values: &[Option<&str>]) {
        self.with_dom(|dom| dom.push_attribute_timeline(key, name, values));
    }

    /// Run `hook` after `action` (by [`Action::name`]) is performed on `key`
    pub fn on_action<F>(&self, key: &str, action: &'static str, hook: F)
    where
        F: Fn(&mut MockDom, &Action) + Send + Sync + 'static,
    {
        self.inner
            .lock()
            .action_hooks
            .push((key.to_string(), action, Arc::new(hook)));
    }

    /// Run `hook` after the page-level key combination `combo` is pressed
    pub fn on_key<F>(&self, combo: &str, hook: F)
    where
        F: Fn(&mut MockDom) + Send + Sync + 'static,
    {
        self.inner
            .lock()
            .key_hooks
            .push((combo.to_string(), Arc::new(hook)));
    }

    pub fn on_goto<F>(&self, hook: F)
    where
        F: Fn(&mut MockDom, &str) + Send + Sync + 'static,
    {
        self.inner.lock().goto_hooks.push(Arc::new(hook));
    }

    /// Run `hook` after every raw mouse input
    pub fn on_mouse<F>(&self, hook: F)
    where
        F: Fn(&mut MockDom, &MouseInput) + Send + Sync + 'static,
    {
        self.inner.lock().mouse_hooks.push(Arc::new(hook));
    }

    pub fn events(&self) -> Vec<MockEvent> {
        self.inner.lock().dom.events.clone()
    }

    /// Names of the actions performed on `key`, in order
    pub fn actions_on(&self, key: &str) -> Vec<&'static str> {
        self.inner
            .lock()
            .dom
            .events
            .iter()
            .filter_map(|event| match event {
                MockEvent::Action { target, action } if target == key => Some(action.name()),
                _ => None,
            })
            .collect()
    }

    pub fn keys_pressed(&self) -> Vec<String> {
        self.inner
            .lock()
            .dom
            .events
            .iter()
            .filter_map(|event| match event {
                MockEvent::Key(KeyInput::Press { combo }) => Some(combo.clone()),
                _ => None,
            })
            .collect()
    }
}

/// A solid-color PNG, handy as a screenshot fixture
pub fn solid_png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut bytes = Vec::new();
    // Encoding an in-memory RGBA buffer cannot fail short of OOM.
    let _ = img.write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png);
    bytes
}

#[async_trait]
impl Driver for MockDriver {
    fn browser(&self) -> Browser {
        self.browser
    }

    async fn goto(&self, url: &str, _timeout: Duration) -> E2eResult<()> {
        let mut guard = self.inner.lock();
        let Inner {
            dom, goto_hooks, ..
        } = &mut *guard;
        dom.url = url.to_string();
        dom.events.push(MockEvent::Goto(url.to_string()));
        for hook in goto_hooks.iter() {
            hook(dom, url);
        }
        Ok(())
    }

    async fn current_url(&self) -> E2eResult<String> {
        Ok(self.inner.lock().dom.url.clone())
    }

    async fn count(&self, chain: &[Locator]) -> E2eResult<usize> {
        Ok(self.inner.lock().dom.count(&chain_key(chain)))
    }

    async fn perform(&self, chain: &[Locator], action: &Action) -> E2eResult<()> {
        let key = chain_key(chain);
        let mut guard = self.inner.lock();
        let Inner {
            dom, action_hooks, ..
        } = &mut *guard;

        if !dom.exists(&key) {
            return Err(E2eError::Driver(format!("{} matched nothing", key)));
        }
        dom.events.push(MockEvent::Action {
            target: key.clone(),
            action: action.clone(),
        });
        match action {
            Action::Fill { value } => dom.set_value(&key, value),
            Action::Clear => dom.set_value(&key, ""),
            Action::Type { text, .. } => dom.element_mut(&key).value.push_str(text),
            _ => {}
        }
        for (hook_key, name, hook) in action_hooks.iter() {
            if *hook_key == key && *name == action.name() {
                hook(dom, action);
            }
        }
        Ok(())
    }

    async fn inspect(&self, chain: &[Locator], probe: &Probe) -> E2eResult<Value> {
        let key = chain_key(chain);
        let mut guard = self.inner.lock();
        let dom = &mut guard.dom;

        if let Probe::Attribute { name } = probe {
            return Ok(dom.read_attribute(&key, name));
        }
        let Some(element) = dom.element(&key) else {
            return Ok(match probe {
                Probe::Visible => Value::Bool(false),
                _ => Value::Null,
            });
        };
        Ok(match probe {
            Probe::Text => Value::String(element.text.clone()),
            Probe::InputValue => Value::String(element.value.clone()),
            Probe::Visible => Value::Bool(element.visible),
            Probe::Enabled => Value::Bool(element.enabled),
            Probe::BoundingBox => element
                .bounding_box
                .map(|b| serde_json::to_value(b).unwrap_or(Value::Null))
                .unwrap_or(Value::Null),
            Probe::ComputedStyle { property } => element
                .styles
                .get(property)
                .map(|v| Value::String(v.clone()))
                .unwrap_or(Value::Null),
            Probe::Attribute { .. } => Value::Null,
        })
    }

    async fn keyboard(&self, input: &KeyInput) -> E2eResult<()> {
        let mut guard = self.inner.lock();
        let Inner { dom, key_hooks, .. } = &mut *guard;
        dom.events.push(MockEvent::Key(input.clone()));
        if let KeyInput::Press { combo } = input {
            for (hook_combo, hook) in key_hooks.iter() {
                if hook_combo == combo {
                    hook(dom);
                }
            }
        }
        Ok(())
    }

    async fn mouse(&self, input: &MouseInput) -> E2eResult<()> {
        let mut guard = self.inner.lock();
        let Inner {
            dom, mouse_hooks, ..
        } = &mut *guard;
        dom.events.push(MockEvent::Mouse(input.clone()));
        for hook in mouse_hooks.iter() {
            hook(dom, input);
        }
        Ok(())
    }

    async fn screenshot(&self, chain: Option<&[Locator]>) -> E2eResult<Vec<u8>> {
        let key = chain.map(chain_key).unwrap_or_else(|| VIEWPORT.to_string());
        let mut guard = self.inner.lock();
        guard.dom.events.push(MockEvent::Screenshot(key.clone()));
        Ok(guard
            .dom
            .screenshots
            .get(&key)
            .cloned()
            .unwrap_or_else(|| solid_png(8, 8, [255, 255, 255, 255])))
    }

    async fn close(&self) -> E2eResult<()> {
        self.inner.lock().dom.events.push(MockEvent::Close);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn attribute_timeline_is_consumed_then_sticks() {
        let mock = MockDriver::new();
        let chain = vec![Locator::TestId {
            id: "save-status".into(),
        }];
        let key = chain_key(&chain);
        mock.set_count(&key, 1);
        mock.push_attribute_timeline(&key, "data-status", &[Some("unsaved"), Some("saved")]);

        let probe = Probe::Attribute {
            name: "data-status".into(),
        };
        assert_eq!(mock.inspect(&chain, &probe).await.unwrap(), "unsaved");
        assert_eq!(mock.inspect(&chain, &probe).await.unwrap(), "saved");
        assert_eq!(mock.inspect(&chain, &probe).await.unwrap(), "saved");
    }

    #[tokio::test]
    async fn hooks_fire_for_matching_action_only() {
        let mock = MockDriver::new();
        let chain = vec![Locator::TestId { id: "add".into() }];
        let key = chain_key(&chain);
        mock.set_count(&key, 1);
        mock.on_action(&key, "click", |dom, _| dom.set_count("testid=added", 1));

        mock.perform(&chain, &Action::Hover).await.unwrap();
        assert!(!mock.with_dom(|dom| dom.exists("testid=added")));
        mock.perform(&chain, &Action::click()).await.unwrap();
        assert!(mock.with_dom(|dom| dom.exists("testid=added")));
    }

    #[tokio::test]
    async fn mouse_hooks_see_each_input() {
        let mock = MockDriver::new();
        mock.on_mouse(|dom, input| {
            if let MouseInput::Up { .. } = input {
                dom.set_count("testid=drawn", 1);
            }
        });
        let button = crate::driver::MouseButton::Left;
        mock.mouse(&MouseInput::Down { button }).await.unwrap();
        assert!(!mock.with_dom(|dom| dom.exists("testid=drawn")));
        mock.mouse(&MouseInput::Up { button }).await.unwrap();
        assert!(mock.with_dom(|dom| dom.exists("testid=drawn")));
        assert_eq!(mock.events().len(), 2);
    }

    #[tokio::test]
    async fn acting_on_missing_element_errors() {
        let mock = MockDriver::new();
        let chain = vec![Locator::TestId { id: "nope".into() }];
        assert!(mock.perform(&chain, &Action::click()).await.is_err());
        assert_eq!(
            mock.inspect(&chain, &Probe::Visible).await.unwrap(),
            Value::Bool(false)
        );
    }
}
