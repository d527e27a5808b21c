//! Playwright browser automation
//!
//! Spawns `node` on an embedded driver script and talks to it over a
//! line-delimited JSON protocol: one request per line on stdin, one response
//! per line on stdout, matched by id. One driver process owns one browser,
//! one context and one page, so every test gets a fresh browser session.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{Action, Browser, Driver, KeyInput, Locator, MouseInput, Probe};
use crate::config::HarnessConfig;
use crate::error::{E2eError, E2eResult};

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Directory holding the `playwright` node package
    pub node_modules: PathBuf,
    pub launch_timeout: Duration,
    /// Upper bound for any single request, on top of its own timeout
    pub request_timeout: Duration,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            node_modules: PathBuf::from("node_modules"),
            launch_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl PlaywrightConfig {
    pub fn from_harness(config: &HarnessConfig) -> Self {
        Self {
            browser: config.browser,
            headless: config.headless,
            viewport_width: config.viewport.width,
            viewport_height: config.viewport.height,
            request_timeout: config.timeouts.navigation() + Duration::from_secs(30),
            ..Default::default()
        }
    }
}

const DRIVER_SCRIPT: &str = r#"
const { chromium, firefox, webkit } = require('playwright');
const readline = require('readline');

const engines = { chromium, firefox, webkit };

function resolve(page, chain) {
  let loc = null;
  for (const step of chain) {
    const scope = loc ?? page;
    switch (step.kind) {
      case 'role':
        loc = scope.getByRole(step.role, step.name == null ? {} : { name: step.name, exact: step.exact });
        break;
      case 'text': loc = scope.getByText(step.text, { exact: step.exact }); break;
      case 'test_id': loc = scope.getByTestId(step.id); break;
      case 'css': loc = scope.locator(step.selector); break;
      case 'class_contains': loc = scope.locator(`[class*="${step.fragment}"]`); break;
      case 'label': loc = scope.getByLabel(step.text); break;
      case 'placeholder': loc = scope.getByPlaceholder(step.text); break;
      case 'has_text': loc = (loc ?? page.locator('body')).filter({ hasText: step.text }); break;
      case 'nth': loc = (loc ?? page.locator('body')).nth(step.index); break;
      default: throw new Error(`unknown locator ${step.kind}`);
    }
  }
  return loc;
}

async function perform(page, loc, action) {
  switch (action.type) {
    case 'click':
      return loc.click({ button: action.button, clickCount: action.click_count, modifiers: action.modifiers });
    case 'fill': return loc.fill(action.value);
    case 'clear': return loc.clear();
    case 'hover': return loc.hover();
    case 'focus': return loc.focus();
    case 'press': return loc.press(action.key);
    case 'type': return loc.pressSequentially(action.text, { delay: action.delay_ms });
    case 'check': return loc.check();
    case 'uncheck': return loc.uncheck();
    case 'select_option': return loc.selectOption(action.value);
    case 'set_input_files': {
      const [chooser] = await Promise.all([page.waitForEvent('filechooser'), loc.click()]);
      return chooser.setFiles(action.paths);
    }
    case 'drag_to': return loc.dragTo(resolve(page, action.target));
    case 'scroll_into_view': return loc.scrollIntoViewIfNeeded();
    default: throw new Error(`unknown action ${action.type}`);
  }
}

async function inspect(loc, probe) {
  switch (probe.type) {
    case 'text': return (await loc.count()) ? loc.innerText() : null;
    case 'input_value': return (await loc.count()) ? loc.inputValue() : null;
    case 'attribute': return (await loc.count()) ? loc.getAttribute(probe.name) : null;
    case 'visible': return loc.isVisible();
    case 'enabled': return (await loc.count()) ? loc.isEnabled() : null;
    case 'bounding_box': return (await loc.count()) ? loc.boundingBox() : null;
    case 'computed_style':
      return (await loc.count())
        ? loc.evaluate((el, p) => getComputedStyle(el).getPropertyValue(p), probe.property)
        : null;
    default: throw new Error(`unknown probe ${probe.type}`);
  }
}

async function keyboard(page, input) {
  switch (input.type) {
    case 'press': return page.keyboard.press(input.combo);
    case 'type': return page.keyboard.type(input.text);
    case 'down': return page.keyboard.down(input.key);
    case 'up': return page.keyboard.up(input.key);
    default: throw new Error(`unknown key input ${input.type}`);
  }
}

async function mouse(page, input) {
  switch (input.type) {
    case 'move': return page.mouse.move(input.x, input.y, { steps: input.steps });
    case 'down': return page.mouse.down({ button: input.button });
    case 'up': return page.mouse.up({ button: input.button });
    case 'click': return page.mouse.click(input.x, input.y, { button: input.button });
    case 'wheel': return page.mouse.wheel(input.delta_x, input.delta_y);
    default: throw new Error(`unknown mouse input ${input.type}`);
  }
}

(async () => {
  const options = JSON.parse(process.argv[2]);
  const browser = await engines[options.browser].launch({ headless: options.headless });
  const context = await browser.newContext({ viewport: options.viewport });
  const page = await context.newPage();
  const send = (msg) => process.stdout.write(JSON.stringify(msg) + '\n');
  send({ ready: true });

  const rl = readline.createInterface({ input: process.stdin });
  for await (const line of rl) {
    if (!line.trim()) continue;
    const req = JSON.parse(line);
    try {
      let result = null;
      switch (req.op) {
        case 'goto': await page.goto(req.url, { timeout: req.timeout_ms }); break;
        case 'url': result = page.url(); break;
        case 'count': result = await resolve(page, req.chain).count(); break;
        case 'perform': await perform(page, resolve(page, req.chain), req.action); break;
        case 'inspect': result = await inspect(resolve(page, req.chain), req.probe); break;
        case 'keyboard': await keyboard(page, req.input); break;
        case 'mouse': await mouse(page, req.input); break;
        case 'screenshot': {
          const target = req.chain ? resolve(page, req.chain) : page;
          result = (await target.screenshot()).toString('base64');
          break;
        }
        case 'close':
          send({ id: req.id, ok: true, result: null });
          await browser.close();
          process.exit(0);
        default: throw new Error(`unknown op ${req.op}`);
      }
      send({ id: req.id, ok: true, result });
    } catch (error) {
      send({ id: req.id, ok: false, error: error.message });
    }
  }
  await browser.close();
})().catch((error) => {
  process.stderr.write(String(error && error.stack || error) + '\n');
  process.exit(1);
});
"#;

#[derive(Debug, Deserialize)]
struct Response {
    id: Option<u64>,
    #[serde(default)]
    ready: bool,
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

struct Channel {
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl Channel {
    async fn read_response(&mut self) -> E2eResult<Response> {
        loop {
            let line = self
                .stdout
                .next_line()
                .await?
                .ok_or_else(|| E2eError::Driver("Playwright driver exited".into()))?;
            match serde_json::from_str::<Response>(&line) {
                Ok(response) => return Ok(response),
                Err(_) => debug!("[playwright] {}", line),
            }
        }
    }
}

/// Playwright browser handle
pub struct PlaywrightDriver {
    browser: Browser,
    channel: Mutex<Channel>,
    child: Mutex<Child>,
    next_id: AtomicU64,
    request_timeout: Duration,
    /// Keeps the driver script on disk for the lifetime of the process
    _script_dir: tempfile::TempDir,
}

impl PlaywrightDriver {
    /// Launch a browser and wait for the driver to report ready
    pub async fn launch(config: PlaywrightConfig) -> E2eResult<Self> {
        // Verify playwright is installed
        Self::check_playwright_installed().await?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("driver.js");
        std::fs::write(&script_path, DRIVER_SCRIPT)?;

        let node_modules = std::fs::canonicalize(&config.node_modules)
            .unwrap_or_else(|_| config.node_modules.clone());
        let options = json!({
            "browser": config.browser.as_str(),
            "headless": config.headless,
            "viewport": { "width": config.viewport_width, "height": config.viewport_height },
        });

        info!("Launching {} via Playwright", config.browser);
        let mut child = TokioCommand::new("node")
            .arg(&script_path)
            .arg(options.to_string())
            .env("NODE_PATH", node_modules)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| E2eError::Driver(format!("Failed to spawn node: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Driver("driver stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Driver("driver stdout unavailable".into()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!("[playwright] {}", line);
                }
            });
        }

        let mut channel = Channel {
            stdin,
            stdout: BufReader::new(stdout).lines(),
        };
        let ready = tokio::time::timeout(config.launch_timeout, channel.read_response())
            .await
            .map_err(|_| E2eError::Timeout("Playwright browser launch".into()))??;
        if !ready.ready {
            return Err(E2eError::Driver(format!(
                "unexpected first message from driver: {:?}",
                ready
            )));
        }

        Ok(Self {
            browser: config.browser,
            channel: Mutex::new(channel),
            child: Mutex::new(child),
            next_id: AtomicU64::new(1),
            request_timeout: config.request_timeout,
            _script_dir: script_dir,
        })
    }

    /// Check if Playwright is installed
    async fn check_playwright_installed() -> E2eResult<()> {
        let status = TokioCommand::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::DriverNotFound),
        }
    }

    async fn request(&self, op: &str, mut payload: Value) -> E2eResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        if let Value::Object(map) = &mut payload {
            map.insert("id".into(), json!(id));
            map.insert("op".into(), json!(op));
        }
        let mut line = payload.to_string();
        line.push('\n');

        let mut channel = self.channel.lock().await;
        channel.stdin.write_all(line.as_bytes()).await?;
        channel.stdin.flush().await?;

        let response = tokio::time::timeout(self.request_timeout, async {
            loop {
                let response = channel.read_response().await?;
                if response.id == Some(id) {
                    return E2eResult::Ok(response);
                }
                debug!("dropping stale driver response {:?}", response.id);
            }
        })
        .await
        .map_err(|_| E2eError::Timeout(format!("Playwright {op} request")))??;

        if response.ok {
            Ok(response.result)
        } else {
            Err(E2eError::Driver(format!(
                "{op} failed: {}",
                response.error.unwrap_or_else(|| "unknown error".into())
            )))
        }
    }

    fn shutdown(child: &mut Child) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = child.id() {
                let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
            }
        }
        let _ = child.start_kill();
    }
}

#[async_trait]
impl Driver for PlaywrightDriver {
    fn browser(&self) -> Browser {
        self.browser
    }

    async fn goto(&self, url: &str, timeout: Duration) -> E2eResult<()> {
        self.request(
            "goto",
            json!({ "url": url, "timeout_ms": timeout.as_millis() as u64 }),
        )
        .await?;
        Ok(())
    }

    async fn current_url(&self) -> E2eResult<String> {
        let value = self.request("url", json!({})).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn count(&self, chain: &[Locator]) -> E2eResult<usize> {
        let value = self.request("count", json!({ "chain": chain })).await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    async fn perform(&self, chain: &[Locator], action: &Action) -> E2eResult<()> {
        self.request("perform", json!({ "chain": chain, "action": action }))
            .await?;
        Ok(())
    }

    async fn inspect(&self, chain: &[Locator], probe: &Probe) -> E2eResult<Value> {
        self.request("inspect", json!({ "chain": chain, "probe": probe }))
            .await
    }

    async fn keyboard(&self, input: &KeyInput) -> E2eResult<()> {
        self.request("keyboard", json!({ "input": input })).await?;
        Ok(())
    }

    async fn mouse(&self, input: &MouseInput) -> E2eResult<()> {
        self.request("mouse", json!({ "input": input })).await?;
        Ok(())
    }

    async fn screenshot(&self, chain: Option<&[Locator]>) -> E2eResult<Vec<u8>> {
        use base64::Engine as _;

        let value = self.request("screenshot", json!({ "chain": chain })).await?;
        let encoded = value
            .as_str()
            .ok_or_else(|| E2eError::Driver("screenshot returned no data".into()))?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| E2eError::Driver(format!("screenshot is not base64: {}", e)))
    }

    async fn close(&self) -> E2eResult<()> {
        if let Err(e) = self.request("close", json!({})).await {
            debug!("driver close request failed: {}", e);
        }
        let mut child = self.child.lock().await;
        match tokio::time::timeout(Duration::from_secs(2), child.wait()).await {
            Ok(_) => Ok(()),
            Err(_) => {
                Self::shutdown(&mut child);
                let _ = child.wait().await;
                Ok(())
            }
        }
    }
}
