//! A fake Studio backend behind scripted mock sessions
//!
//! Every session opened from a [`FakeStudio`] gets its own [`MockDriver`]
//! whose hooks imitate the dashboard and editor, while teams and files live
//! in one shared backend, the way concurrent browsers share one server.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use studio_e2e::components::{
    FileGrid, LayersPanel, Measure, TeamMenu, TokenKind, TokensPanel, Tool,
};
use studio_e2e::driver::mock::MockDom;
use studio_e2e::driver::{BoundingBox, MockDriver, MouseInput};
use studio_e2e::pages::{DashboardPage, WorkspacePage};
use studio_e2e::save::SAVE_STATUS_ATTRIBUTE;
use studio_e2e::{Command, E2eResult, HarnessConfig, Session, SessionFactory};

pub const BASE_URL: &str = "http://studio.test";
pub const DEFAULT_TEAM: &str = "Personal";

/// Card names the fake installs per-card hooks for
const CARD_NAMES: &[&str] = &["New File 1", "New File 2", "New File 3", "test"];

/// Token names the fake installs per-pill hooks for
const TOKEN_NAMES: &[&str] = &["global.radius"];

/// Fill of a freshly drawn shape
pub const DEFAULT_FILL: &str = "b1b2b5";

const VIEWPORT_BOX: BoundingBox = BoundingBox {
    x: 240.0,
    y: 48.0,
    width: 1280.0,
    height: 900.0,
};

struct FakeFile {
    team: String,
    name: String,
}

/// A shape as the backend persisted it
#[derive(Debug, Clone, PartialEq)]
pub struct FakeShape {
    pub file: String,
    pub name: String,
    pub fill: String,
    pub radius: String,
    pub tokens: Vec<String>,
}

#[derive(Default)]
pub struct Backend {
    pub live: BTreeSet<String>,
    pub created: Vec<String>,
    pub delete_attempts: HashMap<String, usize>,
    pub taken: HashSet<String>,
    pub reject_next: usize,
    pub fail_deletes: bool,
    /// Teams the backend creates without switching the session to them
    pub stalled: HashSet<String>,
    files: Vec<FakeFile>,
    shapes: Vec<(usize, FakeShape)>,
}

impl Backend {
    fn file_url(id: usize) -> String {
        format!("{BASE_URL}/#/workspace/{id}")
    }

    fn file_alive(&self, id: usize) -> bool {
        id > 0
            && self
                .files
                .get(id - 1)
                .is_some_and(|f| self.live.contains(&f.team))
    }

    fn team_files(&self, team: &str) -> Vec<(usize, String)> {
        self.files
            .iter()
            .enumerate()
            .filter(|(_, f)| f.team == team)
            .map(|(i, f)| (i + 1, f.name.clone()))
            .collect()
    }

    fn last_shape(&mut self, file: Option<usize>) -> Option<&mut FakeShape> {
        let file = file?;
        self.shapes
            .iter_mut()
            .rev()
            .find(|(id, _)| *id == file)
            .map(|(_, shape)| shape)
    }

    fn find_file(&self, team: &str, name: &str) -> Option<usize> {
        self.team_files(team)
            .into_iter()
            .find(|(_, n)| n == name)
            .map(|(id, _)| id)
    }
}

struct SessionState {
    current_team: String,
    renaming: Option<String>,
    open_file: Option<usize>,
    rectangle_tool: bool,
    tokens: HashMap<String, String>,
}

/// Query keys of the fake product, built from the real components
struct Keys {
    grid: FileGrid,
    app: String,
    current_team: String,
    team_list: String,
    create_team_item: String,
    create_modal: String,
    name_input: String,
    submit: String,
    name_error: String,
    options: String,
    delete_item: String,
    confirm: String,
    confirm_accept: String,
    nav_drafts: String,
    grid_root: String,
    placeholder: String,
    cards: String,
    last_title: String,
    menu: String,
    rename_item: String,
    rename_input: String,
    viewport: String,
    not_found: String,
    save_status: String,
    back: String,
    team: TeamMenu,
    layers: LayersPanel,
    tokens: TokensPanel,
    rectangle_tool: String,
    layer_items: String,
    design: String,
    fill_swatch: String,
    fill_inline: String,
    picker: String,
    picker_hex: String,
    radius: String,
    toggle_tokens: String,
    tokens_sidebar: String,
    add_radius_token: String,
    token_form: String,
    token_name: String,
    token_value: String,
    token_save: String,
}

impl Keys {
    fn new(dash: &DashboardPage, ws: &WorkspacePage) -> Self {
        let team = &dash.team_menu;
        let grid = &dash.file_grid;
        let tokens = TokensPanel::new(ws.session().clone());
        Self {
            grid: grid.clone(),
            app: dash.app_root().to_string(),
            current_team: team.current_team().to_string(),
            team_list: team.team_list().to_string(),
            create_team_item: team.create_team_item().to_string(),
            create_modal: team.create_modal().to_string(),
            name_input: team.name_input().to_string(),
            submit: team.submit_button().to_string(),
            name_error: team.name_error().to_string(),
            options: team.options_button().to_string(),
            delete_item: team.delete_item().to_string(),
            confirm: dash.confirm.dialog().to_string(),
            confirm_accept: dash.confirm.accept_button().to_string(),
            nav_drafts: dash.session().test_id("nav-drafts").to_string(),
            grid_root: grid.grid().to_string(),
            placeholder: grid.new_file_placeholder().to_string(),
            cards: grid.cards().to_string(),
            last_title: grid.last_card_title().to_string(),
            menu: dash.context_menu.menu().to_string(),
            rename_item: dash.context_menu.item("Rename").to_string(),
            rename_input: grid.rename_input().to_string(),
            viewport: ws.viewport.root().to_string(),
            not_found: ws.not_found().to_string(),
            save_status: ws.save_sync().indicator().to_string(),
            back: ws.header.back_to_dashboard().to_string(),
            team: team.clone(),
            layers: ws.layers.clone(),
            rectangle_tool: ws.toolbar.tool(Tool::Rectangle).to_string(),
            layer_items: ws.layers.items().to_string(),
            design: ws.design.root().to_string(),
            fill_swatch: ws.design.fill().swatch().to_string(),
            fill_inline: ws.design.fill().inline_hex().to_string(),
            picker: ws.design.fill().popover().to_string(),
            picker_hex: ws.design.fill().hex_input().to_string(),
            radius: ws.design.measure(Measure::Radius).to_string(),
            toggle_tokens: ws.session().shortcut(Command::ToggleTokens).to_string(),
            tokens_sidebar: tokens.sidebar().to_string(),
            add_radius_token: tokens.add_button(TokenKind::BorderRadius).to_string(),
            token_form: tokens.form().to_string(),
            token_name: tokens.name_input().to_string(),
            token_value: tokens.value_input().to_string(),
            token_save: tokens.save_button().to_string(),
            tokens,
        }
    }

    fn card(&self, name: &str) -> String {
        self.grid.card(name).to_string()
    }

    fn card_title(&self, name: &str) -> String {
        self.grid.card_title(name).to_string()
    }

    fn layer(&self, name: &str) -> String {
        self.layers.item(name).to_string()
    }

    fn pill(&self, name: &str) -> String {
        self.tokens.pill(name).to_string()
    }

    /// Render the editor chrome of an opened file
    fn open_editor(&self, dom: &mut MockDom) {
        dom.remove(&self.not_found);
        dom.set_count(&self.viewport, 1);
        dom.element_mut(&self.viewport).bounding_box = Some(VIEWPORT_BOX);
        dom.set_attribute(&self.save_status, SAVE_STATUS_ATTRIBUTE, "saved");
        dom.set_count(&self.back, 1);
        dom.set_attribute(&self.rectangle_tool, "aria-pressed", "false");
    }

    /// The indicator leaves `saved` and comes back once the change is stored
    fn save_cycle(&self, dom: &mut MockDom) {
        dom.push_attribute_timeline(
            &self.save_status,
            SAVE_STATUS_ATTRIBUTE,
            &[Some("unsaved"), Some("saved")],
        );
    }
}

#[derive(Clone)]
pub struct FakeStudio {
    backend: Arc<Mutex<Backend>>,
    sessions: Arc<Mutex<Vec<MockDriver>>>,
    config: HarnessConfig,
}

impl Default for FakeStudio {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeStudio {
    pub fn new() -> Self {
        let mut config = MockDriver::fast_config(1_000);
        config.timeouts.navigation_ms = 1_000;
        config.base_url = BASE_URL.to_string();
        Self {
            backend: Arc::new(Mutex::new(Backend::default())),
            sessions: Arc::new(Mutex::new(Vec::new())),
            config,
        }
    }

    pub fn config(&self) -> HarnessConfig {
        self.config.clone()
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    pub fn backend(&self) -> parking_lot::MutexGuard<'_, Backend> {
        self.backend.lock()
    }

    pub fn fail_deletes(&self) {
        self.backend.lock().fail_deletes = true;
    }

    /// The next `count` team submissions are rejected as taken
    pub fn reject_next(&self, count: usize) {
        self.backend.lock().reject_next = count;
    }

    /// Submitting `name` creates the team but leaves the switcher on the
    /// previous one
    pub fn stall_team_switch(&self, name: &str) {
        self.backend.lock().stalled.insert(name.to_string());
    }

    pub fn shapes(&self) -> Vec<FakeShape> {
        self.backend
            .lock()
            .shapes
            .iter()
            .map(|(_, shape)| shape.clone())
            .collect()
    }

    pub fn created_teams(&self) -> Vec<String> {
        self.backend.lock().created.clone()
    }

    pub fn live_teams(&self) -> Vec<String> {
        self.backend.lock().live.iter().cloned().collect()
    }

    pub fn delete_attempts(&self, team: &str) -> usize {
        self.backend
            .lock()
            .delete_attempts
            .get(team)
            .copied()
            .unwrap_or(0)
    }

    pub fn opened_sessions(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Open a new browser session against the fake
    pub fn open_session(&self) -> (MockDriver, Session) {
        let mock = MockDriver::new();
        let session = mock.session_with_config(self.config.clone());
        let dash = DashboardPage::new(session.clone());
        let ws = WorkspacePage::new(session.clone());
        let keys = Arc::new(Keys::new(&dash, &ws));
        let state = Arc::new(Mutex::new(SessionState {
            current_team: DEFAULT_TEAM.to_string(),
            renaming: None,
            open_file: None,
            rectangle_tool: false,
            tokens: HashMap::new(),
        }));

        self.install_navigation(&mock, &keys, &state);
        self.install_teams(&mock, &keys, &state);
        self.install_files(&mock, &keys, &state);
        self.install_editor(&mock, &keys, &state);
        self.install_tokens(&mock, &keys, &state);
        self.sessions.lock().push(mock.clone());
        (mock, session)
    }

    fn install_navigation(&self, mock: &MockDriver, keys: &Arc<Keys>, state: &Arc<Mutex<SessionState>>) {
        let backend = self.backend.clone();
        let (k, st) = (keys.clone(), state.clone());
        mock.on_goto(move |dom, url| {
            dom.set_count(&k.app, 1);
            match url.split("/workspace/").nth(1) {
                Some(id) => {
                    let alive = id
                        .parse::<usize>()
                        .map(|id| backend.lock().file_alive(id))
                        .unwrap_or(false);
                    if alive {
                        st.lock().open_file = id.parse().ok();
                        k.open_editor(dom);
                    } else {
                        dom.remove(&k.viewport);
                        dom.set_count(&k.not_found, 1);
                    }
                }
                None => {
                    dom.remove(&k.viewport);
                    dom.remove(&k.not_found);
                    dom.set_text(&k.current_team, &st.lock().current_team);
                    dom.set_count(&k.nav_drafts, 1);
                }
            }
        });

        let k = keys.clone();
        mock.on_key("Escape", move |dom| {
            for key in [&k.create_modal, &k.name_input, &k.submit, &k.name_error, &k.team_list] {
                dom.remove(key);
            }
        });
    }

    fn install_teams(&self, mock: &MockDriver, keys: &Arc<Keys>, state: &Arc<Mutex<SessionState>>) {
        let k = keys.clone();
        mock.on_action(&keys.current_team, "click", move |dom, _| {
            dom.set_count(&k.team_list, 1);
            dom.set_count(&k.create_team_item, 1);
        });

        let k = keys.clone();
        mock.on_action(&keys.create_team_item, "click", move |dom, _| {
            dom.remove(&k.team_list);
            dom.remove(&k.name_error);
            dom.set_count(&k.create_modal, 1);
            dom.set_value(&k.name_input, "");
            dom.set_count(&k.submit, 1);
        });

        let backend = self.backend.clone();
        let (k, st) = (keys.clone(), state.clone());
        mock.on_action(&keys.submit, "click", move |dom, _| {
            let name = dom.value(&k.name_input).unwrap_or_default().to_string();
            let mut backend = backend.lock();
            let rejected = backend.reject_next > 0;
            if rejected {
                backend.reject_next -= 1;
            }
            if rejected || backend.taken.contains(&name) || backend.live.contains(&name) {
                dom.set_text(&k.name_error, "A team with this name already exists");
                return;
            }
            backend.live.insert(name.clone());
            backend.created.push(name.clone());
            if !backend.stalled.contains(&name) {
                st.lock().current_team = name.clone();
                dom.set_text(&k.current_team, &name);
            }
            for key in [&k.create_modal, &k.name_input, &k.submit] {
                dom.remove(key);
            }
        });

        let stalled: Vec<String> = self.backend.lock().stalled.iter().cloned().collect();
        for name in stalled {
            let (k, st) = (keys.clone(), state.clone());
            let item = keys.team.team_item(&name).to_string();
            mock.set_count(&item, 1);
            mock.on_action(&item, "click", move |dom, _| {
                st.lock().current_team = name.clone();
                dom.set_text(&k.current_team, &name);
                dom.remove(&k.team_list);
            });
        }

        let k = keys.clone();
        mock.on_action(&keys.options, "click", move |dom, _| {
            dom.set_count(&k.delete_item, 1);
        });
        // The options button is always rendered on the dashboard.
        mock.set_count(&keys.options, 1);

        let k = keys.clone();
        mock.on_action(&keys.delete_item, "click", move |dom, _| {
            dom.remove(&k.delete_item);
            dom.set_count(&k.confirm, 1);
            dom.set_count(&k.confirm_accept, 1);
        });

        let backend = self.backend.clone();
        let (k, st) = (keys.clone(), state.clone());
        mock.on_action(&keys.confirm_accept, "click", move |dom, _| {
            let team = st.lock().current_team.clone();
            let mut backend = backend.lock();
            *backend.delete_attempts.entry(team.clone()).or_default() += 1;
            if backend.fail_deletes {
                return;
            }
            backend.live.remove(&team);
            st.lock().current_team = DEFAULT_TEAM.to_string();
            dom.set_text(&k.current_team, DEFAULT_TEAM);
            dom.remove(&k.confirm);
            dom.remove(&k.confirm_accept);
        });
    }

    fn install_files(&self, mock: &MockDriver, keys: &Arc<Keys>, state: &Arc<Mutex<SessionState>>) {
        let backend = self.backend.clone();
        let (k, st) = (keys.clone(), state.clone());
        mock.on_action(&keys.nav_drafts, "click", move |dom, _| {
            let team = st.lock().current_team.clone();
            let files = backend.lock().team_files(&team);
            dom.set_count(&k.grid_root, 1);
            dom.set_count(&k.placeholder, 1);
            dom.set_count(&k.cards, files.len());
            for (_, name) in &files {
                dom.set_count(&k.card(name), 1);
                dom.set_text(&k.card_title(name), name);
            }
            if let Some((_, last)) = files.last() {
                dom.set_text(&k.last_title, last);
            }
        });

        let backend = self.backend.clone();
        let (k, st) = (keys.clone(), state.clone());
        mock.on_action(&keys.placeholder, "click", move |dom, _| {
            let team = st.lock().current_team.clone();
            let mut backend = backend.lock();
            let name = format!("New File {}", backend.team_files(&team).len() + 1);
            backend.files.push(FakeFile {
                team: team.clone(),
                name: name.clone(),
            });
            let count = backend.team_files(&team).len();
            dom.set_count(&k.cards, count);
            dom.set_text(&k.last_title, &name);
            dom.set_count(&k.card(&name), 1);
            dom.set_text(&k.card_title(&name), &name);
        });

        for &card_name in CARD_NAMES {
            let backend = self.backend.clone();
            let (k, st) = (keys.clone(), state.clone());
            mock.on_action(&keys.card(card_name), "double_click", move |dom, _| {
                let team = st.lock().current_team.clone();
                let Some(id) = backend.lock().find_file(&team, card_name) else {
                    return;
                };
                dom.set_url(&Backend::file_url(id));
                st.lock().open_file = Some(id);
                k.open_editor(dom);
            });

            let (k, st) = (keys.clone(), state.clone());
            mock.on_action(&keys.card(card_name), "right_click", move |dom, _| {
                st.lock().renaming = Some(card_name.to_string());
                dom.set_count(&k.menu, 1);
                dom.set_count(&k.rename_item, 1);
            });
        }

        let k = keys.clone();
        mock.on_action(&keys.rename_item, "click", move |dom, _| {
            dom.remove(&k.menu);
            dom.set_count(&k.rename_input, 1);
        });

        let backend = self.backend.clone();
        let (k, st) = (keys.clone(), state.clone());
        mock.on_action(&keys.rename_input, "press", move |dom, _| {
            let to = dom.value(&k.rename_input).unwrap_or_default().to_string();
            let Some(from) = st.lock().renaming.take() else {
                return;
            };
            let team = st.lock().current_team.clone();
            let mut backend = backend.lock();
            if let Some(file) = backend
                .files
                .iter_mut()
                .find(|f| f.team == team && f.name == from)
            {
                file.name = to.clone();
            }
            dom.remove(&k.card(&from));
            dom.remove(&k.card_title(&from));
            dom.remove(&k.rename_input);
            dom.set_count(&k.card(&to), 1);
            dom.set_text(&k.card_title(&to), &to);
        });

        let (k, st) = (keys.clone(), state.clone());
        mock.on_action(&keys.back, "click", move |dom, _| {
            dom.remove(&k.viewport);
            dom.remove(&k.back);
            dom.set_url(&format!("{BASE_URL}/#/dashboard"));
            dom.set_text(&k.current_team, &st.lock().current_team);
        });
    }
}

impl FakeStudio {
    fn install_editor(&self, mock: &MockDriver, keys: &Arc<Keys>, state: &Arc<Mutex<SessionState>>) {
        let (k, st) = (keys.clone(), state.clone());
        mock.on_action(&keys.rectangle_tool, "click", move |dom, _| {
            st.lock().rectangle_tool = true;
            dom.set_attribute(&k.rectangle_tool, "aria-pressed", "true");
        });

        // A drag with the rectangle tool armed adds one shape on release.
        let backend = self.backend.clone();
        let (k, st) = (keys.clone(), state.clone());
        mock.on_mouse(move |dom, input| {
            if !matches!(input, MouseInput::Up { .. }) {
                return;
            }
            let mut backend = backend.lock();
            let mut st = st.lock();
            if !std::mem::take(&mut st.rectangle_tool) {
                return;
            }
            let file = st.open_file;
            let file_name = file
                .and_then(|id| backend.files.get(id - 1))
                .map(|f| f.name.clone())
                .unwrap_or_default();
            backend.shapes.push((
                file.unwrap_or_default(),
                FakeShape {
                    file: file_name,
                    name: "Rectangle".into(),
                    fill: DEFAULT_FILL.into(),
                    radius: "0".into(),
                    tokens: Vec::new(),
                },
            ));
            let drawn = file.map_or(0, |id| {
                backend.shapes.iter().filter(|(f, _)| *f == id).count()
            });

            dom.set_attribute(&k.rectangle_tool, "aria-pressed", "false");
            dom.set_count(&k.layer_items, drawn);
            dom.set_count(&k.layer("Rectangle"), 1);
            dom.set_attribute(&k.layer("Rectangle"), "aria-selected", "true");
            dom.set_count(&k.design, 1);
            dom.set_count(&k.fill_swatch, 1);
            dom.set_value(&k.fill_inline, &format!("#{}", DEFAULT_FILL.to_uppercase()));
            dom.set_value(&k.radius, "0");
            k.save_cycle(dom);
        });

        let k = keys.clone();
        mock.on_action(&keys.layer("Rectangle"), "click", move |dom, _| {
            dom.set_attribute(&k.layer("Rectangle"), "aria-selected", "true");
        });

        let k = keys.clone();
        mock.on_action(&keys.fill_swatch, "click", move |dom, _| {
            dom.set_count(&k.picker, 1);
            dom.set_value(&k.picker_hex, "");
        });

        let backend = self.backend.clone();
        let (k, st) = (keys.clone(), state.clone());
        mock.on_action(&keys.picker_hex, "press", move |dom, _| {
            let hex = dom.value(&k.picker_hex).unwrap_or_default().to_ascii_lowercase();
            if let Some(shape) = backend.lock().last_shape(st.lock().open_file) {
                shape.fill = hex.clone();
            }
            dom.set_value(&k.fill_inline, &format!("#{}", hex.to_uppercase()));
            k.save_cycle(dom);
        });

        let k = keys.clone();
        mock.on_key("Escape", move |dom| {
            dom.remove(&k.picker);
            dom.remove(&k.picker_hex);
        });
    }

    fn install_tokens(&self, mock: &MockDriver, keys: &Arc<Keys>, state: &Arc<Mutex<SessionState>>) {
        let k = keys.clone();
        mock.on_key(&keys.toggle_tokens, move |dom| {
            if dom.exists(&k.tokens_sidebar) {
                dom.remove(&k.tokens_sidebar);
            } else {
                dom.set_count(&k.tokens_sidebar, 1);
                dom.set_count(&k.add_radius_token, 1);
            }
        });

        let k = keys.clone();
        mock.on_action(&keys.add_radius_token, "click", move |dom, _| {
            for key in [&k.token_form, &k.token_name, &k.token_value, &k.token_save] {
                dom.set_count(key, 1);
            }
            dom.set_value(&k.token_name, "");
            dom.set_value(&k.token_value, "");
        });

        let (k, st) = (keys.clone(), state.clone());
        mock.on_action(&keys.token_save, "click", move |dom, _| {
            let name = dom.value(&k.token_name).unwrap_or_default().to_string();
            let value = dom.value(&k.token_value).unwrap_or_default().to_string();
            for key in [&k.token_form, &k.token_name, &k.token_value, &k.token_save] {
                dom.remove(key);
            }
            dom.set_count(&k.pill(&name), 1);
            dom.set_text(&k.pill(&name), &name);
            st.lock().tokens.insert(name, value);
            k.save_cycle(dom);
        });

        for &token in TOKEN_NAMES {
            let backend = self.backend.clone();
            let (k, st) = (keys.clone(), state.clone());
            mock.on_action(&keys.pill(token), "click", move |dom, _| {
                let mut backend = backend.lock();
                let st = st.lock();
                let Some(value) = st.tokens.get(token).cloned() else {
                    return;
                };
                if let Some(shape) = backend.last_shape(st.open_file) {
                    shape.radius = value.clone();
                    shape.tokens.push(token.to_string());
                }
                dom.set_count(&k.tokens.applied_indicator(token).to_string(), 1);
                dom.set_value(&k.radius, &value);
                k.save_cycle(dom);
            });
        }
    }
}

#[async_trait]
impl SessionFactory for FakeStudio {
    async fn open(&self) -> E2eResult<Session> {
        Ok(self.open_session().1)
    }
}
