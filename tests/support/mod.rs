//! In-memory browser for exercising the engine without Chrome.
//!
//! Pages hold a flat list of scripted elements (with optional parents),
//! understand the small CSS subset the locator uses, and record every
//! interaction in a log shared by all pages of a browser.

#![allow(dead_code)]

use lms_navigator::{
    BoundingBox, BrowserContext, DomMetrics, ElementHandle, ElementInfo, Error, Framework,
    LoadState, PageDriver, PageId, Result, Selector,
};
use regex::RegexBuilder;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

pub type Log = Rc<RefCell<Vec<String>>>;

/// What happens when an element is clicked.
#[derive(Debug, Clone, Default)]
pub enum Effect {
    #[default]
    None,
    /// Client-side route change: new URL and DOM, then `churn` metric
    /// samples that keep changing.
    Navigate {
        url: String,
        dom: Vec<FakeElement>,
        churn: u32,
    },
    /// Open a new tab.
    OpenTab { url: String, dom: Vec<FakeElement> },
    /// Close the tab the element lives in.
    CloseTab,
}

#[derive(Debug, Clone)]
pub struct FakeElement {
    pub tag: String,
    pub text: String,
    pub attrs: HashMap<String, String>,
    pub label: Option<String>,
    pub container_text: Option<String>,
    pub heading: Option<String>,
    pub bbox: BoundingBox,
    pub visible: bool,
    pub parent: Option<usize>,
    /// `is_rendered` answers false this many times first.
    pub rendered_after: u32,
    pub fail_native_click: bool,
    pub fail_dispatch_click: bool,
    pub options: Vec<String>,
    pub effect: Effect,
}

impl FakeElement {
    pub fn new(tag: &str, text: &str) -> Self {
        Self {
            tag: tag.into(),
            text: text.into(),
            attrs: HashMap::new(),
            label: None,
            container_text: None,
            heading: None,
            bbox: BoundingBox::new(0.0, 0.0, 120.0, 30.0),
            visible: true,
            parent: None,
            rendered_after: 0,
            fail_native_click: false,
            fail_dispatch_click: false,
            options: Vec::new(),
            effect: Effect::None,
        }
    }

    pub fn link(text: &str) -> Self {
        Self::new("a", text)
    }

    pub fn button(text: &str) -> Self {
        Self::new("button", text)
    }

    pub fn input(placeholder: &str) -> Self {
        Self::new("input", "").attr("placeholder", placeholder)
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn container_text(mut self, text: &str) -> Self {
        self.container_text = Some(text.into());
        self
    }

    pub fn heading(mut self, text: &str) -> Self {
        self.heading = Some(text.into());
        self
    }

    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.bbox = BoundingBox::new(0.0, 0.0, width, height);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn child_of(mut self, parent: usize) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn rendered_after(mut self, polls: u32) -> Self {
        self.rendered_after = polls;
        self
    }

    pub fn failing_native_click(mut self) -> Self {
        self.fail_native_click = true;
        self
    }

    pub fn failing_dispatch_click(mut self) -> Self {
        self.fail_dispatch_click = true;
        self
    }

    pub fn options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn on_click(mut self, effect: Effect) -> Self {
        self.effect = effect;
        self
    }

    fn info(&self) -> ElementInfo {
        ElementInfo {
            tag: self.tag.clone(),
            text: self.text.clone(),
            placeholder: self.attrs.get("placeholder").cloned(),
            label: self.label.clone(),
            container_text: self.container_text.clone(),
            title: self.attrs.get("title").cloned(),
            heading: self.heading.clone(),
            bbox: Some(self.bbox),
            visible: self.visible,
        }
    }

    fn display(&self) -> String {
        if self.text.is_empty() {
            format!("<{}>", self.tag)
        } else {
            self.text.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// CSS subset: `tag`, `*`, `.class`, `[attr]`, `[attr="v"]`, `[attr*="v" i]`,
// comma-separated lists.
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum AttrOp {
    Exists,
    Equals,
    Contains,
}

#[derive(Debug)]
struct AttrCond {
    name: String,
    op: AttrOp,
    value: String,
    case_insensitive: bool,
}

#[derive(Debug, Default)]
struct Compound {
    tag: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrCond>,
}

fn split_list(css: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let (mut depth, mut quoted, mut start) = (0, false, 0);
    for (i, c) in css.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '[' if !quoted => depth += 1,
            ']' if !quoted => depth -= 1,
            ',' if !quoted && depth == 0 => {
                parts.push(css[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(css[start..].trim());
    parts
}

fn parse_attr(inner: &str) -> AttrCond {
    let (name, op, rest) = if let Some(pos) = inner.find("*=") {
        (&inner[..pos], AttrOp::Contains, &inner[pos + 2..])
    } else if let Some(pos) = inner.find('=') {
        (&inner[..pos], AttrOp::Equals, &inner[pos + 1..])
    } else {
        (inner, AttrOp::Exists, "")
    };
    let rest = rest.trim();
    let (value, case_insensitive) = match rest.rfind('"') {
        Some(end) if rest.starts_with('"') && end > 0 => {
            (rest[1..end].to_string(), rest[end + 1..].trim() == "i")
        }
        _ => (rest.to_string(), false),
    };
    AttrCond {
        name: name.trim().to_string(),
        op,
        value,
        case_insensitive,
    }
}

fn parse_compound(s: &str) -> Compound {
    let mut compound = Compound::default();
    let chars: Vec<char> = s.chars().collect();
    let mut i = 0;
    let ident = |i: &mut usize| {
        let start = *i;
        while *i < chars.len() && (chars[*i].is_alphanumeric() || chars[*i] == '-' || chars[*i] == '_') {
            *i += 1;
        }
        chars[start..*i].iter().collect::<String>()
    };

    if i < chars.len() && chars[i] == '*' {
        i += 1;
    } else {
        let tag = ident(&mut i);
        if !tag.is_empty() {
            compound.tag = Some(tag.to_lowercase());
        }
    }
    while i < chars.len() {
        match chars[i] {
            '.' => {
                i += 1;
                compound.classes.push(ident(&mut i));
            }
            '[' => {
                let start = i + 1;
                let mut quoted = false;
                while i < chars.len() && !(chars[i] == ']' && !quoted) {
                    if chars[i] == '"' {
                        quoted = !quoted;
                    }
                    i += 1;
                }
                let inner: String = chars[start..i].iter().collect();
                compound.attrs.push(parse_attr(&inner));
                i += 1;
            }
            _ => i += 1,
        }
    }
    compound
}

fn matches_compound(el: &FakeElement, c: &Compound) -> bool {
    if let Some(tag) = &c.tag {
        if &el.tag != tag {
            return false;
        }
    }
    let class_attr = el.attrs.get("class").cloned().unwrap_or_default();
    if !c
        .classes
        .iter()
        .all(|cls| class_attr.split_whitespace().any(|x| x == cls))
    {
        return false;
    }
    c.attrs.iter().all(|cond| {
        let Some(actual) = el.attrs.get(&cond.name) else {
            return false;
        };
        let (actual, want) = if cond.case_insensitive {
            (actual.to_lowercase(), cond.value.to_lowercase())
        } else {
            (actual.clone(), cond.value.clone())
        };
        match cond.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == want,
            AttrOp::Contains => actual.contains(&want),
        }
    })
}

fn matches_css(el: &FakeElement, css: &str) -> bool {
    split_list(css)
        .into_iter()
        .any(|part| matches_compound(el, &parse_compound(part)))
}

fn has_text_matches(el: &FakeElement, tag: &str, text: &str) -> bool {
    if el.tag != tag {
        return false;
    }
    let needle = text.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    let placeholder = el.attrs.get("placeholder").cloned();
    let combined = [placeholder.clone(), el.label.clone()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    [
        Some(el.text.clone()),
        placeholder,
        el.label.clone(),
        el.attrs.get("aria-label").cloned(),
        Some(combined),
    ]
    .into_iter()
    .flatten()
    .any(|h| h.to_lowercase().contains(&needle))
}

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct PageState {
    url: String,
    dom: Vec<FakeElement>,
    generation: u32,
    churn: u32,
    height: i64,
    closed: bool,
    framework: Option<Framework>,
    framework_busy: u32,
    routes: HashMap<String, Vec<FakeElement>>,
    /// URLs whose navigation reports failure after landing.
    flaky_routes: Vec<String>,
    focused: Option<usize>,
    values: HashMap<usize, String>,
    /// The tab closes when the next element query arrives.
    close_on_query: bool,
}

#[derive(Debug)]
struct Spawn {
    url: String,
    dom: Vec<FakeElement>,
}

#[derive(Debug)]
pub struct FakePage {
    id: PageId,
    state: RefCell<PageState>,
    spawn: Rc<RefCell<Vec<Spawn>>>,
    log: Log,
}

impl FakePage {
    fn new(id: PageId, url: &str, dom: Vec<FakeElement>, spawn: Rc<RefCell<Vec<Spawn>>>, log: Log) -> Self {
        Self {
            id,
            state: RefCell::new(PageState {
                url: url.into(),
                dom,
                generation: 0,
                churn: 0,
                height: 1000,
                closed: false,
                framework: None,
                framework_busy: 0,
                routes: HashMap::new(),
                flaky_routes: Vec::new(),
                focused: None,
                values: HashMap::new(),
                close_on_query: false,
            }),
            spawn,
            log,
        }
    }

    fn record(&self, event: String) {
        self.log.borrow_mut().push(event);
    }

    /// Make the next `n` metric samples differ from each other.
    pub fn set_churn(&self, n: u32) {
        self.state.borrow_mut().churn = n;
    }

    pub fn set_framework(&self, framework: Framework, busy_polls: u32) {
        let mut state = self.state.borrow_mut();
        state.framework = Some(framework);
        state.framework_busy = busy_polls;
    }

    pub fn add_route(&self, url: &str, dom: Vec<FakeElement>) {
        self.state.borrow_mut().routes.insert(url.into(), dom);
    }

    pub fn add_flaky_route(&self, url: &str, dom: Vec<FakeElement>) {
        let mut state = self.state.borrow_mut();
        state.routes.insert(url.into(), dom);
        state.flaky_routes.push(url.into());
    }

    pub fn close(&self) {
        self.state.borrow_mut().closed = true;
    }

    /// Close the tab underneath the next `query_all`, as a user would.
    pub fn close_on_next_query(&self) {
        self.state.borrow_mut().close_on_query = true;
    }

    pub fn current_url(&self) -> String {
        self.state.borrow().url.clone()
    }

    /// Value entered into the element with this text or placeholder.
    pub fn value_of(&self, text_or_placeholder: &str) -> Option<String> {
        let state = self.state.borrow();
        let index = state.dom.iter().position(|el| {
            el.text == text_or_placeholder
                || el.attrs.get("placeholder").map(String::as_str) == Some(text_or_placeholder)
                || el.label.as_deref() == Some(text_or_placeholder)
        })?;
        state.values.get(&index).cloned()
    }

    fn load(&self, url: &str, dom: Vec<FakeElement>, churn: u32) {
        let mut state = self.state.borrow_mut();
        state.url = url.into();
        state.dom = dom;
        state.generation += 1;
        state.churn = churn;
        state.focused = None;
        state.values.clear();
    }

    fn handle(&self, generation: u32, index: usize) -> ElementHandle {
        ElementHandle::new(format!("g{}-{}", generation, index))
    }

    fn check_open(&self) -> Result<()> {
        if self.state.borrow().closed {
            return Err(Error::PageUnavailable(format!("tab {} closed", self.id)));
        }
        Ok(())
    }

    /// Resolve a handle to its element index in the current DOM.
    fn resolve(&self, handle: &ElementHandle) -> Result<usize> {
        self.check_open()?;
        let state = self.state.borrow();
        let stale = || Error::ElementNotFound(format!("element {} is no longer attached", handle));
        let (generation, index) = handle
            .as_str()
            .strip_prefix('g')
            .and_then(|rest| rest.split_once('-'))
            .ok_or_else(stale)?;
        let generation: u32 = generation.parse().map_err(|_| stale())?;
        let index: usize = index.parse().map_err(|_| stale())?;
        if generation != state.generation || index >= state.dom.len() {
            return Err(stale());
        }
        Ok(index)
    }

    fn element(&self, handle: &ElementHandle) -> Result<FakeElement> {
        let index = self.resolve(handle)?;
        Ok(self.state.borrow().dom[index].clone())
    }

    fn is_descendant(dom: &[FakeElement], mut index: usize, root: usize) -> bool {
        while let Some(parent) = dom[index].parent {
            if parent == root {
                return true;
            }
            index = parent;
        }
        false
    }

    fn select(&self, selector: &Selector, root: Option<usize>) -> Result<Vec<ElementHandle>> {
        let state = self.state.borrow();
        let in_scope =
            |i: usize| root.map_or(true, |r| Self::is_descendant(&state.dom, i, r));
        let mut hits: Vec<usize> = match selector {
            Selector::Css(css) => (0..state.dom.len())
                .filter(|&i| in_scope(i) && matches_css(&state.dom[i], css))
                .collect(),
            Selector::HasText { tag, text } => (0..state.dom.len())
                .filter(|&i| in_scope(i) && has_text_matches(&state.dom[i], tag, text))
                .collect(),
            Selector::Text {
                pattern,
                case_insensitive,
            } => {
                let re = RegexBuilder::new(pattern)
                    .case_insensitive(*case_insensitive)
                    .build()
                    .map_err(|e| Error::ActionFailed(e.to_string()))?;
                let matched: Vec<usize> = (0..state.dom.len())
                    .filter(|&i| in_scope(i) && re.is_match(state.dom[i].text.trim()))
                    .collect();
                // Deepest matches only.
                matched
                    .iter()
                    .copied()
                    .filter(|&i| {
                        !matched
                            .iter()
                            .any(|&j| j != i && Self::is_descendant(&state.dom, j, i))
                    })
                    .collect()
            }
        };
        hits.dedup();
        Ok(hits
            .into_iter()
            .map(|i| self.handle(state.generation, i))
            .collect())
    }

    fn fire(&self, index: usize) {
        let effect = self.state.borrow().dom[index].effect.clone();
        match effect {
            Effect::None => {}
            Effect::Navigate { url, dom, churn } => self.load(&url, dom, churn),
            Effect::OpenTab { url, dom } => self.spawn.borrow_mut().push(Spawn { url, dom }),
            Effect::CloseTab => self.close(),
        }
    }
}

impl PageDriver for FakePage {
    fn id(&self) -> &PageId {
        &self.id
    }

    async fn url(&self) -> Result<String> {
        self.check_open()?;
        Ok(self.current_url())
    }

    async fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }

    async fn query_all(&self, selector: &Selector) -> Result<Vec<ElementHandle>> {
        self.check_open()?;
        let closing = std::mem::take(&mut self.state.borrow_mut().close_on_query);
        if closing {
            self.close();
            self.record(format!("closed:{}", self.id));
            return self.check_open().map(|_| Vec::new());
        }
        self.record(format!("query:{}", selector));
        self.select(selector, None)
    }

    async fn query_within(
        &self,
        root: &ElementHandle,
        selector: &Selector,
    ) -> Result<Vec<ElementHandle>> {
        let root = self.resolve(root)?;
        self.select(selector, Some(root))
    }

    async fn describe(&self, element: &ElementHandle) -> Result<ElementInfo> {
        Ok(self.element(element)?.info())
    }

    async fn metrics(&self) -> Result<DomMetrics> {
        self.check_open()?;
        let mut state = self.state.borrow_mut();
        if state.churn > 0 {
            state.churn -= 1;
            state.height += 100;
            drop(state);
            self.record("metrics:churn".into());
            let state = self.state.borrow();
            return Ok(DomMetrics {
                child_count: state.dom.len() as u64,
                scroll_height: state.height,
                dom_length: 5000,
            });
        }
        let metrics = DomMetrics {
            child_count: state.dom.len() as u64,
            scroll_height: state.height,
            dom_length: 5000,
        };
        drop(state);
        self.record("metrics:stable".into());
        Ok(metrics)
    }

    async fn wait_for_load(&self, _state: LoadState, _timeout: Duration) -> Result<()> {
        self.check_open()
    }

    async fn detect_framework(&self) -> Result<Option<Framework>> {
        self.check_open()?;
        Ok(self.state.borrow().framework)
    }

    async fn framework_settled(&self, framework: Framework) -> Result<bool> {
        self.check_open()?;
        let mut state = self.state.borrow_mut();
        if state.framework != Some(framework) {
            return Err(Error::ActionFailed("framework hook unavailable".into()));
        }
        if state.framework_busy > 0 {
            state.framework_busy -= 1;
            drop(state);
            self.record("framework:busy".into());
            return Ok(false);
        }
        drop(state);
        self.record("framework:settled".into());
        Ok(true)
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> Result<()> {
        let el = self.element(element)?;
        self.record(format!("scroll:{}", el.display()));
        Ok(())
    }

    async fn is_rendered(&self, element: &ElementHandle) -> Result<bool> {
        let index = self.resolve(element)?;
        let mut state = self.state.borrow_mut();
        let el = &mut state.dom[index];
        if el.rendered_after > 0 {
            el.rendered_after -= 1;
            drop(state);
            self.record("rendered:no".into());
            return Ok(false);
        }
        Ok(el.visible)
    }

    async fn click(&self, element: &ElementHandle, _timeout: Duration) -> Result<()> {
        let index = self.resolve(element)?;
        let el = self.state.borrow().dom[index].clone();
        if el.fail_native_click {
            self.record(format!("click-failed:{}", el.display()));
            return Err(Error::Timeout("element intercepted".into()));
        }
        self.record(format!("click:{}", el.display()));
        self.state.borrow_mut().focused = Some(index);
        self.fire(index);
        Ok(())
    }

    async fn dispatch_click(&self, element: &ElementHandle) -> Result<()> {
        let index = self.resolve(element)?;
        let el = self.state.borrow().dom[index].clone();
        if el.fail_dispatch_click {
            self.record(format!("dispatch-failed:{}", el.display()));
            return Err(Error::ActionFailed("event swallowed".into()));
        }
        self.record(format!("dispatch:{}", el.display()));
        self.fire(index);
        Ok(())
    }

    async fn invoke_click(&self, element: &ElementHandle) -> Result<()> {
        let index = self.resolve(element)?;
        let el = self.state.borrow().dom[index].clone();
        self.record(format!("invoke:{}", el.display()));
        self.fire(index);
        Ok(())
    }

    async fn hover(&self, element: &ElementHandle, _timeout: Duration) -> Result<()> {
        let el = self.element(element)?;
        self.record(format!("hover:{}", el.display()));
        Ok(())
    }

    async fn fill(&self, element: &ElementHandle, value: &str) -> Result<()> {
        let index = self.resolve(element)?;
        let el = self.state.borrow().dom[index].clone();
        self.record(format!("fill:{}={}", el.display(), value));
        self.state.borrow_mut().values.insert(index, value.into());
        Ok(())
    }

    async fn type_text(&self, text: &str, _delay: Duration) -> Result<()> {
        self.check_open()?;
        let focused = self.state.borrow().focused;
        let Some(index) = focused else {
            return Err(Error::ActionFailed("nothing focused".into()));
        };
        self.record(format!("type:{}", text));
        self.state
            .borrow_mut()
            .values
            .entry(index)
            .or_default()
            .push_str(text);
        Ok(())
    }

    async fn select_option(&self, element: &ElementHandle, option: &str) -> Result<()> {
        let index = self.resolve(element)?;
        let el = self.state.borrow().dom[index].clone();
        if !el.options.iter().any(|o| o == option) {
            return Err(Error::ElementNotFound(format!("option \"{}\"", option)));
        }
        self.record(format!("select:{}", option));
        self.state.borrow_mut().values.insert(index, option.into());
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        self.check_open()?;
        self.record(format!("key:{}", key));
        Ok(())
    }

    async fn goto(&self, url: &str, _timeout: Duration) -> Result<()> {
        self.check_open()?;
        self.record(format!("goto:{}", url));
        let (dom, flaky) = {
            let state = self.state.borrow();
            (
                state.routes.get(url).cloned(),
                state.flaky_routes.iter().any(|r| r == url),
            )
        };
        let Some(dom) = dom else {
            return Err(Error::NavigationFailed(format!("{}: net::ERR_NAME_NOT_RESOLVED", url)));
        };
        self.load(url, dom, 0);
        if flaky {
            return Err(Error::Timeout("load event never fired".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Browser
// ---------------------------------------------------------------------------

pub struct FakeBrowser {
    pages: Vec<FakePage>,
    opened: Vec<PageId>,
    spawn: Rc<RefCell<Vec<Spawn>>>,
    log: Log,
    /// Whether spawned tabs are reported through `take_opened`.
    announce: bool,
    next_id: u32,
}

impl FakeBrowser {
    /// One tab at `url` showing `dom`.
    pub fn new(url: &str, dom: Vec<FakeElement>) -> Self {
        let spawn = Rc::new(RefCell::new(Vec::new()));
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let page = FakePage::new(PageId::new("tab-0"), url, dom, spawn.clone(), log.clone());
        Self {
            pages: vec![page],
            opened: Vec::new(),
            spawn,
            log,
            announce: true,
            next_id: 1,
        }
    }

    /// Spawned tabs show up in `pages` but are never announced.
    pub fn silent(mut self) -> Self {
        self.announce = false;
        self
    }

    pub fn first(&self) -> &FakePage {
        &self.pages[0]
    }

    pub fn tab(&self, id: &str) -> &FakePage {
        self.pages
            .iter()
            .find(|p| p.id.as_str() == id)
            .unwrap_or_else(|| panic!("no tab {}", id))
    }

    /// Open a tab as if the user did it.
    pub fn open_tab(&mut self, url: &str, dom: Vec<FakeElement>) -> PageId {
        self.spawn.borrow_mut().push(Spawn {
            url: url.into(),
            dom,
        });
        self.drain_spawns();
        self.pages.last().map(|p| p.id.clone()).unwrap_or_else(|| PageId::new(""))
    }

    pub fn log(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    pub fn clear_log(&self) {
        self.log.borrow_mut().clear();
    }

    /// Index of the first log entry satisfying `pred`.
    pub fn position(&self, pred: impl Fn(&str) -> bool) -> Option<usize> {
        self.log.borrow().iter().position(|e| pred(e))
    }

    fn drain_spawns(&mut self) {
        let spawns: Vec<Spawn> = self.spawn.borrow_mut().drain(..).collect();
        for s in spawns {
            let id = PageId::new(format!("tab-{}", self.next_id));
            self.next_id += 1;
            self.log.borrow_mut().push(format!("open:{}", id));
            self.pages.push(FakePage::new(
                id.clone(),
                &s.url,
                s.dom,
                self.spawn.clone(),
                self.log.clone(),
            ));
            if self.announce {
                self.opened.push(id);
            }
        }
    }
}

impl BrowserContext for FakeBrowser {
    type Page = FakePage;

    async fn pages(&mut self) -> Result<Vec<PageId>> {
        self.drain_spawns();
        Ok(self
            .pages
            .iter()
            .filter(|p| !p.state.borrow().closed)
            .map(|p| p.id.clone())
            .collect())
    }

    fn page(&self, id: &PageId) -> Option<&FakePage> {
        self.pages
            .iter()
            .find(|p| &p.id == id && !p.state.borrow().closed)
    }

    async fn take_opened(&mut self) -> Result<Vec<PageId>> {
        self.drain_spawns();
        Ok(std::mem::take(&mut self.opened))
    }
}

/// The course list page used across scenarios.
pub const COURSES_URL: &str = "https://learn.uq.edu.au/ultra/course";
