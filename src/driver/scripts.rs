//! Page-side scripts. Each is a function expression invoked with JSON-encoded
//! arguments; anything structured comes back through `JSON.stringify`.

/// Attribute used to stamp element handles onto DOM nodes.
pub const HANDLE_ATTR: &str = "data-nav-handle";

/// Selector for a stamped handle.
pub fn handle_selector(id: &str) -> String {
    format!("[{}=\"{}\"]", HANDLE_ATTR, id)
}

/// Build a call expression `script(arg)`.
pub fn call(script: &str, arg: &impl serde::Serialize) -> String {
    // Serializing plain data to a JSON string cannot fail.
    let arg = serde_json::to_string(arg).unwrap_or_else(|_| "null".into());
    format!("({})({})", script.trim(), arg)
}

/// Resolve a selector request to stamped handles, in document order.
///
/// Replies `{handles: [...]}` or `{error: "stale" | message}`.
pub const QUERY_JS: &str = r#"
(req) => {
    const ATTR = 'data-nav-handle';
    const stamp = el => {
        let id = el.getAttribute(ATTR);
        if (!id) {
            window.__navSeq = (window.__navSeq || 0) + 1;
            id = 'h' + window.__navSeq;
            el.setAttribute(ATTR, id);
        }
        return id;
    };
    const lc = s => (s || '').toLowerCase().replace(/\s+/g, ' ').trim();
    const labelOf = el => {
        if (!el.id) return '';
        const l = document.querySelector(`label[for="${CSS.escape(el.id)}"]`);
        return l ? l.innerText : '';
    };

    let scope = document;
    if (req.root) {
        scope = document.querySelector(`[${ATTR}="${req.root}"]`);
        if (!scope) return JSON.stringify({ error: 'stale' });
    }

    let found = [];
    try {
        switch (req.kind) {
            case 'css':
                found = [...scope.querySelectorAll(req.css)];
                break;
            case 'text': {
                const re = new RegExp(req.pattern, req.flags);
                const hits = [...scope.querySelectorAll('body *')]
                    .filter(el => re.test((el.innerText || '').trim()));
                found = hits.filter(el => !hits.some(o => o !== el && el.contains(o)));
                break;
            }
            case 'has_text': {
                const needle = lc(req.text);
                found = [...scope.querySelectorAll(req.tag)].filter(el => {
                    if (!needle) return true;
                    const label = labelOf(el);
                    const hay = [
                        el.innerText,
                        el.getAttribute('placeholder'),
                        label,
                        el.getAttribute('aria-label'),
                        [el.getAttribute('placeholder'), label].filter(Boolean).join(' '),
                    ];
                    return hay.some(h => lc(h).includes(needle));
                });
                break;
            }
        }
    } catch (e) {
        return JSON.stringify({ error: String(e) });
    }
    return JSON.stringify({ handles: found.map(stamp) });
}
"#;

/// Describe a stamped element, or `null` once it is gone.
pub const DESCRIBE_JS: &str = r#"
(id) => {
    const el = document.querySelector(`[data-nav-handle="${id}"]`);
    if (!el) return 'null';
    const clean = s => (s || '').replace(/\s+/g, ' ').trim();
    const r = el.getBoundingClientRect();
    const s = getComputedStyle(el);
    const label = el.id ? document.querySelector(`label[for="${CSS.escape(el.id)}"]`) : null;
    const container = el.parentElement ? el.parentElement.closest('div, li, section, article') : null;
    const heading = el.matches('h1,h2,h3,h4,h5,h6') ? el : el.querySelector('h1,h2,h3,h4,h5,h6');
    return JSON.stringify({
        tag: el.tagName.toLowerCase(),
        text: clean(el.innerText).slice(0, 300),
        placeholder: el.getAttribute('placeholder'),
        label: label ? clean(label.innerText) : null,
        container_text: container ? clean(container.innerText).slice(0, 300) : null,
        title: el.getAttribute('title'),
        heading: heading ? clean(heading.innerText) : null,
        bbox: { x: r.x, y: r.y, width: r.width, height: r.height },
        visible: r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none',
    });
}
"#;

pub const METRICS_JS: &str = r#"
JSON.stringify({
    child_count: document.body ? document.body.childElementCount : 0,
    scroll_height: document.body ? document.body.scrollHeight : 0,
    dom_length: document.documentElement.outerHTML.length,
})
"#;

pub const READY_STATE_JS: &str = "document.readyState";

/// `'angular'`, `'angularjs'` or `''`.
pub const FRAMEWORK_JS: &str = r#"
(() => {
    if (typeof window.getAllAngularTestabilities === 'function' || document.querySelector('[ng-version]')) {
        return 'angular';
    }
    if (window.angular || document.querySelector('[ng-app],[data-ng-app]')) {
        return 'angularjs';
    }
    return '';
})()
"#;

/// Throws when the testability API is unreachable.
pub const ANGULAR_SETTLED_JS: &str = r#"
window.getAllAngularTestabilities().findIndex(x => !x.isStable()) === -1
"#;

/// Throws when the injector is unreachable.
pub const ANGULARJS_SETTLED_JS: &str = r#"
(() => {
    const root = document.querySelector('[ng-app],[data-ng-app]') || document.body;
    return window.angular.element(root).injector().get('$http').pendingRequests.length === 0;
})()
"#;

/// Element-level operations reply `'missing'` when the handle no longer
/// resolves, otherwise a JSON value.
pub const SCROLL_JS: &str = r#"
(id) => {
    const el = document.querySelector(`[data-nav-handle="${id}"]`);
    if (!el) return 'missing';
    el.scrollIntoView({ block: 'center', inline: 'center' });
    return 'true';
}
"#;

pub const RENDERED_JS: &str = r#"
(id) => {
    const el = document.querySelector(`[data-nav-handle="${id}"]`);
    if (!el) return 'missing';
    const s = getComputedStyle(el);
    const ok = s.visibility !== 'hidden' && s.display !== 'none' && el.offsetWidth > 0 && el.offsetHeight > 0;
    return JSON.stringify(ok);
}
"#;

pub const BBOX_JS: &str = r#"
(id) => {
    const el = document.querySelector(`[data-nav-handle="${id}"]`);
    if (!el) return 'missing';
    const r = el.getBoundingClientRect();
    return JSON.stringify({ x: r.x, y: r.y, width: r.width, height: r.height });
}
"#;

pub const DISPATCH_CLICK_JS: &str = r#"
(id) => {
    const el = document.querySelector(`[data-nav-handle="${id}"]`);
    if (!el) return 'missing';
    el.dispatchEvent(new MouseEvent('click', { bubbles: true, cancelable: true, view: window }));
    return 'true';
}
"#;

pub const INVOKE_CLICK_JS: &str = r#"
(id) => {
    const el = document.querySelector(`[data-nav-handle="${id}"]`);
    if (!el) return 'missing';
    el.scrollIntoView({ block: 'center' });
    el.click();
    return 'true';
}
"#;

pub const FOCUS_JS: &str = r#"
(id) => {
    const el = document.querySelector(`[data-nav-handle="${id}"]`);
    if (!el) return 'missing';
    el.focus();
    return 'true';
}
"#;

/// Reply is `'false'` when no option matches.
pub const SELECT_JS: &str = r#"
(arg) => {
    const sel = document.querySelector(`[data-nav-handle="${arg.id}"]`);
    if (!sel) return 'missing';
    if (!sel.options) return 'false';
    const want = arg.val.trim().toLowerCase();
    const opt = Array.from(sel.options).find(o =>
        o.value === arg.val || o.text.trim() === arg.val.trim() || o.text.trim().toLowerCase() === want);
    if (!opt) return 'false';
    sel.value = opt.value;
    sel.dispatchEvent(new Event('input', { bubbles: true }));
    sel.dispatchEvent(new Event('change', { bubbles: true }));
    return 'true';
}
"#;
