//! Rich-text editor heuristic for "post content" style descriptions.

use crate::config::{ActionKind, LocatorConfig};
use crate::driver::{ElementHandle, ElementInfo, PageDriver, Selector};
use crate::{Error, Result};
use tracing::debug;

/// Editor selectors, most specific first.
pub const EDITOR_SELECTORS: &[&str] = &[
    r#"div[role="textbox"]"#,
    r#"div[contenteditable="true"]"#,
    ".ql-editor",
    ".tox-edit-area",
    ".cke_contents",
    ".ProseMirror",
    ".public-DraftEditor-content",
    ".w-md-editor-content",
    "textarea.large-textarea",
    r#"textarea[aria-label="Post content"]"#,
];

/// Fallback pool when no editor is large enough.
pub const FALLBACK_SELECTOR: &str = r#"textarea, div[contenteditable="true"]"#;

/// Text entry into something described as post / reply / comment content.
pub fn wants_text_area(intent: ActionKind, description: &str, keywords: &[String]) -> bool {
    if !intent.is_text_entry() {
        return false;
    }
    let desc = description.to_lowercase();
    keywords.iter().any(|k| desc.contains(&k.to_lowercase()))
}

/// Describe, treating a detached node as absent.
pub(crate) async fn describe_live<P: PageDriver>(
    page: &P,
    handle: &ElementHandle,
) -> Result<Option<ElementInfo>> {
    match page.describe(handle).await {
        Ok(info) => Ok(Some(info)),
        Err(Error::ElementNotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// First sufficiently large visible editor, else the largest visible
/// textarea or content-editable.
pub async fn find_editor<P: PageDriver>(
    page: &P,
    config: &LocatorConfig,
) -> Result<Option<(ElementHandle, ElementInfo)>> {
    for css in EDITOR_SELECTORS {
        for handle in page.query_all(&Selector::css(*css)).await? {
            let Some(info) = describe_live(page, &handle).await? else {
                continue;
            };
            let big_enough = info.bbox.is_some_and(|b| {
                b.width > config.editor_min_width && b.height > config.editor_min_height
            });
            if info.visible && big_enough {
                debug!("editor matched {}", css);
                return Ok(Some((handle, info)));
            }
        }
    }

    let mut best: Option<(ElementHandle, ElementInfo, f64)> = None;
    for handle in page.query_all(&Selector::css(FALLBACK_SELECTOR)).await? {
        let Some(info) = describe_live(page, &handle).await? else {
            continue;
        };
        if !info.visible {
            continue;
        }
        let area = info.bbox.map(|b| b.area()).unwrap_or(0.0);
        if best.as_ref().map_or(true, |(_, _, a)| area > *a) {
            best = Some((handle, info, area));
        }
    }
    if let Some((_, info, area)) = &best {
        debug!("largest text area <{}> ({} px²)", info.tag, area);
    }
    Ok(best.map(|(handle, info, _)| (handle, info)))
}
