//! The HTML shell the front end is mounted into.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{CoopGamesError, Result};

/// A root component attached under a host element.
#[derive(Debug, Clone, PartialEq)]
pub struct MountedRoot {
    /// Tag of the root component.
    pub component: String,
    /// Markup inserted as the element's first child.
    pub markup: String,
}

/// An element of the host page that carries an `id`.
#[derive(Debug, Clone)]
pub struct Element {
    pub tag: String,
    pub id: String,
    open_tag_end: usize,
    root: Option<MountedRoot>,
}

impl Element {
    pub fn root(&self) -> Option<&MountedRoot> {
        self.root.as_ref()
    }

    /// Number of roots attached under this element (0 or 1).
    pub fn root_count(&self) -> usize {
        usize::from(self.root.is_some())
    }
}

/// A parsed host document with its id-bearing elements.
#[derive(Debug, Clone)]
pub struct HostPage {
    html: String,
    elements: BTreeMap<String, Element>,
}

fn element_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?is)<([a-z][a-z0-9-]*)\b[^>]*?\sid\s*=\s*["']([^"']+)["'][^>]*>"#)
            .expect("element pattern is a valid regex")
    })
}

// An unterminated comment runs to the end of the document
fn comment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)<!--.*?(?:-->|\z)").expect("comment pattern is a valid regex")
    })
}

impl HostPage {
    /// Parse `html`, indexing every opening tag that has an `id` attribute.
    ///
    /// Tags inside `<!-- -->` comments are ignored. When an id repeats, the
    /// first element wins.
    pub fn parse(html: impl Into<String>) -> Self {
        let html = html.into();
        let mut elements = BTreeMap::new();

        // Blank out comments byte for byte so offsets still index `html`
        let scan = comment_pattern().replace_all(&html, |caps: &regex::Captures| {
            " ".repeat(caps[0].len())
        });

        for caps in element_pattern().captures_iter(&scan) {
            let (Some(whole), Some(tag), Some(id)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                continue;
            };
            if whole.as_str().ends_with("/>") {
                continue;
            }
            elements.entry(id.as_str().to_string()).or_insert_with(|| Element {
                tag: tag.as_str().to_ascii_lowercase(),
                id: id.as_str().to_string(),
                open_tag_end: whole.end(),
                root: None,
            });
        }

        Self { html, elements }
    }

    /// Find an element by `#id` selector. Other selector kinds match nothing.
    pub fn find(&self, selector: &str) -> Option<&Element> {
        let id = selector.strip_prefix('#')?;
        self.elements.get(id)
    }

    /// Ids of every indexed element.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.elements.keys().map(String::as_str)
    }

    /// Attach `root` under the element matching `selector`.
    pub(crate) fn attach(&mut self, selector: &str, root: MountedRoot) -> Result<()> {
        let element = selector
            .strip_prefix('#')
            .and_then(|id| self.elements.get_mut(id))
            .ok_or_else(|| CoopGamesError::MountPointMissing(selector.to_string()))?;
        if element.root.is_some() {
            return Err(CoopGamesError::AlreadyMounted(selector.to_string()));
        }
        element.root = Some(root);
        Ok(())
    }

    /// The document with every mounted root inserted into its element.
    pub fn render(&self) -> String {
        let mut mounted: Vec<&Element> = self
            .elements
            .values()
            .filter(|e| e.root.is_some())
            .collect();
        mounted.sort_by_key(|e| e.open_tag_end);

        let mut out = String::with_capacity(self.html.len() + 256);
        let mut cursor = 0;
        for element in mounted {
            if let Some(root) = &element.root {
                out.push_str(&self.html[cursor..element.open_tag_end]);
                out.push_str(&root.markup);
                cursor = element.open_tag_end;
            }
        }
        out.push_str(&self.html[cursor..]);
        out
    }
}
