//! Capabilities registered on an [`App`](super::App) before it is mounted.

use std::collections::BTreeSet;

/// Directives made available to every component of an application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    names: BTreeSet<String>,
}

impl Directives {
    pub fn register(&mut self, name: &str) {
        self.names.insert(name.to_string());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// A cross-cutting capability installed on the whole component tree.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn install(&self, directives: &mut Directives);
}

/// Detects clicks that land outside an element (`v-click-away`).
#[derive(Debug, Clone, Copy, Default)]
pub struct ClickAway;

impl ClickAway {
    pub const DIRECTIVE: &'static str = "click-away";

    /// Whether a click whose event path (target first, ids of the target and
    /// its ancestors) is `path` happened away from `element_id`.
    pub fn is_click_away(path: &[&str], element_id: &str) -> bool {
        !path.iter().any(|id| *id == element_id)
    }
}

impl Plugin for ClickAway {
    fn name(&self) -> &str {
        "vue3-click-away"
    }

    fn install(&self, directives: &mut Directives) {
        directives.register(Self::DIRECTIVE);
    }
}
