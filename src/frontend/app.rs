//! Root application instance and its mounting into a [`HostPage`].

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::json;

use super::event_bus::EventBus;
use super::host_page::{HostPage, MountedRoot};
use super::plugin::{Directives, Plugin};
use crate::error::{CoopGamesError, Result};

/// A UI component known to the application by its tag.
pub trait Component: Send + Sync {
    fn tag(&self) -> &str;

    /// Markup the component renders when mounted.
    fn render(&self) -> String {
        format!("<{tag}></{tag}>", tag = self.tag())
    }
}

/// Top-level component owning the whole game browser.
#[derive(Debug, Clone, Default)]
pub struct RootComponent {
    bus: Option<EventBus>,
}

impl RootComponent {
    pub const TAG: &'static str = "root-component";

    pub fn new() -> Self {
        Self::default()
    }

    /// A root component that talks to its children through `bus`.
    pub fn with_bus(bus: EventBus) -> Self {
        Self { bus: Some(bus) }
    }

    pub fn bus(&self) -> Option<&EventBus> {
        self.bus.as_ref()
    }
}

impl Component for RootComponent {
    fn tag(&self) -> &str {
        Self::TAG
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// An application instance, not yet attached to a page.
///
/// [`mount`](App::mount) consumes the instance, so an app is mounted at most
/// once.
pub struct App {
    root: Box<dyn Component>,
    directives: Directives,
    plugins: Vec<String>,
    bus: Option<EventBus>,
}

fn template_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*<([a-z][a-z0-9-]*)\s*(?:/>|>\s*</([a-z][a-z0-9-]*)>)\s*$")
            .expect("template pattern is a valid regex")
    })
}

impl App {
    /// An app rendering `root` directly.
    pub fn new(root: impl Component + 'static) -> Self {
        Self {
            root: Box::new(root),
            directives: Directives::default(),
            plugins: Vec::new(),
            bus: None,
        }
    }

    /// An app whose inline `template` references its root component by tag.
    ///
    /// The template must consist of a single element naming one of
    /// `components`. `bus` is kept for the app's lifetime.
    pub fn with_template(
        template: &str,
        components: Vec<Box<dyn Component>>,
        bus: EventBus,
    ) -> Result<Self> {
        let caps = template_pattern().captures(template).ok_or_else(|| {
            CoopGamesError::InvalidArgument(format!(
                "template must be a single component element: {}",
                template.trim()
            ))
        })?;
        let tag = caps.get(1).map_or("", |m| m.as_str());
        if let Some(close) = caps.get(2) {
            if close.as_str() != tag {
                return Err(CoopGamesError::InvalidArgument(format!(
                    "template closes <{}> with </{}>",
                    tag,
                    close.as_str()
                )));
            }
        }

        let root = components
            .into_iter()
            .find(|c| c.tag() == tag)
            .ok_or_else(|| {
                CoopGamesError::InvalidArgument(format!("unknown component <{}>", tag))
            })?;

        Ok(Self {
            root,
            directives: Directives::default(),
            plugins: Vec::new(),
            bus: Some(bus),
        })
    }

    /// Install `plugin` on the app. Must happen before mounting.
    pub fn use_plugin(mut self, plugin: impl Plugin) -> Self {
        plugin.install(&mut self.directives);
        self.plugins.push(plugin.name().to_string());
        self
    }

    pub fn directives(&self) -> &Directives {
        &self.directives
    }

    pub fn bus(&self) -> Option<&EventBus> {
        self.bus.as_ref()
    }

    /// Attach the root component under the element matching `selector`.
    ///
    /// A missing element fails with `MountPointMissing` and leaves the page
    /// untouched.
    pub fn mount(self, page: &mut HostPage, selector: &str) -> Result<MountedApp> {
        let root_tag = self.root.tag().to_string();
        let root = MountedRoot {
            component: root_tag.clone(),
            markup: self.root_markup(),
        };

        if let Err(e) = page.attach(selector, root) {
            log::error!("Unable to mount <{}> at '{}': {}", root_tag, selector, e);
            return Err(e);
        }
        log::info!("Mounted <{}> at '{}'", root_tag, selector);

        if let Some(bus) = &self.bus {
            bus.publish(
                "app:mounted",
                json!({ "selector": selector, "component": root_tag }),
            );
        }

        Ok(MountedApp {
            selector: selector.to_string(),
            root_tag,
            plugins: self.plugins,
            directives: self.directives,
            bus: self.bus,
        })
    }

    fn root_markup(&self) -> String {
        let directives: Vec<&str> = self.directives.names().collect();
        let mut attrs = format!(" data-root=\"{}\"", self.root.tag());
        if !directives.is_empty() {
            attrs.push_str(&format!(" data-directives=\"{}\"", directives.join(" ")));
        }
        format!("<div{}>{}</div>", attrs, self.root.render())
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("root", &self.root.tag())
            .field("plugins", &self.plugins)
            .field("bus", &self.bus.is_some())
            .finish()
    }
}

/// An app attached to its host element.
#[derive(Debug)]
pub struct MountedApp {
    pub selector: String,
    pub root_tag: String,
    pub plugins: Vec<String>,
    pub directives: Directives,
    pub bus: Option<EventBus>,
}
