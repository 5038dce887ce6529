//! Front-end shell served by the HTTP layer.
//!
//! The host page (`index.html`) is parsed once at startup and the root
//! component is mounted into its `#app` element. Two bootstraps exist:
//!
//! - [`bootstrap_with_plugins`] builds the app from the root component and
//!   installs the [`ClickAway`] plugin before mounting.
//! - [`bootstrap_with_bus`] builds the app from an inline
//!   `<root-component />` template and hands it a shared [`EventBus`].
//!
//! Either way a missing mount point is a startup error.

pub mod app;
pub mod event_bus;
pub mod host_page;
pub mod plugin;

pub use app::{App, Component, MountedApp, RootComponent};
pub use event_bus::{EventBus, Subscription};
pub use host_page::{Element, HostPage, MountedRoot};
pub use plugin::{ClickAway, Directives, Plugin};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::{CoopGamesError, Result};

/// Which bootstrap the server mounts the shell with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellVariant {
    /// Inline template plus a shared event bus.
    Template,
    /// Root component plus the click-away plugin.
    #[default]
    Plugins,
}

impl FromStr for ShellVariant {
    type Err = CoopGamesError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "template" => Ok(Self::Template),
            "plugins" => Ok(Self::Plugins),
            _ => Err(CoopGamesError::InvalidArgument(format!(
                "unknown shell variant '{}' (expected template or plugins)",
                s
            ))),
        }
    }
}

impl fmt::Display for ShellVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Template => write!(f, "template"),
            Self::Plugins => write!(f, "plugins"),
        }
    }
}

/// Mount the root component with the click-away plugin at `#app`.
pub fn bootstrap_with_plugins(page: &mut HostPage) -> Result<MountedApp> {
    App::new(RootComponent::new())
        .use_plugin(ClickAway)
        .mount(page, config::MOUNT_SELECTOR)
}

/// Mount `<root-component />` with `bus` at `#app`.
pub fn bootstrap_with_bus(page: &mut HostPage, bus: EventBus) -> Result<MountedApp> {
    let components: Vec<Box<dyn Component>> = vec![Box::new(RootComponent::with_bus(bus.clone()))];
    App::with_template("<root-component />", components, bus)?.mount(page, config::MOUNT_SELECTOR)
}

/// Run the bootstrap selected by `variant`.
pub fn bootstrap(variant: ShellVariant, page: &mut HostPage, bus: EventBus) -> Result<MountedApp> {
    match variant {
        ShellVariant::Template => bootstrap_with_bus(page, bus),
        ShellVariant::Plugins => bootstrap_with_plugins(page),
    }
}
