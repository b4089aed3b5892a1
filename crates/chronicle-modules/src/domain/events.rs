//! Domain events for the module lifecycle context.

use std::sync::LazyLock;

use chronicle_core::event::{DomainEvent, EventData, EventHeader, decode_payload, encode_payload};
use chronicle_core::registry::EventRegistry;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Aggregate type name of module streams.
pub const MODULE_AGGREGATE_TYPE: &str = "module";

/// Event type string for `ModuleInstalled`.
pub const MODULE_INSTALLED_EVENT_TYPE: &str = "module.installed";
/// Event type string for `ModuleEnabled`.
pub const MODULE_ENABLED_EVENT_TYPE: &str = "module.enabled";
/// Event type string for `ModuleDisabled`.
pub const MODULE_DISABLED_EVENT_TYPE: &str = "module.disabled";
/// Event type string for `ModuleUpdated`.
pub const MODULE_UPDATED_EVENT_TYPE: &str = "module.updated";
/// Event type string for `ModuleUninstalled`.
pub const MODULE_UNINSTALLED_EVENT_TYPE: &str = "module.uninstalled";

/// Current schema version of `module.installed`. Version 1 carried no
/// dependency list.
pub const MODULE_INSTALLED_SCHEMA_VERSION: i32 = 2;

/// Emitted when a module is installed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleInstalled {
    /// The module identifier.
    pub module_id: String,
    /// Human-readable module name.
    pub name: String,
    /// Installed release version.
    pub version: String,
    /// Identifiers of modules this module depends on.
    pub dependencies: Vec<String>,
}

/// Emitted when a module is enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleEnabled {
    /// The module identifier.
    pub module_id: String,
}

/// Emitted when a module is disabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDisabled {
    /// The module identifier.
    pub module_id: String,
    /// Why the module was disabled.
    pub reason: String,
}

/// Emitted when a module is upgraded or downgraded to another release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleUpdated {
    /// The module identifier.
    pub module_id: String,
    /// Release version before the update.
    pub from_version: String,
    /// Release version after the update.
    pub to_version: String,
    /// Dependencies of the new release.
    pub dependencies: Vec<String>,
}

/// Emitted when a module is uninstalled. Terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleUninstalled {
    /// The module identifier.
    pub module_id: String,
    /// Why the module was uninstalled.
    pub reason: String,
}

/// Event payload variants for the module lifecycle context.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleEventKind {
    /// The module has been installed.
    Installed(ModuleInstalled),
    /// The module has been enabled.
    Enabled(ModuleEnabled),
    /// The module has been disabled.
    Disabled(ModuleDisabled),
    /// The module has moved to another release.
    Updated(ModuleUpdated),
    /// The module has been uninstalled.
    Uninstalled(ModuleUninstalled),
}

/// Domain event envelope for the module lifecycle context.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleEvent {
    /// Envelope fields.
    pub header: EventHeader,
    /// Event-specific payload.
    pub kind: ModuleEventKind,
}

static REGISTRY: LazyLock<EventRegistry<ModuleEvent>> = LazyLock::new(|| {
    EventRegistry::new(MODULE_AGGREGATE_TYPE)
        .register(
            MODULE_INSTALLED_EVENT_TYPE,
            MODULE_INSTALLED_SCHEMA_VERSION,
            |header, data| {
                let payload = decode_payload(MODULE_INSTALLED_EVENT_TYPE, data)?;
                Ok(ModuleEvent {
                    header,
                    kind: ModuleEventKind::Installed(payload),
                })
            },
        )
        .upcast(MODULE_INSTALLED_EVENT_TYPE, 1, add_empty_dependencies)
        .register(MODULE_ENABLED_EVENT_TYPE, 1, |header, data| {
            let payload = decode_payload(MODULE_ENABLED_EVENT_TYPE, data)?;
            Ok(ModuleEvent {
                header,
                kind: ModuleEventKind::Enabled(payload),
            })
        })
        .register(MODULE_DISABLED_EVENT_TYPE, 1, |header, data| {
            let payload = decode_payload(MODULE_DISABLED_EVENT_TYPE, data)?;
            Ok(ModuleEvent {
                header,
                kind: ModuleEventKind::Disabled(payload),
            })
        })
        .register(MODULE_UPDATED_EVENT_TYPE, 1, |header, data| {
            let payload = decode_payload(MODULE_UPDATED_EVENT_TYPE, data)?;
            Ok(ModuleEvent {
                header,
                kind: ModuleEventKind::Updated(payload),
            })
        })
        .register(MODULE_UNINSTALLED_EVENT_TYPE, 1, |header, data| {
            let payload = decode_payload(MODULE_UNINSTALLED_EVENT_TYPE, data)?;
            Ok(ModuleEvent {
                header,
                kind: ModuleEventKind::Uninstalled(payload),
            })
        })
});

/// v1 → v2: installs recorded before dependency tracking had none.
#[allow(clippy::unnecessary_wraps)]
fn add_empty_dependencies(mut data: EventData) -> Result<EventData, String> {
    data.entry("dependencies")
        .or_insert_with(|| Value::Array(Vec::new()));
    Ok(data)
}

impl DomainEvent for ModuleEvent {
    fn event_type(&self) -> &'static str {
        match &self.kind {
            ModuleEventKind::Installed(_) => MODULE_INSTALLED_EVENT_TYPE,
            ModuleEventKind::Enabled(_) => MODULE_ENABLED_EVENT_TYPE,
            ModuleEventKind::Disabled(_) => MODULE_DISABLED_EVENT_TYPE,
            ModuleEventKind::Updated(_) => MODULE_UPDATED_EVENT_TYPE,
            ModuleEventKind::Uninstalled(_) => MODULE_UNINSTALLED_EVENT_TYPE,
        }
    }

    fn header(&self) -> &EventHeader {
        &self.header
    }

    fn to_map(&self) -> EventData {
        match &self.kind {
            ModuleEventKind::Installed(payload) => encode_payload(payload),
            ModuleEventKind::Enabled(payload) => encode_payload(payload),
            ModuleEventKind::Disabled(payload) => encode_payload(payload),
            ModuleEventKind::Updated(payload) => encode_payload(payload),
            ModuleEventKind::Uninstalled(payload) => encode_payload(payload),
        }
    }

    fn registry() -> &'static EventRegistry<Self> {
        &REGISTRY
    }
}
