//! Aggregate roots for the module lifecycle context.

use chrono::{DateTime, Utc};
use chronicle_core::aggregate::{AggregateRoot, Journal};
use chronicle_core::clock::Clock;
use chronicle_core::error::DomainError;
use chronicle_core::event::EventHeader;
use serde::Serialize;
use uuid::Uuid;

use super::events::{
    MODULE_AGGREGATE_TYPE, MODULE_INSTALLED_SCHEMA_VERSION, ModuleDisabled, ModuleEnabled,
    ModuleEvent, ModuleEventKind, ModuleInstalled, ModuleUninstalled, ModuleUpdated,
};

/// Lifecycle status of a module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    /// Not installed yet; the aggregate has no events.
    #[default]
    Pending,
    /// Installed but never enabled.
    Installed,
    /// Active.
    Enabled,
    /// Installed and switched off.
    Disabled,
    /// Removed. Terminal.
    Uninstalled,
}

impl ModuleStatus {
    /// Returns the status name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Installed => "installed",
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
            Self::Uninstalled => "uninstalled",
        }
    }
}

impl std::fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The aggregate root for an installable module.
#[derive(Debug, Default, PartialEq)]
pub struct Module {
    /// Aggregate identifier, set by `ModuleInstalled`.
    id: Option<String>,
    /// Human-readable name.
    name: String,
    /// Installed release version.
    release: String,
    /// Identifiers of required modules.
    dependencies: Vec<String>,
    /// Current lifecycle status.
    status: ModuleStatus,
    /// When the module was installed.
    installed_at: Option<DateTime<Utc>>,
    /// When the last event was applied.
    changed_at: Option<DateTime<Utc>>,
    /// Reason given for the most recent disable, while disabled.
    disabled_reason: Option<String>,
    /// Reason given for uninstalling.
    uninstall_reason: Option<String>,
    /// Event-sourcing bookkeeping.
    journal: Journal<ModuleEvent>,
}

impl Module {
    /// Returns the module's human-readable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the installed release version.
    #[must_use]
    pub fn release(&self) -> &str {
        &self.release
    }

    /// Returns the identifiers of required modules.
    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub fn status(&self) -> ModuleStatus {
        self.status
    }

    /// Returns when the module was installed.
    #[must_use]
    pub fn installed_at(&self) -> Option<DateTime<Utc>> {
        self.installed_at
    }

    /// Returns when the module last changed.
    #[must_use]
    pub fn changed_at(&self) -> Option<DateTime<Utc>> {
        self.changed_at
    }

    /// Returns the reason the module is disabled, if it is.
    #[must_use]
    pub fn disabled_reason(&self) -> Option<&str> {
        self.disabled_reason.as_deref()
    }

    /// Returns the reason the module was uninstalled, if it was.
    #[must_use]
    pub fn uninstall_reason(&self) -> Option<&str> {
        self.uninstall_reason.as_deref()
    }

    fn module_id(&self) -> String {
        self.id.clone().unwrap_or_default()
    }

    fn header(correlation_id: Uuid, clock: &dyn Clock) -> EventHeader {
        EventHeader::now(clock).caused_by(correlation_id)
    }

    /// Installs the module, producing a `ModuleInstalled` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` if the module was already
    /// installed, and `DomainError::Validation` if the id, name or version
    /// is blank or the module lists itself as a dependency.
    pub fn install(
        &mut self,
        module_id: &str,
        name: &str,
        version: &str,
        dependencies: Vec<String>,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.status != ModuleStatus::Pending {
            return Err(DomainError::InvalidTransition(format!(
                "module {} is already {}",
                self.module_id(),
                self.status
            )));
        }
        for (field, value) in [("id", module_id), ("name", name), ("version", version)] {
            if value.trim().is_empty() {
                return Err(DomainError::Validation(format!(
                    "module {field} must not be blank"
                )));
            }
        }
        if dependencies.iter().any(|dependency| dependency == module_id) {
            return Err(DomainError::Validation(format!(
                "module {module_id} cannot depend on itself"
            )));
        }

        self.record_that(ModuleEvent {
            header: Self::header(correlation_id, clock)
                .with_event_version(MODULE_INSTALLED_SCHEMA_VERSION),
            kind: ModuleEventKind::Installed(ModuleInstalled {
                module_id: module_id.to_owned(),
                name: name.to_owned(),
                version: version.to_owned(),
                dependencies,
            }),
        });
        Ok(())
    }

    /// Enables the module, producing a `ModuleEnabled` event. Enabling an
    /// enabled module does nothing.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` if the module is not
    /// installed or has been uninstalled.
    pub fn enable(&mut self, correlation_id: Uuid, clock: &dyn Clock) -> Result<(), DomainError> {
        match self.status {
            ModuleStatus::Enabled => return Ok(()),
            ModuleStatus::Pending => {
                return Err(DomainError::InvalidTransition(
                    "cannot enable a module that is not installed".into(),
                ));
            }
            ModuleStatus::Uninstalled => {
                return Err(DomainError::InvalidTransition(format!(
                    "cannot enable uninstalled module {}",
                    self.module_id()
                )));
            }
            ModuleStatus::Installed | ModuleStatus::Disabled => {}
        }

        self.record_that(ModuleEvent {
            header: Self::header(correlation_id, clock),
            kind: ModuleEventKind::Enabled(ModuleEnabled {
                module_id: self.module_id(),
            }),
        });
        Ok(())
    }

    /// Disables the module, producing a `ModuleDisabled` event. Disabling a
    /// module that is not enabled does nothing.
    pub fn disable(&mut self, reason: &str, correlation_id: Uuid, clock: &dyn Clock) {
        if self.status != ModuleStatus::Enabled {
            return;
        }

        self.record_that(ModuleEvent {
            header: Self::header(correlation_id, clock),
            kind: ModuleEventKind::Disabled(ModuleDisabled {
                module_id: self.module_id(),
                reason: reason.to_owned(),
            }),
        });
    }

    /// Moves the module to another release, producing a `ModuleUpdated`
    /// event. The status is unchanged.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` if the module is not
    /// installed or has been uninstalled, and `DomainError::Validation` if
    /// the version is blank or already installed.
    pub fn update(
        &mut self,
        new_version: &str,
        dependencies: Vec<String>,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if matches!(
            self.status,
            ModuleStatus::Pending | ModuleStatus::Uninstalled
        ) {
            return Err(DomainError::InvalidTransition(format!(
                "cannot update a module that is {}",
                self.status
            )));
        }
        if new_version.trim().is_empty() {
            return Err(DomainError::Validation(
                "module version must not be blank".into(),
            ));
        }
        if new_version == self.release {
            return Err(DomainError::Validation(format!(
                "module {} is already at version {new_version}",
                self.module_id()
            )));
        }
        let module_id = self.module_id();
        if dependencies.contains(&module_id) {
            return Err(DomainError::Validation(format!(
                "module {module_id} cannot depend on itself"
            )));
        }

        self.record_that(ModuleEvent {
            header: Self::header(correlation_id, clock),
            kind: ModuleEventKind::Updated(ModuleUpdated {
                module_id,
                from_version: self.release.clone(),
                to_version: new_version.to_owned(),
                dependencies,
            }),
        });
        Ok(())
    }

    /// Uninstalls the module, producing a `ModuleUninstalled` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` unless the module is
    /// installed or disabled; an enabled module must be disabled first.
    pub fn uninstall(
        &mut self,
        reason: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        match self.status {
            ModuleStatus::Installed | ModuleStatus::Disabled => {}
            ModuleStatus::Enabled => {
                return Err(DomainError::InvalidTransition(format!(
                    "module {} must be disabled before it is uninstalled",
                    self.module_id()
                )));
            }
            ModuleStatus::Pending | ModuleStatus::Uninstalled => {
                return Err(DomainError::InvalidTransition(format!(
                    "cannot uninstall a module that is {}",
                    self.status
                )));
            }
        }

        self.record_that(ModuleEvent {
            header: Self::header(correlation_id, clock),
            kind: ModuleEventKind::Uninstalled(ModuleUninstalled {
                module_id: self.module_id(),
                reason: reason.to_owned(),
            }),
        });
        Ok(())
    }
}

impl AggregateRoot for Module {
    type Event = ModuleEvent;
    const AGGREGATE_TYPE: &'static str = MODULE_AGGREGATE_TYPE;

    fn aggregate_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn apply(&mut self, event: &Self::Event) {
        match &event.kind {
            ModuleEventKind::Installed(payload) => {
                self.id = Some(payload.module_id.clone());
                self.name.clone_from(&payload.name);
                self.release.clone_from(&payload.version);
                self.dependencies.clone_from(&payload.dependencies);
                self.status = ModuleStatus::Installed;
                self.installed_at = Some(event.header.occurred_at);
            }
            ModuleEventKind::Enabled(_) => {
                self.status = ModuleStatus::Enabled;
                self.disabled_reason = None;
            }
            ModuleEventKind::Disabled(payload) => {
                self.status = ModuleStatus::Disabled;
                self.disabled_reason = Some(payload.reason.clone());
            }
            ModuleEventKind::Updated(payload) => {
                self.release.clone_from(&payload.to_version);
                self.dependencies.clone_from(&payload.dependencies);
            }
            ModuleEventKind::Uninstalled(payload) => {
                self.status = ModuleStatus::Uninstalled;
                self.uninstall_reason = Some(payload.reason.clone());
            }
        }
        self.changed_at = Some(event.header.occurred_at);
    }

    fn journal(&self) -> &Journal<Self::Event> {
        &self.journal
    }

    fn journal_mut(&mut self) -> &mut Journal<Self::Event> {
        &mut self.journal
    }
}
