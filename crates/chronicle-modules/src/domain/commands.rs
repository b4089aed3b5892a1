//! Commands for the module lifecycle context.

use chronicle_core::command::Command;
use uuid::Uuid;

/// Command to install a module.
#[derive(Debug, Clone)]
pub struct InstallModule {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The module identifier.
    pub module_id: String,
    /// Human-readable module name.
    pub name: String,
    /// Release version to install.
    pub version: String,
    /// Identifiers of required modules.
    pub dependencies: Vec<String>,
}

impl Command for InstallModule {
    fn command_type(&self) -> &'static str {
        "module.install_module"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to enable a module.
#[derive(Debug, Clone)]
pub struct EnableModule {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The module identifier.
    pub module_id: String,
}

impl Command for EnableModule {
    fn command_type(&self) -> &'static str {
        "module.enable_module"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to disable a module.
#[derive(Debug, Clone)]
pub struct DisableModule {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The module identifier.
    pub module_id: String,
    /// Why the module is being disabled.
    pub reason: String,
}

impl Command for DisableModule {
    fn command_type(&self) -> &'static str {
        "module.disable_module"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to move a module to another release.
#[derive(Debug, Clone)]
pub struct UpdateModule {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The module identifier.
    pub module_id: String,
    /// Target release version.
    pub version: String,
    /// Dependencies of the target release.
    pub dependencies: Vec<String>,
}

impl Command for UpdateModule {
    fn command_type(&self) -> &'static str {
        "module.update_module"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to uninstall a module.
#[derive(Debug, Clone)]
pub struct UninstallModule {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The module identifier.
    pub module_id: String,
    /// Why the module is being removed.
    pub reason: String,
}

impl Command for UninstallModule {
    fn command_type(&self) -> &'static str {
        "module.uninstall_module"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
