//! The fixed set of package managers and OS-primary resolution.
use thiserror::Error;

use super::{Apt, Cask, Gem, Homebrew, ManagerEnv, Npm, PackageManager, Pip, VsCode, Yum};
use crate::platform::Os;

/// Order in which non-extension managers are probed for the OS primary.
pub const PRIMARY_PRIORITY: [&str; 6] = ["brew", "apt", "yum", "pip", "npm", "gem"];

/// No installed manager is native to this platform.
///
/// Carries the manager the caller should assume instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no OS package manager found on {os}; assuming {fallback}")]
pub struct NoOsPackageManager {
    /// Host platform.
    pub os: Os,
    /// Name of the safe default.
    pub fallback: &'static str,
}

/// Every compiled-in package manager, built once at startup.
#[derive(Debug)]
pub struct ManagerRegistry {
    brew: Homebrew,
    apt: Apt,
    yum: Yum,
    pip: Pip,
    npm: Npm,
    gem: Gem,
    cask: Cask,
    vscode: VsCode,
    os: Os,
}

impl ManagerRegistry {
    /// Build all eight managers sharing `env`.
    #[must_use]
    pub fn new(env: &ManagerEnv) -> Self {
        Self {
            brew: Homebrew::new(env.clone()),
            apt: Apt::new(env.clone()),
            yum: Yum::new(env.clone()),
            pip: Pip::new(env.clone()),
            npm: Npm::new(env.clone()),
            gem: Gem::new(env.clone()),
            cask: Cask::new(env.clone()),
            vscode: VsCode::new(env.clone()),
            os: env.platform.os,
        }
    }

    /// All managers: primary candidates in priority order, then extensions.
    #[must_use]
    pub fn all(&self) -> [&dyn PackageManager; 8] {
        [
            &self.brew,
            &self.apt,
            &self.yum,
            &self.pip,
            &self.npm,
            &self.gem,
            &self.cask,
            &self.vscode,
        ]
    }

    /// Exact lookup by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn PackageManager> {
        self.all().into_iter().find(|m| m.name() == name)
    }

    /// First non-extension manager, in [`PRIMARY_PRIORITY`] order, that is
    /// installed and native to the host.
    ///
    /// # Errors
    ///
    /// Returns [`NoOsPackageManager`] naming the fallback when none qualifies.
    pub fn resolve_os_primary(&self) -> Result<&dyn PackageManager, NoOsPackageManager> {
        self.all()
            .into_iter()
            .filter(|m| !m.is_extension())
            .find(|m| m.is_os_package_manager())
            .ok_or_else(|| NoOsPackageManager {
                os: self.os,
                fallback: self.fallback().name(),
            })
    }

    /// The OS primary, or the platform fallback with a warning.
    #[must_use]
    pub fn os_primary(&self) -> &dyn PackageManager {
        self.resolve_os_primary().unwrap_or_else(|e| {
            tracing::warn!("{e}");
            self.fallback()
        })
    }

    /// Manager named `name`; unknown names fall back to the OS primary.
    #[must_use]
    pub fn resolve(&self, name: &str) -> &dyn PackageManager {
        self.get(name).unwrap_or_else(|| {
            let primary = self.os_primary();
            tracing::warn!(
                "unknown package manager '{name}', using {}",
                primary.name()
            );
            primary
        })
    }

    /// Safe default when no primary is detected.
    fn fallback(&self) -> &dyn PackageManager {
        match self.os {
            Os::MacOs => &self.brew,
            _ => &self.apt,
        }
    }
}
