//! The loaded menu: step catalog plus translations, swappable as one unit.
//!
//! Requests take an `Arc` snapshot when they start, so a reload never changes
//! the menu underneath an in-flight request.

use std::sync::{Arc, RwLock};

use ussd_types::error::CatalogError;

use crate::action::registry::ActionRegistry;
use crate::catalog::StepCatalog;
use crate::localize::Localizer;

/// Steps and translations loaded together from configuration.
#[derive(Debug, Clone)]
pub struct MenuDefinition {
    pub catalog: StepCatalog,
    pub localizer: Localizer,
}

impl MenuDefinition {
    pub fn new(catalog: StepCatalog, localizer: Localizer) -> Self {
        Self { catalog, localizer }
    }

    /// Check the menu against the registry and the required entry steps.
    pub fn verify(
        &self,
        registry: &ActionRegistry,
        entry_steps: &[&str],
    ) -> Result<(), CatalogError> {
        self.catalog.require_steps(entry_steps)?;
        self.catalog.verify_references(registry)
    }
}

/// Process-wide handle to the current menu.
#[derive(Debug)]
pub struct SharedMenu {
    current: RwLock<Arc<MenuDefinition>>,
}

impl SharedMenu {
    pub fn new(menu: MenuDefinition) -> Self {
        Self {
            current: RwLock::new(Arc::new(menu)),
        }
    }

    /// The menu as of now.
    pub fn snapshot(&self) -> Arc<MenuDefinition> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Swap in a new menu. Existing snapshots stay valid.
    pub fn replace(&self, menu: MenuDefinition) {
        let menu = Arc::new(menu);
        match self.current.write() {
            Ok(mut guard) => *guard = menu,
            Err(poisoned) => *poisoned.into_inner() = menu,
        }
    }
}
