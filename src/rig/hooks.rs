//! Hook injection
//!
//! Extensions splice behavior around every lifecycle stage without
//! subclassing the host: one pair of default-no-op trait methods per stage.
//! For a host stage the dispatcher runs every installed extension's
//! before-hook in install order, then the host body, then every after-hook
//! in install order.

use crate::error::{Result, RigError};
use crate::rig::context::BuildContext;
use crate::rig::lifecycle::Stage;
use crate::rig::orchestrator::Rig;

/// Data contribution for an external GUI launcher. Purely descriptive;
/// the core never interprets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelSpec {
    pub title: String,
    pub entry: String,
}

/// An installable lifecycle extension.
///
/// Every hook defaults to a no-op; extensions override only the stages they
/// care about. Hooks receive the same `(rig, ctx)` pair the host stage gets,
/// and their errors abort the run exactly like a host-stage error.
pub trait Extension {
    /// Registry key. Install order, not this name, decides dispatch order.
    fn name(&self) -> &str;

    /// Optional GUI panel contribution.
    fn panel(&self) -> Option<PanelSpec> {
        None
    }

    // Joint phase hooks

    fn before_create_unit(&mut self, _rig: &mut Rig, _ctx: &mut BuildContext) -> Result<()> {
        Ok(())
    }
    fn after_create_unit(&mut self, _rig: &mut Rig, _ctx: &mut BuildContext) -> Result<()> {
        Ok(())
    }

    fn before_process(&mut self, _rig: &mut Rig, _ctx: &mut BuildContext) -> Result<()> {
        Ok(())
    }
    fn after_process(&mut self, _rig: &mut Rig, _ctx: &mut BuildContext) -> Result<()> {
        Ok(())
    }

    fn before_finalize(&mut self, _rig: &mut Rig, _ctx: &mut BuildContext) -> Result<()> {
        Ok(())
    }
    fn after_finalize(&mut self, _rig: &mut Rig, _ctx: &mut BuildContext) -> Result<()> {
        Ok(())
    }

    // Rig phase hooks

    fn before_pre_process(&mut self, _rig: &mut Rig, _ctx: &mut BuildContext) -> Result<()> {
        Ok(())
    }
    fn after_pre_process(&mut self, _rig: &mut Rig, _ctx: &mut BuildContext) -> Result<()> {
        Ok(())
    }

    fn before_create_rig(&mut self, _rig: &mut Rig, _ctx: &mut BuildContext) -> Result<()> {
        Ok(())
    }
    fn after_create_rig(&mut self, _rig: &mut Rig, _ctx: &mut BuildContext) -> Result<()> {
        Ok(())
    }

    fn before_post_process(&mut self, _rig: &mut Rig, _ctx: &mut BuildContext) -> Result<()> {
        Ok(())
    }
    fn after_post_process(&mut self, _rig: &mut Rig, _ctx: &mut BuildContext) -> Result<()> {
        Ok(())
    }
}

/// Ordered extension registry, keyed by extension name.
#[derive(Default)]
pub struct ExtensionRegistry {
    entries: Vec<Box<dyn Extension>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install an extension. Insertion order is dispatch order; installing
    /// two extensions under the same name is an error.
    pub fn install(&mut self, extension: Box<dyn Extension>) -> Result<()> {
        let name = extension.name().to_string();
        if self.entries.iter().any(|e| e.name() == name) {
            return Err(RigError::DuplicateExtension { name });
        }
        self.entries.push(extension);
        Ok(())
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Extension> {
        self.entries
            .iter()
            .find(|e| e.name() == name)
            .map(|e| e.as_ref())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut (dyn Extension + 'static)> {
        for entry in &mut self.entries {
            if entry.name() == name {
                return Some(entry.as_mut());
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Collect every panel contribution, in install order.
    pub fn panels(&self) -> Vec<PanelSpec> {
        self.entries.iter().filter_map(|e| e.panel()).collect()
    }

    /// Run every extension's before-hook for `stage`, in install order.
    pub fn dispatch_before(
        &mut self,
        stage: Stage,
        rig: &mut Rig,
        ctx: &mut BuildContext,
    ) -> Result<()> {
        for ext in &mut self.entries {
            match stage {
                Stage::CreateUnit => ext.before_create_unit(rig, ctx)?,
                Stage::Process => ext.before_process(rig, ctx)?,
                Stage::Finalize => ext.before_finalize(rig, ctx)?,
                Stage::PreProcess => ext.before_pre_process(rig, ctx)?,
                Stage::CreateRig => ext.before_create_rig(rig, ctx)?,
                Stage::PostProcess => ext.before_post_process(rig, ctx)?,
            }
        }
        Ok(())
    }

    /// Run every extension's after-hook for `stage`, in install order.
    pub fn dispatch_after(
        &mut self,
        stage: Stage,
        rig: &mut Rig,
        ctx: &mut BuildContext,
    ) -> Result<()> {
        for ext in &mut self.entries {
            match stage {
                Stage::CreateUnit => ext.after_create_unit(rig, ctx)?,
                Stage::Process => ext.after_process(rig, ctx)?,
                Stage::Finalize => ext.after_finalize(rig, ctx)?,
                Stage::PreProcess => ext.after_pre_process(rig, ctx)?,
                Stage::CreateRig => ext.after_create_rig(rig, ctx)?,
                Stage::PostProcess => ext.after_post_process(rig, ctx)?,
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("entries", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl Extension for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn panel(&self) -> Option<PanelSpec> {
            Some(PanelSpec {
                title: self.0.to_string(),
                entry: format!("{}::open", self.0),
            })
        }
    }

    #[test]
    fn test_install_order_preserved() {
        let mut registry = ExtensionRegistry::new();
        registry.install(Box::new(Named("b"))).unwrap();
        registry.install(Box::new(Named("a"))).unwrap();
        assert_eq!(registry.names(), vec!["b", "a"]);
        assert!(registry.get("a").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_install_rejected() {
        let mut registry = ExtensionRegistry::new();
        registry.install(Box::new(Named("x"))).unwrap();
        let err = registry.install(Box::new(Named("x"))).unwrap_err();
        assert!(matches!(err, RigError::DuplicateExtension { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_panels_in_install_order() {
        let mut registry = ExtensionRegistry::new();
        registry.install(Box::new(Named("first"))).unwrap();
        registry.install(Box::new(Named("second"))).unwrap();
        let panels = registry.panels();
        assert_eq!(panels.len(), 2);
        assert_eq!(panels[0].title, "first");
        assert_eq!(panels[1].entry, "second::open");
    }
}
