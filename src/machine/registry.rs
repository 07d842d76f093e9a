//! Type-keyed module registry.

use crate::core::State;
use crate::module::Module;
use std::any::{Any, TypeId};
use std::sync::Arc;

/// One attached module, reachable both through the hook trait and as its
/// concrete type.
pub(crate) struct ModuleEntry<S: State> {
    type_id: TypeId,
    module: Arc<dyn Module<S>>,
    concrete: Arc<dyn Any + Send + Sync>,
}

impl<S: State> ModuleEntry<S> {
    pub(crate) fn new<M: Module<S>>(module: Arc<M>) -> Self {
        Self {
            type_id: TypeId::of::<M>(),
            concrete: Arc::clone(&module) as Arc<dyn Any + Send + Sync>,
            module,
        }
    }

    pub(crate) fn module(&self) -> &Arc<dyn Module<S>> {
        &self.module
    }

    pub(crate) fn downcast<M: Module<S>>(&self) -> Option<Arc<M>> {
        Arc::clone(&self.concrete).downcast::<M>().ok()
    }
}

/// Modules in registration order, at most one per concrete type.
pub(crate) struct ModuleRegistry<S: State> {
    entries: Vec<ModuleEntry<S>>,
}

impl<S: State> ModuleRegistry<S> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub(crate) fn contains(&self, type_id: TypeId) -> bool {
        self.entries.iter().any(|entry| entry.type_id == type_id)
    }

    /// Append `entry`. Callers check [`contains`](Self::contains) first.
    pub(crate) fn insert(&mut self, entry: ModuleEntry<S>) {
        debug_assert!(!self.contains(entry.type_id));
        self.entries.push(entry);
    }

    pub(crate) fn remove(&mut self, type_id: TypeId) -> Option<ModuleEntry<S>> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.type_id == type_id)?;
        Some(self.entries.remove(index))
    }

    /// Take every entry, in registration order.
    pub(crate) fn drain(&mut self) -> Vec<ModuleEntry<S>> {
        std::mem::take(&mut self.entries)
    }

    pub(crate) fn get<M: Module<S>>(&self) -> Option<Arc<M>> {
        let type_id = TypeId::of::<M>();
        self.entries
            .iter()
            .find(|entry| entry.type_id == type_id)
            .and_then(ModuleEntry::downcast::<M>)
    }

    /// Hook handles in registration order, for calling outside the lock.
    pub(crate) fn handles(&self) -> Vec<Arc<dyn Module<S>>> {
        self.entries
            .iter()
            .map(|entry| Arc::clone(entry.module()))
            .collect()
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| entry.module.name().to_string())
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, PartialEq, Debug)]
    struct Level(u8);

    impl State for Level {
        fn name(&self) -> &str {
            "Level"
        }
    }

    struct First;
    impl Module<Level> for First {
        fn name(&self) -> &str {
            "first"
        }
    }

    struct Second;
    impl Module<Level> for Second {
        fn name(&self) -> &str {
            "second"
        }
    }

    #[test]
    fn keeps_registration_order() {
        let mut registry = ModuleRegistry::<Level>::new();
        registry.insert(ModuleEntry::new(Arc::new(Second)));
        registry.insert(ModuleEntry::new(Arc::new(First)));

        assert_eq!(registry.names(), vec!["second", "first"]);
        assert_eq!(registry.handles().len(), 2);
    }

    #[test]
    fn lookup_by_concrete_type() {
        let mut registry = ModuleRegistry::<Level>::new();
        let first = Arc::new(First);
        registry.insert(ModuleEntry::new(Arc::clone(&first)));

        assert!(registry.contains(TypeId::of::<First>()));
        assert!(!registry.contains(TypeId::of::<Second>()));
        assert!(Arc::ptr_eq(&registry.get::<First>().unwrap(), &first));
        assert!(registry.get::<Second>().is_none());
    }

    #[test]
    fn remove_by_type() {
        let mut registry = ModuleRegistry::<Level>::new();
        registry.insert(ModuleEntry::new(Arc::new(First)));
        registry.insert(ModuleEntry::new(Arc::new(Second)));

        let removed = registry.remove(TypeId::of::<First>()).unwrap();

        assert!(removed.downcast::<First>().is_some());
        assert_eq!(registry.len(), 1);
        assert!(registry.remove(TypeId::of::<First>()).is_none());
    }

    #[test]
    fn drain_empties_in_order() {
        let mut registry = ModuleRegistry::<Level>::new();
        registry.insert(ModuleEntry::new(Arc::new(First)));
        registry.insert(ModuleEntry::new(Arc::new(Second)));

        let drained = registry.drain();

        let names: Vec<_> = drained.iter().map(|entry| entry.module().name()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(registry.len(), 0);
    }
}
