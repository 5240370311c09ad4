//! Fixture identity and lifecycle hook slots.

use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::sync::{Arc, OnceLock};

/// A setup, teardown, or parameter-case hook over fixture data.
pub type Hook<T> = Arc<dyn Fn(&mut T) + Send + Sync>;

/// A test body over fixture data.
pub type Body<T> = Arc<dyn Fn(&mut T) + Send + Sync>;

/// Typed handle to a registered fixture.
///
/// Only meaningful for the registry that issued it.
pub struct FixtureId<T> {
    index: usize,
    _data: PhantomData<fn() -> T>,
}

impl<T> FixtureId<T> {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index,
            _data: PhantomData,
        }
    }

    /// Registration position of the fixture.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<T> Clone for FixtureId<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FixtureId<T> {}

impl<T> PartialEq for FixtureId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for FixtureId<T> {}

impl<T> fmt::Debug for FixtureId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FixtureId").field(&self.index).finish()
    }
}

/// Setup and teardown slots shared by every test of one fixture.
///
/// Both slots start empty (a no-op) and accept exactly one override.
pub(crate) struct FixtureSlots<T> {
    name: String,
    setup: OnceLock<Hook<T>>,
    teardown: OnceLock<Hook<T>>,
}

impl<T> FixtureSlots<T> {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            setup: OnceLock::new(),
            teardown: OnceLock::new(),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Install the setup hook. Fails if one was already installed.
    pub(crate) fn override_setup(&self, hook: Hook<T>) -> bool {
        self.setup.set(hook).is_ok()
    }

    /// Install the teardown hook. Fails if one was already installed.
    pub(crate) fn override_teardown(&self, hook: Hook<T>) -> bool {
        self.teardown.set(hook).is_ok()
    }

    pub(crate) fn has_setup(&self) -> bool {
        self.setup.get().is_some()
    }

    pub(crate) fn has_teardown(&self) -> bool {
        self.teardown.get().is_some()
    }

    pub(crate) fn setup(&self, data: &mut T) {
        if let Some(hook) = self.setup.get() {
            hook(data);
        }
    }

    pub(crate) fn teardown(&self, data: &mut T) {
        if let Some(hook) = self.teardown.get() {
            hook(data);
        }
    }
}

/// Read-only view of a registered fixture.
pub struct FixtureDescriptor<T> {
    slots: Arc<FixtureSlots<T>>,
}

impl<T> FixtureDescriptor<T> {
    pub(crate) fn new(slots: Arc<FixtureSlots<T>>) -> Self {
        Self { slots }
    }

    pub fn name(&self) -> &str {
        self.slots.name()
    }

    /// Size in bytes of the fixture's data layout.
    pub fn data_size(&self) -> usize {
        mem::size_of::<T>()
    }

    /// Whether the setup slot holds an override rather than the no-op.
    pub fn has_custom_setup(&self) -> bool {
        self.slots.has_setup()
    }

    /// Whether the teardown slot holds an override rather than the no-op.
    pub fn has_custom_teardown(&self) -> bool {
        self.slots.has_teardown()
    }
}

impl<T> fmt::Debug for FixtureDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixtureDescriptor")
            .field("name", &self.name())
            .field("data_size", &self.data_size())
            .field("custom_setup", &self.has_custom_setup())
            .field("custom_teardown", &self.has_custom_teardown())
            .finish()
    }
}
