//! Test and fixture registration.
//!
//! Startup happens in two phases. During registration, fixtures, hook
//! overrides and tests are added to a mutable [`Registry`]. [`Registry::seal`]
//! then consumes it and yields an immutable [`Suite`], which is the only thing
//! the engine runs. Hook overrides therefore always land before any test of
//! their fixture executes.

mod fixture;
mod params;

pub use fixture::{Body, FixtureDescriptor, FixtureId, Hook};
pub use params::ParamCase;

use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;

use crate::engine::{BoundTest, Runnable};
pub(crate) use fixture::FixtureSlots;
pub(crate) use params::CaseBinding;

/// Errors raised while registering fixtures and tests.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("fixture already registered: {0}")]
    DuplicateFixture(String),

    #[error("test already registered in fixture {fixture}: {name}")]
    DuplicateTest { fixture: String, name: String },

    #[error("setup already overridden for fixture: {0}")]
    SetupAlreadyOverridden(String),

    #[error("teardown already overridden for fixture: {0}")]
    TeardownAlreadyOverridden(String),

    #[error("name must not be empty")]
    EmptyName,

    #[error("parameterized test {0} has no cases")]
    NoCases(String),

    #[error("unknown fixture handle: {0}")]
    UnknownFixture(usize),
}

/// A test waiting to be registered.
pub struct TestDescriptor<T> {
    name: String,
    fixture: FixtureId<T>,
    body: Body<T>,
    case: Option<CaseBinding<T>>,
}

impl<T> TestDescriptor<T> {
    pub fn new(
        fixture: FixtureId<T>,
        name: impl Into<String>,
        body: impl Fn(&mut T) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            fixture,
            body: Arc::new(body),
            case: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fixture(&self) -> FixtureId<T> {
        self.fixture
    }

    pub fn case_tag(&self) -> Option<&str> {
        self.case.as_ref().map(|c| c.tag.as_str())
    }

    pub fn case_index(&self) -> Option<usize> {
        self.case.as_ref().map(|c| c.index)
    }

    /// Report name: the base name, plus the case tag for parameterized tests.
    pub fn display_name(&self) -> String {
        display_name(&self.name, self.case_tag())
    }

    fn with_case(&self, case: CaseBinding<T>) -> Self {
        Self {
            name: self.name.clone(),
            fixture: self.fixture,
            body: Arc::clone(&self.body),
            case: Some(case),
        }
    }
}

pub(crate) fn display_name(name: &str, tag: Option<&str>) -> String {
    match tag {
        Some(tag) => format!("{} ({})", name, tag),
        None => name.to_string(),
    }
}

struct FixtureEntry {
    name: String,
    /// `Arc<FixtureSlots<T>>` for the fixture's data type.
    slots: Box<dyn Any + Send + Sync>,
}

/// Mutable registration phase.
#[derive(Default)]
pub struct Registry {
    fixtures: Vec<FixtureEntry>,
    tests: Vec<Box<dyn Runnable>>,
    names: HashSet<(usize, String)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fixture whose per-test data is a fresh `T::default()`.
    ///
    /// Setup and teardown start as no-ops.
    pub fn register_fixture<T: Default + 'static>(
        &mut self,
        name: impl Into<String>,
    ) -> Result<FixtureId<T>, RegistryError> {
        let name = name.into();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.fixtures.iter().any(|f| f.name == name) {
            return Err(RegistryError::DuplicateFixture(name));
        }
        let slots: Arc<FixtureSlots<T>> = Arc::new(FixtureSlots::new(name.clone()));
        let index = self.fixtures.len();
        self.fixtures.push(FixtureEntry {
            name: name.clone(),
            slots: Box::new(slots),
        });
        tracing::debug!(fixture = %name, index, "registered fixture");
        Ok(FixtureId::new(index))
    }

    /// Replace the fixture's no-op setup. Allowed once per fixture.
    pub fn override_setup<T: 'static>(
        &mut self,
        fixture: FixtureId<T>,
        hook: impl Fn(&mut T) + Send + Sync + 'static,
    ) -> Result<(), RegistryError> {
        let slots = self.slots(fixture)?;
        if !slots.override_setup(Arc::new(hook)) {
            return Err(RegistryError::SetupAlreadyOverridden(slots.name().to_string()));
        }
        Ok(())
    }

    /// Replace the fixture's no-op teardown. Allowed once per fixture.
    pub fn override_teardown<T: 'static>(
        &mut self,
        fixture: FixtureId<T>,
        hook: impl Fn(&mut T) + Send + Sync + 'static,
    ) -> Result<(), RegistryError> {
        let slots = self.slots(fixture)?;
        if !slots.override_teardown(Arc::new(hook)) {
            return Err(RegistryError::TeardownAlreadyOverridden(slots.name().to_string()));
        }
        Ok(())
    }

    /// Append a test. Names must be unique within their fixture.
    pub fn register_test<T: Default + 'static>(
        &mut self,
        test: TestDescriptor<T>,
    ) -> Result<(), RegistryError> {
        if test.name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let slots = self.slots(test.fixture)?;
        let key = (test.fixture.index(), test.display_name());
        if self.names.contains(&key) {
            return Err(RegistryError::DuplicateTest {
                fixture: slots.name().to_string(),
                name: key.1,
            });
        }
        self.names.insert(key);
        tracing::debug!(
            fixture = slots.name(),
            test = %test.display_name(),
            "registered test"
        );
        self.tests.push(Box::new(BoundTest::new(
            test.name,
            slots,
            test.body,
            test.case,
        )));
        Ok(())
    }

    /// Shorthand for registering a plain test.
    pub fn test<T: Default + 'static>(
        &mut self,
        fixture: FixtureId<T>,
        name: impl Into<String>,
        body: impl Fn(&mut T) + Send + Sync + 'static,
    ) -> Result<(), RegistryError> {
        self.register_test(TestDescriptor::new(fixture, name, body))
    }

    /// Expand a parameterized test into one test per case.
    ///
    /// Every case shares `body` and the fixture's teardown; its setup is the
    /// fixture setup followed by the case initializer. Returns the number of
    /// tests registered. Nothing is registered if any expanded name collides.
    pub fn register_parameterized<T: Default + 'static>(
        &mut self,
        fixture: FixtureId<T>,
        name: impl Into<String>,
        body: impl Fn(&mut T) + Send + Sync + 'static,
        cases: Vec<ParamCase<T>>,
    ) -> Result<usize, RegistryError> {
        let template = TestDescriptor::new(fixture, name, body);
        if template.name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if cases.is_empty() {
            return Err(RegistryError::NoCases(template.name));
        }
        let slots = self.slots(fixture)?;

        let expanded: Vec<TestDescriptor<T>> = params::expand(cases)
            .into_iter()
            .map(|case| template.with_case(case))
            .collect();
        let mut seen = HashSet::new();
        for test in &expanded {
            let display = test.display_name();
            if self.names.contains(&(fixture.index(), display.clone())) || !seen.insert(display.clone())
            {
                return Err(RegistryError::DuplicateTest {
                    fixture: slots.name().to_string(),
                    name: display,
                });
            }
        }

        let count = expanded.len();
        for test in expanded {
            self.register_test(test)?;
        }
        Ok(count)
    }

    /// Read-only view of a fixture.
    pub fn fixture<T: 'static>(
        &self,
        fixture: FixtureId<T>,
    ) -> Result<FixtureDescriptor<T>, RegistryError> {
        self.slots(fixture).map(FixtureDescriptor::new)
    }

    pub fn fixture_count(&self) -> usize {
        self.fixtures.len()
    }

    pub fn test_count(&self) -> usize {
        self.tests.len()
    }

    /// End the registration phase.
    pub fn seal(self) -> Suite {
        tracing::debug!(
            fixtures = self.fixtures.len(),
            tests = self.tests.len(),
            "sealed registry"
        );
        Suite { tests: self.tests }
    }

    fn slots<T: 'static>(&self, fixture: FixtureId<T>) -> Result<Arc<FixtureSlots<T>>, RegistryError> {
        self.fixtures
            .get(fixture.index())
            .and_then(|entry| entry.slots.downcast_ref::<Arc<FixtureSlots<T>>>())
            .cloned()
            .ok_or(RegistryError::UnknownFixture(fixture.index()))
    }
}

/// Sealed, ordered set of runnable tests.
pub struct Suite {
    tests: Vec<Box<dyn Runnable>>,
}

impl Suite {
    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// Tests in execution order.
    pub fn tests(&self) -> impl Iterator<Item = &dyn Runnable> {
        self.tests.iter().map(|t| t.as_ref())
    }

    /// `(fixture, test)` name pairs in execution order.
    pub fn listing(&self) -> Vec<(String, String)> {
        self.tests
            .iter()
            .map(|t| (t.fixture().to_string(), t.display_name()))
            .collect()
    }
}

impl std::fmt::Debug for Suite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Suite").field("tests", &self.tests.len()).finish()
    }
}
