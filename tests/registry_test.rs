//! Registry and fixture registration tests.

use gg_testbed::registry::{ParamCase, Registry, RegistryError, TestDescriptor};

#[derive(Debug, Default)]
struct Counter {
    value: u32,
}

#[derive(Debug, Default)]
struct Other;

// =============================================================================
// Fixture Registration
// =============================================================================

#[test]
fn fixture_registration_returns_distinct_handles() {
    let mut registry = Registry::new();
    let a = registry.register_fixture::<Counter>("a").unwrap();
    let b = registry.register_fixture::<Counter>("b").unwrap();

    assert_ne!(a, b);
    assert_eq!(registry.fixture_count(), 2);
}

#[test]
fn duplicate_fixture_name_is_rejected() {
    let mut registry = Registry::new();
    registry.register_fixture::<Counter>("math").unwrap();

    let err = registry.register_fixture::<Other>("math").unwrap_err();
    assert_eq!(err, RegistryError::DuplicateFixture("math".into()));
}

#[test]
fn empty_fixture_name_is_rejected() {
    let mut registry = Registry::new();
    assert_eq!(
        registry.register_fixture::<Counter>("").unwrap_err(),
        RegistryError::EmptyName
    );
}

#[test]
fn fixture_descriptor_reports_hooks_and_size() {
    let mut registry = Registry::new();
    let fixture = registry.register_fixture::<Counter>("counter").unwrap();

    let before = registry.fixture(fixture).unwrap();
    assert_eq!(before.name(), "counter");
    assert_eq!(before.data_size(), std::mem::size_of::<Counter>());
    assert!(!before.has_custom_setup());
    assert!(!before.has_custom_teardown());

    registry.override_setup(fixture, |c| c.value = 1).unwrap();
    let after = registry.fixture(fixture).unwrap();
    assert!(after.has_custom_setup());
    assert!(!after.has_custom_teardown());
}

#[test]
fn empty_fixture_has_zero_data_size() {
    let mut registry = Registry::new();
    let fixture = registry.register_fixture::<()>("empty").unwrap();
    assert_eq!(registry.fixture(fixture).unwrap().data_size(), 0);
}

// =============================================================================
// Hook Overrides
// =============================================================================

#[test]
fn setup_override_allowed_once() {
    let mut registry = Registry::new();
    let fixture = registry.register_fixture::<Counter>("counter").unwrap();

    registry.override_setup(fixture, |c| c.value = 1).unwrap();
    let err = registry.override_setup(fixture, |c| c.value = 2).unwrap_err();
    assert_eq!(err, RegistryError::SetupAlreadyOverridden("counter".into()));
}

#[test]
fn teardown_override_allowed_once() {
    let mut registry = Registry::new();
    let fixture = registry.register_fixture::<Counter>("counter").unwrap();

    registry.override_teardown(fixture, |c| c.value = 0).unwrap();
    let err = registry.override_teardown(fixture, |c| c.value = 0).unwrap_err();
    assert_eq!(err, RegistryError::TeardownAlreadyOverridden("counter".into()));
}

#[test]
fn setup_and_teardown_overrides_are_independent() {
    let mut registry = Registry::new();
    let fixture = registry.register_fixture::<Counter>("counter").unwrap();

    registry.override_teardown(fixture, |c| c.value = 0).unwrap();
    registry.override_setup(fixture, |c| c.value = 1).unwrap();

    let descriptor = registry.fixture(fixture).unwrap();
    assert!(descriptor.has_custom_setup());
    assert!(descriptor.has_custom_teardown());
}

#[test]
fn handle_from_another_registry_is_unknown() {
    let mut first = Registry::new();
    first.register_fixture::<Counter>("a").unwrap();
    let foreign = first.register_fixture::<Counter>("b").unwrap();

    let mut second = Registry::new();
    second.register_fixture::<Counter>("only").unwrap();

    assert_eq!(
        second.test(foreign, "t", |_| {}).unwrap_err(),
        RegistryError::UnknownFixture(1)
    );
}

// =============================================================================
// Test Registration
// =============================================================================

#[test]
fn tests_keep_registration_order_across_fixtures() {
    let mut registry = Registry::new();
    let a = registry.register_fixture::<Counter>("a").unwrap();
    let b = registry.register_fixture::<Other>("b").unwrap();

    registry.test(a, "first", |_| {}).unwrap();
    registry.test(b, "second", |_| {}).unwrap();
    registry.test(a, "third", |_| {}).unwrap();

    let suite = registry.seal();
    let names: Vec<(String, String)> = suite.listing();
    assert_eq!(
        names,
        vec![
            ("a".to_string(), "first".to_string()),
            ("b".to_string(), "second".to_string()),
            ("a".to_string(), "third".to_string()),
        ]
    );
}

#[test]
fn duplicate_test_name_in_same_fixture_is_rejected() {
    let mut registry = Registry::new();
    let fixture = registry.register_fixture::<Counter>("math").unwrap();
    registry.test(fixture, "adds", |_| {}).unwrap();

    let err = registry.test(fixture, "adds", |_| {}).unwrap_err();
    assert_eq!(
        err,
        RegistryError::DuplicateTest {
            fixture: "math".into(),
            name: "adds".into(),
        }
    );
    assert_eq!(registry.test_count(), 1);
}

#[test]
fn same_test_name_in_different_fixtures_is_allowed() {
    let mut registry = Registry::new();
    let a = registry.register_fixture::<Counter>("a").unwrap();
    let b = registry.register_fixture::<Counter>("b").unwrap();

    registry.test(a, "works", |_| {}).unwrap();
    registry.test(b, "works", |_| {}).unwrap();
    assert_eq!(registry.test_count(), 2);
}

#[test]
fn empty_test_name_is_rejected() {
    let mut registry = Registry::new();
    let fixture = registry.register_fixture::<Counter>("math").unwrap();
    assert_eq!(
        registry.test(fixture, "", |_| {}).unwrap_err(),
        RegistryError::EmptyName
    );
}

#[test]
fn descriptor_exposes_names() {
    let mut registry = Registry::new();
    let fixture = registry.register_fixture::<Counter>("math").unwrap();
    let descriptor = TestDescriptor::new(fixture, "adds", |c: &mut Counter| c.value += 1);

    assert_eq!(descriptor.name(), "adds");
    assert_eq!(descriptor.display_name(), "adds");
    assert_eq!(descriptor.fixture(), fixture);
    assert!(descriptor.case_tag().is_none());
    assert!(descriptor.case_index().is_none());

    registry.register_test(descriptor).unwrap();
}

#[test]
fn sealed_suite_reports_size() {
    let mut registry = Registry::new();
    assert!(registry.seal().is_empty());

    let mut registry = Registry::new();
    let fixture = registry.register_fixture::<Counter>("math").unwrap();
    registry.test(fixture, "one", |_| {}).unwrap();
    registry
        .register_parameterized(
            fixture,
            "many",
            |_| {},
            vec![
                ParamCase::tagged("x", |c: &mut Counter| c.value = 1),
                ParamCase::tagged("y", |c: &mut Counter| c.value = 2),
            ],
        )
        .unwrap();

    let suite = registry.seal();
    assert_eq!(suite.len(), 3);
    assert_eq!(suite.tests().count(), 3);
}
