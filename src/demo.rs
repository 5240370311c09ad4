//! Bundled demonstration suite.
//!
//! Exercises every feature of the engine: an empty fixture, fixture data,
//! parameterized cases, custom setup and teardown, every assertion form, one
//! deliberate assertion failure and, under process isolation, one deliberate
//! memory fault. The binary runs this suite, so a full run reports one
//! failure and one crash.

use crate::registry::{ParamCase, Registry, RegistryError, Suite};
use crate::sandbox::IsolationMode;
use crate::{
    require_eq, require_false, require_ge, require_gt, require_le, require_lt, require_ne,
    require_non_null, require_null, require_str_eq, require_true, skip, skip_if,
};

/// Data for tests that measure strings.
#[derive(Debug, Default)]
pub struct StringData {
    pub text: Option<&'static str>,
    pub length: usize,
}

/// A buffer allocated by setup and released by teardown.
#[derive(Debug, Default)]
pub struct ScratchBuffer {
    pub text: Option<String>,
}

pub const SCRATCH_CAPACITY: usize = 1024;

/// Build the demonstration suite.
///
/// The memory-fault test only faults when `mode` can contain it; inline it
/// skips itself instead of taking the runner down.
pub fn suite(mode: IsolationMode) -> Result<Suite, RegistryError> {
    let mut registry = Registry::new();
    register_simple(&mut registry, cfg!(unix) && mode == IsolationMode::Fork)?;
    register_strings(&mut registry)?;
    register_custom_lifecycle(&mut registry)?;
    Ok(registry.seal())
}

fn register_simple(registry: &mut Registry, contained: bool) -> Result<(), RegistryError> {
    let simple = registry.register_fixture::<()>("simple")?;

    registry.test(simple, "assert_true_succeeds", |_| {
        require_true!(1);
    })?;

    registry.test(simple, "skipped_test_does_not_run", |_| {
        skip!("This test is skipped for demonstration purposes.");
    })?;

    registry.test(simple, "conditionally_skipped_test", |_| {
        skip_if!(false, "This skip directive will not run.");
        require_true!(1);
        skip_if!(true, "But this one will!");
        require_true!(0);
    })?;

    registry.test(simple, "all_assertions", |data| {
        require_eq!(437, 437);
        require_ne!(42, 437);
        require_lt!(42, 437);
        require_le!(437, 437);
        require_gt!(437, 42);
        require_ge!(437, 437);
        require_str_eq!("Hello!", "Hello!");
        require_null!(std::ptr::null::<u8>());
        require_non_null!(data as *const ());
        require_true!(1);
        // Fails on purpose.
        require_false!(1);
    })?;

    registry.test(simple, "segfault_does_not_crash", move |_| {
        if !contained {
            skip!("memory faults are only contained under fork isolation");
        }
        let value = read_invalid_address();
        require_eq!(value, 0u32);
    })?;

    Ok(())
}

fn register_strings(registry: &mut Registry) -> Result<(), RegistryError> {
    let strings = registry.register_fixture::<StringData>("string")?;

    registry.test(strings, "strlen_returns_correct_length", |data| {
        data.text = Some("Hello!");
        data.length = 6;
        require_non_null!(data.text);
        require_str_eq!(data.text.unwrap_or_default(), "Hello!");
        require_eq!(data.text.map_or(0, str::len), data.length);
    })?;

    let cases = vec![
        ParamCase::new(|d: &mut StringData| set_text(d, "", 0)),
        ParamCase::new(|d: &mut StringData| set_text(d, "Hello!", 6)),
        ParamCase::new(|d: &mut StringData| set_text(d, "Parameterised testing is awesome!", 33)),
        ParamCase::new(|d: &mut StringData| set_text(d, "One more parameter set", 22)),
    ];
    registry.register_parameterized(
        strings,
        "strlen_correct_length_parameterised",
        |data| {
            require_non_null!(data.text);
            require_eq!(data.text.map_or(0, str::len), data.length);
        },
        cases,
    )?;

    Ok(())
}

fn set_text(data: &mut StringData, text: &'static str, length: usize) {
    data.text = Some(text);
    data.length = length;
}

fn register_custom_lifecycle(registry: &mut Registry) -> Result<(), RegistryError> {
    let custom = registry.register_fixture::<ScratchBuffer>("custom_lifecycle")?;
    registry.override_setup(custom, |data| {
        data.text = Some(String::with_capacity(SCRATCH_CAPACITY));
    })?;
    registry.override_teardown(custom, |data| {
        data.text = None;
    })?;

    registry.test(custom, "copy_to_dynamic_string", |data| {
        require_non_null!(data.text.as_ref());
        let Some(text) = data.text.as_mut() else {
            return;
        };
        text.push_str("Custom test lifecycles rock!");
        require_str_eq!(text, "Custom test lifecycles rock!");
        require_eq!(text.len(), 28);
        require_ge!(text.capacity(), SCRATCH_CAPACITY);
    })?;

    Ok(())
}

#[cfg(unix)]
fn read_invalid_address() -> u32 {
    // SAFETY: none. Faults deliberately; only reached inside a forked child.
    unsafe { std::ptr::read_volatile(std::ptr::null::<u32>().wrapping_add(4)) }
}

#[cfg(not(unix))]
fn read_invalid_address() -> u32 {
    0
}
