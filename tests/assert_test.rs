//! Assertion macro and diagnostic tests.
//!
//! Assertions halt by unwinding with a `Halt` payload; these tests catch the
//! unwind directly instead of going through a sandbox.

use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr::NonNull;

use gg_testbed::assert::{Halt, DIAGNOSTIC_PREFIX};
use gg_testbed::{
    require, require_eq, require_false, require_ge, require_gt, require_le, require_lt,
    require_ne, require_non_null, require_null, require_str_eq, require_str_ne, require_true,
    skip, skip_if,
};

fn halt<F: FnOnce()>(f: F) -> Option<Halt> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => None,
        Err(payload) => Some(*payload.downcast::<Halt>().expect("payload should be a Halt")),
    }
}

fn failure<F: FnOnce()>(f: F) -> String {
    match halt(f) {
        Some(Halt::Failed(message)) => message,
        other => panic!("expected failure, got {:?}", other),
    }
}

fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or_default()
}

// =============================================================================
// Comparisons
// =============================================================================

#[test]
fn passing_comparisons_do_not_halt() {
    assert!(halt(|| {
        require_eq!(437, 437);
        require_ne!(42, 437);
        require_lt!(42, 437);
        require_le!(437, 437);
        require_gt!(437, 42);
        require_ge!(437, 437);
    })
    .is_none());
}

#[test]
fn equality_failure_shows_both_values() {
    let message = failure(|| {
        let x = 4i32;
        require_eq!(x, 5);
    });
    assert_eq!(first_line(&message), "Expression is false: 4 == 5");
    assert!(message.contains("expression: x == 5"));
    assert!(message.contains("assert_test.rs"));
}

#[test]
fn every_operator_renders_its_symbol() {
    let cases: [(&str, Box<dyn Fn()>); 6] = [
        ("1 != 1", Box::new(|| require_ne!(1, 1))),
        ("2 < 1", Box::new(|| require_lt!(2, 1))),
        ("2 <= 1", Box::new(|| require_le!(2, 1))),
        ("1 > 2", Box::new(|| require_gt!(1, 2))),
        ("1 >= 2", Box::new(|| require_ge!(1, 2))),
        ("1 == 2", Box::new(|| require_eq!(1, 2))),
    ];
    for (expected, body) in cases {
        let message = failure(|| body());
        assert_eq!(first_line(&message), format!("{}{}", DIAGNOSTIC_PREFIX, expected));
    }
}

#[test]
fn unsigned_values_include_hex() {
    let message = failure(|| require_eq!(255u8, 0u8));
    assert_eq!(first_line(&message), "Expression is false: 255 (0xff) == 0 (0x0)");
}

#[test]
fn string_operands_are_quoted() {
    let message = failure(|| require_eq!("abc", "abd"));
    assert_eq!(first_line(&message), "Expression is false: \"abc\" == \"abd\"");
}

#[test]
fn float_operands_round_trip() {
    let message = failure(|| require_lt!(0.3f64, 0.1f64));
    assert_eq!(first_line(&message), "Expression is false: 0.3 < 0.1");
}

#[test]
fn unformattable_operands_fall_back_to_source_text() {
    #[derive(Debug, PartialEq)]
    struct Point {
        x: i32,
    }
    let a = Point { x: 1 };
    let message = failure(|| require_eq!(a, Point { x: 2 }));
    assert_eq!(
        first_line(&message),
        "Expression is false: a == Point { x: 2 }"
    );
}

#[test]
fn operands_are_evaluated_once() {
    let calls = Cell::new(0);
    let next = || {
        calls.set(calls.get() + 1);
        calls.get()
    };
    let message = failure(|| require_eq!(next(), 7));
    assert_eq!(calls.get(), 1);
    assert_eq!(first_line(&message), "Expression is false: 1 == 7");
}

#[test]
fn first_failure_stops_the_body() {
    let reached = Cell::new(false);
    let message = failure(|| {
        require_eq!(1, 2);
        reached.set(true);
        require_eq!(3, 4);
    });
    assert!(!reached.get());
    assert!(message.contains("1 == 2"));
}

// =============================================================================
// Truthiness
// =============================================================================

#[test]
fn truthiness_uses_the_operand_type_zero() {
    assert!(halt(|| {
        require_true!(1);
        require_true!(true);
        require_true!(-0.5f64);
        require!('a');
        require_false!(0u64);
        require_false!(false);
    })
    .is_none());

    let message = failure(|| require_true!(0u16));
    assert_eq!(first_line(&message), "Expression is false: 0 (0x0) != 0 (0x0)");

    let message = failure(|| require_false!(1));
    assert_eq!(first_line(&message), "Expression is false: 1 == 0");
    assert!(message.contains("expression: 1"));
}

// =============================================================================
// Strings And Pointers
// =============================================================================

#[test]
fn string_contents_are_compared() {
    let owned = String::from("Hello!");
    assert!(halt(|| {
        require_str_eq!(owned, "Hello!");
        require_str_ne!(owned.as_str(), "hello!");
    })
    .is_none());

    let message = failure(|| require_str_eq!(owned, "Hello?"));
    assert_eq!(
        first_line(&message),
        "Expression is false: \"Hello!\" == \"Hello?\""
    );
}

#[test]
fn null_checks_accept_pointer_like_values() {
    let value = 5u32;
    let present: Option<&u32> = Some(&value);
    let absent: Option<&u32> = None;
    assert!(halt(|| {
        require_null!(std::ptr::null::<u8>());
        require_null!(absent);
        require_non_null!(present);
        require_non_null!(NonNull::from(&value));
        require_non_null!(&value as *const u32);
    })
    .is_none());

    let message = failure(|| require_non_null!(absent));
    assert_eq!(first_line(&message), "Expression is false: NULL (0x0) != NULL (0x0)");

    let message = failure(|| require_null!(present));
    assert!(first_line(&message).ends_with("== NULL (0x0)"));
    assert!(first_line(&message).contains("0x"));
}

// =============================================================================
// Skips
// =============================================================================

#[test]
fn skip_carries_reason() {
    assert_eq!(
        halt(|| {
            skip!("known bug");
        }),
        Some(Halt::Skipped("known bug".into()))
    );
    assert_eq!(
        halt(|| {
            skip!("issue #{}", 42);
        }),
        Some(Halt::Skipped("issue #42".into()))
    );
}

#[test]
fn skip_if_only_skips_when_condition_holds() {
    let reached = Cell::new(0);
    let outcome = halt(|| {
        skip_if!(false, "not this one");
        reached.set(1);
        skip_if!(true, "but this one");
        reached.set(2);
    });
    assert_eq!(reached.get(), 1);
    assert_eq!(outcome, Some(Halt::Skipped("but this one".into())));
}

#[test]
fn skip_without_reason_is_a_failure() {
    let message = failure(|| {
        skip!("");
    });
    assert!(message.contains("non-empty reason"));
}
