//! Assertion protocol for test bodies.
//!
//! Every comparison captures both operands exactly once, renders them through
//! the type-directed formatter in [`format`], and on failure halts the running
//! test by unwinding with a [`Halt`] payload. The payload is raised with
//! [`std::panic::resume_unwind`], so no panic hook fires, and it is caught only
//! at the per-test boundary in [`crate::sandbox`].
//!
//! Failures are fail-fast: the first failing assertion ends the test body.

mod format;
mod macros;

pub use format::{
    render, Formattable, Nullable, Operand, RenderKnown, RenderSource, Truthy, Value,
};

use std::fmt;
use std::panic::{self, Location};

/// Prefix of every comparison diagnostic.
pub const DIAGNOSTIC_PREFIX: &str = "Expression is false: ";

/// Comparison operator of an assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    /// Source symbol of the operator.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    /// Whether `lhs op rhs` holds.
    pub fn holds<A, B>(self, lhs: &A, rhs: &B) -> bool
    where
        A: PartialOrd<B> + ?Sized,
        B: ?Sized,
    {
        match self {
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unwind payload that ends a test body early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Halt {
    /// An assertion did not hold; carries the rendered diagnostic.
    Failed(String),
    /// A skip directive fired; carries the caller's reason.
    Skipped(String),
}

/// A comparison that did not hold.
#[derive(Debug, Clone)]
pub struct Violation {
    pub op: CmpOp,
    pub lhs: String,
    pub rhs: String,
    pub expression: Option<String>,
    pub location: &'static Location<'static>,
}

impl Violation {
    /// Render the diagnostic written into the channel.
    ///
    /// The first line is always `Expression is false: <lhs> <op> <rhs>`.
    pub fn diagnostic(&self) -> String {
        let mut text = format!(
            "{}{} {} {}",
            DIAGNOSTIC_PREFIX,
            self.lhs,
            self.op.symbol(),
            self.rhs
        );
        if let Some(expression) = &self.expression {
            text.push_str("\n    expression: ");
            text.push_str(expression);
        }
        text.push_str(&format!(
            "\n    at {}:{}",
            self.location.file(),
            self.location.line()
        ));
        text
    }
}

/// Compare two formattable operands and halt the test if `lhs op rhs` fails.
///
/// Function form of the `require_*!` macros for callers that already hold
/// both values.
#[track_caller]
pub fn compare<A, B>(lhs: &A, rhs: &B, op: CmpOp)
where
    A: PartialOrd<B> + Formattable + ?Sized,
    B: Formattable + ?Sized,
{
    if !op.holds(lhs, rhs) {
        fail_comparison(op, render(lhs.value()), render(rhs.value()), None);
    }
}

/// Halt the running test with a comparison diagnostic.
#[doc(hidden)]
#[track_caller]
pub fn fail_comparison(op: CmpOp, lhs: String, rhs: String, expression: Option<&str>) -> ! {
    let violation = Violation {
        op,
        lhs,
        rhs,
        expression: expression.map(str::to_owned),
        location: Location::caller(),
    };
    fail(violation.diagnostic())
}

/// Halt the running test as failed with the given diagnostic.
pub fn fail(message: impl Into<String>) -> ! {
    panic::resume_unwind(Box::new(Halt::Failed(message.into())))
}

/// Halt the running test as skipped.
///
/// Skips must explain themselves: an empty reason turns the skip into a
/// failure.
pub fn skip(reason: impl Into<String>) -> ! {
    let reason = reason.into();
    if reason.trim().is_empty() {
        fail("skip directive requires a non-empty reason");
    }
    panic::resume_unwind(Box::new(Halt::Skipped(reason)))
}

/// Skip the running test if `condition` holds; otherwise return.
pub fn skip_if(condition: bool, reason: impl Into<String>) {
    if condition {
        skip(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::catch_unwind;

    fn halt_of<F: FnOnce() + std::panic::UnwindSafe>(f: F) -> Halt {
        let payload = catch_unwind(f).expect_err("body should halt");
        *payload.downcast::<Halt>().expect("payload should be a Halt")
    }

    #[test]
    fn test_symbols() {
        assert_eq!(CmpOp::Eq.symbol(), "==");
        assert_eq!(CmpOp::Ne.symbol(), "!=");
        assert_eq!(CmpOp::Lt.symbol(), "<");
        assert_eq!(CmpOp::Le.symbol(), "<=");
        assert_eq!(CmpOp::Gt.symbol(), ">");
        assert_eq!(CmpOp::Ge.symbol(), ">=");
        assert_eq!(CmpOp::Ge.to_string(), ">=");
    }

    #[test]
    fn test_holds_matches_operators() {
        assert!(CmpOp::Eq.holds(&3, &3));
        assert!(CmpOp::Ne.holds(&3, &4));
        assert!(CmpOp::Lt.holds(&3, &4));
        assert!(CmpOp::Le.holds(&4, &4));
        assert!(CmpOp::Gt.holds(&5, &4));
        assert!(CmpOp::Ge.holds(&4, &4));
        assert!(!CmpOp::Lt.holds(&4, &4));
        assert!(!CmpOp::Eq.holds(&f64::NAN, &f64::NAN));
    }

    #[test]
    fn test_compare_passes_silently() {
        compare(&42u8, &42u8, CmpOp::Eq);
        compare("abc", "abd", CmpOp::Lt);
    }

    #[test]
    fn test_compare_failure_diagnostic() {
        let halt = halt_of(|| compare(&4i32, &5i32, CmpOp::Eq));
        match halt {
            Halt::Failed(message) => {
                assert!(message.starts_with("Expression is false: 4 == 5"));
                assert!(message.contains("mod.rs"));
            }
            other => panic!("unexpected halt: {:?}", other),
        }
    }

    #[test]
    fn test_skip_carries_reason() {
        assert_eq!(
            halt_of(|| skip("not on this platform")),
            Halt::Skipped("not on this platform".into())
        );
    }

    #[test]
    fn test_empty_skip_reason_fails() {
        match halt_of(|| skip("  ")) {
            Halt::Failed(message) => assert!(message.contains("non-empty reason")),
            other => panic!("unexpected halt: {:?}", other),
        }
    }

    #[test]
    fn test_skip_if_false_returns() {
        skip_if(false, "never");
    }
}
