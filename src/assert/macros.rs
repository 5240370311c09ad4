//! Assertion and skip macros used inside test bodies and hooks.
//!
//! Every macro evaluates each operand exactly once, binding it by reference
//! before comparing, so side effects in operand expressions happen once.

#[doc(hidden)]
#[macro_export]
macro_rules! __require_cmp {
    ($op:ident, $cmp:tt, $lhs:expr, $rhs:expr) => {
        match (&$lhs, &$rhs) {
            (lhs, rhs) => {
                if !(*lhs $cmp *rhs) {
                    #[allow(unused_imports)]
                    use $crate::assert::{RenderKnown as _, RenderSource as _};
                    $crate::assert::fail_comparison(
                        $crate::assert::CmpOp::$op,
                        (&$crate::assert::Operand(lhs)).render_operand(stringify!($lhs)),
                        (&$crate::assert::Operand(rhs)).render_operand(stringify!($rhs)),
                        ::core::option::Option::Some(concat!(
                            stringify!($lhs),
                            " ",
                            stringify!($cmp),
                            " ",
                            stringify!($rhs)
                        )),
                    );
                }
            }
        }
    };
}

/// Require `lhs == rhs`.
#[macro_export]
macro_rules! require_eq {
    ($lhs:expr, $rhs:expr $(,)?) => {
        $crate::__require_cmp!(Eq, ==, $lhs, $rhs)
    };
}

/// Require `lhs != rhs`.
#[macro_export]
macro_rules! require_ne {
    ($lhs:expr, $rhs:expr $(,)?) => {
        $crate::__require_cmp!(Ne, !=, $lhs, $rhs)
    };
}

/// Require `lhs < rhs`.
#[macro_export]
macro_rules! require_lt {
    ($lhs:expr, $rhs:expr $(,)?) => {
        $crate::__require_cmp!(Lt, <, $lhs, $rhs)
    };
}

/// Require `lhs <= rhs`.
#[macro_export]
macro_rules! require_le {
    ($lhs:expr, $rhs:expr $(,)?) => {
        $crate::__require_cmp!(Le, <=, $lhs, $rhs)
    };
}

/// Require `lhs > rhs`.
#[macro_export]
macro_rules! require_gt {
    ($lhs:expr, $rhs:expr $(,)?) => {
        $crate::__require_cmp!(Gt, >, $lhs, $rhs)
    };
}

/// Require `lhs >= rhs`.
#[macro_export]
macro_rules! require_ge {
    ($lhs:expr, $rhs:expr $(,)?) => {
        $crate::__require_cmp!(Ge, >=, $lhs, $rhs)
    };
}

/// Require a value to differ from its type's zero value.
///
/// Works on booleans, integers, floats, chars and raw pointers.
#[macro_export]
macro_rules! require_true {
    ($value:expr $(,)?) => {
        match &$value {
            value => {
                if $crate::assert::Truthy::is_zero(value) {
                    $crate::assert::fail_comparison(
                        $crate::assert::CmpOp::Ne,
                        $crate::assert::render($crate::assert::Formattable::value(value)),
                        $crate::assert::render($crate::assert::Truthy::zero(value)),
                        ::core::option::Option::Some(stringify!($value)),
                    );
                }
            }
        }
    };
}

/// Alias of [`require_true!`].
#[macro_export]
macro_rules! require {
    ($value:expr $(,)?) => {
        $crate::require_true!($value)
    };
}

/// Require a value to equal its type's zero value.
#[macro_export]
macro_rules! require_false {
    ($value:expr $(,)?) => {
        match &$value {
            value => {
                if !$crate::assert::Truthy::is_zero(value) {
                    $crate::assert::fail_comparison(
                        $crate::assert::CmpOp::Eq,
                        $crate::assert::render($crate::assert::Formattable::value(value)),
                        $crate::assert::render($crate::assert::Truthy::zero(value)),
                        ::core::option::Option::Some(stringify!($value)),
                    );
                }
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __require_str {
    ($op:ident, $cmp:tt, $lhs:expr, $rhs:expr) => {
        match (&$lhs, &$rhs) {
            (lhs, rhs) => {
                let lhs: &str = ::core::convert::AsRef::<str>::as_ref(lhs);
                let rhs: &str = ::core::convert::AsRef::<str>::as_ref(rhs);
                if !(lhs $cmp rhs) {
                    $crate::assert::fail_comparison(
                        $crate::assert::CmpOp::$op,
                        $crate::assert::render($crate::assert::Value::Str(lhs)),
                        $crate::assert::render($crate::assert::Value::Str(rhs)),
                        ::core::option::Option::Some(concat!(
                            stringify!($lhs),
                            " ",
                            stringify!($cmp),
                            " ",
                            stringify!($rhs)
                        )),
                    );
                }
            }
        }
    };
}

/// Require two string-like values to have equal contents.
#[macro_export]
macro_rules! require_str_eq {
    ($lhs:expr, $rhs:expr $(,)?) => {
        $crate::__require_str!(Eq, ==, $lhs, $rhs)
    };
}

/// Require two string-like values to have different contents.
#[macro_export]
macro_rules! require_str_ne {
    ($lhs:expr, $rhs:expr $(,)?) => {
        $crate::__require_str!(Ne, !=, $lhs, $rhs)
    };
}

/// Require a pointer-like value to be null.
#[macro_export]
macro_rules! require_null {
    ($ptr:expr $(,)?) => {
        match &$ptr {
            ptr => {
                if !$crate::assert::Nullable::is_null(ptr) {
                    $crate::assert::fail_comparison(
                        $crate::assert::CmpOp::Eq,
                        $crate::assert::render($crate::assert::Value::Pointer(
                            $crate::assert::Nullable::address(ptr),
                        )),
                        $crate::assert::render($crate::assert::Value::Pointer(0)),
                        ::core::option::Option::Some(stringify!($ptr)),
                    );
                }
            }
        }
    };
}

/// Require a pointer-like value to be non-null.
#[macro_export]
macro_rules! require_non_null {
    ($ptr:expr $(,)?) => {
        match &$ptr {
            ptr => {
                if $crate::assert::Nullable::is_null(ptr) {
                    $crate::assert::fail_comparison(
                        $crate::assert::CmpOp::Ne,
                        $crate::assert::render($crate::assert::Value::Pointer(0)),
                        $crate::assert::render($crate::assert::Value::Pointer(0)),
                        ::core::option::Option::Some(stringify!($ptr)),
                    );
                }
            }
        }
    };
}

/// Skip the running test with a reason.
///
/// Accepts a plain reason or a format string with arguments.
#[macro_export]
macro_rules! skip {
    ($reason:literal $(,)?) => {
        $crate::assert::skip($reason)
    };
    ($fmt:literal, $($arg:tt)+) => {
        $crate::assert::skip(::std::format!($fmt, $($arg)+))
    };
    ($reason:expr $(,)?) => {
        $crate::assert::skip($reason)
    };
}

/// Skip the running test if the condition holds.
#[macro_export]
macro_rules! skip_if {
    ($cond:expr, $($reason:tt)+) => {
        if $cond {
            $crate::skip!($($reason)+);
        }
    };
}
