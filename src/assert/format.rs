//! Type-directed operand formatting.
//!
//! Assertion operands are rendered without caller-supplied format strings.
//! Each supported type maps itself onto a tagged [`Value`], and [`render`] is
//! the single routine that turns a `Value` into diagnostic text.
//!
//! Types that do not implement [`Formattable`] still work inside the
//! `require_*!` macros: the macros wrap each operand in [`Operand`] and call
//! `render_operand` through an autoref probe. [`RenderKnown`] matches first
//! for formattable types; everything else falls through to [`RenderSource`],
//! which renders the literal source expression.

use std::ptr::NonNull;

/// Tagged view of an operand, ready for rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Bool(bool),
    Signed(i128),
    Unsigned(u128),
    /// Size-typed unsigned integer (`usize`).
    Size(usize),
    Char(char),
    Float32(f32),
    Float64(f64),
    Str(&'a str),
    Bytes(&'a [u8]),
    /// Opaque address; zero is null.
    Pointer(usize),
}

/// Render a value as diagnostic text.
///
/// Strings are quoted, unsigned integers carry their hexadecimal form,
/// floats use the shortest representation that round-trips.
pub fn render(value: Value<'_>) -> String {
    match value {
        Value::Bool(b) => b.to_string(),
        Value::Signed(n) => n.to_string(),
        Value::Unsigned(n) => format!("{} ({:#x})", n, n),
        Value::Size(n) => format!("{} ({:#x})", n, n),
        Value::Char(c) => format!("'{}'", c.escape_debug()),
        Value::Float32(x) => format!("{:?}", x),
        Value::Float64(x) => format!("{:?}", x),
        Value::Str(s) => format!("\"{}\"", s.escape_debug()),
        Value::Bytes(b) => format!("b\"{}\"", b.escape_ascii()),
        Value::Pointer(0) => "NULL (0x0)".to_string(),
        Value::Pointer(addr) => format!("{:#x}", addr),
    }
}

/// A type the assertion protocol knows how to render.
pub trait Formattable {
    fn value(&self) -> Value<'_>;
}

macro_rules! formattable_int {
    ($variant:ident as $wide:ty => $($t:ty),+) => {
        $(
            impl Formattable for $t {
                fn value(&self) -> Value<'_> {
                    Value::$variant(<$wide>::from(*self))
                }
            }
        )+
    };
}

formattable_int!(Signed as i128 => i8, i16, i32, i64, i128);
formattable_int!(Unsigned as u128 => u8, u16, u32, u64, u128);

impl Formattable for isize {
    fn value(&self) -> Value<'_> {
        // isize is at most 64 bits on every supported target
        Value::Signed(*self as i128)
    }
}

impl Formattable for usize {
    fn value(&self) -> Value<'_> {
        Value::Size(*self)
    }
}

impl Formattable for bool {
    fn value(&self) -> Value<'_> {
        Value::Bool(*self)
    }
}

impl Formattable for char {
    fn value(&self) -> Value<'_> {
        Value::Char(*self)
    }
}

impl Formattable for f32 {
    fn value(&self) -> Value<'_> {
        Value::Float32(*self)
    }
}

impl Formattable for f64 {
    fn value(&self) -> Value<'_> {
        Value::Float64(*self)
    }
}

impl Formattable for str {
    fn value(&self) -> Value<'_> {
        Value::Str(self)
    }
}

impl Formattable for String {
    fn value(&self) -> Value<'_> {
        Value::Str(self.as_str())
    }
}

impl Formattable for [u8] {
    fn value(&self) -> Value<'_> {
        Value::Bytes(self)
    }
}

impl<const N: usize> Formattable for [u8; N] {
    fn value(&self) -> Value<'_> {
        Value::Bytes(self.as_slice())
    }
}

impl Formattable for Vec<u8> {
    fn value(&self) -> Value<'_> {
        Value::Bytes(self.as_slice())
    }
}

impl<T: ?Sized> Formattable for *const T {
    fn value(&self) -> Value<'_> {
        Value::Pointer(self.address())
    }
}

impl<T: ?Sized> Formattable for *mut T {
    fn value(&self) -> Value<'_> {
        Value::Pointer(self.address())
    }
}

impl<T: ?Sized> Formattable for NonNull<T> {
    fn value(&self) -> Value<'_> {
        Value::Pointer(self.address())
    }
}

impl<T: Formattable + ?Sized> Formattable for &T {
    fn value(&self) -> Value<'_> {
        (**self).value()
    }
}

/// A type with a zero value, used by the truthiness assertions.
///
/// `require_true!(x)` checks `x != zero` and `require_false!(x)` checks
/// `x == zero`, where zero is taken from the operand's own type.
pub trait Truthy: Formattable {
    fn is_zero(&self) -> bool;
    fn zero(&self) -> Value<'static>;
}

macro_rules! truthy_num {
    ($($t:ty),+) => {
        $(
            impl Truthy for $t {
                fn is_zero(&self) -> bool {
                    *self == (0 as $t)
                }

                fn zero(&self) -> Value<'static> {
                    (0 as $t).value_static()
                }
            }
        )+
    };
}

/// Zero values never borrow, so they can be produced as `Value<'static>`.
trait StaticValue {
    fn value_static(self) -> Value<'static>;
}

macro_rules! static_value {
    ($variant:ident as $wide:ty => $($t:ty),+) => {
        $(
            impl StaticValue for $t {
                fn value_static(self) -> Value<'static> {
                    Value::$variant(self as $wide)
                }
            }
        )+
    };
}

static_value!(Signed as i128 => i8, i16, i32, i64, i128, isize);
static_value!(Unsigned as u128 => u8, u16, u32, u64, u128);
static_value!(Size as usize => usize);
static_value!(Float32 as f32 => f32);
static_value!(Float64 as f64 => f64);

truthy_num!(i8, i16, i32, i64, i128, isize);
truthy_num!(u8, u16, u32, u64, u128, usize);
truthy_num!(f32, f64);

impl Truthy for bool {
    fn is_zero(&self) -> bool {
        !*self
    }

    fn zero(&self) -> Value<'static> {
        Value::Bool(false)
    }
}

impl Truthy for char {
    fn is_zero(&self) -> bool {
        *self == '\0'
    }

    fn zero(&self) -> Value<'static> {
        Value::Char('\0')
    }
}

impl<T: ?Sized> Truthy for *const T {
    fn is_zero(&self) -> bool {
        self.is_null()
    }

    fn zero(&self) -> Value<'static> {
        Value::Pointer(0)
    }
}

impl<T: ?Sized> Truthy for *mut T {
    fn is_zero(&self) -> bool {
        self.is_null()
    }

    fn zero(&self) -> Value<'static> {
        Value::Pointer(0)
    }
}

/// A pointer-like value that may be null.
pub trait Nullable {
    fn is_null(&self) -> bool;
    fn address(&self) -> usize;
}

impl<T: ?Sized> Nullable for *const T {
    fn is_null(&self) -> bool {
        self.address() == 0
    }

    fn address(&self) -> usize {
        self.cast::<()>() as usize
    }
}

impl<T: ?Sized> Nullable for *mut T {
    fn is_null(&self) -> bool {
        self.address() == 0
    }

    fn address(&self) -> usize {
        self.cast::<()>() as usize
    }
}

impl<T: ?Sized> Nullable for NonNull<T> {
    fn is_null(&self) -> bool {
        false
    }

    fn address(&self) -> usize {
        self.as_ptr().cast::<()>() as usize
    }
}

impl<T: ?Sized> Nullable for Option<&T> {
    fn is_null(&self) -> bool {
        self.is_none()
    }

    fn address(&self) -> usize {
        self.map_or(0, |r| (r as *const T).address())
    }
}

impl<T: ?Sized> Nullable for Option<&mut T> {
    fn is_null(&self) -> bool {
        self.is_none()
    }

    fn address(&self) -> usize {
        self.as_deref().map_or(0, |r| (r as *const T).address())
    }
}

impl<T: ?Sized> Nullable for Option<Box<T>> {
    fn is_null(&self) -> bool {
        self.is_none()
    }

    fn address(&self) -> usize {
        self.as_deref().map_or(0, |r| (r as *const T).address())
    }
}

impl<T: ?Sized> Nullable for Option<NonNull<T>> {
    fn is_null(&self) -> bool {
        self.is_none()
    }

    fn address(&self) -> usize {
        self.map_or(0, |p| p.address())
    }
}

/// Operand wrapper used by the assertion macros for render dispatch.
pub struct Operand<'a, T: ?Sized>(pub &'a T);

/// Renders operands whose type implements [`Formattable`].
pub trait RenderKnown {
    fn render_operand(&self, source: &str) -> String;
}

impl<T: Formattable + ?Sized> RenderKnown for Operand<'_, T> {
    fn render_operand(&self, _source: &str) -> String {
        render(self.0.value())
    }
}

/// Fallback for unrecognized types: the literal source expression.
pub trait RenderSource {
    fn render_operand(&self, source: &str) -> String;
}

impl<T: ?Sized> RenderSource for &Operand<'_, T> {
    fn render_operand(&self, source: &str) -> String {
        source.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers() {
        assert_eq!(render((-7i8).value()), "-7");
        assert_eq!(render(i64::MIN.value()), "-9223372036854775808");
        assert_eq!(render(255u8.value()), "255 (0xff)");
        assert_eq!(render(4096usize.value()), "4096 (0x1000)");
        assert_eq!(render(u128::MAX.value()), format!("{} ({:#x})", u128::MAX, u128::MAX));
    }

    #[test]
    fn test_text_and_bytes() {
        assert_eq!(render("a\"b".value()), "\"a\\\"b\"");
        assert_eq!(render(String::from("hi").value()), "\"hi\"");
        assert_eq!(render('x'.value()), "'x'");
        assert_eq!(render(b"ab\x00\n".value()), "b\"ab\\x00\\n\"");
    }

    #[test]
    fn test_floats_round_trip() {
        assert_eq!(render(0.1f64.value()), "0.1");
        assert_eq!(render(1.0f32.value()), "1.0");
        assert_eq!(render(f64::NAN.value()), "NaN");
    }

    #[test]
    fn test_pointers() {
        let null: *const u8 = std::ptr::null();
        assert_eq!(render(null.value()), "NULL (0x0)");
        let x = 5u32;
        let p = &x as *const u32;
        assert_eq!(render(p.value()), format!("{:#x}", p as usize));
    }

    #[test]
    fn test_zero_values() {
        assert!(0i32.is_zero());
        assert!(!1u64.is_zero());
        assert!(false.is_zero());
        assert!(0.0f64.is_zero());
        assert_eq!(render(7u16.zero()), "0 (0x0)");
        assert_eq!(render(true.zero()), "false");
    }

    #[test]
    fn test_nullable_options() {
        let x = 3u8;
        let some: Option<&u8> = Some(&x);
        let none: Option<&u8> = None;
        assert!(!some.is_null());
        assert!(none.is_null());
        assert_eq!(none.address(), 0);
        assert_eq!(some.address(), &x as *const u8 as usize);
        let boxed: Option<Box<u8>> = Some(Box::new(1));
        assert!(!boxed.is_null());
    }

    #[test]
    fn test_autoref_dispatch() {
        struct Opaque;
        let known = 42u8;
        let unknown = Opaque;
        assert_eq!((&Operand(&known)).render_operand("known"), "42 (0x2a)");
        assert_eq!((&Operand(&unknown)).render_operand("unknown"), "unknown");
    }
}
