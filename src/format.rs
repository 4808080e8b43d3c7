//! Number formatting without the `core::fmt` machinery, and the [`Emit`]
//! protocol that the output stream and [`Serialize`] are built on.

use std::fmt::{self, Write as _};

use crate::{
    memory::ArrayResource,
    string::{OwnedString, StringView},
    Result,
};

/// Enough room for any `i64` or `u64`, sign included.
pub const INT_BUF_LEN: usize = 32;

/// Room for a float in the fast path or its scientific fallback.
pub const FLOAT_BUF_LEN: usize = 64;

/// Fractional digits beyond this are not meaningful for an `f64`.
pub const MAX_DECIMALS: u32 = 17;

/// Writes the decimal digits of `value` to the start of `buf` and returns how
/// many bytes were written.
///
/// ```
/// # use pmr_kit::format::{utoa, INT_BUF_LEN};
/// let mut buf = [0; INT_BUF_LEN];
/// let n = utoa(1024, &mut buf);
/// assert_eq!(&buf[..n], b"1024");
/// ```
pub fn utoa(mut value: u64, buf: &mut [u8; INT_BUF_LEN]) -> usize {
    let mut len = 0;
    loop {
        buf[len] = b'0' + (value % 10) as u8;
        len += 1;
        value /= 10;
        if value == 0 {
            break;
        }
    }
    buf[..len].reverse();
    len
}

/// Like [`utoa`], with a leading `-` for negative values. `i64::MIN` is
/// formatted through its unsigned magnitude.
pub fn itoa(value: i64, buf: &mut [u8; INT_BUF_LEN]) -> usize {
    if value >= 0 {
        return utoa(value as u64, buf);
    }
    let mut digits = [0; INT_BUF_LEN];
    let len = utoa(value.unsigned_abs(), &mut digits);
    buf[0] = b'-';
    buf[1..=len].copy_from_slice(&digits[..len]);
    len + 1
}

/// Formats into a fixed buffer through `core::fmt`, for values outside the
/// fast path.
struct Cursor<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl fmt::Write for Cursor<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.len + s.len();
        if end > self.buf.len() {
            return Err(fmt::Error);
        }
        self.buf[self.len..end].copy_from_slice(s.as_bytes());
        self.len = end;
        Ok(())
    }
}

/// Writes `value` with exactly `decimals` fractional digits (capped at
/// [`MAX_DECIMALS`]) and returns the length.
///
/// The magnitude is scaled by `10^decimals` and rounded to the nearest
/// integer, exact ties going to the even neighbour. Zero results print
/// without a sign. `NaN` and the infinities print as `nan`, `inf` and `-inf`.
///
/// ```
/// # use pmr_kit::format::{dtoa, FLOAT_BUF_LEN};
/// let mut buf = [0; FLOAT_BUF_LEN];
/// let n = dtoa(-3.14159, 2, &mut buf);
/// assert_eq!(&buf[..n], b"-3.14");
/// ```
pub fn dtoa(value: f64, decimals: u32, buf: &mut [u8; FLOAT_BUF_LEN]) -> usize {
    let special: &[u8] = if value.is_nan() {
        b"nan"
    } else if value == f64::INFINITY {
        b"inf"
    } else if value == f64::NEG_INFINITY {
        b"-inf"
    } else {
        b""
    };
    if !special.is_empty() {
        buf[..special.len()].copy_from_slice(special);
        return special.len();
    }

    let decimals = decimals.min(MAX_DECIMALS);
    let scale = 10u64.pow(decimals);
    let scaled = value.abs() * scale as f64;
    if scaled >= u64::MAX as f64 {
        // Beyond the integer fast path.
        let mut cursor = Cursor { buf: &mut buf[..], len: 0 };
        return match write!(cursor, "{:.*e}", decimals as usize, value) {
            Ok(()) => cursor.len,
            Err(_) => 0,
        };
    }

    let floor = scaled.floor();
    let rest = scaled - floor;
    let mut units = floor as u64;
    if rest > 0.5 || (rest == 0.5 && units % 2 == 1) {
        units += 1;
    }

    let mut len = 0;
    if value.is_sign_negative() && units != 0 {
        buf[0] = b'-';
        len = 1;
    }
    let mut digits = [0; INT_BUF_LEN];
    let n = utoa(units / scale, &mut digits);
    buf[len..len + n].copy_from_slice(&digits[..n]);
    len += n;

    if decimals > 0 {
        buf[len] = b'.';
        len += 1;
        let mut frac = units % scale;
        for i in (0..decimals as usize).rev() {
            buf[len + i] = b'0' + (frac % 10) as u8;
            frac /= 10;
        }
        len += decimals as usize;
    }
    len
}

/// A destination for formatted bytes.
pub trait Sink {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()>;
}

impl<const G: usize, R: ArrayResource<u8>> Sink for OwnedString<G, R> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.push_bytes(bytes)
    }
}

/// Values that know how to write themselves into a [`Sink`].
///
/// Integers print in decimal, floats with two fractional digits (see
/// [`dtoa`]) and a `u8` as the single raw byte it holds.
pub trait Emit {
    fn emit<S: Sink + ?Sized>(&self, sink: &mut S) -> Result<()>;
}

impl<T: Emit + ?Sized> Emit for &T {
    fn emit<S: Sink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        (**self).emit(sink)
    }
}

macro_rules! emit_signed {
    ($($ty:ty),*) => {$(
        impl Emit for $ty {
            fn emit<S: Sink + ?Sized>(&self, sink: &mut S) -> Result<()> {
                let mut buf = [0; INT_BUF_LEN];
                let len = itoa(*self as i64, &mut buf);
                sink.write_bytes(&buf[..len])
            }
        }
    )*};
}

macro_rules! emit_unsigned {
    ($($ty:ty),*) => {$(
        impl Emit for $ty {
            fn emit<S: Sink + ?Sized>(&self, sink: &mut S) -> Result<()> {
                let mut buf = [0; INT_BUF_LEN];
                let len = utoa(*self as u64, &mut buf);
                sink.write_bytes(&buf[..len])
            }
        }
    )*};
}

emit_signed!(i8, i16, i32, i64, isize);
emit_unsigned!(u16, u32, u64, usize);

impl Emit for u8 {
    fn emit<S: Sink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        sink.write_bytes(&[*self])
    }
}

impl Emit for f64 {
    fn emit<S: Sink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        let mut buf = [0; FLOAT_BUF_LEN];
        let len = dtoa(*self, 2, &mut buf);
        sink.write_bytes(&buf[..len])
    }
}

impl Emit for f32 {
    fn emit<S: Sink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        f64::from(*self).emit(sink)
    }
}

impl Emit for bool {
    fn emit<S: Sink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        sink.write_bytes(if *self { b"true" } else { b"false" })
    }
}

impl Emit for char {
    fn emit<S: Sink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        let mut buf = [0; 4];
        sink.write_bytes(self.encode_utf8(&mut buf).as_bytes())
    }
}

impl Emit for str {
    fn emit<S: Sink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        sink.write_bytes(self.as_bytes())
    }
}

impl Emit for [u8] {
    fn emit<S: Sink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        sink.write_bytes(self)
    }
}

impl<const G: usize, R: ArrayResource<u8>> Emit for OwnedString<G, R> {
    fn emit<S: Sink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        sink.write_bytes(self.as_bytes())
    }
}

impl Emit for StringView<'_> {
    fn emit<S: Sink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        sink.write_bytes(self.as_bytes())
    }
}

/// Renders a value into a fresh [`OwnedString`].
pub trait Serialize {
    fn serialize(&self) -> Result<OwnedString>;
}

impl<T: Emit + ?Sized> Serialize for T {
    fn serialize(&self) -> Result<OwnedString> {
        let mut out = OwnedString::new();
        self.emit(&mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{assert, check};

    fn int(value: i64) -> Vec<u8> {
        let mut buf = [0; INT_BUF_LEN];
        let n = itoa(value, &mut buf);
        buf[..n].to_vec()
    }

    fn float(value: f64, decimals: u32) -> String {
        let mut buf = [0; FLOAT_BUF_LEN];
        let n = dtoa(value, decimals, &mut buf);
        String::from_utf8(buf[..n].to_vec()).unwrap()
    }

    #[test]
    fn integers() {
        check!(int(0) == b"0");
        check!(int(7) == b"7");
        check!(int(-42) == b"-42");
        check!(int(i64::MAX) == b"9223372036854775807");
        check!(int(i64::MIN) == b"-9223372036854775808");

        let mut buf = [0; INT_BUF_LEN];
        let n = utoa(u64::MAX, &mut buf);
        check!(&buf[..n] == b"18446744073709551615");
    }

    #[test]
    fn floats_with_two_digits() {
        check!(float(3.14159, 2) == "3.14");
        check!(float(2.999, 2) == "3.00");
        check!(float(-0.5, 2) == "-0.50");
        check!(float(0.0, 2) == "0.00");
        check!(float(-0.001, 2) == "0.00");
        check!(float(100.0, 0) == "100");
        check!(float(1.5, 3) == "1.500");
    }

    #[test]
    fn exact_ties_round_to_even() {
        // 0.125 and 0.375 are exact in binary.
        check!(float(0.125, 2) == "0.12");
        check!(float(0.375, 2) == "0.38");
        check!(float(2.5, 0) == "2");
        check!(float(3.5, 0) == "4");
    }

    #[test]
    fn special_floats() {
        check!(float(f64::NAN, 2) == "nan");
        check!(float(f64::INFINITY, 2) == "inf");
        check!(float(f64::NEG_INFINITY, 2) == "-inf");
        check!(float(1e300, 2) == "1.00e300");
    }

    #[test]
    fn serialize_values() {
        assert!(42u32.serialize().unwrap() == "42");
        assert!((-7i8).serialize().unwrap() == "-7");
        assert!(true.serialize().unwrap() == "true");
        assert!(b'x'.serialize().unwrap() == "x");
        assert!('é'.serialize().unwrap() == "é");
        assert!(1.25f32.serialize().unwrap() == "1.25");
        assert!("text".serialize().unwrap() == "text");

        let owned: OwnedString = OwnedString::from("owned");
        assert!(owned.serialize().unwrap() == "owned");
        assert!(owned.view().serialize().unwrap() == "owned");
    }

    #[test]
    fn emit_appends_to_strings() {
        let mut s: OwnedString = OwnedString::from("n=");
        12i32.emit(&mut s).unwrap();
        ", ".emit(&mut s).unwrap();
        (-0.756f64).emit(&mut s).unwrap();
        assert!(s == "n=12, -0.76");
    }
}
