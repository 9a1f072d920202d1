//! Byte encodings for typed keys and values.
//!
//! Every encoding here preserves order: for two values `a` and `b` of the
//! same type, `a < b` exactly when `a.encode() < b.encode()` under plain
//! byte comparison. A typed range therefore maps onto a byte range, and a
//! view clamped to encoded bounds returns values in their natural order.
//!
//! | type                 | encoding                                        |
//! |----------------------|-------------------------------------------------|
//! | `u8` .. `u64`        | big-endian, fixed width                         |
//! | `i8` .. `i64`        | sign bit flipped, then big-endian               |
//! | `usize` / `isize`    | as `u64` / `i64`                                |
//! | `f64`                | [`f64_to_ordered`], big-endian                  |
//! | `String`             | UTF-8                                           |
//! | `Vec<u8>`            | unchanged                                       |
//!
//! Integer encodings are fixed width, so a prefix of one is never a valid
//! key of the same type. Strings and byte vectors keep variable width.

use crate::error::{Error, Result};

const F64_SIGN: u64 = 1 << 63;

/// A type with an order-preserving byte encoding.
pub trait Codec: Sized {
    fn encode(&self) -> Vec<u8>;

    /// Rebuild a value from its encoding. Bytes that are not a valid
    /// encoding of `Self` are [`Error::Corruption`].
    fn decode(bytes: &[u8]) -> Result<Self>;
}

fn fixed<const N: usize>(bytes: &[u8], type_name: &str) -> Result<[u8; N]> {
    <[u8; N]>::try_from(bytes).map_err(|_| {
        Error::Corruption(format!(
            "expected {} bytes for {}, got {}",
            N,
            type_name,
            bytes.len()
        ))
    })
}

macro_rules! unsigned_codec {
    ($($t:ty),*) => {$(
        impl Codec for $t {
            fn encode(&self) -> Vec<u8> {
                self.to_be_bytes().to_vec()
            }

            fn decode(bytes: &[u8]) -> Result<Self> {
                Ok(<$t>::from_be_bytes(fixed(bytes, stringify!($t))?))
            }
        }
    )*};
}

// Flipping the sign bit moves i::MIN to 0 and i::MAX to u::MAX, so
// two's-complement order becomes unsigned order.
macro_rules! signed_codec {
    ($($t:ty => $u:ty),*) => {$(
        impl Codec for $t {
            fn encode(&self) -> Vec<u8> {
                let biased = (*self as $u) ^ ((1 as $u) << (<$u>::BITS - 1));
                biased.to_be_bytes().to_vec()
            }

            fn decode(bytes: &[u8]) -> Result<Self> {
                let biased = <$u>::from_be_bytes(fixed(bytes, stringify!($t))?);
                Ok((biased ^ ((1 as $u) << (<$u>::BITS - 1))) as $t)
            }
        }
    )*};
}

unsigned_codec!(u8, u16, u32, u64);
signed_codec!(i8 => u8, i16 => u16, i32 => u32, i64 => u64);

impl Codec for usize {
    fn encode(&self) -> Vec<u8> {
        (*self as u64).encode()
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let wide = u64::decode(bytes)?;
        usize::try_from(wide).map_err(|_| Error::Corruption(format!("{} does not fit in usize", wide)))
    }
}

impl Codec for isize {
    fn encode(&self) -> Vec<u8> {
        (*self as i64).encode()
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let wide = i64::decode(bytes)?;
        isize::try_from(wide).map_err(|_| Error::Corruption(format!("{} does not fit in isize", wide)))
    }
}

/// Map `x` to a `u64` whose unsigned order matches the numeric order of
/// `f64`.
///
/// Positive values keep their IEEE bits above `1 << 63`. Negative values
/// sit the same distance below it, so `-0.0` and `0.0` share one encoding.
/// Every NaN maps to `u64::MAX`, above `+∞`.
pub fn f64_to_ordered(x: f64) -> u64 {
    if x.is_nan() {
        return u64::MAX;
    }
    let magnitude = x.to_bits() & !F64_SIGN;
    if x.is_sign_negative() {
        F64_SIGN - magnitude
    } else {
        F64_SIGN | magnitude
    }
}

/// Inverse of [`f64_to_ordered`]. Values no `f64` maps to decode as NaN.
pub fn f64_from_ordered(value: u64) -> f64 {
    if value >= F64_SIGN {
        f64::from_bits(value - F64_SIGN)
    } else {
        -f64::from_bits(F64_SIGN - value)
    }
}

impl Codec for f64 {
    fn encode(&self) -> Vec<u8> {
        f64_to_ordered(*self).encode()
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(f64_from_ordered(u64::decode(bytes)?))
    }
}

impl Codec for String {
    fn encode(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::Corruption(format!("invalid UTF-8: {}", e)))
    }
}

impl Codec for Vec<u8> {
    fn encode(&self) -> Vec<u8> {
        self.clone()
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_flip_bounds() {
        assert_eq!(i8::MIN.encode(), vec![0x00]);
        assert_eq!((-1i8).encode(), vec![0x7F]);
        assert_eq!(0i8.encode(), vec![0x80]);
        assert_eq!(i8::MAX.encode(), vec![0xFF]);
        assert_eq!(i32::decode(&i32::MIN.encode()).unwrap(), i32::MIN);
    }

    #[test]
    fn f64_landmarks() {
        assert_eq!(f64_to_ordered(0.0), F64_SIGN);
        assert_eq!(f64_to_ordered(-0.0), F64_SIGN);
        assert_eq!(f64_to_ordered(f64::INFINITY), 0xFFF0_0000_0000_0000);
        assert_eq!(f64_to_ordered(f64::NEG_INFINITY), 0x0010_0000_0000_0000);
        assert_eq!(f64_to_ordered(f64::NAN), u64::MAX);
        assert_eq!(f64_to_ordered(-f64::NAN), u64::MAX);
        assert!(f64_from_ordered(u64::MAX).is_nan());
    }

    #[test]
    fn wrong_width_is_corruption() {
        let err = u32::decode(&[1, 2, 3]).unwrap_err();
        assert!(err.is_corruption());
        assert_eq!(err.to_string(), "Corruption: expected 4 bytes for u32, got 3");
        assert!(String::decode(&[0xFF, 0xFE]).unwrap_err().is_corruption());
    }
}
