// src/data_formats/dtype.rs
//
// `descr` strings and the element types we can decode them into.

use super::npy::NpyError;

/// Byte order marker of a `descr` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    const NATIVE: ByteOrder = if cfg!(target_endian = "big") {
        ByteOrder::Big
    } else {
        ByteOrder::Little
    };
}

/// Scalar kind of a `descr` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Bool,
    Int,
    UInt,
    Float,
}

/// A decoded, supported `descr` such as `<f8` or `|u1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dtype {
    pub kind: Kind,
    pub size: usize,
    pub order: ByteOrder,
}

/// A single value read out of a file, before conversion to the output type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl Dtype {
    /// Parse a numpy type string.
    pub fn parse(descr: &str) -> Result<Self, NpyError> {
        let unsupported = || NpyError::UnsupportedDtype(descr.to_string());
        let bytes = descr.as_bytes();
        let (order, rest) = match bytes.first() {
            Some(b'<') => (Some(ByteOrder::Little), &bytes[1..]),
            Some(b'>') => (Some(ByteOrder::Big), &bytes[1..]),
            Some(b'=') => (Some(ByteOrder::NATIVE), &bytes[1..]),
            Some(b'|') => (None, &bytes[1..]),
            _ => (None, bytes),
        };
        let (&kind, size) = rest.split_first().ok_or_else(unsupported)?;
        let size: usize = std::str::from_utf8(size)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(unsupported)?;
        let kind = match (kind, size) {
            (b'b', 1) => Kind::Bool,
            (b'i', 1 | 2 | 4 | 8) => Kind::Int,
            (b'u', 1 | 2 | 4 | 8) => Kind::UInt,
            (b'f', 4 | 8) => Kind::Float,
            _ => return Err(unsupported()),
        };
        // Multi-byte types need an explicit order; `|` only makes sense for single bytes.
        let order = match order {
            Some(o) => o,
            None if size == 1 => ByteOrder::Little,
            None => return Err(unsupported()),
        };
        Ok(Self { kind, size, order })
    }

    /// Decode one element from exactly `self.size` bytes.
    pub fn read_scalar(&self, b: &[u8]) -> Scalar {
        macro_rules! read {
            ($t:ty, $n:literal) => {{
                let raw = fixed::<$n>(b);
                match self.order {
                    ByteOrder::Little => <$t>::from_le_bytes(raw),
                    ByteOrder::Big => <$t>::from_be_bytes(raw),
                }
            }};
        }
        match (self.kind, self.size) {
            (Kind::Bool, _) => Scalar::Bool(b[0] != 0),
            (Kind::Int, 1) => Scalar::Int(b[0] as i8 as i64),
            (Kind::Int, 2) => Scalar::Int(read!(i16, 2) as i64),
            (Kind::Int, 4) => Scalar::Int(read!(i32, 4) as i64),
            (Kind::Int, _) => Scalar::Int(read!(i64, 8)),
            (Kind::UInt, 1) => Scalar::UInt(b[0] as u64),
            (Kind::UInt, 2) => Scalar::UInt(read!(u16, 2) as u64),
            (Kind::UInt, 4) => Scalar::UInt(read!(u32, 4) as u64),
            (Kind::UInt, _) => Scalar::UInt(read!(u64, 8)),
            (Kind::Float, 4) => Scalar::Float(read!(f32, 4) as f64),
            (Kind::Float, _) => Scalar::Float(read!(f64, 8)),
        }
    }
}

fn fixed<const N: usize>(b: &[u8]) -> [u8; N] {
    let mut raw = [0u8; N];
    raw.copy_from_slice(&b[..N]);
    raw
}

/// Element types that can be written to and decoded from `.npy` data.
pub trait NpyElement: Copy + Send + 'static {
    /// `descr` written for this type.
    const DESCR: &'static str;

    /// Convert a decoded value with `as`-cast semantics.
    fn from_scalar(value: Scalar) -> Self;

    /// Append the little-endian encoding of `self`.
    fn write_le(&self, out: &mut Vec<u8>);
}

macro_rules! impl_numeric_element {
    ($($t:ty => $descr:literal),* $(,)?) => {$(
        impl NpyElement for $t {
            const DESCR: &'static str = $descr;

            fn from_scalar(value: Scalar) -> Self {
                match value {
                    Scalar::Bool(v) => v as u8 as $t,
                    Scalar::Int(v) => v as $t,
                    Scalar::UInt(v) => v as $t,
                    Scalar::Float(v) => v as $t,
                }
            }

            fn write_le(&self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }
        }
    )*};
}

impl_numeric_element! {
    i8 => "|i1", i16 => "<i2", i32 => "<i4", i64 => "<i8",
    u8 => "|u1", u16 => "<u2", u32 => "<u4", u64 => "<u8",
    f32 => "<f4", f64 => "<f8",
}

impl NpyElement for bool {
    const DESCR: &'static str = "|b1";

    fn from_scalar(value: Scalar) -> Self {
        match value {
            Scalar::Bool(v) => v,
            Scalar::Int(v) => v != 0,
            Scalar::UInt(v) => v != 0,
            Scalar::Float(v) => v != 0.0,
        }
    }

    fn write_le(&self, out: &mut Vec<u8>) {
        out.push(*self as u8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_descrs() {
        let d = Dtype::parse("<f8").unwrap();
        assert_eq!((d.kind, d.size, d.order), (Kind::Float, 8, ByteOrder::Little));
        let d = Dtype::parse(">i2").unwrap();
        assert_eq!((d.kind, d.size, d.order), (Kind::Int, 2, ByteOrder::Big));
        assert_eq!(Dtype::parse("|u1").unwrap().kind, Kind::UInt);
        assert_eq!(Dtype::parse("|b1").unwrap().kind, Kind::Bool);
    }

    #[test]
    fn rejects_unsupported_descrs() {
        for descr in ["<f2", "<c16", "|S10", "<U4", "", "<", "f8", "<i3"] {
            assert!(
                matches!(Dtype::parse(descr), Err(NpyError::UnsupportedDtype(_))),
                "{descr} should be rejected"
            );
        }
    }

    #[test]
    fn reads_big_endian_values() {
        let d = Dtype::parse(">u2").unwrap();
        assert_eq!(d.read_scalar(&[0x01, 0x02]), Scalar::UInt(0x0102));
        let d = Dtype::parse("<i4").unwrap();
        assert_eq!(d.read_scalar(&(-7i32).to_le_bytes()), Scalar::Int(-7));
    }

    #[test]
    fn casts_like_as() {
        assert_eq!(f32::from_scalar(Scalar::Int(3)), 3.0);
        assert_eq!(u8::from_scalar(Scalar::Float(2.9)), 2);
        assert_eq!(i64::from_scalar(Scalar::Bool(true)), 1);
        assert!(bool::from_scalar(Scalar::Float(0.5)));
    }

    #[test]
    fn descr_round_trips_through_parse() {
        assert_eq!(Dtype::parse(f64::DESCR).unwrap().size, 8);
        assert_eq!(Dtype::parse(i8::DESCR).unwrap().kind, Kind::Int);
        assert_eq!(Dtype::parse(bool::DESCR).unwrap().kind, Kind::Bool);
    }
}
