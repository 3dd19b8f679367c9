//! 16-byte identifiers rendered as 32 lowercase hex characters.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdParseError {
    #[error("expected 32 hex characters, got {0}")]
    Length(usize),
    #[error("invalid hex character {0:?}")]
    Char(char),
}

fn parse_hex16(s: &str) -> Result<[u8; 16], IdParseError> {
    let s = s.trim();
    if s.len() != 32 {
        return Err(IdParseError::Length(s.chars().count()));
    }
    let mut out = [0u8; 16];
    let bytes = s.as_bytes();
    for (i, slot) in out.iter_mut().enumerate() {
        let hi = nibble(bytes[2 * i])?;
        let lo = nibble(bytes[2 * i + 1])?;
        *slot = (hi << 4) | lo;
    }
    Ok(out)
}

fn nibble(b: u8) -> Result<u8, IdParseError> {
    match b {
        b'0'..=b'9' => Ok(b - b'0'),
        b'a'..=b'f' => Ok(b - b'a' + 10),
        b'A'..=b'F' => Ok(b - b'A' + 10),
        other => Err(IdParseError::Char(other as char)),
    }
}

macro_rules! hex_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; 16]);

        impl $name {
            pub const fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(bytes)
            }

            pub const fn as_bytes(&self) -> &[u8; 16] {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_hex16(s).map(Self)
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = IdParseError;
            fn try_from(raw: &[u8]) -> Result<Self, Self::Error> {
                <[u8; 16]>::try_from(raw)
                    .map(Self)
                    .map_err(|_| IdParseError::Length(raw.len() * 2))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                for b in &self.0 {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({self})", stringify!($name))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                s.collect_str(self)
            }
        }
    };
}

hex_id!(
    /// Identifier of a plant.
    PlantId
);
hex_id!(
    /// Identifier of a single measurement row.
    MeasurementId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_case_and_renders_lowercase() {
        let id: PlantId = "AABBccdd00112233445566778899EEFF".parse().expect("valid");
        assert_eq!(id.to_string(), "aabbccdd00112233445566778899eeff");
    }

    #[test]
    fn rejects_wrong_length_and_bad_chars() {
        assert_eq!(
            "abc".parse::<MeasurementId>(),
            Err(IdParseError::Length(3))
        );
        assert_eq!(
            "zz".repeat(16).parse::<MeasurementId>(),
            Err(IdParseError::Char('z'))
        );
    }

    #[test]
    fn byte_slices_must_be_sixteen_long() {
        assert!(PlantId::try_from(&[0u8; 16][..]).is_ok());
        assert!(PlantId::try_from(&[0u8; 4][..]).is_err());
    }
}
