use hex::{decode, encode, FromHexError};
use serde::de::Visitor;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::io::{Error, ErrorKind};
use std::str::FromStr;

pub fn prep_hex_str(to_fix: &str) -> String {
    let lc = to_fix.to_lowercase();
    if let Some(s) = lc.strip_prefix("0x") {
        s.to_string()
    } else {
        lc
    }
}

pub fn hex_to_bytes(hex: &str) -> Result<Vec<u8>, FromHexError> {
    decode(prep_hex_str(hex))
}

pub trait SizedBytes<'a>: Serialize + Deserialize<'a> + fmt::Display {
    const SIZE: usize;
    fn parse(bytes: &[u8]) -> Result<Self, Error>
    where
        Self: Sized;
    fn as_slice(&'a self) -> &'a [u8];
    fn is_null(&self) -> bool;
}

macro_rules! impl_sized_bytes {
    ($($name: ident, $size:expr, $visitor:ident);*) => {
        $(
            #[derive(Copy, Clone)]
            pub struct $name {
                pub bytes: [u8; $size],
            }
            impl<'a> SizedBytes<'a> for $name {
                const SIZE: usize = $size;

                fn parse(bytes: &[u8]) -> Result<Self, Error> {
                    if bytes.len() != $size {
                        Err(Error::new(
                            ErrorKind::InvalidInput,
                            format!(
                                "Invalid length for {}: expected {}, got {}",
                                stringify!($name), $size, bytes.len()
                            ),
                        ))
                    } else {
                        let mut buf = [0u8; $size];
                        buf.copy_from_slice(bytes);
                        Ok(Self { bytes: buf })
                    }
                }

                fn as_slice(&'a self) -> &'a [u8] {
                    &self.bytes
                }

                fn is_null(&self) -> bool {
                    self.bytes.iter().all(|v| *v == 0)
                }
            }
            impl $name {
                #[must_use]
                pub fn from_sized_bytes(bytes: [u8; $size]) -> Self {
                    $name { bytes }
                }
                #[must_use]
                pub fn to_sized_bytes(&self) -> &[u8; $size] {
                    &self.bytes
                }
            }

            impl std::hash::Hash for $name {
                fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                    self.bytes.hash(state);
                }
            }

            impl PartialEq for $name {
                fn eq(&self, other: &Self) -> bool {
                    self.bytes == other.bytes
                }
            }
            impl Eq for $name {}

            impl PartialOrd for $name {
                fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                    Some(self.cmp(other))
                }
            }
            impl Ord for $name {
                fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                    self.bytes.cmp(&other.bytes)
                }
            }

            impl AsRef<[u8]> for $name {
                fn as_ref(&self) -> &[u8] {
                    &self.bytes
                }
            }

            impl IntoIterator for $name {
                type Item = u8;
                type IntoIter = std::array::IntoIter<u8, $size>;
                fn into_iter(self) -> Self::IntoIter {
                    self.bytes.into_iter()
                }
            }

            impl From<[u8; $size]> for $name {
                fn from(bytes: [u8; $size]) -> Self {
                    $name::from_sized_bytes(bytes)
                }
            }

            impl From<&[u8; $size]> for $name {
                fn from(bytes: &[u8; $size]) -> Self {
                    $name::from_sized_bytes(*bytes)
                }
            }

            impl FromStr for $name {
                type Err = Error;
                fn from_str(hex: &str) -> Result<Self, Self::Err> {
                    let bytes = decode(prep_hex_str(hex))
                        .map_err(|e| Error::new(ErrorKind::InvalidInput, format!("{e:?}")))?;
                    Self::parse(&bytes)
                }
            }

            impl From<&str> for $name {
                fn from(hex: &str) -> Self {
                    Self::from_str(hex).unwrap_or_default()
                }
            }

            impl From<String> for $name {
                fn from(hex: String) -> Self {
                    Self::from(hex.as_str())
                }
            }

            impl Serialize for $name {
                fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
                where
                    S: Serializer,
                {
                    serializer.serialize_str(self.to_string().as_str())
                }
            }

            struct $visitor;

            impl<'de> Visitor<'de> for $visitor {
                type Value = $name;

                fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                    formatter.write_str(
                        format!("Expecting a hex String of byte length {}", $size).as_str(),
                    )
                }

                fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
                where
                    E: serde::de::Error,
                {
                    $name::from_str(value).map_err(|e| serde::de::Error::custom(e.to_string()))
                }

                fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
                where
                    E: serde::de::Error,
                {
                    self.visit_str(&value)
                }
            }

            impl<'a> Deserialize<'a> for $name {
                fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
                where
                    D: Deserializer<'a>,
                {
                    deserializer.deserialize_string($visitor)
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", encode(self.bytes))
                }
            }

            impl fmt::Debug for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", encode(self.bytes))
                }
            }

            impl Default for $name {
                fn default() -> $name {
                    $name::from([0; $size])
                }
            }
        )*
    };
    ()=>{};
}

impl_sized_bytes!(
    Bytes4, 4, Bytes4Visitor;
    Bytes32, 32, Bytes32Visitor;
    Bytes48, 48, Bytes48Visitor;
    Bytes96, 96, Bytes96Visitor
);

impl std::ops::Index<std::ops::Range<usize>> for Bytes32 {
    type Output = [u8];
    fn index(&self, index: std::ops::Range<usize>) -> &Self::Output {
        &self.bytes[index]
    }
}
