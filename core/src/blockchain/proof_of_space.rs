use crate::blockchain::sized_bytes::{prep_hex_str, Bytes32};
use crate::utils::hash_256;
use hex::{decode, encode};
use serde::de::Visitor;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::{Debug, Display, Formatter};

#[derive(Clone, PartialEq, Eq, Default)]
pub struct ProofBytes(Vec<u8>);

impl ProofBytes {
    pub fn iter(&self) -> std::slice::Iter<'_, u8> {
        self.0.iter()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}
impl Display for ProofBytes {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&encode(&self.0))
    }
}
impl Debug for ProofBytes {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&encode(&self.0))
    }
}

impl Serialize for ProofBytes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&encode(&self.0))
    }
}

struct ProofBytesVisitor;

impl Visitor<'_> for ProofBytesVisitor {
    type Value = ProofBytes;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("Expecting a hex String")
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(ProofBytes(
            decode(prep_hex_str(value)).map_err(|e| serde::de::Error::custom(e.to_string()))?,
        ))
    }

    fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        self.visit_str(&value)
    }
}

impl<'a> Deserialize<'a> for ProofBytes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'a>,
    {
        deserializer.deserialize_string(ProofBytesVisitor)
    }
}

impl AsRef<[u8]> for ProofBytes {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl From<Vec<u8>> for ProofBytes {
    fn from(bytes: Vec<u8>) -> ProofBytes {
        ProofBytes(bytes)
    }
}

/// Proof of space as the chain-state engine sees it: the verifier is an
/// opaque collaborator, so only the fields consensus arithmetic needs are
/// carried here.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct ProofOfSpace {
    pub challenge: Bytes32,
    pub plot_id: Bytes32,
    pub size: u8,
    pub proof: ProofBytes,
}
impl ProofOfSpace {
    #[must_use]
    pub fn get_hash(&self) -> Bytes32 {
        let mut to_hash: Vec<u8> = Vec::new();
        to_hash.extend(self.challenge);
        to_hash.extend(self.plot_id);
        to_hash.push(self.size);
        to_hash.extend(self.proof.iter());
        Bytes32::from(hash_256(to_hash))
    }
}
