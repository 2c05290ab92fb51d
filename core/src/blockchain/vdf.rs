use crate::blockchain::proof_of_space::ProofBytes;
use crate::blockchain::sized_bytes::Bytes32;
use crate::utils::hash_256;
use serde::{Deserialize, Serialize};

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug, Default)]
pub struct VdfOutput {
    pub data: ProofBytes,
}
impl VdfOutput {
    #[must_use]
    pub fn get_hash(&self) -> Bytes32 {
        Bytes32::from(hash_256(&self.data))
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct VdfInfo {
    pub challenge: Bytes32,
    pub output: VdfOutput,
    pub number_of_iterations: u64,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug, Default)]
pub struct VdfProof {
    pub normalized_to_identity: bool,
    pub witness: Vec<u8>,
    pub witness_type: u8,
}
