use verdant_core::blockchain::proof_of_space::ProofOfSpace;
use verdant_core::blockchain::sized_bytes::{Bytes32, Bytes96, SizedBytes};
use verdant_core::blockchain::vdf::{VdfInfo, VdfProof};
use verdant_core::utils::hash_256;

/// Checks a proof of space against its challenge and signage point, yielding
/// the quality string used for iteration counts. `None` means the proof does
/// not pass.
pub trait ProofOfSpaceVerifier: Send + Sync {
    fn verify_and_get_quality(
        &self,
        proof: &ProofOfSpace,
        challenge: &Bytes32,
        signage_point_hash: &Bytes32,
    ) -> Option<Bytes32>;
}

/// Checks a timelord proof against the VDF info it claims to witness.
pub trait VdfVerifier: Send + Sync {
    fn is_valid(&self, info: &VdfInfo, proof: &VdfProof, input_challenge: &Bytes32) -> bool;
}

/// Checks the block body's aggregated signature over its spend data.
pub trait SignatureVerifier: Send + Sync {
    fn is_valid(&self, signature: &Bytes96, message_hash: &Bytes32) -> bool;
}

/// Deterministic stand-in verifier for environments without real plots or a
/// timelord. Quality is derived from the plot id and challenge, so two nodes
/// using it agree on every block's iteration count.
#[derive(Default, Clone, Copy)]
pub struct EmulatedVerifier;

impl ProofOfSpaceVerifier for EmulatedVerifier {
    fn verify_and_get_quality(
        &self,
        proof: &ProofOfSpace,
        challenge: &Bytes32,
        _signage_point_hash: &Bytes32,
    ) -> Option<Bytes32> {
        if proof.challenge != *challenge {
            return None;
        }
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(proof.plot_id.as_slice());
        buf.extend_from_slice(challenge.as_slice());
        Some(Bytes32::from(hash_256(&buf)))
    }
}

impl VdfVerifier for EmulatedVerifier {
    fn is_valid(&self, info: &VdfInfo, _proof: &VdfProof, input_challenge: &Bytes32) -> bool {
        info.challenge == *input_challenge && info.number_of_iterations > 0
    }
}

impl SignatureVerifier for EmulatedVerifier {
    fn is_valid(&self, _signature: &Bytes96, _message_hash: &Bytes32) -> bool {
        true
    }
}
