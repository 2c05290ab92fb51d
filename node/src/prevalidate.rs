use crate::traits::{ProofOfSpaceVerifier, VdfVerifier};
use std::io::{Error, ErrorKind};
use std::sync::Arc;
use tokio::sync::Semaphore;
use verdant_core::blockchain::full_block::FullBlock;
use verdant_core::blockchain::sized_bytes::Bytes32;

/// Outcome of the CPU-heavy proof checks for one block, computed before the
/// chain lock is taken. The header rules consume this instead of re-running
/// the verifiers.
#[derive(Clone, Debug)]
pub struct PreValidationResult {
    pub header_hash: Bytes32,
    pub quality: Option<Bytes32>,
    pub vdfs_valid: bool,
}

/// Runs the proof of space and VDF verifiers for one block.
pub fn pre_validate_block(
    pos_verifier: &dyn ProofOfSpaceVerifier,
    vdf_verifier: &dyn VdfVerifier,
    block: &FullBlock,
) -> PreValidationResult {
    let sp_hash = block.signage_point_hash();
    let quality = pos_verifier.verify_and_get_quality(
        &block.proof_of_space,
        &block.proof_of_space.challenge,
        &sp_hash,
    );
    let mut vdfs_valid = vdf_verifier.is_valid(
        &block.cc_ip_vdf,
        &block.cc_ip_proof,
        &block.proof_of_space.challenge,
    );
    if let Some(sp_vdf) = &block.cc_sp_vdf {
        match &block.cc_sp_proof {
            Some(sp_proof) => {
                vdfs_valid = vdfs_valid
                    && vdf_verifier.is_valid(sp_vdf, sp_proof, &block.proof_of_space.challenge);
            }
            None => vdfs_valid = false,
        }
    }
    PreValidationResult {
        header_hash: block.header_hash(),
        quality,
        vdfs_valid,
    }
}

/// Fans batches of blocks out over a bounded number of verifier tasks. One
/// core is left free for the runtime; results come back in input order so
/// callers can feed them straight into sequential block acceptance.
pub struct PreValidationPool {
    pos_verifier: Arc<dyn ProofOfSpaceVerifier>,
    vdf_verifier: Arc<dyn VdfVerifier>,
    semaphore: Arc<Semaphore>,
}

impl PreValidationPool {
    #[must_use]
    pub fn new(
        pos_verifier: Arc<dyn ProofOfSpaceVerifier>,
        vdf_verifier: Arc<dyn VdfVerifier>,
    ) -> Self {
        let permits = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2)
            .saturating_sub(1)
            .max(1);
        Self {
            pos_verifier,
            vdf_verifier,
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    pub async fn pre_validate_blocks(
        &self,
        blocks: &[FullBlock],
    ) -> Result<Vec<PreValidationResult>, Error> {
        let mut handles = Vec::with_capacity(blocks.len());
        for block in blocks {
            let block = block.clone();
            let pos_verifier = self.pos_verifier.clone();
            let vdf_verifier = self.vdf_verifier.clone();
            let semaphore = self.semaphore.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::new(ErrorKind::Other, format!("Semaphore closed: {e}")))?;
                Ok::<PreValidationResult, Error>(pre_validate_block(
                    pos_verifier.as_ref(),
                    vdf_verifier.as_ref(),
                    &block,
                ))
            }));
        }
        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(
                handle
                    .await
                    .map_err(|e| Error::new(ErrorKind::Other, format!("Verifier task failed: {e}")))??,
            );
        }
        Ok(results)
    }
}
