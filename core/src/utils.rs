use sha2::{Digest, Sha256};

#[must_use]
pub fn hash_256(input: impl AsRef<[u8]>) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(input.as_ref());
    let mut buf = [0u8; 32];
    hasher.finalize_into((&mut buf).into());
    buf
}
