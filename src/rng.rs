// Copyright 2024 The pivcs11 developers
// See LICENSE.txt file for terms

//! Pass-through to the collaborator RNG, surfaced so the embedding
//! module can service C_GenerateRandom and C_SeedRandom without
//! touching OpenSSL itself.

use crate::error::Result;
use crate::map_err;
use crate::pkcs11::*;

/// Fills the buffer with random bytes
pub fn generate_random(data: &mut [u8]) -> Result<()> {
    map_err!(openssl::rand::rand_bytes(data), CKR_FUNCTION_FAILED)
}

/// Accepts caller supplied seed material. OpenSSL 3.x feeds its DRBGs
/// from its own entropy sources; the material is accepted for
/// interface compatibility and not counted as entropy.
pub fn add_seed(data: &[u8]) -> Result<()> {
    log::trace!("ignoring {} bytes of caller seed material", data.len());
    Ok(())
}
