//! Hashing and recoverable-signature helpers.

use alloy_primitives::{keccak256, Address, B256};
use blake2::{digest::consts::U32, Blake2b, Digest};
use secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId},
    Message, PublicKey, SecretKey, SECP256K1,
};

/// Blake2b with a 256-bit output, used for transaction ids and work evaluation.
pub type Blake2b256 = Blake2b<U32>;

/// Computes the Blake2b-256 digest over the concatenation of `inputs`.
pub fn blake2b256<'a>(inputs: impl IntoIterator<Item = &'a [u8]>) -> B256 {
    let mut hasher = Blake2b256::new();
    for input in inputs {
        hasher.update(input);
    }
    B256::from_slice(hasher.finalize().as_slice())
}

/// Recovers the address of the signer of `msg` from a 65-byte `r || s || v` blob.
pub fn recover_signer(sig: &[u8; 65], msg: &B256) -> Result<Address, secp256k1::Error> {
    let sig =
        RecoverableSignature::from_compact(&sig[..64], RecoveryId::from_i32(sig[64] as i32)?)?;

    let public = SECP256K1.recover_ecdsa(&Message::from_digest(msg.0), &sig)?;
    Ok(public_key_to_address(public))
}

/// Signs `msg` with the given secret key, returning the 65-byte `r || s || v` blob.
pub fn sign_hash(secret: B256, msg: B256) -> Result<[u8; 65], secp256k1::Error> {
    let secret = SecretKey::from_slice(secret.as_ref())?;
    let sig = SECP256K1.sign_ecdsa_recoverable(&Message::from_digest(msg.0), &secret);
    let (rec_id, data) = sig.serialize_compact();

    let mut blob = [0u8; 65];
    blob[..64].copy_from_slice(&data);
    blob[64] = rec_id.to_i32() as u8;
    Ok(blob)
}

/// Converts a public key into an address by hashing the encoded public key with keccak256.
pub fn public_key_to_address(public: PublicKey) -> Address {
    // strip out the first byte because that should be the SECP256K1_TAG_PUBKEY_UNCOMPRESSED
    // tag returned by libsecp's uncompressed pubkey serialization
    let hash = keccak256(&public.serialize_uncompressed()[1..]);
    Address::from_slice(&hash[12..])
}

/// Address of the key pair derived from `secret`.
pub fn secret_to_address(secret: B256) -> Result<Address, secp256k1::Error> {
    let secret = SecretKey::from_slice(secret.as_ref())?;
    Ok(public_key_to_address(PublicKey::from_secret_key(SECP256K1, &secret)))
}
