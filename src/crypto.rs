use alloy_primitives::{keccak256, Address, B256, U256};
use bip39::{Language, Mnemonic};
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tiny_hderive::bip32::ExtendedPrivKey;

use crate::error::SignetError;

/// Derivation path for account signing keys (Ethereum coin type).
const DERIVATION_PATH: &str = "m/44'/60'/0'/0/0";

pub struct KeyPair {
    pub signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a new secp256k1 keypair
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        KeyPair { signing_key }
    }

    /// Generate a new 12-word mnemonic
    pub fn generate_mnemonic() -> String {
        let mut entropy = [0u8; 16]; // 128 bits = 12 words
        let mut csprng = OsRng;
        csprng.fill_bytes(&mut entropy);
        let mnemonic = Mnemonic::from_entropy_in(Language::English, &entropy)
            .expect("16 bytes of entropy is always a valid mnemonic");
        mnemonic.to_string()
    }

    /// Restore keypair from mnemonic
    pub fn from_mnemonic(phrase: &str) -> Result<Self, SignetError> {
        let mnemonic = Mnemonic::parse_in_normalized(Language::English, phrase)
            .map_err(|e| SignetError::KeyError(format!("invalid mnemonic: {e}")))?;
        let seed = mnemonic.to_seed("");

        let ext_key = ExtendedPrivKey::derive(&seed, DERIVATION_PATH)
            .map_err(|_| SignetError::KeyError("key derivation failed".to_string()))?;
        let signing_key = SigningKey::from_slice(&ext_key.secret())
            .map_err(|e| SignetError::KeyError(e.to_string()))?;

        Ok(KeyPair { signing_key })
    }

    /// Restore keypair from a raw 32-byte secret
    pub fn from_secret_bytes(secret: &[u8]) -> Result<Self, SignetError> {
        let signing_key =
            SigningKey::from_slice(secret).map_err(|e| SignetError::KeyError(e.to_string()))?;
        Ok(KeyPair { signing_key })
    }

    /// Address of this keypair: low 20 bytes of keccak256 of the uncompressed public key
    pub fn address(&self) -> Address {
        let point = self.signing_key.verifying_key().to_encoded_point(false);
        // Skip the 0x04 SEC1 tag byte.
        Address::from_raw_public_key(&point.as_bytes()[1..])
    }

    /// Sign a 32-byte digest, producing a recoverable (v, r, s) signature
    pub fn sign_digest(&self, digest: B256) -> Result<RecoverableSignature, SignetError> {
        let (sig, recid) = self
            .signing_key
            .sign_prehash_recoverable(digest.as_slice())
            .map_err(|e| SignetError::KeyError(e.to_string()))?;
        let bytes = sig.to_bytes();
        Ok(RecoverableSignature {
            v: recid.to_byte() + 27,
            r: B256::from_slice(&bytes[..32]),
            s: B256::from_slice(&bytes[32..]),
        })
    }

    /// Secret key as hex string
    pub fn secret_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }
}

/// A recoverable ECDSA signature in the (v, r, s) layout, v in {27, 28}
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature {
    pub v: u8,
    pub r: B256,
    pub s: B256,
}

impl RecoverableSignature {
    /// Recover the signer address from this signature over `digest`
    pub fn recover(&self, digest: B256) -> Result<Address, SignetError> {
        let recid = self
            .v
            .checked_sub(27)
            .and_then(RecoveryId::from_byte)
            .ok_or(SignetError::InvalidSignature)?;
        let sig = EcdsaSignature::from_scalars(self.r.0, self.s.0)
            .map_err(|_| SignetError::InvalidSignature)?;
        let verifying_key = VerifyingKey::recover_from_prehash(digest.as_slice(), &sig, recid)
            .map_err(|_| SignetError::InvalidSignature)?;
        let point = verifying_key.to_encoded_point(false);
        Ok(Address::from_raw_public_key(&point.as_bytes()[1..]))
    }
}

/// The controller nonce as it appears on the wire: 12 bytes, big-endian
pub fn nonce_bytes(nonce: u64) -> [u8; 12] {
    let mut out = [0u8; 12];
    out[4..].copy_from_slice(&nonce.to_be_bytes());
    out
}

/// Digest a signer authorizes when forwarding a call through a controller.
///
/// Layout: destination(20) || value(32, BE) || data || controller(20) ||
/// nonce(12, BE) || signer(20), hashed with keccak256. Binding the
/// controller address and the counter prevents cross-contract and
/// cross-epoch replay.
pub fn forward_digest(
    destination: Address,
    value: U256,
    data: &[u8],
    controller: Address,
    nonce: u64,
    signer: Address,
) -> B256 {
    let mut buf = Vec::with_capacity(20 + 32 + data.len() + 20 + 12 + 20);
    buf.extend_from_slice(destination.as_slice());
    buf.extend_from_slice(&value.to_be_bytes::<32>());
    buf.extend_from_slice(data);
    buf.extend_from_slice(controller.as_slice());
    buf.extend_from_slice(&nonce_bytes(nonce));
    buf.extend_from_slice(signer.as_slice());
    keccak256(buf)
}
