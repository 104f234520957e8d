use std::io::{self, Write};

use alloy_primitives::{Address, U256};

use crate::crypto::RecoverableSignature;
use crate::error::SignetError;

/// Trait for values with a canonical binary representation on the call wire.
/// careful: This must be deterministic across platforms/versions.
pub trait CanonicalSerialize {
    fn canonical_serialize<W: Write>(&self, writer: &mut W) -> io::Result<()>;

    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.canonical_serialize(&mut buf).expect("memory write failed");
        buf
    }
}

// --- Primitives (big-endian, to match the digest layout) ---

impl CanonicalSerialize for u8 {
    fn canonical_serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&[*self])
    }
}

impl CanonicalSerialize for u64 {
    fn canonical_serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_be_bytes())
    }
}

impl CanonicalSerialize for Address {
    fn canonical_serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(self.as_slice())
    }
}

impl CanonicalSerialize for U256 {
    fn canonical_serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_be_bytes::<32>())
    }
}

impl CanonicalSerialize for Vec<u8> {
    fn canonical_serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let len = self.len() as u32;
        writer.write_all(&len.to_be_bytes())?;
        writer.write_all(self)
    }
}

impl CanonicalSerialize for RecoverableSignature {
    fn canonical_serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&[self.v])?;
        writer.write_all(self.r.as_slice())?;
        writer.write_all(self.s.as_slice())
    }
}

// --- Call payloads ---

const SEL_CHANGE_OWNERSHIP: u8 = 0x01;
const SEL_EXECUTE: u8 = 0x02;
const SEL_FORWARD_ON_BEHALF: u8 = 0x03;
const SEL_DEPLOY_IDENTITY: u8 = 0x10;
const SEL_DEPLOY_CONTROLLER: u8 = 0x11;
const SEL_DEPLOY_PAIR: u8 = 0x12;
const SEL_DEPLOY_PAIR_NO_EVENT: u8 = 0x13;
const SEL_DEPLOY_MULTI: u8 = 0x14;

/// Every operation a contract account understands, as it travels between
/// accounts. `ChangeOwnership` is shared by identities and controllers;
/// dispatch is by the callee's logic, not by selector.
#[derive(Debug, Clone, PartialEq)]
pub enum CallPayload {
    ChangeOwnership {
        new_owner: Address,
    },
    Execute {
        to: Address,
        value: U256,
        data: Vec<u8>,
    },
    ForwardOnBehalf {
        destination: Address,
        value: U256,
        data: Vec<u8>,
        nonce: u64,
        signature: RecoverableSignature,
    },
    DeployIdentity {
        owner: Address,
    },
    DeployController {
        owner: Address,
        identity: Address,
        recovery: Address,
    },
    DeployPair {
        owner: Address,
        recovery: Address,
    },
    DeployPairNoEvent {
        owner: Address,
        recovery: Address,
    },
    DeployMulti {
        recovery: Address,
    },
}

impl CanonicalSerialize for CallPayload {
    fn canonical_serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        match self {
            CallPayload::ChangeOwnership { new_owner } => {
                SEL_CHANGE_OWNERSHIP.canonical_serialize(writer)?;
                new_owner.canonical_serialize(writer)
            }
            CallPayload::Execute { to, value, data } => {
                SEL_EXECUTE.canonical_serialize(writer)?;
                to.canonical_serialize(writer)?;
                value.canonical_serialize(writer)?;
                data.canonical_serialize(writer)
            }
            CallPayload::ForwardOnBehalf {
                destination,
                value,
                data,
                nonce,
                signature,
            } => {
                SEL_FORWARD_ON_BEHALF.canonical_serialize(writer)?;
                destination.canonical_serialize(writer)?;
                value.canonical_serialize(writer)?;
                data.canonical_serialize(writer)?;
                nonce.canonical_serialize(writer)?;
                signature.canonical_serialize(writer)
            }
            CallPayload::DeployIdentity { owner } => {
                SEL_DEPLOY_IDENTITY.canonical_serialize(writer)?;
                owner.canonical_serialize(writer)
            }
            CallPayload::DeployController {
                owner,
                identity,
                recovery,
            } => {
                SEL_DEPLOY_CONTROLLER.canonical_serialize(writer)?;
                owner.canonical_serialize(writer)?;
                identity.canonical_serialize(writer)?;
                recovery.canonical_serialize(writer)
            }
            CallPayload::DeployPair { owner, recovery } => {
                SEL_DEPLOY_PAIR.canonical_serialize(writer)?;
                owner.canonical_serialize(writer)?;
                recovery.canonical_serialize(writer)
            }
            CallPayload::DeployPairNoEvent { owner, recovery } => {
                SEL_DEPLOY_PAIR_NO_EVENT.canonical_serialize(writer)?;
                owner.canonical_serialize(writer)?;
                recovery.canonical_serialize(writer)
            }
            CallPayload::DeployMulti { recovery } => {
                SEL_DEPLOY_MULTI.canonical_serialize(writer)?;
                recovery.canonical_serialize(writer)
            }
        }
    }
}

impl CallPayload {
    pub fn decode(bytes: &[u8]) -> Result<Self, SignetError> {
        let mut reader = Reader::new(bytes);
        let selector = reader.u8()?;
        let payload = match selector {
            SEL_CHANGE_OWNERSHIP => CallPayload::ChangeOwnership {
                new_owner: reader.address()?,
            },
            SEL_EXECUTE => CallPayload::Execute {
                to: reader.address()?,
                value: reader.u256()?,
                data: reader.var_bytes()?,
            },
            SEL_FORWARD_ON_BEHALF => CallPayload::ForwardOnBehalf {
                destination: reader.address()?,
                value: reader.u256()?,
                data: reader.var_bytes()?,
                nonce: reader.u64()?,
                signature: reader.signature()?,
            },
            SEL_DEPLOY_IDENTITY => CallPayload::DeployIdentity {
                owner: reader.address()?,
            },
            SEL_DEPLOY_CONTROLLER => CallPayload::DeployController {
                owner: reader.address()?,
                identity: reader.address()?,
                recovery: reader.address()?,
            },
            SEL_DEPLOY_PAIR => CallPayload::DeployPair {
                owner: reader.address()?,
                recovery: reader.address()?,
            },
            SEL_DEPLOY_PAIR_NO_EVENT => CallPayload::DeployPairNoEvent {
                owner: reader.address()?,
                recovery: reader.address()?,
            },
            SEL_DEPLOY_MULTI => CallPayload::DeployMulti {
                recovery: reader.address()?,
            },
            other => {
                return Err(SignetError::MalformedPayload(format!(
                    "unknown selector 0x{other:02x}"
                )))
            }
        };
        reader.finish()?;
        Ok(payload)
    }
}

/// Cursor over an incoming payload
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], SignetError> {
        if self.buf.len() - self.pos < n {
            return Err(SignetError::MalformedPayload(format!(
                "truncated: wanted {n} bytes at offset {}",
                self.pos
            )));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, SignetError> {
        Ok(self.take(1)?[0])
    }

    fn u64(&mut self) -> Result<u64, SignetError> {
        let mut b = [0u8; 8];
        b.copy_from_slice(self.take(8)?);
        Ok(u64::from_be_bytes(b))
    }

    fn address(&mut self) -> Result<Address, SignetError> {
        Ok(Address::from_slice(self.take(20)?))
    }

    fn u256(&mut self) -> Result<U256, SignetError> {
        Ok(U256::from_be_slice(self.take(32)?))
    }

    fn var_bytes(&mut self) -> Result<Vec<u8>, SignetError> {
        let mut b = [0u8; 4];
        b.copy_from_slice(self.take(4)?);
        let len = u32::from_be_bytes(b) as usize;
        Ok(self.take(len)?.to_vec())
    }

    fn signature(&mut self) -> Result<RecoverableSignature, SignetError> {
        let v = self.u8()?;
        let r = alloy_primitives::B256::from_slice(self.take(32)?);
        let s = alloy_primitives::B256::from_slice(self.take(32)?);
        Ok(RecoverableSignature { v, r, s })
    }

    fn finish(&self) -> Result<(), SignetError> {
        if self.pos != self.buf.len() {
            return Err(SignetError::MalformedPayload(format!(
                "{} trailing bytes",
                self.buf.len() - self.pos
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;

    #[test]
    fn test_forward_roundtrip() {
        let payload = CallPayload::ForwardOnBehalf {
            destination: Address::repeat_byte(0xab),
            value: U256::from(42u64),
            data: vec![0x12, 0x34, 0x56, 0x78],
            nonce: 7,
            signature: RecoverableSignature {
                v: 28,
                r: B256::repeat_byte(1),
                s: B256::repeat_byte(2),
            },
        };
        let decoded = CallPayload::decode(&payload.to_bytes()).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_deploy_pair_roundtrip() {
        let payload = CallPayload::DeployPair {
            owner: Address::repeat_byte(3),
            recovery: Address::repeat_byte(4),
        };
        assert_eq!(CallPayload::decode(&payload.to_bytes()).unwrap(), payload);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(CallPayload::decode(&[]).is_err());
        assert!(CallPayload::decode(&[0xff]).is_err());
        // Truncated ChangeOwnership: selector plus half an address.
        assert!(CallPayload::decode(&[SEL_CHANGE_OWNERSHIP, 1, 2, 3]).is_err());
    }

    #[test]
    fn test_rejects_trailing_bytes() {
        let mut bytes = CallPayload::DeployMulti {
            recovery: Address::repeat_byte(9),
        }
        .to_bytes();
        bytes.push(0);
        assert!(matches!(
            CallPayload::decode(&bytes),
            Err(SignetError::MalformedPayload(_))
        ));
    }
}
