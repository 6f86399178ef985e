use ed25519_dalek::{Signer, Verifier};

use crate::cell::*;
use crate::error::Error;

/// Unsigned external message payload.
#[derive(Debug, Clone)]
pub struct UnsignedBody {
    /// Unsigned payload.
    pub payload: Cell,
    /// A hash to sign.
    pub hash: HashBytes,
}

impl UnsignedBody {
    /// Builds an unsigned body from a payload model.
    pub fn new<T: Store>(payload: T) -> Result<Self, Error> {
        let payload = ok!(CellBuilder::build_from(payload));
        Ok(Self {
            hash: *payload.repr_hash(),
            payload,
        })
    }

    /// Signs the payload and returns a body cell with filled signature.
    pub fn sign(&self, key: &ed25519_dalek::SigningKey) -> Result<Cell, Error> {
        let signature = key.sign(self.hash.as_slice());
        self.with_signature(&signature)
    }

    /// Returns a body cell with filled signature.
    pub fn with_signature(&self, signature: &ed25519_dalek::Signature) -> Result<Cell, Error> {
        self.fill_signature(&signature.to_bytes())
    }

    /// Returns a body cell with signature filled with zero bytes.
    pub fn with_fake_signature(&self) -> Result<Cell, Error> {
        self.fill_signature(&[0u8; 64])
    }

    /// Returns a body cell with filled signature.
    pub fn fill_signature(&self, signature: &[u8; 64]) -> Result<Cell, Error> {
        let mut builder = CellBuilder::new();
        ok!(builder.store_raw(signature, 512));
        ok!(builder.store_slice(&self.payload.as_slice()));
        builder.build()
    }
}

/// Parsed signed external message payload.
#[derive(Debug, Clone, Copy)]
pub struct SignedBody<'a> {
    /// Payload signature.
    pub signature: [u8; 64],
    /// Signed data and references.
    pub payload: CellSlice<'a>,
}

impl<'a> SignedBody<'a> {
    /// Splits the body into the signature and the payload.
    pub fn parse(body: &'a Cell) -> Result<Self, Error> {
        let mut payload = body.as_slice();
        let mut signature = [0u8; 64];
        ok!(payload.load_raw(&mut signature, 512));
        Ok(Self { signature, payload })
    }

    /// Rebuilds the payload cell which was signed.
    pub fn payload_cell(&self) -> Result<Cell, Error> {
        let mut builder = CellBuilder::new();
        ok!(builder.store_slice(&self.payload));
        builder.build()
    }

    /// Computes the hash of the signed payload.
    pub fn payload_hash(&self) -> Result<HashBytes, Error> {
        let cell = ok!(self.payload_cell());
        Ok(*cell.repr_hash())
    }

    /// Checks the signature using the specified public key.
    pub fn verify(&self, public_key: &HashBytes) -> Result<(), Error> {
        let Ok(public_key) = ed25519_dalek::VerifyingKey::from_bytes(public_key.as_array()) else {
            return Err(Error::InvalidPublicKey);
        };

        let hash = ok!(self.payload_hash());
        let signature = ed25519_dalek::Signature::from_bytes(&self.signature);
        match public_key.verify(hash.as_slice(), &signature) {
            Ok(()) => Ok(()),
            Err(_) => Err(Error::InvalidSignature),
        }
    }

    /// Loads the payload model.
    pub fn load_payload<T: Load<'a>>(&self) -> Result<T, Error> {
        let mut payload = self.payload;
        let result = ok!(T::load_from(&mut payload));
        if payload.is_data_empty() && payload.is_refs_empty() {
            Ok(result)
        } else {
            Err(Error::InvalidData)
        }
    }
}
