use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Error;
use std::fmt;
use std::ops::Deref;

static HRP_NPUB: bech32::Hrp = bech32::Hrp::parse_unchecked("npub");

/// A 32-byte x-only public key. Byte contents are not verified against
/// the curve unless the caller asks for it.
#[derive(Eq, PartialEq, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct Pubkey([u8; 32]);

impl Deref for Pubkey {
    type Target = [u8; 32];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Pubkey {
    pub fn new(data: [u8; 32]) -> Self {
        Self(data)
    }

    pub fn bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn hex(&self) -> String {
        hex::encode(self.bytes())
    }

    /// Accepts either hex or an npub bech32 string.
    pub fn parse(s: &str) -> Result<Self, Error> {
        match Pubkey::from_hex(s) {
            Ok(pk) => Ok(pk),
            Err(_) => Pubkey::from_npub(s),
        }
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, Error> {
        Ok(Pubkey(hex::decode(hex_str)?.as_slice().try_into()?))
    }

    /// Like [`Pubkey::from_hex`] but also checks the bytes are a valid
    /// curve point.
    pub fn from_hex_verified(hex_str: &str) -> Result<Self, Error> {
        let pk = Pubkey::from_hex(hex_str)?;
        pk.verify()?;
        Ok(pk)
    }

    pub fn from_npub(s: &str) -> Result<Self, Error> {
        let (hrp, data) = bech32::decode(s).map_err(|_| Error::InvalidBech32)?;

        if hrp != HRP_NPUB {
            return Err(Error::InvalidBech32);
        }

        Ok(Pubkey(data.as_slice().try_into()?))
    }

    pub fn to_npub(&self) -> Option<String> {
        bech32::encode::<bech32::Bech32>(HRP_NPUB, &self.0).ok()
    }

    fn verify(&self) -> Result<(), Error> {
        nostr::secp256k1::XOnlyPublicKey::from_slice(&self.0)
            .map(|_| ())
            .map_err(|_| Error::InvalidPublicKey)
    }
}

impl From<[u8; 32]> for Pubkey {
    fn from(data: [u8; 32]) -> Self {
        Self(data)
    }
}

impl From<Pubkey> for String {
    fn from(pk: Pubkey) -> Self {
        pk.hex()
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hex())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hex())
    }
}

impl Serialize for Pubkey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.hex())
    }
}

impl<'de> Deserialize<'de> for Pubkey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Pubkey::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JB55_HEX: &str = "32e1827635450ebb3c5a7d12c1f8e7b2b514439ac10a67eef3d9fd9c5c68e245";

    /// Hex round-trips through parse and back.
    #[test]
    fn hex_roundtrip() {
        let pk = Pubkey::parse(JB55_HEX).expect("parse hex");
        assert_eq!(pk.hex(), JB55_HEX);
    }

    /// npub encoding decodes back to the same key.
    #[test]
    fn npub_roundtrip() {
        let pk = Pubkey::from_hex(JB55_HEX).expect("parse hex");
        let npub = pk.to_npub().expect("encode npub");
        assert!(npub.starts_with("npub1"));
        assert_eq!(Pubkey::parse(&npub).expect("parse npub"), pk);
    }

    /// Wrong-length hex is rejected.
    #[test]
    fn short_hex_rejected() {
        assert!(Pubkey::from_hex("deadbeef").is_err());
    }

    /// Verified parse rejects bytes off the curve.
    #[test]
    fn verify_rejects_garbage() {
        let all_zero = "0".repeat(64);
        assert!(Pubkey::from_hex(&all_zero).is_ok());
        assert!(Pubkey::from_hex_verified(&all_zero).is_err());
    }

    /// Serde uses the hex string form.
    #[test]
    fn serde_hex_string() {
        let pk = Pubkey::from_hex(JB55_HEX).expect("parse hex");
        let json = serde_json::to_string(&pk).expect("serialize");
        assert_eq!(json, format!("\"{JB55_HEX}\""));
        let back: Pubkey = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, pk);
    }
}
