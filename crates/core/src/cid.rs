//! Content identifiers
//!
//! Only the textual forms a user is likely to paste are accepted:
//! base58btc CIDv0 (`Qm...`) and base32 CIDv1 (`bafy...`). The string is
//! validated, not decoded; the node is the authority on whether the
//! content exists.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
const CID_V0_LEN: usize = 46;
/// Shortest base32 CIDv1: version + codec + sha2-256 multihash, plus the `b` prefix
const CID_V1_MIN_LEN: usize = 59;

/// A syntactically valid IPFS content identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cid(String);

impl Cid {
    /// Validate and wrap a CID string (surrounding whitespace is ignored)
    pub fn parse(input: &str) -> Result<Self> {
        let cid = input.trim();

        if cid.is_empty() {
            return Err(Error::invalid_cid(input, "hash is empty"));
        }

        if cid.starts_with("Qm") {
            if cid.len() != CID_V0_LEN {
                return Err(Error::invalid_cid(
                    cid,
                    format!("CIDv0 must be {CID_V0_LEN} characters, got {}", cid.len()),
                ));
            }
            if let Some(bad) = cid.chars().find(|c| !BASE58_ALPHABET.contains(*c)) {
                return Err(Error::invalid_cid(cid, format!("'{bad}' is not a base58 character")));
            }
            return Ok(Self(cid.to_string()));
        }

        if let Some(body) = cid.strip_prefix('b') {
            if cid.len() < CID_V1_MIN_LEN {
                return Err(Error::invalid_cid(
                    cid,
                    format!("CIDv1 must be at least {CID_V1_MIN_LEN} characters, got {}", cid.len()),
                ));
            }
            if let Some(bad) = body.chars().find(|c| !matches!(c, 'a'..='z' | '2'..='7')) {
                return Err(Error::invalid_cid(cid, format!("'{bad}' is not a base32 character")));
            }
            return Ok(Self(cid.to_string()));
        }

        Err(Error::invalid_cid(cid, "must start with Qm (CIDv0) or b (CIDv1)"))
    }

    /// CID version, 0 or 1
    pub fn version(&self) -> u8 {
        if self.0.starts_with("Qm") { 0 } else { 1 }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Cid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for Cid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for Cid {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Cid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(|e| serde::de::Error::custom(e.message))
    }
}
