//! Seed node discovery through the DNS bootstrap directory.
//!
//! The directory answers SRV queries with targets like
//! `ln1qw508d6...tpsc.lseed.bitcoinstats.com.`, whose leading label is the
//! bech32 encoding of the seed's public key.

use hickory_resolver::Resolver;

pub const DEFAULT_SEED_DOMAIN: &str = "lseed.bitcoinstats.com";

/// Errors from seed resolution. Any of them fails the whole lookup.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("SRV lookup for {domain} failed: {message}")]
    Resolve { domain: String, message: String },
    #[error("SRV target `{0}` has no leading label")]
    EmptyLabel(String),
    #[error("invalid seed label `{label}`: {source}")]
    Bech32 {
        label: String,
        #[source]
        source: bech32::Error,
    },
}

/// A seed advertised by the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedRecord {
    pub label: String,
    pub node_id: String,
}

/// Anything that can produce seed nodes.
pub trait SeedSource {
    fn seed_records(&self) -> Result<Vec<SeedRecord>, SeedError>;

    fn seed_node_ids(&self) -> Result<Vec<String>, SeedError> {
        Ok(self
            .seed_records()?
            .into_iter()
            .map(|record| record.node_id)
            .collect())
    }
}

/// Resolves seeds with the system DNS configuration.
#[derive(Debug, Clone)]
pub struct DnsSeedResolver {
    domain: String,
}

impl DnsSeedResolver {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    fn resolve_error(&self, message: impl ToString) -> SeedError {
        SeedError::Resolve {
            domain: self.domain.clone(),
            message: message.to_string(),
        }
    }
}

impl Default for DnsSeedResolver {
    fn default() -> Self {
        Self::new(DEFAULT_SEED_DOMAIN)
    }
}

impl SeedSource for DnsSeedResolver {
    fn seed_records(&self) -> Result<Vec<SeedRecord>, SeedError> {
        let resolver = Resolver::from_system_conf().map_err(|e| self.resolve_error(e))?;
        let lookup = resolver
            .srv_lookup(self.domain.as_str())
            .map_err(|e| self.resolve_error(e))?;

        let records = lookup
            .iter()
            .map(|srv| seed_record_from_target(&srv.target().to_utf8()))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(domain = %self.domain, seeds = records.len(), "resolved seed nodes");
        Ok(records)
    }
}

/// Decode one SRV target hostname into a seed record.
pub fn seed_record_from_target(target: &str) -> Result<SeedRecord, SeedError> {
    let label = leading_label(target).ok_or_else(|| SeedError::EmptyLabel(target.to_string()))?;
    let node_id = decode_seed_label(label)?;
    Ok(SeedRecord {
        label: label.to_string(),
        node_id,
    })
}

/// First DNS label of `target`, ignoring the root dot.
pub fn leading_label(target: &str) -> Option<&str> {
    target
        .trim_end_matches('.')
        .split('.')
        .next()
        .filter(|label| !label.is_empty())
}

/// Decode a bech32 seed label into a hex node ID.
///
/// The 5-bit payload is regrouped into 4-bit nibbles with padding, so the last
/// nibble is always a padding artifact and is dropped.
pub fn decode_seed_label(label: &str) -> Result<String, SeedError> {
    let bech32_error = |source| SeedError::Bech32 {
        label: label.to_string(),
        source,
    };
    let (_hrp, data, _variant) = bech32::decode(label).map_err(bech32_error)?;
    let nibbles = bech32::convert_bits(&data, 5, 4, true).map_err(bech32_error)?;

    let mut hex: String = nibbles.iter().map(|n| format!("{:x}", n)).collect();
    hex.pop();
    Ok(hex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bech32::{ToBase32, Variant};

    const PUBKEY: &str = "02b6b2d6d1d7b0ff3a6e7b9f9d2d5c12a5e4f3a3c8b9d0e1f2a3b4c5d6e7f80912";

    fn pubkey_bytes() -> Vec<u8> {
        (0..PUBKEY.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&PUBKEY[i..i + 2], 16).unwrap())
            .collect()
    }

    fn encoded_label() -> String {
        bech32::encode("ln", pubkey_bytes().to_base32(), Variant::Bech32).unwrap()
    }

    #[test]
    fn test_leading_label() {
        assert_eq!(
            leading_label("ln1abc.lseed.bitcoinstats.com."),
            Some("ln1abc")
        );
        assert_eq!(leading_label("ln1abc"), Some("ln1abc"));
        assert_eq!(leading_label("."), None);
        assert_eq!(leading_label(""), None);
    }

    #[test]
    fn test_decode_recovers_pubkey() {
        assert_eq!(decode_seed_label(&encoded_label()).unwrap(), PUBKEY);
    }

    #[test]
    fn test_decode_is_deterministic() {
        let label = encoded_label();
        let first = decode_seed_label(&label).unwrap();
        for _ in 0..5 {
            assert_eq!(decode_seed_label(&label).unwrap(), first);
        }
    }

    #[test]
    fn test_record_from_full_target() {
        let label = encoded_label();
        let record =
            seed_record_from_target(&format!("{}.lseed.bitcoinstats.com.", label)).unwrap();
        assert_eq!(record.label, label);
        assert_eq!(record.node_id, PUBKEY);
    }

    #[test]
    fn test_bad_checksum_is_error() {
        let mut label = encoded_label();
        let last = label.pop().unwrap();
        label.push(if last == 'q' { 'p' } else { 'q' });
        assert!(matches!(
            decode_seed_label(&label),
            Err(SeedError::Bech32 { .. })
        ));
    }

    #[test]
    fn test_empty_target_is_error() {
        assert!(matches!(
            seed_record_from_target("."),
            Err(SeedError::EmptyLabel(_))
        ));
    }
}
