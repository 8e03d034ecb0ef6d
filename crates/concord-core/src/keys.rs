// crates/concord-core/src/keys.rs
//
// Fixed-layout composite keys for all persisted module state.
//
// Key format: `kind (1 byte) ‖ scope ‖ identity`, where
//   - denoms are length-prefixed (`len u8 ‖ utf8`) so a denom prefix never
//     matches a longer denom,
//   - program ids and block heights are big-endian u64 so byte order equals
//     numeric order,
//   - identities are their raw 20 bytes.
//
// These layouts are consensus-critical: changing one changes state roots.

use crate::error::ConcordError;
use crate::identity::{AccountId, ValidatorId, ID_LEN};

pub const KIND_COMMITMENT: u8 = 0x01;
pub const KIND_VOTE: u8 = 0x02;
pub const KIND_EXCHANGE_RATE: u8 = 0x03;
pub const KIND_FEEDER: u8 = 0x04;
pub const KIND_PROGRAM: u8 = 0x10;
pub const KIND_CANDIDATE_QUEUE: u8 = 0x11;
pub const KIND_GOVERNANCE_VOTE: u8 = 0x12;
pub const KIND_NEXT_PROGRAM_ID: u8 = 0x13;
pub const KIND_CLAIM: u8 = 0x20;
pub const KIND_PARAMS: u8 = 0x30;

/// Longest denom accepted anywhere a denom is embedded in a key.
pub const MAX_DENOM_LEN: usize = 64;

fn push_denom(key: &mut Vec<u8>, denom: &str) {
    // Callers validate denoms before building keys; longer denoms are
    // rejected upstream by `validate_denom`.
    let bytes = denom.as_bytes();
    key.push(bytes.len() as u8);
    key.extend_from_slice(bytes);
}

/// Check that a denom is non-empty, short, and made of `[a-z0-9/]`.
pub fn validate_denom(denom: &str) -> Result<(), ConcordError> {
    if denom.is_empty() || denom.len() > MAX_DENOM_LEN {
        return Err(ConcordError::InvalidInput(format!(
            "denom must be 1..={} bytes, got {:?}",
            MAX_DENOM_LEN, denom
        )));
    }
    if !denom
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'/')
    {
        return Err(ConcordError::InvalidInput(format!(
            "denom {:?} contains invalid characters",
            denom
        )));
    }
    Ok(())
}

/// `0x01 ‖ denom ‖ validator`
pub fn commitment_key(denom: &str, voter: &ValidatorId) -> Vec<u8> {
    let mut key = vec![KIND_COMMITMENT];
    push_denom(&mut key, denom);
    key.extend_from_slice(voter.as_bytes());
    key
}

/// Prefix covering every revealed vote.
pub fn vote_prefix() -> Vec<u8> {
    vec![KIND_VOTE]
}

fn vote_denom_prefix(denom: &str) -> Vec<u8> {
    let mut key = vec![KIND_VOTE];
    push_denom(&mut key, denom);
    key
}

/// `0x02 ‖ denom ‖ validator`
pub fn vote_key(denom: &str, voter: &ValidatorId) -> Vec<u8> {
    let mut key = vote_denom_prefix(denom);
    key.extend_from_slice(voter.as_bytes());
    key
}

/// Prefix covering every stored exchange rate.
pub fn exchange_rate_prefix() -> Vec<u8> {
    vec![KIND_EXCHANGE_RATE]
}

/// `0x03 ‖ denom`
pub fn exchange_rate_key(denom: &str) -> Vec<u8> {
    let mut key = vec![KIND_EXCHANGE_RATE];
    push_denom(&mut key, denom);
    key
}

/// Recover the denom from an exchange-rate key.
pub fn denom_from_exchange_rate_key(key: &[u8]) -> Result<String, ConcordError> {
    if key.len() < 2 || key[0] != KIND_EXCHANGE_RATE {
        return Err(malformed("exchange rate", key));
    }
    let len = key[1] as usize;
    let body = key.get(2..2 + len).ok_or_else(|| malformed("exchange rate", key))?;
    String::from_utf8(body.to_vec()).map_err(|_| malformed("exchange rate", key))
}

/// `0x04 ‖ validator`
pub fn feeder_key(operator: &ValidatorId) -> Vec<u8> {
    let mut key = vec![KIND_FEEDER];
    key.extend_from_slice(operator.as_bytes());
    key
}

/// Prefix covering every program record.
pub fn program_prefix() -> Vec<u8> {
    vec![KIND_PROGRAM]
}

/// `0x10 ‖ id`
pub fn program_key(id: u64) -> Vec<u8> {
    let mut key = vec![KIND_PROGRAM];
    key.extend_from_slice(&id.to_be_bytes());
    key
}

/// Prefix covering the whole candidate queue.
pub fn candidate_queue_prefix() -> Vec<u8> {
    vec![KIND_CANDIDATE_QUEUE]
}

/// `0x11 ‖ end_block ‖ id`
pub fn candidate_queue_key(end_block: u64, id: u64) -> Vec<u8> {
    let mut key = vec![KIND_CANDIDATE_QUEUE];
    key.extend_from_slice(&end_block.to_be_bytes());
    key.extend_from_slice(&id.to_be_bytes());
    key
}

/// Recover `(end_block, id)` from a candidate queue key.
pub fn parse_candidate_queue_key(key: &[u8]) -> Result<(u64, u64), ConcordError> {
    if key.len() != 17 || key[0] != KIND_CANDIDATE_QUEUE {
        return Err(malformed("candidate queue", key));
    }
    let end_block = u64::from_be_bytes(read_array(&key[1..9]));
    let id = u64::from_be_bytes(read_array(&key[9..17]));
    Ok((end_block, id))
}

/// Prefix covering every governance vote on one program.
pub fn governance_vote_program_prefix(id: u64) -> Vec<u8> {
    let mut key = vec![KIND_GOVERNANCE_VOTE];
    key.extend_from_slice(&id.to_be_bytes());
    key
}

/// `0x12 ‖ id ‖ voter`
pub fn governance_vote_key(id: u64, voter: &AccountId) -> Vec<u8> {
    let mut key = governance_vote_program_prefix(id);
    key.extend_from_slice(voter.as_bytes());
    key
}

/// Singleton key for the next program id counter.
pub fn next_program_id_key() -> Vec<u8> {
    vec![KIND_NEXT_PROGRAM_ID]
}

/// Prefix covering one claim pool namespace.
pub fn claim_prefix(namespace: u8) -> Vec<u8> {
    vec![KIND_CLAIM, namespace]
}

/// `0x20 ‖ namespace ‖ recipient`
pub fn claim_key(namespace: u8, recipient: &AccountId) -> Vec<u8> {
    let mut key = claim_prefix(namespace);
    key.extend_from_slice(recipient.as_bytes());
    key
}

/// Recover the recipient from a claim key.
pub fn recipient_from_claim_key(key: &[u8]) -> Result<AccountId, ConcordError> {
    if key.len() != 2 + ID_LEN || key[0] != KIND_CLAIM {
        return Err(malformed("claim", key));
    }
    AccountId::from_slice(&key[2..])
}

/// `0x30 ‖ module`
pub fn params_key(module: u8) -> Vec<u8> {
    vec![KIND_PARAMS, module]
}

fn read_array(bytes: &[u8]) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(bytes);
    out
}

fn malformed(kind: &str, key: &[u8]) -> ConcordError {
    ConcordError::Storage(format!("malformed {} key {}", kind, hex::encode(key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denom_prefix_does_not_match_longer_denom() {
        let v = ValidatorId([1; 20]);
        let key = vote_key("ukrwx", &v);
        assert!(!key.starts_with(&vote_denom_prefix("ukrw")));
        assert!(vote_key("ukrw", &v).starts_with(&vote_denom_prefix("ukrw")));
    }

    #[test]
    fn test_queue_keys_sort_by_height_then_id() {
        let a = candidate_queue_key(9, 500);
        let b = candidate_queue_key(10, 1);
        let c = candidate_queue_key(10, 2);
        assert!(a < b && b < c);
    }

    #[test]
    fn test_parse_candidate_queue_key() {
        let key = candidate_queue_key(42, 7);
        assert_eq!(parse_candidate_queue_key(&key).unwrap(), (42, 7));
        assert!(parse_candidate_queue_key(&key[..10]).is_err());
    }

    #[test]
    fn test_exchange_rate_denom_round_trip() {
        let key = exchange_rate_key("ukrw");
        assert_eq!(denom_from_exchange_rate_key(&key).unwrap(), "ukrw");
    }

    #[test]
    fn test_claim_recipient_round_trip() {
        let a = AccountId([9; 20]);
        let key = claim_key(1, &a);
        assert!(key.starts_with(&claim_prefix(1)));
        assert!(!key.starts_with(&claim_prefix(2)));
        assert_eq!(recipient_from_claim_key(&key).unwrap(), a);
    }

    #[test]
    fn test_validate_denom() {
        assert!(validate_denom("ukrw").is_ok());
        assert!(validate_denom("ibc/27394").is_ok());
        assert!(validate_denom("").is_err());
        assert!(validate_denom("UKRW").is_err());
        assert!(validate_denom(&"a".repeat(MAX_DENOM_LEN + 1)).is_err());
    }
}
