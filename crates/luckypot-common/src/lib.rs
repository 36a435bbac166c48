//! Common utilities for the Luckypot indexer
//!
//! Provides efficient conversions between EVM types and storage formats,
//! wei formatting for derived titles, IPFS URL helpers, and the read-only
//! chain access trait shared by all projections.

pub mod chain;

pub use chain::{ChainReader, Erc20Metadata, PotState};
pub use primitive_types::U256;

/// 20-byte EVM account/contract address.
pub type Address = primitive_types::H160;
/// 32-byte transaction hash.
pub type TxHash = primitive_types::H256;

/// Parse a `0x`-prefixed or bare hex string into an address.
pub fn parse_address(s: &str) -> anyhow::Result<Address> {
    let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))?;
    anyhow::ensure!(
        bytes.len() == 20,
        "expected a 20-byte address, got {} bytes",
        bytes.len()
    );
    Ok(Address::from_slice(&bytes))
}

// ===== Address conversions =====

/// Convert Address to 20-byte BLOB for storage (big-endian)
pub fn address_to_blob(addr: Address) -> Vec<u8> {
    addr.as_bytes().to_vec()
}

/// Convert BLOB back to Address (big-endian)
pub fn blob_to_address(bytes: &[u8]) -> Address {
    let mut arr = [0u8; 20];
    let len = bytes.len().min(20);
    // Right-align for big-endian (pad zeros on the left)
    arr[20 - len..].copy_from_slice(&bytes[..len]);
    Address::from(arr)
}

/// Convert TxHash to 32-byte BLOB for storage (big-endian)
pub fn tx_hash_to_blob(hash: TxHash) -> Vec<u8> {
    hash.as_bytes().to_vec()
}

/// Convert BLOB back to TxHash (big-endian)
pub fn blob_to_tx_hash(bytes: &[u8]) -> TxHash {
    let mut arr = [0u8; 32];
    let len = bytes.len().min(32);
    arr[32 - len..].copy_from_slice(&bytes[..len]);
    TxHash::from(arr)
}

// ===== U256 conversions =====

/// Convert U256 to variable-length BLOB for storage (big-endian, compact)
///
/// Zero encodes as a single 0x00 byte; other values as their minimal
/// big-endian representation (leading zero bytes stripped).
pub fn u256_to_blob(value: U256) -> Vec<u8> {
    if value.is_zero() {
        return vec![0u8];
    }
    let bytes = value.to_big_endian();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(31);
    bytes[start..].to_vec()
}

/// Convert BLOB back to U256 (big-endian)
pub fn blob_to_u256(bytes: &[u8]) -> U256 {
    let mut arr = [0u8; 32];
    let len = bytes.len().min(32);
    arr[32 - len..].copy_from_slice(&bytes[..len]);
    U256::from_big_endian(&arr)
}

// ===== Wei formatting =====

/// Format a raw token amount as a decimal string, shifting by `decimals`
/// and trimming trailing fractional zeros.
///
/// `format_units(2 * 10^18, 18)` is `"2"`, `format_units(25 * 10^17, 18)`
/// is `"2.5"`.
pub fn format_units(value: U256, decimals: u32) -> String {
    if decimals == 0 {
        return value.to_string();
    }
    let scale = match U256::from(10u64).checked_pow(U256::from(decimals)) {
        Some(scale) => scale,
        None => return value.to_string(),
    };
    let integer = value / scale;
    let remainder = value % scale;
    if remainder.is_zero() {
        return integer.to_string();
    }
    let mut fraction = format!("{:0>width$}", remainder.to_string(), width = decimals as usize);
    while fraction.ends_with('0') {
        fraction.pop();
    }
    format!("{integer}.{fraction}")
}

/// Format a wei amount with the standard 18 decimals.
pub fn format_wei(value: U256) -> String {
    format_units(value, 18)
}

// ===== IPFS helpers =====

/// Extract the CID from an `ipfs://` URI or a gateway URL containing
/// `/ipfs/`; anything else passes through unchanged.
pub fn ipfs_cid(url: &str) -> String {
    if let Some(cid) = url.strip_prefix("ipfs://") {
        return cid.to_string();
    }
    if let Some(pos) = url.find("/ipfs/") {
        if pos > 0 {
            return url[pos + "/ipfs/".len()..].to_string();
        }
    }
    url.to_string()
}

/// Rewrite an `ipfs://` URI to a resolvable gateway URL; other URLs pass
/// through unchanged.
pub fn ipfs_url(url: &str) -> String {
    match url.strip_prefix("ipfs://") {
        Some(cid) => format!("https://ipfs.io/ipfs/{cid}"),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u256_blob_zero() {
        let blob = u256_to_blob(U256::zero());
        assert_eq!(blob, vec![0u8]);
        assert_eq!(blob_to_u256(&blob), U256::zero());
    }

    #[test]
    fn test_u256_blob_compact() {
        let value = U256::from(0x1234u64);
        let blob = u256_to_blob(value);
        assert_eq!(blob, vec![0x12, 0x34]);
        assert_eq!(blob_to_u256(&blob), value);
    }

    #[test]
    fn test_u256_blob_large() {
        // 2^200 + 7 needs more than 16 bytes
        let value = (U256::from(1u64) << 200) + U256::from(7u64);
        let blob = u256_to_blob(value);
        assert!(blob.len() > 16);
        assert_eq!(blob_to_u256(&blob), value);
    }

    #[test]
    fn test_parse_address() {
        let addr = parse_address("0x00000000000000000000000000000000000000b0").unwrap();
        assert_eq!(addr, Address::from_low_u64_be(0xb0));
        // Bare hex works too
        let bare = parse_address("00000000000000000000000000000000000000b0").unwrap();
        assert_eq!(bare, addr);
    }

    #[test]
    fn test_parse_address_rejects_wrong_length() {
        assert!(parse_address("0xb0").is_err());
        assert!(parse_address("not hex").is_err());
    }

    #[test]
    fn test_address_blob_roundtrip() {
        let addr = Address::from_low_u64_be(0xabcdef);
        assert_eq!(blob_to_address(&address_to_blob(addr)), addr);
    }

    #[test]
    fn test_address_blob_short_input() {
        // Short blobs right-align, leading bytes zero
        let addr = blob_to_address(&[0x01, 0x02]);
        assert_eq!(addr, Address::from_low_u64_be(0x0102));
    }

    #[test]
    fn test_tx_hash_blob_roundtrip() {
        let hash = TxHash::from_low_u64_be(0xdeadbeef);
        assert_eq!(blob_to_tx_hash(&tx_hash_to_blob(hash)), hash);
    }

    #[test]
    fn test_format_units_whole() {
        let two_eth = U256::from(2u64) * U256::from(10u64).pow(U256::from(18u64));
        assert_eq!(format_units(two_eth, 18), "2");
    }

    #[test]
    fn test_format_units_fraction_trimmed() {
        let amount = U256::from(25u64) * U256::from(10u64).pow(U256::from(17u64));
        assert_eq!(format_units(amount, 18), "2.5");
    }

    #[test]
    fn test_format_units_small_fraction() {
        // 0.000000000000000001 with 18 decimals
        assert_eq!(format_units(U256::from(1u64), 18), "0.000000000000000001");
    }

    #[test]
    fn test_format_units_zero_decimals() {
        assert_eq!(format_units(U256::from(42u64), 0), "42");
    }

    #[test]
    fn test_format_wei() {
        let half = U256::from(5u64) * U256::from(10u64).pow(U256::from(17u64));
        assert_eq!(format_wei(half), "0.5");
    }

    #[test]
    fn test_ipfs_cid_from_scheme() {
        assert_eq!(ipfs_cid("ipfs://QmAbc123"), "QmAbc123");
    }

    #[test]
    fn test_ipfs_cid_from_gateway() {
        assert_eq!(ipfs_cid("https://ipfs.io/ipfs/QmAbc123"), "QmAbc123");
    }

    #[test]
    fn test_ipfs_cid_passthrough() {
        assert_eq!(ipfs_cid("QmAbc123"), "QmAbc123");
    }

    #[test]
    fn test_ipfs_url_rewrite() {
        assert_eq!(ipfs_url("ipfs://QmAbc123"), "https://ipfs.io/ipfs/QmAbc123");
    }

    #[test]
    fn test_ipfs_url_passthrough() {
        assert_eq!(
            ipfs_url("https://example.com/meta.json"),
            "https://example.com/meta.json"
        );
    }
}
