//! Token registry
//!
//! Caches ERC-20 descriptors in the store so each token address is
//! fetched from the chain at most once.

use anyhow::Result;
use luckypot_common::{chain::ChainReader, Address};

use crate::entities::Token;
use crate::store::Store;

/// Decimals assumed when a token does not report any.
const DEFAULT_DECIMALS: u32 = 18;

/// Resolve a token descriptor, fetching metadata on first sight.
///
/// Returns `None` for the zero address. A cached row is returned as-is
/// without touching the chain. When the metadata calls revert (or the
/// endpoint fails), the descriptor is cached with empty name/symbol and
/// 18 decimals so later events do not retry the fetch.
pub async fn ensure_token(
    store: &Store,
    chain: &dyn ChainReader,
    address: Address,
) -> Result<Option<Token>> {
    if address == Address::zero() {
        return Ok(None);
    }

    if let Some(token) = store.get_token(address)? {
        return Ok(Some(token));
    }

    let metadata = match chain.erc20_metadata(address).await {
        Ok(metadata) => metadata,
        Err(e) => {
            tracing::warn!(
                target: "luckypot_store::registry",
                token = %address,
                error = %e,
                "Failed to fetch token metadata, caching defaults"
            );
            Default::default()
        }
    };

    let token = Token {
        address,
        name: metadata.name.unwrap_or_default(),
        symbol: metadata.symbol.unwrap_or_default(),
        decimals: metadata.decimals.unwrap_or(DEFAULT_DECIMALS),
    };
    store.insert_token(&token)?;
    Ok(Some(token))
}
