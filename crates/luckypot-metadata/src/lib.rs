//! Token metadata ingestion.
//!
//! Pot notes reference IPFS documents; the host fetches the content and
//! hands the raw bytes to [`ingest`] keyed by CID. Anything that is not
//! a JSON object is dropped without a trace row, matching the fetcher's
//! fire-and-forget contract.

use anyhow::Result;
use luckypot_common::{ipfs_cid, ipfs_url};
use luckypot_store::{Store, TokenMetadataRecord};

/// Parse fetched content and upsert one metadata row for `cid`.
///
/// Missing or non-string fields default to the empty string; an
/// `ipfs://` image reference is rewritten to a gateway URL. Re-ingest
/// overwrites the previous row.
pub fn ingest(store: &Store, cid: &str, content: &[u8]) -> Result<()> {
    let value: serde_json::Value = match serde_json::from_slice(content) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(
                target: "luckypot_metadata::ingest",
                cid,
                error = %e,
                "Content is not JSON, skipping"
            );
            return Ok(());
        }
    };
    let Some(object) = value.as_object() else {
        tracing::debug!(
            target: "luckypot_metadata::ingest",
            cid,
            "Content is not a JSON object, skipping"
        );
        return Ok(());
    };

    let text = |key: &str| {
        object
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };

    let record = TokenMetadataRecord {
        cid: cid.to_string(),
        name: text("name"),
        image: ipfs_url(&text("image")),
        description: text("description"),
    };
    store.put_token_metadata(&record)?;

    tracing::debug!(
        target: "luckypot_metadata::ingest",
        cid,
        name = %record.name,
        "Stored token metadata"
    );

    Ok(())
}

/// [`ingest`] for hosts that key fetches by URL rather than CID:
/// `ipfs://…` and gateway URLs collapse to the CID they carry, anything
/// else keys the row verbatim.
pub fn ingest_url(store: &Store, url: &str, content: &[u8]) -> Result<()> {
    ingest(store, &ipfs_cid(url), content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        Store::new(":memory:").unwrap()
    }

    #[test]
    fn test_ingests_full_object() {
        let store = store();
        let content = br#"{"name":"Lucky Pot #1","image":"ipfs://QmImage","description":"weekly draw"}"#;
        ingest(&store, "QmPot1", content).unwrap();

        let record = store.get_token_metadata("QmPot1").unwrap().unwrap();
        assert_eq!(record.name, "Lucky Pot #1");
        assert_eq!(record.image, "https://ipfs.io/ipfs/QmImage");
        assert_eq!(record.description, "weekly draw");
    }

    #[test]
    fn test_http_image_passes_through() {
        let store = store();
        ingest(
            &store,
            "QmPot2",
            br#"{"image":"https://example.com/pot.png"}"#,
        )
        .unwrap();

        let record = store.get_token_metadata("QmPot2").unwrap().unwrap();
        assert_eq!(record.image, "https://example.com/pot.png");
        assert_eq!(record.name, "");
    }

    #[test]
    fn test_missing_and_non_string_fields_default_empty() {
        let store = store();
        ingest(&store, "QmPot3", br#"{"name":42,"image":["x"]}"#).unwrap();

        let record = store.get_token_metadata("QmPot3").unwrap().unwrap();
        assert_eq!(record.name, "");
        assert_eq!(record.image, "");
        assert_eq!(record.description, "");
    }

    #[test]
    fn test_non_object_content_is_skipped() {
        let store = store();
        ingest(&store, "QmPot4", br#"[1,2,3]"#).unwrap();
        ingest(&store, "QmPot4", br#""just a string""#).unwrap();
        assert!(store.get_token_metadata("QmPot4").unwrap().is_none());
    }

    #[test]
    fn test_invalid_json_is_skipped() {
        let store = store();
        ingest(&store, "QmPot5", b"\x89PNG not json").unwrap();
        assert!(store.get_token_metadata("QmPot5").unwrap().is_none());
    }

    #[test]
    fn test_reingest_overwrites() {
        let store = store();
        ingest(&store, "QmPot6", br#"{"name":"first"}"#).unwrap();
        ingest(&store, "QmPot6", br#"{"name":"second"}"#).unwrap();

        let record = store.get_token_metadata("QmPot6").unwrap().unwrap();
        assert_eq!(record.name, "second");
    }

    #[test]
    fn test_ingest_url_keys_by_cid() {
        let store = store();
        ingest_url(&store, "ipfs://QmPot7", br#"{"name":"by url"}"#).unwrap();

        let record = store.get_token_metadata("QmPot7").unwrap().unwrap();
        assert_eq!(record.name, "by url");
    }
}
