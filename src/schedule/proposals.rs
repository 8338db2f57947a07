use std::collections::BTreeMap;

use anyhow::Result;
use serde_json::Value;

use crate::http::fetch_json;
use crate::store::schema::FeatureRecord;

/// GitHub contents listing of the SIMD proposals directory. Each entry named
/// `NNNN-*.md` maps the four-digit proposal number to its document URL.
pub const PROPOSALS_API_URL: &str =
    "https://api.github.com/repos/solana-foundation/solana-improvement-documents/contents/proposals";

#[derive(Debug, Clone, Default)]
pub struct ProposalLinks {
    by_number: BTreeMap<String, String>,
}

impl ProposalLinks {
    pub async fn fetch(url: &str) -> Result<Self> {
        let listing = fetch_json(url).await?;
        Ok(Self::from_listing(&listing))
    }

    pub fn from_listing(listing: &Value) -> Self {
        let mut by_number = BTreeMap::new();
        for entry in listing.as_array().map(Vec::as_slice).unwrap_or_default() {
            let Some(name) = entry.get("name").and_then(Value::as_str) else {
                continue;
            };
            if !name.ends_with(".md") || name.len() < 4 {
                continue;
            }
            let number = &name[..4];
            if !number.bytes().all(|b| b.is_ascii_digit()) {
                continue;
            }
            let Some(url) = entry.get("html_url").and_then(Value::as_str) else {
                continue;
            };
            by_number.insert(number.to_string(), url.to_string());
        }
        Self { by_number }
    }

    /// Looks up a proposal number, zero-padding short spellings ("42" ->
    /// "0042"). Unknown numbers resolve to nothing, never an error.
    pub fn link_for(&self, simd: &str) -> Option<&str> {
        let number = normalize_simd(simd)?;
        self.by_number.get(&number).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_number.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_number.is_empty()
    }
}

/// Fills `simd_links` on records where it is shorter than `simds`, keeping
/// the two sequences parallel: a record is only rewritten when every one of
/// its proposal numbers resolves. Returns how many records were filled.
pub fn fill_missing_links(records: &mut [FeatureRecord], links: &ProposalLinks) -> usize {
    let mut filled = 0;
    for record in records.iter_mut() {
        if record.simds.is_empty() || record.simd_links.len() >= record.simds.len() {
            continue;
        }
        let resolved: Vec<String> = record
            .simds
            .iter()
            .filter_map(|simd| links.link_for(simd).map(str::to_string))
            .collect();
        if resolved.len() == record.simds.len() {
            record.simd_links = resolved;
            filled += 1;
        }
    }
    filled
}

fn normalize_simd(simd: &str) -> Option<String> {
    let trimmed = simd.trim();
    if trimmed.is_empty() || trimmed.len() > 4 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("{trimmed:0>4}"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{fill_missing_links, ProposalLinks};
    use crate::store::schema::FeatureRecord;

    fn listing() -> ProposalLinks {
        ProposalLinks::from_listing(&json!([
            { "name": "0042-example.md", "html_url": "https://example.org/0042" },
            { "name": "0186-loaded-accounts.md", "html_url": "https://example.org/0186" },
            { "name": "README.md", "html_url": "https://example.org/readme" },
            { "name": "0099-no-url.txt", "html_url": "https://example.org/0099" }
        ]))
    }

    fn record(simds: &[&str], links: &[&str]) -> FeatureRecord {
        FeatureRecord {
            key: "K".to_string(),
            title: None,
            description: None,
            simds: simds.iter().map(|s| s.to_string()).collect(),
            simd_links: links.iter().map(|s| s.to_string()).collect(),
            owners: Vec::new(),
            min_agave_versions: Vec::new(),
            min_fd_versions: Vec::new(),
            min_jito_versions: Vec::new(),
            planned_testnet_order: None,
            testnet_activation_epoch: None,
            devnet_activation_epoch: None,
            mainnet_activation_epoch: None,
            comms_required: None,
        }
    }

    #[test]
    fn listing_keeps_only_numbered_markdown() {
        let links = listing();
        assert_eq!(links.len(), 2);
        assert_eq!(links.link_for("0042"), Some("https://example.org/0042"));
        assert_eq!(links.link_for("42"), Some("https://example.org/0042"));
        assert_eq!(links.link_for("0007"), None);
        assert_eq!(links.link_for("not-a-number"), None);
    }

    #[test]
    fn fills_links_when_every_simd_resolves() {
        let mut records = vec![record(&["42", "0186"], &[])];
        let filled = fill_missing_links(&mut records, &listing());
        assert_eq!(filled, 1);
        assert_eq!(
            records[0].simd_links,
            vec!["https://example.org/0042", "https://example.org/0186"]
        );
    }

    #[test]
    fn partial_resolution_leaves_the_record_untouched() {
        let mut records = vec![record(&["42", "7777"], &[])];
        let filled = fill_missing_links(&mut records, &listing());
        assert_eq!(filled, 0);
        assert!(records[0].simd_links.is_empty());
    }

    #[test]
    fn complete_link_lists_are_not_rewritten() {
        let mut records = vec![record(&["42"], &["https://curated.example/42"])];
        let filled = fill_missing_links(&mut records, &listing());
        assert_eq!(filled, 0);
        assert_eq!(records[0].simd_links, vec!["https://curated.example/42"]);
    }
}
