use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

use crate::http::{fetch_text, sha256_hex};
use crate::schedule::{CandidateRecord, ScheduleBatch, ScheduleSource};
use crate::store::schema::de_opt_u64;

/// The agave wiki serves the human-edited tracker schedule as JSON: a map of
/// status bucket to rows keyed by the spreadsheet column headers.
pub const WIKI_SCHEDULE_URL: &str =
    "https://github.com/anza-xyz/agave/wiki/feature-gate-tracker-schedule.json";

pub struct WikiScheduleSource {
    url: String,
}

impl WikiScheduleSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl ScheduleSource for WikiScheduleSource {
    async fn fetch_candidates(&self) -> Result<ScheduleBatch> {
        let body = fetch_text(&self.url).await?;
        let raw_hash = sha256_hex(&body);
        let payload: Value = serde_json::from_str(&body)
            .with_context(|| format!("schedule source is not JSON: {}", self.url))?;
        let candidates = parse_schedule(&payload)?;
        Ok(ScheduleBatch {
            source_url: self.url.clone(),
            fetched_at: Utc::now(),
            raw_hash,
            candidates,
        })
    }
}

/// Flattens the status buckets into candidate records, preserving row order.
/// Rows without a feature id are placeholders in the wiki table and are
/// skipped with a warning; a malformed row is fatal, since silently dropping
/// it would make the store diverge from the source.
pub fn parse_schedule(payload: &Value) -> Result<Vec<CandidateRecord>> {
    let buckets = payload
        .as_object()
        .context("schedule payload is not an object of status buckets")?;

    let mut out = Vec::new();
    for (status, rows) in buckets {
        let rows = rows
            .as_array()
            .with_context(|| format!("status bucket {status:?} is not an array"))?;
        for row in rows {
            let parsed: ScheduleRow = serde_json::from_value(row.clone())
                .with_context(|| format!("malformed schedule row in bucket {status:?}"))?;
            match parsed.into_candidate() {
                Some(candidate) => out.push(candidate),
                None => warn!(bucket = %status, "skipping schedule row without a feature id"),
            }
        }
    }
    Ok(out)
}

/// Wire shape of one wiki row. Accepts both the current multi-value columns
/// and the older single-value spelling (`simd`, `simd_link`, `version`,
/// snake_case epoch names) so a source rollback does not break the sync.
#[derive(Debug, Clone, Deserialize)]
struct ScheduleRow {
    #[serde(
        rename = "Feature ID",
        alias = "key",
        default,
        deserialize_with = "de_opt_text"
    )]
    key: Option<String>,
    #[serde(
        rename = "Title",
        alias = "title",
        default,
        deserialize_with = "de_opt_text"
    )]
    title: Option<String>,
    #[serde(
        rename = "SIMDs",
        alias = "simds",
        alias = "simd",
        default,
        deserialize_with = "de_text_seq"
    )]
    simds: Vec<String>,
    #[serde(
        rename = "SIMD Links",
        alias = "simd_links",
        alias = "simd_link",
        default,
        deserialize_with = "de_text_seq"
    )]
    simd_links: Vec<String>,
    #[serde(
        rename = "Owners",
        alias = "owners",
        default,
        deserialize_with = "de_text_seq"
    )]
    owners: Vec<String>,
    #[serde(
        rename = "Min Agave Versions",
        alias = "min_agave_versions",
        alias = "version",
        default,
        deserialize_with = "de_text_seq"
    )]
    min_agave_versions: Vec<String>,
    #[serde(
        rename = "Min Fd Versions",
        alias = "min_fd_versions",
        default,
        deserialize_with = "de_text_seq"
    )]
    min_fd_versions: Vec<String>,
    #[serde(
        rename = "Min Jito Versions",
        alias = "min_jito_versions",
        default,
        deserialize_with = "de_text_seq"
    )]
    min_jito_versions: Vec<String>,
    #[serde(
        rename = "Planned Testnet Order",
        alias = "planned_testnet_order",
        default,
        deserialize_with = "de_opt_u64"
    )]
    planned_testnet_order: Option<u64>,
    #[serde(
        rename = "Testnet Epoch",
        alias = "testnet_epoch",
        default,
        deserialize_with = "de_opt_u64"
    )]
    testnet_activation_epoch: Option<u64>,
    #[serde(
        rename = "Devnet Epoch",
        alias = "devnet_epoch",
        default,
        deserialize_with = "de_opt_u64"
    )]
    devnet_activation_epoch: Option<u64>,
    #[serde(
        rename = "Comms Required",
        alias = "comms_required",
        default,
        deserialize_with = "de_opt_text"
    )]
    comms_required: Option<String>,
}

impl ScheduleRow {
    fn into_candidate(self) -> Option<CandidateRecord> {
        Some(CandidateRecord {
            key: self.key?,
            title: self.title,
            simds: self.simds,
            simd_links: self.simd_links,
            owners: self.owners,
            min_agave_versions: self.min_agave_versions,
            min_fd_versions: self.min_fd_versions,
            min_jito_versions: self.min_jito_versions,
            planned_testnet_order: self.planned_testnet_order,
            testnet_activation_epoch: self.testnet_activation_epoch,
            devnet_activation_epoch: self.devnet_activation_epoch,
            comms_required: self.comms_required,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Num(u64),
}

impl Scalar {
    fn into_trimmed(self) -> Option<String> {
        match self {
            Scalar::Text(text) => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Scalar::Num(n) => Some(n.to_string()),
        }
    }
}

/// Blank-tolerant text cell: "", "  " and null all read as absent.
fn de_opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.and_then(Scalar::into_trimmed))
}

/// Accepts a scalar, a list of scalars, or null; blank entries are dropped.
fn de_text_seq<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<Scalar>),
        One(Scalar),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::Many(values)) => values
            .into_iter()
            .filter_map(Scalar::into_trimmed)
            .collect(),
        Some(OneOrMany::One(value)) => value.into_trimmed().into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::parse_schedule;

    #[test]
    fn parses_bucketed_rows_with_column_aliases() {
        let payload = json!({
            "Pending": [
                {
                    "Feature ID": "Key111",
                    "Title": "Enable chained merkle shreds",
                    "SIMDs": ["0180"],
                    "SIMD Links": ["https://example.org/0180"],
                    "Owners": ["carol"],
                    "Min Agave Versions": ["2.1.0"],
                    "Min Fd Versions": [],
                    "Min Jito Versions": [],
                    "Planned Testnet Order": 2,
                    "Testnet Epoch": 712,
                    "Devnet Epoch": "",
                    "Comms Required": null
                }
            ],
            "Active": [
                {
                    "Feature ID": "Key222",
                    "Title": "Fix curve validation",
                    "Testnet Epoch": "705",
                    "Devnet Epoch": 698
                }
            ]
        });

        let candidates = parse_schedule(&payload).expect("valid schedule");
        assert_eq!(candidates.len(), 2);

        let first = candidates.iter().find(|c| c.key == "Key111").expect("Key111");
        assert_eq!(first.simds, vec!["0180"]);
        assert_eq!(first.testnet_activation_epoch, Some(712));
        assert_eq!(first.devnet_activation_epoch, None);
        assert_eq!(first.planned_testnet_order, Some(2));

        let second = candidates.iter().find(|c| c.key == "Key222").expect("Key222");
        assert_eq!(second.testnet_activation_epoch, Some(705));
        assert_eq!(second.devnet_activation_epoch, Some(698));
    }

    #[test]
    fn accepts_single_value_legacy_columns() {
        let payload = json!({
            "Pending": [
                {
                    "key": "Key333",
                    "title": "Old style row",
                    "simd": "42",
                    "simd_link": "http://x",
                    "version": "1.2.0",
                    "testnet_epoch": 600
                }
            ]
        });

        let candidates = parse_schedule(&payload).expect("valid schedule");
        assert_eq!(candidates[0].simds, vec!["42"]);
        assert_eq!(candidates[0].simd_links, vec!["http://x"]);
        assert_eq!(candidates[0].min_agave_versions, vec!["1.2.0"]);
        assert_eq!(candidates[0].testnet_activation_epoch, Some(600));
    }

    #[test]
    fn skips_rows_without_a_feature_id() {
        let payload = json!({
            "Scheduled": [
                { "Feature ID": "", "Title": "placeholder" },
                { "Feature ID": "Key444", "Title": "real" }
            ]
        });

        let candidates = parse_schedule(&payload).expect("valid schedule");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].key, "Key444");
    }

    #[test]
    fn malformed_row_is_fatal() {
        let payload = json!({ "Pending": [ { "Feature ID": "K", "Testnet Epoch": {"bad": 1} } ] });
        assert!(parse_schedule(&payload).is_err());
    }

    #[test]
    fn non_bucketed_payload_is_rejected() {
        assert!(parse_schedule(&json!([1, 2, 3])).is_err());
    }
}
