use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Canonical persisted shape of one tracked feature gate.
///
/// `key` is the feature account address and the primary key of the store.
/// `title`, `description`, `owners`, the version lists and `comms_required`
/// are operator-curated; reconciliation never touches them. The devnet and
/// testnet epochs are rewritten from the schedule source on every sync, while
/// `mainnet_activation_epoch` is set at most once, from on-chain state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FeatureRecord {
    pub key: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub simds: Vec<String>,
    #[serde(default)]
    pub simd_links: Vec<String>,
    #[serde(default)]
    pub owners: Vec<String>,
    #[serde(default)]
    pub min_agave_versions: Vec<String>,
    #[serde(default)]
    pub min_fd_versions: Vec<String>,
    #[serde(default)]
    pub min_jito_versions: Vec<String>,
    #[serde(default, deserialize_with = "de_opt_u64")]
    pub planned_testnet_order: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_u64")]
    pub testnet_activation_epoch: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_u64")]
    pub devnet_activation_epoch: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_u64")]
    pub mainnet_activation_epoch: Option<u64>,
    #[serde(default)]
    pub comms_required: Option<String>,
}

/// Pre-migration store shape: single-valued `simd`/`simd_link`/`version` and
/// camelCase epoch names. Losslessly embeddable into [`FeatureRecord`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LegacyFeatureRecord {
    pub key: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub simd: Option<String>,
    #[serde(default)]
    pub simd_link: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(
        default,
        rename = "testnetActivationEpoch",
        deserialize_with = "de_opt_u64"
    )]
    pub testnet_activation_epoch: Option<u64>,
    #[serde(
        default,
        rename = "devnetActivationEpoch",
        deserialize_with = "de_opt_u64"
    )]
    pub devnet_activation_epoch: Option<u64>,
    #[serde(
        default,
        rename = "mainnetActivationEpoch",
        deserialize_with = "de_opt_u64"
    )]
    pub mainnet_activation_epoch: Option<u64>,
}

impl From<LegacyFeatureRecord> for FeatureRecord {
    fn from(legacy: LegacyFeatureRecord) -> Self {
        Self {
            key: legacy.key,
            title: legacy.title,
            description: legacy.description,
            simds: legacy.simd.into_iter().collect(),
            simd_links: legacy.simd_link.into_iter().collect(),
            owners: Vec::new(),
            min_agave_versions: legacy.version.into_iter().collect(),
            min_fd_versions: Vec::new(),
            min_jito_versions: Vec::new(),
            planned_testnet_order: None,
            testnet_activation_epoch: legacy.testnet_activation_epoch,
            devnet_activation_epoch: legacy.devnet_activation_epoch,
            mainnet_activation_epoch: legacy.mainnet_activation_epoch,
            comms_required: None,
        }
    }
}

#[derive(Debug, Error)]
#[error("feature record matches neither the stored nor the legacy shape: {summary}")]
pub struct MigrationError {
    pub summary: String,
}

/// Upgrades one raw store entry into the canonical shape.
///
/// Validation is a two-stage attempt: canonical first, legacy second. Both
/// shapes reject unknown fields, so a record that matches neither is reported
/// as fatal instead of being silently truncated into whichever shape ignores
/// the extra data. Idempotent on already-canonical records.
pub fn migrate(raw: Value) -> Result<FeatureRecord, MigrationError> {
    match serde_json::from_value::<FeatureRecord>(raw.clone()) {
        Ok(record) => Ok(record),
        Err(canonical_err) => match serde_json::from_value::<LegacyFeatureRecord>(raw.clone()) {
            Ok(legacy) => Ok(legacy.into()),
            Err(legacy_err) => Err(MigrationError {
                summary: format!(
                    "{} (canonical: {canonical_err}; legacy: {legacy_err})",
                    preview(&raw)
                ),
            }),
        },
    }
}

fn preview(raw: &Value) -> String {
    if let Some(key) = raw.get("key").and_then(Value::as_str) {
        return format!("key {key:?}");
    }
    let rendered = raw.to_string();
    rendered.chars().take(120).collect()
}

/// Accepts the epoch encodings the schedule source and old stores produced:
/// an integer, a numeric string, a blank string, or null.
pub(crate) fn de_opt_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("epoch must be a non-negative integer: {n}"))),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                trimmed
                    .parse::<u64>()
                    .map(Some)
                    .map_err(|_| D::Error::custom(format!("invalid epoch value: {s:?}")))
            }
        }
        Some(other) => Err(D::Error::custom(format!("invalid epoch value: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{migrate, FeatureRecord};

    #[test]
    fn canonical_record_passes_through_unchanged() {
        let raw = json!({
            "key": "FeatureKey111",
            "title": "Raise loaded account limit",
            "description": "Operator note",
            "simds": ["0186"],
            "simd_links": ["https://example.org/0186"],
            "owners": ["alice"],
            "min_agave_versions": ["2.0.0"],
            "min_fd_versions": [],
            "min_jito_versions": [],
            "planned_testnet_order": 3,
            "testnet_activation_epoch": 700,
            "devnet_activation_epoch": 680,
            "mainnet_activation_epoch": 650,
            "comms_required": "blog post"
        });

        let migrated = migrate(raw.clone()).expect("canonical record");
        assert_eq!(migrated.key, "FeatureKey111");
        assert_eq!(migrated.mainnet_activation_epoch, Some(650));

        // Idempotence: migrating the canonical serialization is a no-op.
        let reserialized = serde_json::to_value(&migrated).expect("serialize");
        let twice = migrate(reserialized).expect("still canonical");
        assert_eq!(twice, migrated);
    }

    #[test]
    fn legacy_record_maps_to_singleton_sequences() {
        let raw = json!({
            "key": "B",
            "simd": "42",
            "simd_link": "http://x",
            "version": "1.2.0"
        });

        let migrated = migrate(raw).expect("legacy record");
        assert_eq!(migrated.simds, vec!["42"]);
        assert_eq!(migrated.simd_links, vec!["http://x"]);
        assert_eq!(migrated.min_agave_versions, vec!["1.2.0"]);
        assert!(migrated.owners.is_empty());
        assert!(migrated.min_fd_versions.is_empty());
        assert!(migrated.min_jito_versions.is_empty());
    }

    #[test]
    fn legacy_record_keeps_epochs_and_tolerates_blanks() {
        let raw = json!({
            "key": "C",
            "simd": "77",
            "version": "1.18.0",
            "testnetActivationEpoch": 612,
            "devnetActivationEpoch": "598",
            "mainnetActivationEpoch": ""
        });

        let migrated = migrate(raw).expect("legacy record");
        assert_eq!(migrated.testnet_activation_epoch, Some(612));
        assert_eq!(migrated.devnet_activation_epoch, Some(598));
        assert_eq!(migrated.mainnet_activation_epoch, None);
    }

    #[test]
    fn unknown_shape_is_fatal() {
        let err = migrate(json!({"id": "not-a-feature", "stuff": []}))
            .expect_err("neither shape should match");
        assert!(err.to_string().contains("neither"));
    }

    #[test]
    fn extra_fields_do_not_silently_truncate() {
        // A canonical record with an unexpected field must not fall back to
        // the legacy shape and drop its plural fields on the floor.
        let err = migrate(json!({
            "key": "D",
            "simds": ["11"],
            "unexpected_field": true
        }))
        .expect_err("unknown field should be fatal");
        assert!(err.summary.contains("key \"D\""));
    }

    #[test]
    fn negative_epoch_is_rejected() {
        assert!(migrate(json!({"key": "E", "testnet_activation_epoch": -4})).is_err());
    }

    #[test]
    fn missing_key_is_fatal() {
        assert!(migrate(json!({"title": "keyless"})).is_err());
    }

    #[test]
    fn serialization_uses_canonical_field_names() {
        let record = FeatureRecord {
            key: "F".to_string(),
            title: None,
            description: None,
            simds: vec!["9".to_string()],
            simd_links: Vec::new(),
            owners: Vec::new(),
            min_agave_versions: Vec::new(),
            min_fd_versions: Vec::new(),
            min_jito_versions: Vec::new(),
            planned_testnet_order: None,
            testnet_activation_epoch: Some(1),
            devnet_activation_epoch: None,
            mainnet_activation_epoch: None,
            comms_required: None,
        };
        let value = serde_json::to_value(&record).expect("serialize");
        assert!(value.get("simds").is_some());
        assert!(value.get("testnet_activation_epoch").is_some());
        assert!(value.get("testnetActivationEpoch").is_none());
        assert!(value.get("simd").is_none());
    }
}
