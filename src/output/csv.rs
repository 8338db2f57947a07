use anyhow::Result;

use crate::store::schema::FeatureRecord;

pub fn status_to_csv(records: &[FeatureRecord]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "key",
        "title",
        "simds",
        "devnet_activation_epoch",
        "testnet_activation_epoch",
        "mainnet_activation_epoch",
        "owners",
    ])?;
    for record in records {
        writer.write_record([
            record.key.clone(),
            record.title.clone().unwrap_or_default(),
            record.simds.join(";"),
            record
                .devnet_activation_epoch
                .map(|e| e.to_string())
                .unwrap_or_default(),
            record
                .testnet_activation_epoch
                .map(|e| e.to_string())
                .unwrap_or_default(),
            record
                .mainnet_activation_epoch
                .map(|e| e.to_string())
                .unwrap_or_default(),
            record.owners.join(";"),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

#[cfg(test)]
mod tests {
    use super::status_to_csv;
    use crate::store::schema::FeatureRecord;

    #[test]
    fn renders_header_and_rows() {
        let record = FeatureRecord {
            key: "K1".to_string(),
            title: Some("Gate".to_string()),
            description: None,
            simds: vec!["0001".to_string(), "0002".to_string()],
            simd_links: Vec::new(),
            owners: Vec::new(),
            min_agave_versions: Vec::new(),
            min_fd_versions: Vec::new(),
            min_jito_versions: Vec::new(),
            planned_testnet_order: None,
            testnet_activation_epoch: None,
            devnet_activation_epoch: Some(9),
            mainnet_activation_epoch: None,
            comms_required: None,
        };
        let rendered = status_to_csv(&[record]).expect("csv");
        let mut lines = rendered.lines();
        assert!(lines.next().expect("header").starts_with("key,title"));
        assert_eq!(lines.next().expect("row"), "K1,Gate,0001;0002,9,,,");
    }
}
