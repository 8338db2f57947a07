use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};

use crate::store::schema::FeatureRecord;

fn epoch_cell(epoch: Option<u64>) -> String {
    epoch.map(|e| e.to_string()).unwrap_or_else(|| "-".to_string())
}

pub fn render_status_table(records: &[FeatureRecord]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Key", "Title", "SIMDs", "Devnet", "Testnet", "Mainnet",
    ]);

    for record in records {
        let mainnet_cell = match record.mainnet_activation_epoch {
            Some(epoch) => Cell::new(epoch.to_string()).fg(Color::Green),
            None => Cell::new("pending").fg(Color::Yellow),
        };
        table.add_row(Row::from(vec![
            Cell::new(&record.key),
            Cell::new(record.title.as_deref().unwrap_or("-")),
            Cell::new(record.simds.join(", ")),
            Cell::new(epoch_cell(record.devnet_activation_epoch)),
            Cell::new(epoch_cell(record.testnet_activation_epoch)),
            mainnet_cell,
        ]));
    }
    table.to_string()
}

pub fn render_discovered_table(records: &[FeatureRecord]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Key", "Title", "SIMDs", "Devnet", "Testnet"]);
    for record in records {
        table.add_row(vec![
            record.key.clone(),
            record.title.clone().unwrap_or_else(|| "-".to_string()),
            record.simds.join(", "),
            epoch_cell(record.devnet_activation_epoch),
            epoch_cell(record.testnet_activation_epoch),
        ]);
    }
    table.to_string()
}
