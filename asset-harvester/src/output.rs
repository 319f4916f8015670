use crate::types::PurchaseRecord;
use crate::utils::write_atomic;
use anyhow::Context;
use interfaces::{RecordFields, RecordSink, COMMON_EXPORT_FIELDS};
use serde_json::Value;
use std::path::Path;
use tracing::info;

/// Field mappings for exporters, with every common export field present (null when absent).
pub fn export_fields(records: &[PurchaseRecord]) -> Vec<RecordFields> {
    records
        .iter()
        .map(|record| {
            let mut fields = record.to_fields();
            for name in COMMON_EXPORT_FIELDS {
                fields.entry(name.to_string()).or_insert(Value::Null);
            }
            fields
        })
        .collect()
}

/// Writes records as one pretty-printed JSON array.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFileSink;

impl RecordSink for JsonFileSink {
    fn sink_name(&self) -> String {
        "json".to_string()
    }

    fn write_records(&self, records: &[RecordFields], destination: &Path) -> anyhow::Result<usize> {
        let bytes = serde_json::to_vec_pretty(records)?;
        write_atomic(destination, &bytes)
            .with_context(|| format!("writing records to {}", destination.display()))?;
        info!("Wrote {} records to {}", records.len(), destination.display());
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExtractionMethod, TransactionType};
    use rust_decimal::Decimal;

    #[test]
    fn deposits_export_null_fiat_fields() {
        let record = PurchaseRecord {
            transaction_type: TransactionType::Deposit,
            amount: Some(Decimal::new(5, 1)),
            item_name: "SOL".into(),
            total_spent: None,
            currency: None,
            vendor: "Binance".into(),
            purchase_date: "2024-03-01 00:00:00 UTC".into(),
            transaction_id: None,
            fee_amount: None,
            fee_currency: None,
            confidence: 0.95,
            extraction_method: ExtractionMethod::Regex,
            extraction_notes: None,
            asset_id: Some("solana".into()),
        };

        let fields = export_fields(&[record]);
        assert_eq!(fields[0]["total_spent"], Value::Null);
        assert_eq!(fields[0]["currency"], Value::Null);
        assert_eq!(fields[0]["transaction_type"], "deposit");

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        assert_eq!(JsonFileSink.write_records(&fields, &path).unwrap(), 1);
        let written: Vec<Value> = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written[0]["vendor"], "Binance");
    }
}
