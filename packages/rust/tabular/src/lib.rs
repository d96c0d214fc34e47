//! Tabular source extractor: one record per qualifying CSV/spreadsheet row.
//!
//! The file extension and filter condition are validated when the extractor
//! is built, so a bad configuration fails before any row is read.

pub mod table;

use kbimport_shared::{
    DocumentRecord, Extractor, ImportError, Result, RowFilter, SourceKind, TabularSourceConfig,
};
use tracing::{info, instrument};

pub use table::{Cell, MISSING, Table, TableFormat};

/// Title used when the configured title column does not exist.
const UNTITLED: &str = "Untitled";

/// Replacement for missing-value text in record bodies.
const MISSING_REPLACEMENT: &str = "-";

/// Extracts records from a CSV or Excel file.
#[derive(Debug, Clone)]
pub struct TabularExtractor {
    config: TabularSourceConfig,
    format: TableFormat,
    filter: Option<RowFilter>,
}

impl TabularExtractor {
    /// Validate the configuration without touching the file.
    pub fn new(config: TabularSourceConfig) -> Result<Self> {
        let format = TableFormat::from_path(&config.file_path)?;
        let filter = config.row_filter()?;
        Ok(Self {
            config,
            format,
            filter,
        })
    }

    /// Read the file and build one record per qualifying row.
    #[instrument(skip_all, fields(path = %self.config.file_path.display()))]
    pub fn extract_rows(&self) -> Result<Vec<DocumentRecord>> {
        let table = Table::load(&self.config.file_path, self.format)?;
        let records = self.records_from(&table)?;
        info!(
            rows = table.rows.len(),
            records = records.len(),
            "tabular extraction complete"
        );
        Ok(records)
    }

    /// Build records from an already loaded table.
    pub fn records_from(&self, table: &Table) -> Result<Vec<DocumentRecord>> {
        let filter = match &self.filter {
            Some(filter) => {
                let column = table.column(&filter.field).ok_or_else(|| {
                    ImportError::config(format!(
                        "filter field '{}' is not a column of {}",
                        filter.field,
                        self.config.file_path.display()
                    ))
                })?;
                Some((column, &filter.value))
            }
            None => None,
        };

        let entry = &self.config.entry_config;
        let title_column = entry.title_field.as_deref().and_then(|f| table.column(f));
        let name_column = entry.file_name_field.as_deref().and_then(|f| table.column(f));
        let content_columns: Vec<(&str, usize)> = self
            .config
            .content_fields
            .iter()
            .filter_map(|field| table.column(field).map(|i| (field.as_str(), i)))
            .collect();
        let metadata_columns: Vec<(&str, usize)> = entry
            .field_map
            .iter()
            .filter_map(|(column, key)| table.column(column).map(|i| (key.as_str(), i)))
            .collect();

        let mut records = Vec::new();

        for (index, row) in table.rows.iter().enumerate() {
            if let Some((column, value)) = filter {
                if !table.cell(row, column).equals(value) {
                    continue;
                }
            }

            let title = title_column
                .map(|i| table.cell(row, i).render())
                .unwrap_or_else(|| UNTITLED.to_string());

            let fields: Vec<String> = content_columns
                .iter()
                .map(|(field, i)| format!("\n\n{field}: {}", table.cell(row, *i).render()))
                .collect();
            let content = format!("{title}\n\n{}", fields.join(" "))
                .replace(MISSING, MISSING_REPLACEMENT);

            let file_name = name_column
                .map(|i| table.cell(row, i))
                .filter(|cell| !cell.is_empty())
                .map(Cell::render)
                .unwrap_or_else(|| format!("unknown_entry_{}", index + 1));

            let record = metadata_columns
                .iter()
                .fold(DocumentRecord::new(content, &file_name), |record, (key, i)| {
                    record.with_field(*key, table.cell(row, *i).to_json())
                });

            records.push(record);
        }

        Ok(records)
    }
}

impl Extractor for TabularExtractor {
    fn kind(&self) -> SourceKind {
        SourceKind::Tabular
    }

    async fn extract(&self) -> Result<Vec<DocumentRecord>> {
        self.extract_rows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    fn config_for(path: &Path, filter: Option<serde_json::Value>) -> TabularSourceConfig {
        let mut data = serde_json::json!({
            "file_path": path,
            "content_fields": ["Description", "Price"],
            "entry_config": {
                "title_field": "Name",
                "file_name_field": "Sku",
                "Category": "category"
            }
        });
        if let Some(filter) = filter {
            data["filter_condition"] = filter;
        }
        serde_json::from_value(data).expect("tabular config")
    }

    fn write_products(dir: &Path) -> PathBuf {
        let path = dir.join("products.csv");
        std::fs::write(
            &path,
            "Sku,Name,Description,Price,Category,Active\n\
             A-1,Lamp,Desk lamp,19.9,Home,yes\n\
             B/2,Chair,,45.0,Home,no\n\
             C:3,Table,Oak table,,Furniture,yes\n",
        )
        .expect("write csv");
        path
    }

    #[tokio::test]
    async fn filtered_csv_yields_matching_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_products(dir.path());
        let filter = serde_json::json!({"filter_field": "Active", "filter_value": "yes"});
        let extractor = TabularExtractor::new(config_for(&path, Some(filter))).unwrap();

        let records = extractor.extract().await.expect("extract");

        assert_eq!(records.len(), 2);
        for record in &records {
            assert!(record.date_imported().is_some());
            assert!(!record.content().contains("nan"));
        }
        assert_eq!(records[0].file_name(), "A-1");
        assert_eq!(records[1].file_name(), "C_3");
        assert!(records[1].content().contains("Price: -"));
    }

    #[test]
    fn content_layout_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_products(dir.path());
        let extractor = TabularExtractor::new(config_for(&path, None)).unwrap();

        let records = extractor.extract_rows().unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(
            records[0].content(),
            "Lamp\n\n\n\nDescription: Desk lamp \n\nPrice: 19.9"
        );
        assert_eq!(records[0].metadata()["category"], serde_json::json!("Home"));
        assert_eq!(records[1].file_name(), "B_2");
        assert!(records[1].content().contains("Description: -"));
    }

    #[test]
    fn spreadsheet_rows_render_whole_numbers() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures/xlsx/products.xlsx");

        let active = serde_json::json!({"filter_field": "Active", "filter_value": true});
        let extractor = TabularExtractor::new(config_for(&path, Some(active))).unwrap();
        let records = extractor.extract_rows().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].file_name(), "1001");
        assert_eq!(
            records[0].content(),
            "Lamp\n\n\n\nDescription: Desk lamp \n\nPrice: 45.0"
        );

        let by_sku = serde_json::json!({"filter_field": "Sku", "filter_value": 1002});
        let extractor = TabularExtractor::new(config_for(&path, Some(by_sku))).unwrap();
        let records = extractor.extract_rows().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].file_name(), "1002");
        assert!(records[0].content().contains("Description: -"));
    }

    #[test]
    fn missing_columns_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.csv");
        std::fs::write(&path, "Description\nfirst\nsecond\n").unwrap();
        let extractor = TabularExtractor::new(config_for(&path, None)).unwrap();

        let records = extractor.extract_rows().unwrap();

        assert_eq!(records.len(), 2);
        assert!(records[0].content().starts_with("Untitled\n\n"));
        assert_eq!(records[0].file_name(), "unknown_entry_1");
        assert_eq!(records[1].file_name(), "unknown_entry_2");
    }

    #[test]
    fn filter_is_type_sensitive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stock.csv");
        std::fs::write(&path, "Sku,Name,Stock\nx1,One,1\nx2,Two,2\n").unwrap();

        let as_text = serde_json::json!({"filter_field": "Stock", "filter_value": "1"});
        let extractor = TabularExtractor::new(config_for(&path, Some(as_text))).unwrap();
        assert!(extractor.extract_rows().unwrap().is_empty());

        let as_number = serde_json::json!({"filter_field": "Stock", "filter_value": 1});
        let extractor = TabularExtractor::new(config_for(&path, Some(as_number))).unwrap();
        let records = extractor.extract_rows().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].file_name(), "x1");
    }

    #[test]
    fn unsupported_extension_fails_before_reading() {
        // The file does not exist: the extension check must come first.
        let config = config_for(Path::new("/nonexistent/products.json"), None);
        let err = TabularExtractor::new(config).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn malformed_filter_fails_fast() {
        let filter = serde_json::json!({"filter_value": "yes"});
        let config = config_for(Path::new("/nonexistent/products.csv"), Some(filter));
        assert!(TabularExtractor::new(config).unwrap_err().is_config());
    }

    #[test]
    fn unknown_filter_column_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_products(dir.path());
        let filter = serde_json::json!({"filter_field": "Missing", "filter_value": "yes"});
        let extractor = TabularExtractor::new(config_for(&path, Some(filter))).unwrap();
        assert!(extractor.extract_rows().unwrap_err().is_config());
    }
}
