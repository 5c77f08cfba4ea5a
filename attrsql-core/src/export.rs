use serde::Serialize;

use crate::errors::TableResult;
use crate::table::RequirementTable;

pub const EXPORT_FILENAME: &str = "sql_output.csv";
pub const TEMPLATE_FILENAME: &str = "requirements_template.csv";
pub const CSV_MIME_TYPE: &str = "text/csv";

/// A downloadable CSV document.
#[derive(Debug, Clone, Serialize)]
pub struct CsvExport {
    pub filename: String,
    pub mime_type: String,
    pub content: String,
}

impl CsvExport {
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }
}

pub fn export_table(table: &RequirementTable) -> TableResult<CsvExport> {
    Ok(CsvExport {
        filename: EXPORT_FILENAME.to_string(),
        mime_type: CSV_MIME_TYPE.to_string(),
        content: table.to_csv_string()?,
    })
}

pub fn export_template() -> CsvExport {
    CsvExport {
        filename: TEMPLATE_FILENAME.to_string(),
        mime_type: CSV_MIME_TYPE.to_string(),
        content: RequirementTable::template_csv(),
    }
}
