use std::io::Read;

use csv::{ReaderBuilder, Writer};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{TableError, TableResult};

pub const TARGET_OBJECT: &str = "TargetObject";
pub const TARGET_OBJECT_ATTRIBUTE: &str = "TargetObjectAttribute";
pub const CALCULATION_LOGIC: &str = "CalculationLogic";
pub const SQL_CONTEXT: &str = "SQLContext";
pub const SQL_OUTPUT: &str = "SQLOutput";

/// Header written by earlier exports of the tool; read back as [`SQL_OUTPUT`].
const LEGACY_SQL_OUTPUT: &str = "SQL Output";

/// Blank header cells are named `Unnamed: <position>`.
const UNNAMED_PREFIX: &str = "Unnamed: ";

/// Schema of a freshly created table.
pub const INPUT_COLUMNS: [&str; 4] = [
    TARGET_OBJECT,
    TARGET_OBJECT_ATTRIBUTE,
    CALCULATION_LOGIC,
    SQL_CONTEXT,
];

/// One business requirement: the four input fields, the generated SQL and any
/// additional columns carried over from an upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementRow {
    pub target_object: String,
    pub target_object_attribute: String,
    pub calculation_logic: String,
    pub sql_context: String,
    pub sql_output: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub extra: IndexMap<String, String>,
}

impl RequirementRow {
    pub fn new(
        target_object: impl Into<String>,
        target_object_attribute: impl Into<String>,
        calculation_logic: impl Into<String>,
        sql_context: impl Into<String>,
    ) -> Self {
        Self {
            target_object: target_object.into(),
            target_object_attribute: target_object_attribute.into(),
            calculation_logic: calculation_logic.into(),
            sql_context: sql_context.into(),
            sql_output: None,
            extra: IndexMap::new(),
        }
    }

    /// Cell value by column name. Unknown extra columns read as `None`.
    pub fn get(&self, column: &str) -> Option<&str> {
        match column {
            TARGET_OBJECT => Some(&self.target_object),
            TARGET_OBJECT_ATTRIBUTE => Some(&self.target_object_attribute),
            CALCULATION_LOGIC => Some(&self.calculation_logic),
            SQL_CONTEXT => Some(&self.sql_context),
            SQL_OUTPUT => self.sql_output.as_deref(),
            other => self.extra.get(other).map(String::as_str),
        }
    }

    fn set(&mut self, column: &str, value: String) {
        match column {
            TARGET_OBJECT => self.target_object = value,
            TARGET_OBJECT_ATTRIBUTE => self.target_object_attribute = value,
            CALCULATION_LOGIC => self.calculation_logic = value,
            SQL_CONTEXT => self.sql_context = value,
            SQL_OUTPUT => self.sql_output = Some(value).filter(|v| !v.is_empty()),
            other => {
                self.extra.insert(other.to_string(), value);
            }
        }
    }
}

/// In-memory requirement table.
///
/// `columns` is the schema in display/export order. Rows always carry the four
/// input fields even when the schema lacks them; serialization only writes the
/// columns in the schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementTable {
    columns: Vec<String>,
    rows: Vec<RequirementRow>,
}

impl Default for RequirementTable {
    fn default() -> Self {
        Self::empty()
    }
}

impl RequirementTable {
    /// Empty table with the four input columns as schema.
    pub fn empty() -> Self {
        Self {
            columns: INPUT_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn from_rows(rows: impl IntoIterator<Item = RequirementRow>) -> Self {
        let mut table = Self::empty();
        table.rows.extend(rows);
        if table.rows.iter().any(|row| row.sql_output.is_some()) {
            table.ensure_column(SQL_OUTPUT);
        }
        for key in table
            .rows
            .iter()
            .flat_map(|row| row.extra.keys().cloned())
            .collect::<Vec<_>>()
        {
            table.ensure_column(&key);
        }
        table
    }

    /// Parse uploaded CSV content. Malformed input is reported, never repaired.
    pub fn from_csv_bytes(bytes: &[u8]) -> TableResult<Self> {
        Self::from_csv_reader(bytes)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> TableResult<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        if headers.is_empty() {
            return Err(TableError::MissingHeader);
        }

        let mut columns: Vec<String> = Vec::with_capacity(headers.len());
        for (position, header) in headers.iter().enumerate() {
            let name = match header {
                LEGACY_SQL_OUTPUT => SQL_OUTPUT.to_string(),
                "" => format!("{}{}", UNNAMED_PREFIX, position),
                other => other.to_string(),
            };
            if columns.contains(&name) {
                return Err(TableError::DuplicateColumn(name));
            }
            columns.push(name);
        }

        // Short rows read as trailing empty cells; long rows are malformed.
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.len() > columns.len() {
                return Err(TableError::TooManyFields {
                    line: record.position().map(|p| p.line()).unwrap_or_default(),
                    found: record.len(),
                    expected: columns.len(),
                });
            }
            let mut row = RequirementRow::default();
            for (position, column) in columns.iter().enumerate() {
                row.set(column, record.get(position).unwrap_or_default().to_string());
            }
            rows.push(row);
        }

        debug!(
            columns = columns.len(),
            rows = rows.len(),
            "Loaded requirement table from CSV"
        );

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[RequirementRow] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&RequirementRow> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_output_column(&self) -> bool {
        self.columns.iter().any(|c| c == SQL_OUTPUT)
    }

    /// Append a row and return its index.
    pub fn push_row(&mut self, row: RequirementRow) -> usize {
        for key in row.extra.keys() {
            if !self.columns.iter().any(|c| c == key) {
                self.columns.push(key.clone());
            }
        }
        self.rows.push(row);
        self.rows.len() - 1
    }

    pub fn insert_row(&mut self, index: usize, row: RequirementRow) -> TableResult<()> {
        if index > self.rows.len() {
            return Err(TableError::RowOutOfRange {
                index,
                len: self.rows.len(),
            });
        }
        for key in row.extra.keys() {
            if !self.columns.iter().any(|c| c == key) {
                self.columns.push(key.clone());
            }
        }
        self.rows.insert(index, row);
        Ok(())
    }

    pub fn remove_row(&mut self, index: usize) -> TableResult<RequirementRow> {
        if index >= self.rows.len() {
            return Err(TableError::RowOutOfRange {
                index,
                len: self.rows.len(),
            });
        }
        Ok(self.rows.remove(index))
    }

    /// Update a single cell. Editing a column outside the schema adds it.
    pub fn edit(&mut self, index: usize, column: &str, value: impl Into<String>) -> TableResult<()> {
        if column.is_empty() {
            return Err(TableError::EmptyColumnName);
        }
        let len = self.rows.len();
        let row = self
            .rows
            .get_mut(index)
            .ok_or(TableError::RowOutOfRange { index, len })?;
        row.set(column, value.into());
        self.ensure_column(column);
        Ok(())
    }

    /// Write the generated SQL for one row; the output column joins the schema
    /// on first use.
    pub(crate) fn write_sql_output(&mut self, index: usize, sql: String) {
        if let Some(row) = self.rows.get_mut(index) {
            row.set(SQL_OUTPUT, sql);
            self.ensure_column(SQL_OUTPUT);
        }
    }

    fn ensure_column(&mut self, column: &str) {
        if !self.columns.iter().any(|c| c == column) {
            self.columns.push(column.to_string());
        }
    }

    /// Header line plus one record per row, standard CSV quoting.
    pub fn to_csv_string(&self) -> TableResult<String> {
        let mut wtr = Writer::from_writer(Vec::new());
        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(self.columns.iter().map(|c| row.get(c).unwrap_or("")))?;
        }
        let data = wtr
            .into_inner()
            .map_err(|e| TableError::Export(e.to_string()))?;
        String::from_utf8(data).map_err(|e| TableError::Export(e.to_string()))
    }

    /// Header-only CSV users can fill in and upload.
    pub fn template_csv() -> String {
        format!("{}\n", INPUT_COLUMNS.join(","))
    }
}
