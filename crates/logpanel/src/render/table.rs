//! Table-shaped values rendered as an HTML `dataframe` table.

use serde_json::Value;

use crate::error::RenderError;
use crate::html::escape_html;

/// One table cell.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }

    /// Display text for the cell. `precision` fixes the number of decimals
    /// for every numeric cell.
    pub fn render(&self, precision: Option<usize>) -> String {
        match (self, precision) {
            (Self::Null, _) => "NaN".to_string(),
            (Self::Bool(true), _) => "True".to_string(),
            (Self::Bool(false), _) => "False".to_string(),
            (Self::Int(i), Some(p)) => format!("{:.p$}", *i as f64),
            (Self::Int(i), None) => i.to_string(),
            (Self::Float(f), _) if f.is_nan() => "NaN".to_string(),
            (Self::Float(f), _) if f.is_infinite() => {
                let sign = if *f > 0.0 { "" } else { "-" };
                format!("{sign}inf")
            }
            (Self::Float(f), Some(p)) => format!("{f:.p$}"),
            (Self::Float(f), None) if f.fract() == 0.0 => format!("{f:.1}"),
            (Self::Float(f), None) => f.to_string(),
            (Self::Text(s), _) => s.clone(),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Cell {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Cell {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for Cell {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Rendering switches for [`Table::to_html`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TableOptions {
    /// Show the header row. Default: `true`.
    pub header: bool,
    /// Show the index column. Default: `true`.
    pub index: bool,
    /// Round numeric cells to this many decimals. Default: `None`.
    pub precision: Option<usize>,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            header: true,
            index: true,
            precision: None,
        }
    }
}

/// A rectangular table with named columns and an index label per row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub index: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Append a row labelled with its position. Short rows are padded with
    /// nulls, long rows truncated.
    pub fn push_row(&mut self, cells: impl IntoIterator<Item = Cell>) {
        let label = self.rows.len().to_string();
        self.push_labelled_row(label, cells);
    }

    pub fn push_labelled_row(
        &mut self,
        label: impl Into<String>,
        cells: impl IntoIterator<Item = Cell>,
    ) {
        let mut row: Vec<Cell> = cells.into_iter().take(self.columns.len()).collect();
        row.resize(self.columns.len(), Cell::Null);
        self.index.push(label.into());
        self.rows.push(row);
    }

    /// Build a table from any of the usual JSON shapes:
    ///
    /// - an array of records (`[{"a": 1}, {"a": 2, "b": 3}]`),
    /// - an array of rows (`[[1, 2], [3, 4]]`) or of scalars,
    /// - an object of columns (`{"a": [1, 2]}`),
    /// - an object of index-keyed columns (`{"a": {"x": 1}}`).
    pub fn from_json(value: &Value) -> Result<Self, RenderError> {
        match value {
            Value::Array(items) if items.iter().all(Value::is_object) => {
                let mut columns: Vec<String> = Vec::new();
                for item in items.iter().filter_map(Value::as_object) {
                    for key in item.keys() {
                        if !columns.contains(key) {
                            columns.push(key.clone());
                        }
                    }
                }
                let mut table = Self::new(columns.clone());
                for item in items.iter().filter_map(Value::as_object) {
                    table.push_row(
                        columns
                            .iter()
                            .map(|c| item.get(c).map_or(Cell::Null, Cell::from_json)),
                    );
                }
                Ok(table)
            }
            Value::Array(items) if items.iter().all(Value::is_array) => {
                let width = items
                    .iter()
                    .filter_map(Value::as_array)
                    .map(Vec::len)
                    .max()
                    .unwrap_or(0);
                let mut table = Self::new((0..width).map(|i| i.to_string()));
                for row in items.iter().filter_map(Value::as_array) {
                    table.push_row(row.iter().map(Cell::from_json));
                }
                Ok(table)
            }
            Value::Array(items) => {
                if items.iter().any(|v| v.is_array() || v.is_object()) {
                    return Err(RenderError::Table(
                        "array mixes nested and scalar values".into(),
                    ));
                }
                let mut table = Self::new(["0"]);
                for item in items {
                    table.push_row([Cell::from_json(item)]);
                }
                Ok(table)
            }
            Value::Object(map) if map.values().all(Value::is_array) => {
                let lengths: Vec<usize> = map
                    .values()
                    .filter_map(Value::as_array)
                    .map(Vec::len)
                    .collect();
                let rows = lengths.first().copied().unwrap_or(0);
                if lengths.iter().any(|&l| l != rows) {
                    return Err(RenderError::Table("columns have different lengths".into()));
                }
                let mut table = Self::new(map.keys().cloned());
                for r in 0..rows {
                    table.push_row(
                        map.values()
                            .filter_map(Value::as_array)
                            .map(|col| Cell::from_json(&col[r])),
                    );
                }
                Ok(table)
            }
            Value::Object(map) if map.values().all(Value::is_object) => {
                let mut labels: Vec<String> = Vec::new();
                for column in map.values().filter_map(Value::as_object) {
                    for key in column.keys() {
                        if !labels.contains(key) {
                            labels.push(key.clone());
                        }
                    }
                }
                let mut table = Self::new(map.keys().cloned());
                for label in labels {
                    let cells: Vec<Cell> = map
                        .values()
                        .filter_map(Value::as_object)
                        .map(|col| col.get(&label).map_or(Cell::Null, Cell::from_json))
                        .collect();
                    table.push_labelled_row(label, cells);
                }
                Ok(table)
            }
            Value::Object(_) => Err(RenderError::Table(
                "an object of scalar values has no index".into(),
            )),
            other => Err(RenderError::Table(format!("expected an array or object, got {other}"))),
        }
    }

    /// Render as an HTML table in the `dataframe` layout.
    pub fn to_html(&self, opts: &TableOptions) -> String {
        let mut html = String::from("<table border=\"1\" class=\"dataframe\">\n");

        if opts.header {
            html.push_str("  <thead>\n    <tr style=\"text-align: right;\">\n");
            if opts.index {
                html.push_str("      <th></th>\n");
            }
            for column in &self.columns {
                html.push_str(&format!("      <th>{}</th>\n", escape_html(column)));
            }
            html.push_str("    </tr>\n  </thead>\n");
        }

        html.push_str("  <tbody>\n");
        for (label, row) in self.index.iter().zip(&self.rows) {
            html.push_str("    <tr>\n");
            if opts.index {
                html.push_str(&format!("      <th>{}</th>\n", escape_html(label)));
            }
            for cell in row {
                html.push_str(&format!(
                    "      <td>{}</td>\n",
                    escape_html(&cell.render(opts.precision))
                ));
            }
            html.push_str("    </tr>\n");
        }
        html.push_str("  </tbody>\n</table>");
        html
    }
}
