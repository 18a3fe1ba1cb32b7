use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::domain::SourceKind;
use crate::error::AssembleError;

const MISSING_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>",
    "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl Cell {
    /// Missing values (empty or NA-like) normalize to zero; boolean literals
    /// count as indicator values.
    pub fn parse(raw: &str) -> Self {
        let value = raw.trim();
        if value.is_empty() || MISSING_MARKERS.contains(&value) {
            return Cell::Number(0.0);
        }
        match value {
            "True" | "true" | "TRUE" => return Cell::Number(1.0),
            "False" | "false" | "FALSE" => return Cell::Number(0.0),
            _ => {}
        }
        match value.parse::<f64>() {
            Ok(number) if number.is_finite() => Cell::Number(number),
            Ok(number) if number.is_nan() => Cell::Number(0.0),
            _ => Cell::Text(value.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(value) => Some(*value),
            Cell::Text(_) => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(value) => write!(f, "{value}"),
            Cell::Text(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Cell>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowCountMismatch {
    pub expected: usize,
    pub found: usize,
}

/// Column-major table; every column holds exactly `rows` cells.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawTable")]
pub struct Table {
    rows: usize,
    columns: Vec<Column>,
}

#[derive(Deserialize)]
struct RawTable {
    rows: usize,
    columns: Vec<Column>,
}

impl TryFrom<RawTable> for Table {
    type Error = String;

    fn try_from(raw: RawTable) -> Result<Self, Self::Error> {
        if let Some(column) = raw.columns.iter().find(|col| col.values.len() != raw.rows) {
            return Err(format!(
                "column {} has {} values, table has {} rows",
                column.name,
                column.values.len(),
                raw.rows
            ));
        }
        Ok(Self {
            rows: raw.rows,
            columns: raw.columns,
        })
    }
}

impl Table {
    pub fn new(rows: usize) -> Self {
        Self {
            rows,
            columns: Vec::new(),
        }
    }

    /// Reads a raw file of a delimited source using that source's delimiter.
    pub fn read_source(path: &Utf8Path, kind: SourceKind) -> Result<Self, AssembleError> {
        match kind.delimiter() {
            Some(delimiter) => Self::read_delimited(path, delimiter),
            None => Err(AssembleError::format(
                path,
                format!("{kind} files are not delimited tables"),
            )),
        }
    }

    pub fn read_delimited(path: &Utf8Path, delimiter: u8) -> Result<Self, AssembleError> {
        let file = File::open(path.as_std_path())
            .map_err(|err| AssembleError::Filesystem(format!("open {path}: {err}")))?;
        Self::from_reader(BufReader::new(file), delimiter).map_err(|message| AssembleError::Csv {
            path: path.to_string(),
            message,
        })
    }

    /// Header on the first line; rows shorter than the header are padded
    /// with zero, longer rows are rejected.
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self, String> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .has_headers(true)
            .from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(|err| err.to_string())?
            .iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        let mut columns = dedupe_names(headers)
            .into_iter()
            .map(|name| Column {
                name,
                values: Vec::new(),
            })
            .collect::<Vec<_>>();

        let mut rows = 0;
        for (index, record) in csv_reader.records().enumerate() {
            let record = record.map_err(|err| err.to_string())?;
            if record.len() > columns.len() {
                return Err(format!(
                    "row {} has {} fields, header has {}",
                    index + 1,
                    record.len(),
                    columns.len()
                ));
            }
            for (position, column) in columns.iter_mut().enumerate() {
                column
                    .values
                    .push(record.get(position).map(Cell::parse).unwrap_or(Cell::Number(0.0)));
            }
            rows += 1;
        }

        Ok(Self { rows, columns })
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|col| col.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|col| col.name == name)
    }

    pub fn push_column(&mut self, name: &str, values: Vec<Cell>) -> Result<(), RowCountMismatch> {
        if values.len() != self.rows {
            return Err(RowCountMismatch {
                expected: self.rows,
                found: values.len(),
            });
        }
        self.columns.push(Column {
            name: name.to_string(),
            values,
        });
        Ok(())
    }

    /// Appends or replaces a column holding `value` in every row.
    pub fn push_constant(&mut self, name: &str, value: Cell) {
        let values = vec![value; self.rows];
        match self.columns.iter_mut().find(|col| col.name == name) {
            Some(column) => column.values = values,
            None => self.columns.push(Column {
                name: name.to_string(),
                values,
            }),
        }
    }

    pub fn prefix_columns(&mut self, prefix: &str) {
        for column in &mut self.columns {
            column.name = format!("{prefix}_{}", column.name);
        }
    }

    /// Row-index aligned column-wise join; nothing is matched by value.
    /// Names present on both sides become `<name>_x` (kept) and `<name>_y` (joined).
    pub fn join_positional(&mut self, mut other: Table) -> Result<(), RowCountMismatch> {
        if other.rows != self.rows {
            return Err(RowCountMismatch {
                expected: self.rows,
                found: other.rows,
            });
        }
        for joined in &mut other.columns {
            if let Some(kept) = self.columns.iter_mut().find(|col| col.name == joined.name) {
                kept.name = format!("{}_x", kept.name);
                joined.name = format!("{}_y", joined.name);
            }
        }
        self.columns.extend(other.columns);
        Ok(())
    }

    /// Row-wise union. Columns keep first-seen order; cells a table lacks
    /// are filled with zero.
    pub fn concat<'a>(tables: impl IntoIterator<Item = &'a Table>) -> Table {
        let tables = tables.into_iter().collect::<Vec<_>>();
        let mut names: Vec<&str> = Vec::new();
        for table in &tables {
            for column in &table.columns {
                if !names.contains(&column.name.as_str()) {
                    names.push(&column.name);
                }
            }
        }

        let rows = tables.iter().map(|table| table.rows).sum();
        let columns = names
            .into_iter()
            .map(|name| {
                let mut values = Vec::with_capacity(rows);
                for table in &tables {
                    match table.column(name) {
                        Some(column) => values.extend(column.values.iter().cloned()),
                        None => values.extend(std::iter::repeat_n(Cell::Number(0.0), table.rows)),
                    }
                }
                Column {
                    name: name.to_string(),
                    values,
                }
            })
            .collect();

        Table { rows, columns }
    }

    /// Per-column count of numeric cells equal to `value`.
    pub fn count_equal(&self, value: f64) -> Vec<(String, usize)> {
        self.columns
            .iter()
            .map(|column| {
                let count = column
                    .values
                    .iter()
                    .filter(|cell| cell.as_f64() == Some(value))
                    .count();
                (column.name.clone(), count)
            })
            .collect()
    }

    pub fn write_csv(&self, path: &Utf8Path, delimiter: u8) -> Result<(), AssembleError> {
        let to_error = |err: csv::Error| AssembleError::Csv {
            path: path.to_string(),
            message: err.to_string(),
        };
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(path.as_std_path())
            .map_err(to_error)?;
        writer.write_record(self.column_names()).map_err(to_error)?;
        for row in 0..self.rows {
            let record = self.columns.iter().map(|col| {
                col.values
                    .get(row)
                    .map(Cell::to_string)
                    .unwrap_or_default()
            });
            writer.write_record(record).map_err(to_error)?;
        }
        writer
            .flush()
            .map_err(|err| AssembleError::Filesystem(format!("write {path}: {err}")))
    }
}

/// Repeated header names get `.1`, `.2`, ... suffixes so every column stays addressable.
fn dedupe_names(names: Vec<String>) -> Vec<String> {
    let mut seen = HashMap::<String, usize>::new();
    names
        .into_iter()
        .map(|name| {
            let count = seen.entry(name.clone()).or_insert(0);
            let unique = if *count == 0 {
                name
            } else {
                format!("{name}.{count}")
            };
            *count += 1;
            unique
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(text: &str, delimiter: u8) -> Table {
        Table::from_reader(text.as_bytes(), delimiter).unwrap()
    }

    #[test]
    fn missing_cells_become_zero() {
        let t = table("crawl;bend\n1;\n;NaN\n0;1\n", b';');
        assert_eq!(t.row_count(), 3);
        let bend = &t.column("bend").unwrap().values;
        assert_eq!(bend, &vec![Cell::Number(0.0), Cell::Number(0.0), Cell::Number(1.0)]);
        assert_eq!(t.column("crawl").unwrap().values[1], Cell::Number(0.0));
    }

    #[test]
    fn short_rows_are_padded_and_long_rows_rejected() {
        let t = table("a,b,c\n1,2\n", b',');
        assert_eq!(t.column("c").unwrap().values, vec![Cell::Number(0.0)]);

        let err = Table::from_reader("a,b\n1,2,3\n".as_bytes(), b',').unwrap_err();
        assert!(err.contains("3 fields"));
    }

    #[test]
    fn text_and_boolean_cells() {
        let t = table("state;flag\nrest;True\n", b';');
        assert_eq!(t.column("state").unwrap().values[0], Cell::from("rest"));
        assert_eq!(t.column("flag").unwrap().values[0], Cell::Number(1.0));
    }

    #[test]
    fn duplicate_headers_are_suffixed() {
        let t = table("x,x,x\n1,2,3\n", b',');
        assert_eq!(t.column_names(), vec!["x", "x.1", "x.2"]);
    }

    #[test]
    fn positional_join_keeps_order() {
        let mut left = table("Basin\n1\n2\n", b',');
        left.prefix_columns("A9");
        let mut right = table("Basin\n3\n4\n", b',');
        right.prefix_columns("B1");
        left.join_positional(right).unwrap();
        assert_eq!(left.column_names(), vec!["A9_Basin", "B1_Basin"]);
        assert_eq!(left.column("B1_Basin").unwrap().values[1], Cell::Number(4.0));
    }

    #[test]
    fn positional_join_row_mismatch() {
        let mut left = table("a\n1\n2\n", b',');
        let short = table("b\n1\n", b',');
        assert_eq!(
            left.join_positional(short),
            Err(RowCountMismatch {
                expected: 2,
                found: 1
            })
        );
        assert_eq!(left.column_names(), vec!["a"]);
    }

    #[test]
    fn positional_join_suffixes_shared_names() {
        let mut left = table("a,b\n1,2\n", b',');
        let right = table("c,a\n5,6\n", b',');
        left.join_positional(right).unwrap();
        assert_eq!(left.column_names(), vec!["a_x", "b", "c", "a_y"]);
        assert_eq!(left.column("a_x").unwrap().values, vec![Cell::Number(1.0)]);
        assert_eq!(left.column("a_y").unwrap().values, vec![Cell::Number(6.0)]);
    }

    #[test]
    fn time_files_are_not_delimited_tables() {
        let err = Table::read_source(Utf8Path::new("x/23-05-01L3-time-cl.txt"), SourceKind::Time)
            .unwrap_err();
        assert!(matches!(err, AssembleError::Format { .. }));
    }

    #[test]
    fn pandas_missing_markers() {
        let t = table("v\nn/a\n<NA>\n#NA\n-1.#IND\nNULL\n", b',');
        assert!(t.column("v").unwrap().values.iter().all(|v| *v == Cell::Number(0.0)));
    }

    #[test]
    fn deserialize_rejects_ragged_columns() {
        let json = r#"{"rows":3,"columns":[{"name":"time","values":[0.5]}]}"#;
        let err = serde_json::from_str::<Table>(json).unwrap_err();
        assert!(err.to_string().contains("has 1 values"));

        let json = r#"{"rows":1,"columns":[{"name":"time","values":[0.5]}]}"#;
        let table = serde_json::from_str::<Table>(json).unwrap();
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn concat_unions_columns() {
        let first = table("crawl;bend\n1;0\n", b';');
        let second = table("crawl;roll\n0;1\n1;1\n", b';');
        let all = Table::concat([&first, &second]);
        assert_eq!(all.row_count(), 3);
        assert_eq!(all.column_names(), vec!["crawl", "bend", "roll"]);
        assert_eq!(
            all.column("roll").unwrap().values,
            vec![Cell::Number(0.0), Cell::Number(1.0), Cell::Number(1.0)]
        );
        assert_eq!(
            all.count_equal(1.0),
            vec![
                ("crawl".to_string(), 2),
                ("bend".to_string(), 0),
                ("roll".to_string(), 2)
            ]
        );
    }

    #[test]
    fn constant_columns_fill_every_row() {
        let mut t = table("a\n1\n2\n", b',');
        t.push_constant("exp_id", Cell::from("cl"));
        assert_eq!(t.column("exp_id").unwrap().values, vec![Cell::from("cl"); 2]);
    }
}
