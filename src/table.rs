use crate::value::Value;

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ParseError {
    #[error("Malformed row {row}: expected {expected} fields, found {found}")]
    RowWidth {
        row: u64,
        expected: usize,
        found: usize,
    },
    #[error("Malformed input at row {row}: {message}")]
    Malformed { row: u64, message: String },
    #[error("Empty input: no header row")]
    EmptyInput,
}

/// An in-memory table: ordered column names plus rows of cells.
///
/// Invariant: every row has exactly `columns.len()` cells. Construction
/// enforces it; nothing mutates a table after the loader returns it.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Parse a tab-separated source with a header row naming the columns.
    pub fn parse_tsv(source: &str) -> Result<Self, ParseError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            // Headers and field counts are handled manually so errors carry
            // consistent row numbers.
            .has_headers(false)
            .flexible(true)
            .from_reader(source.as_bytes());

        let mut records = reader.records();
        let mut row: u64 = 1;

        let header = match records.next() {
            None => return Err(ParseError::EmptyInput),
            Some(Err(e)) => {
                return Err(ParseError::Malformed {
                    row,
                    message: e.to_string(),
                });
            }
            Some(Ok(record)) => record,
        };
        let columns: Vec<String> = header.iter().map(|f| f.trim().to_string()).collect();

        let mut rows = Vec::new();
        for record in records {
            row += 1;
            let record = record.map_err(|e| ParseError::Malformed {
                row,
                message: e.to_string(),
            })?;
            if record.len() != columns.len() {
                return Err(ParseError::RowWidth {
                    row,
                    expected: columns.len(),
                    found: record.len(),
                });
            }
            rows.push(record.iter().map(Value::parse).collect());
        }

        Ok(Self { columns, rows })
    }

    /// Parse a newline-delimited plain list (no header) into a
    /// single-column `name` table, so flat lists and tabular datasets look
    /// the same downstream.
    pub fn parse_list(source: &str) -> Self {
        let rows = source
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| vec![Value::parse(line)])
            .collect();
        Self {
            columns: vec!["name".to_string()],
            rows,
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cell(&self, row: usize, column: usize) -> &Value {
        &self.rows[row][column]
    }

    /// Render the table back to TSV, header row included. Missing cells
    /// render empty.
    pub fn to_tsv(&self) -> String {
        let mut out = self.columns.join("\t");
        out.push('\n');
        for row in &self.rows {
            let fields: Vec<String> = row.iter().map(Value::to_string).collect();
            out.push_str(&fields.join("\t"));
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_tsv() {
        let table = Table::parse_tsv("name\tpop\nBoston\t675647\nNewton\t88923\n").unwrap();
        assert_eq!(table.columns, vec!["name", "pop"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.cell(0, 0), &Value::Text("Boston".to_string()));
        assert_eq!(table.cell(1, 1), &Value::Number(88923.0));
    }

    #[test]
    fn test_parse_tsv_empty_cell_is_missing() {
        let table = Table::parse_tsv("name\tparent\nEssex\t\nBoston\tEssex\n").unwrap();
        assert_eq!(table.cell(0, 1), &Value::Missing);
        assert_eq!(table.cell(1, 1), &Value::Text("Essex".to_string()));
    }

    #[test]
    fn test_parse_tsv_rejects_ragged_row() {
        let err = Table::parse_tsv("name\tpop\nBoston\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::RowWidth {
                row: 2,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_parse_tsv_rejects_empty_input() {
        assert_eq!(Table::parse_tsv("").unwrap_err(), ParseError::EmptyInput);
    }

    #[test]
    fn test_parse_list() {
        let table = Table::parse_list("Alewife\n\n  Davis  \nPorter\n");
        assert_eq!(table.columns, vec!["name"]);
        assert_eq!(
            table.rows,
            vec![
                vec![Value::Text("Alewife".to_string())],
                vec![Value::Text("Davis".to_string())],
                vec![Value::Text("Porter".to_string())],
            ]
        );
    }

    #[test]
    fn test_to_tsv_round_trip() {
        let source = "name\tparent\nEssex\t\nBoston\tEssex\n";
        let table = Table::parse_tsv(source).unwrap();
        assert_eq!(table.to_tsv(), source);
    }
}
