use crate::hierarchy::parent_options;
use crate::table::Table;
use crate::value::Value;

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum QueryError {
    #[error("Invalid filter column {column:?}")]
    UnknownColumn { column: String },
    #[error("Unknown parent or name value {parent:?}")]
    UnknownParent { parent: String },
    #[error("Dataset declares no name/parent hierarchy")]
    NoHierarchy,
}

/// Filter parameters for one query.
///
/// `level` bounds the ancestor depth for `include_parents` (0 = direct
/// children only). Parent sets and column filters are given in caller order;
/// [`QueryParams::cache_key`] canonicalizes them so set-equal parameter
/// lists share a cache entry.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParams {
    pub level: u32,
    pub include_parents: Vec<String>,
    pub exclude_parents: Vec<String>,
    pub column_filters: Vec<(String, String)>,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            level: 1,
            include_parents: Vec::new(),
            exclude_parents: Vec::new(),
            column_filters: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    dataset: String,
    level: u32,
    include_parents: Vec<String>,
    exclude_parents: Vec<String>,
    column_filters: Vec<(String, String)>,
}

impl QueryParams {
    pub fn cache_key(&self, dataset: &str) -> QueryKey {
        let mut include_parents = self.include_parents.clone();
        include_parents.sort();
        include_parents.dedup();
        let mut exclude_parents = self.exclude_parents.clone();
        exclude_parents.sort();
        exclude_parents.dedup();
        let mut column_filters = self.column_filters.clone();
        column_filters.sort();
        column_filters.dedup();
        QueryKey {
            dataset: dataset.to_string(),
            level: self.level,
            include_parents,
            exclude_parents,
            column_filters,
        }
    }
}

/// The filtered rows plus the category values for a selection control.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutput {
    pub table: Table,
    pub top_level_options: Option<Vec<String>>,
}

/// Run the filter pipeline over an augmented table.
///
/// Validation happens before any row is touched: include/exclude values
/// need the table to declare a hierarchy and must name either a parent
/// value or a row, and an unknown filter column rejects the whole query.
/// Filters only remove rows, so the survivors keep source order, and a row
/// reachable through several included parents appears once.
pub fn run(table: &Table, params: &QueryParams) -> Result<QueryOutput, QueryError> {
    let top_level_options = parent_options(table);
    let name_col = table.column_index("name");

    if !params.include_parents.is_empty() || !params.exclude_parents.is_empty() {
        let (Some(name_col), Some(known_parents)) = (name_col, top_level_options.as_deref())
        else {
            return Err(QueryError::NoHierarchy);
        };
        for value in params
            .include_parents
            .iter()
            .chain(&params.exclude_parents)
        {
            let is_name = table
                .rows
                .iter()
                .any(|row| row[name_col].to_string() == *value);
            if !known_parents.contains(value) && !is_name {
                return Err(QueryError::UnknownParent {
                    parent: value.clone(),
                });
            }
        }
    }
    let filter_cols: Vec<(usize, &str)> = params
        .column_filters
        .iter()
        .map(|(column, value)| {
            table
                .column_index(column)
                .map(|i| (i, value.as_str()))
                .ok_or_else(|| QueryError::UnknownColumn {
                    column: column.clone(),
                })
        })
        .collect::<Result<_, _>>()?;

    let include_cols: Vec<(&str, Option<usize>)> = params
        .include_parents
        .iter()
        .map(|p| (p.as_str(), table.column_index(p)))
        .collect();
    let exclude_cols: Vec<(&str, Option<usize>)> = params
        .exclude_parents
        .iter()
        .map(|p| (p.as_str(), table.column_index(p)))
        .collect();

    let rows: Vec<Vec<Value>> = table
        .rows
        .iter()
        .filter(|row| {
            if !include_cols.is_empty() {
                let included = include_cols.iter().any(|(parent, col)| {
                    let within_level = col
                        .and_then(|c| row[c].as_number())
                        .is_some_and(|depth| depth <= params.level as f64);
                    // A category header is never a member of its own set.
                    let is_self = name_col.is_some_and(|c| row[c].to_string() == *parent);
                    within_level && !is_self
                });
                if !included {
                    return false;
                }
            }
            // Excluding a value drops the named row itself along with every
            // descendant, even when the value never appears as a parent.
            if exclude_cols.iter().any(|(parent, col)| {
                name_col.is_some_and(|c| row[c].to_string() == *parent)
                    || col.is_some_and(|c| !row[c].is_missing())
            }) {
                return false;
            }
            filter_cols
                .iter()
                .all(|(col, value)| row[*col].matches(value))
        })
        .cloned()
        .collect();

    Ok(QueryOutput {
        table: Table {
            columns: table.columns.clone(),
            rows,
        },
        top_level_options,
    })
}
