pub mod cache;
pub mod engine;
pub mod hierarchy;
pub mod query;
pub mod table;
pub mod value;

use wasm_bindgen::prelude::*;

use query::QueryParams;
use table::Table;

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Parse a source passed as a string: tab-separated with a header when the
/// first line contains a tab, otherwise a plain newline-delimited list.
fn parse_source(source: &str) -> Result<Table, String> {
    let tabular = source.lines().next().is_some_and(|line| line.contains('\t'));
    if tabular {
        let table = Table::parse_tsv(source).map_err(|e| e.to_string())?;
        hierarchy::augment(table).map_err(|e| e.to_string())
    } else {
        Ok(Table::parse_list(source))
    }
}

fn params_from(
    level: Option<u32>,
    parents: Option<Vec<String>>,
    exclude_parents: Option<Vec<String>>,
) -> QueryParams {
    QueryParams {
        level: level.unwrap_or(1),
        include_parents: parents.unwrap_or_default(),
        exclude_parents: exclude_parents.unwrap_or_default(),
        column_filters: Vec::new(),
    }
}

/// Query a dataset source and return the surviving rows as TSV
#[wasm_bindgen(js_name = "queryTsv")]
pub fn query_tsv(
    source: &str,
    level: Option<u32>,
    parents: Option<Vec<String>>,
    exclude_parents: Option<Vec<String>>,
) -> Result<String, String> {
    let table = parse_source(source)?;
    let params = params_from(level, parents, exclude_parents);
    let output = query::run(&table, &params).map_err(|e| e.to_string())?;
    Ok(output.table.to_tsv())
}

/// Query a dataset source and return the surviving `name` cells, for games
/// that only need the entry list
#[wasm_bindgen(js_name = "queryEntries")]
pub fn query_entries(
    source: &str,
    level: Option<u32>,
    parents: Option<Vec<String>>,
    exclude_parents: Option<Vec<String>>,
) -> Result<js_sys::Array, String> {
    let table = parse_source(source)?;
    let params = params_from(level, parents, exclude_parents);
    let output = query::run(&table, &params).map_err(|e| e.to_string())?;
    let name_col = output.table.column_index("name").unwrap_or(0);
    let entries = js_sys::Array::new();
    for row in &output.table.rows {
        entries.push(&JsValue::from_str(&row[name_col].to_string()));
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_query_tsv_filters_source_string() {
        let source = "name\tparent\nEssex\t\nBoston\tEssex\nNewton\tEssex\n";
        let result = query_tsv(source, Some(0), Some(vec!["Essex".to_string()]), None).unwrap();
        assert_eq!(
            result,
            "name\tparent\tEssex\nBoston\tEssex\t0\nNewton\tEssex\t0\n"
        );
    }

    #[test]
    fn test_query_tsv_plain_list_passthrough() {
        let result = query_tsv("Alewife\nDavis\n", None, None, None).unwrap();
        assert_eq!(result, "name\nAlewife\nDavis\n");
    }

    #[test]
    fn test_query_tsv_unknown_parent_is_error() {
        let source = "name\tparent\nEssex\t\nBoston\tEssex\n";
        let err = query_tsv(source, None, Some(vec!["Atlantis".to_string()]), None).unwrap_err();
        assert!(err.contains("Atlantis"));
    }
}
