use std::collections::{HashMap, HashSet, VecDeque};

use crate::table::Table;
use crate::value::Value;

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum HierarchyError {
    #[error("Parent value {value:?} clashes with an existing column")]
    ParentColumnClash { value: String },
}

/// Augment a table that declares a hierarchy with one synthetic column per
/// distinct parent value.
///
/// Requires both a `name` and a `parent` column; tables without them pass
/// through untouched. For each row the synthetic column of an ancestor holds
/// the ancestor depth (0 = direct parent) as a number; rows not descended
/// from that ancestor keep the cell missing.
///
/// A name listed in several rows accumulates several direct parents, so the
/// hierarchy is a DAG rather than a tree. Depths come from a breadth-first
/// walk over the parent map, visiting parents in source listing order, so a
/// multi-path ancestor gets its shortest, first-seen depth deterministically.
pub fn augment(mut table: Table) -> Result<Table, HierarchyError> {
    let (Some(name_col), Some(parent_col)) =
        (table.column_index("name"), table.column_index("parent"))
    else {
        return Ok(table);
    };

    // Distinct parent values in first-appearance order.
    let mut unique_parents: Vec<String> = Vec::new();
    let mut seen_parents: HashSet<String> = HashSet::new();
    for row in &table.rows {
        let parent = &row[parent_col];
        if parent.is_missing() {
            continue;
        }
        let parent = parent.to_string();
        if seen_parents.insert(parent.clone()) {
            unique_parents.push(parent);
        }
    }

    for parent in &unique_parents {
        if table.columns.iter().any(|c| c == parent) {
            return Err(HierarchyError::ParentColumnClash {
                value: parent.clone(),
            });
        }
    }

    // name value -> direct parents, in source row order.
    let mut parent_map: HashMap<String, Vec<String>> = HashMap::new();
    for row in &table.rows {
        let (name, parent) = (&row[name_col], &row[parent_col]);
        if name.is_missing() || parent.is_missing() {
            continue;
        }
        parent_map
            .entry(name.to_string())
            .or_default()
            .push(parent.to_string());
    }

    let base_len = table.columns.len();
    let synthetic_index: HashMap<&str, usize> = unique_parents
        .iter()
        .enumerate()
        .map(|(i, p)| (p.as_str(), base_len + i))
        .collect();
    table.columns.extend(unique_parents.iter().cloned());
    for row in &mut table.rows {
        row.resize(base_len + synthetic_index.len(), Value::Missing);
    }

    for row in &mut table.rows {
        let name = match &row[name_col] {
            Value::Missing => continue,
            name => name.to_string(),
        };
        for (depth, ancestor) in enumerate_ancestors(&name, &parent_map) {
            let col = synthetic_index[ancestor.as_str()];
            row[col] = Value::Number(depth as f64);
        }
    }

    Ok(table)
}

/// Every ancestor reachable from `name` with its first-seen depth
/// (0 = direct parent). The visited set is seeded with `name` itself, so a
/// cycle back to the starting row terminates and never assigns it a depth.
fn enumerate_ancestors(
    name: &str,
    parent_map: &HashMap<String, Vec<String>>,
) -> Vec<(u32, String)> {
    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(name.to_string());

    let mut out = Vec::new();
    let mut queue: VecDeque<(u32, &[String])> = VecDeque::new();
    if let Some(parents) = parent_map.get(name) {
        queue.push_back((0, parents.as_slice()));
    }
    while let Some((depth, parents)) = queue.pop_front() {
        for parent in parents {
            if !seen.insert(parent.clone()) {
                continue;
            }
            out.push((depth, parent.clone()));
            if let Some(grandparents) = parent_map.get(parent) {
                queue.push_back((depth + 1, grandparents.as_slice()));
            }
        }
    }
    out
}

/// The sorted, duplicate-free set of values ever used in the `parent`
/// column, independent of any filter. `None` when the table declares no
/// hierarchy.
pub fn parent_options(table: &Table) -> Option<Vec<String>> {
    let parent_col = table.column_index("parent")?;
    let mut options: Vec<String> = table
        .rows
        .iter()
        .map(|row| &row[parent_col])
        .filter(|v| !v.is_missing())
        .map(Value::to_string)
        .collect();
    options.sort();
    options.dedup();
    Some(options)
}
