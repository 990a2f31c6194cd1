//! Canonical cleaning transform.
//!
//! [`normalize`] is pure and total: any well-formed [`Table`] produces a
//! cleaned table. Steps run in a fixed order:
//!
//! 1. drop rows whose cells are all missing,
//! 2. trim leading/trailing whitespace of text cells,
//! 3. rename columns (trim, lowercase, spaces → `_`, collisions suffixed),
//! 4. replace remaining missing cells and non-finite numbers with the
//!    `NULL` literal.
//!
//! Blank text is not missing: a cell holding `"  "` survives step 1 and
//! becomes `""` in step 2.

use std::collections::HashSet;

use crate::models::{Cell, Table, NULL_MARKER};

pub fn normalize(mut table: Table) -> Table {
    table.retain_rows(|row| row.iter().any(|cell| !cell.is_missing()));
    table.map_cells(trim_cell);

    normalize_names(table.columns_mut());
    table.map_cells(fill_missing);
    table
}

fn trim_cell(cell: Cell) -> Cell {
    match cell {
        Cell::Text(s) => {
            let trimmed = s.trim();
            if trimmed.len() == s.len() {
                Cell::Text(s)
            } else {
                Cell::Text(trimmed.to_string())
            }
        }
        other => other,
    }
}

fn fill_missing(cell: Cell) -> Cell {
    match cell {
        Cell::Number(n) if !n.is_finite() => Cell::Text(NULL_MARKER.to_string()),
        other if other.is_missing() => Cell::Text(NULL_MARKER.to_string()),
        other => other,
    }
}

/// Lowercases, trims, and underscores column names in place.
///
/// A name that collides with an earlier one gets the first free suffix
/// `_2`, `_3`, …, so no column is ever dropped.
pub fn normalize_names(columns: &mut [String]) {
    let mut taken: HashSet<String> = HashSet::with_capacity(columns.len());

    for name in columns.iter_mut() {
        let base = normalize_name(name);
        let mut candidate = base.clone();
        let mut n = 2;
        while taken.contains(&candidate) {
            candidate = format!("{}_{}", base, n);
            n += 1;
        }
        taken.insert(candidate.clone());
        *name = candidate;
    }
}

pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: Vec<Vec<Cell>>) -> Table {
        Table::from_rows(columns.iter().map(|c| c.to_string()).collect(), rows).unwrap()
    }

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn sales_scenario() {
        let raw = table(
            &["Region", " Total Sales"],
            vec![
                vec![text("East"), Cell::Number(100.0)],
                vec![Cell::Missing, Cell::Missing],
                vec![text(" West "), Cell::Number(50.0)],
            ],
        );

        let cleaned = normalize(raw);
        assert_eq!(cleaned.columns(), &["region", "total_sales"]);
        assert_eq!(
            cleaned.rows(),
            &[
                vec![text("East"), Cell::Number(100.0)],
                vec![text("West"), Cell::Number(50.0)],
            ]
        );
    }

    #[test]
    fn row_with_one_value_is_kept_and_filled() {
        let cleaned = normalize(table(
            &["a", "b", "c"],
            vec![vec![Cell::Missing, text("x"), Cell::Number(f64::NAN)]],
        ));
        assert_eq!(cleaned.rows(), &[vec![text("NULL"), text("x"), text("NULL")]]);
    }

    #[test]
    fn infinities_become_null() {
        let cleaned = normalize(table(
            &["a", "b", "c"],
            vec![vec![
                Cell::Number(f64::INFINITY),
                Cell::Number(f64::NEG_INFINITY),
                Cell::Number(2.0),
            ]],
        ));
        assert_eq!(cleaned.row_count(), 1);
        assert_eq!(
            cleaned.rows()[0],
            vec![text("NULL"), text("NULL"), Cell::Number(2.0)]
        );
    }

    #[test]
    fn blank_text_is_not_missing() {
        let cleaned = normalize(table(&["a", "b"], vec![vec![text("   "), Cell::Missing]]));
        assert_eq!(cleaned.row_count(), 1);
        assert_eq!(cleaned.rows()[0], vec![text(""), text("NULL")]);
    }

    #[test]
    fn internal_whitespace_and_raw_cells_untouched() {
        let cleaned = normalize(table(
            &["a", "b"],
            vec![vec![text("  New   York "), Cell::Raw(" True ".into())]],
        ));
        assert_eq!(
            cleaned.rows()[0],
            vec![text("New   York"), Cell::Raw(" True ".into())]
        );
    }

    #[test]
    fn no_missing_cells_survive() {
        let cleaned = normalize(table(
            &["a", "b"],
            vec![
                vec![Cell::Missing, Cell::Number(1.0)],
                vec![Cell::Missing, Cell::Missing],
                vec![text("x"), Cell::Missing],
            ],
        ));
        assert_eq!(cleaned.row_count(), 2);
        assert!(cleaned.rows().iter().flatten().all(|c| !c.is_missing()));
    }

    #[test]
    fn names_are_lowercase_without_spaces() {
        let mut names = vec![
            "First Name".to_string(),
            " ZIP Code ".to_string(),
            "a  b".to_string(),
        ];
        normalize_names(&mut names);
        assert_eq!(names, vec!["first_name", "zip_code", "a__b"]);
        assert!(names
            .iter()
            .all(|n| !n.contains(' ') && *n == n.to_lowercase()));
    }

    #[test]
    fn colliding_names_get_suffixes() {
        let mut names = vec![
            "Total Sales".to_string(),
            "total_sales".to_string(),
            "TOTAL SALES".to_string(),
            "total_sales_2".to_string(),
        ];
        normalize_names(&mut names);
        assert_eq!(
            names,
            vec![
                "total_sales",
                "total_sales_2",
                "total_sales_3",
                "total_sales_2_2"
            ]
        );
    }

    #[test]
    fn deterministic() {
        let input = table(
            &["A b", "a B"],
            vec![vec![text(" 1 "), Cell::Missing], vec![Cell::Missing, Cell::Missing]],
        );
        assert_eq!(normalize(input.clone()), normalize(input));
    }

    #[test]
    fn zero_column_table_stays_empty() {
        let cleaned = normalize(Table::default());
        assert!(cleaned.columns().is_empty());
        assert_eq!(cleaned.row_count(), 0);
    }
}
