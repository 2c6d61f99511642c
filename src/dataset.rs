// Extraction of numeric series from query result tables

use crate::flux::{ColumnType, Table};

/// The extracted series for one grouped table of one widget's query: a
/// display title plus the numeric values, one per row in row order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    pub title: String,
    pub values: Vec<i64>,
}

impl Dataset {
    /// Build a Dataset from one table. The title is the group-key
    /// values comma-joined and newline-terminated. When the target
    /// column is absent the Dataset still carries the title with no
    /// values, so the group stays visible with an empty chart; a
    /// non-numeric declared type yields no values the same way.
    pub fn from_table(table: &Table, column: &str) -> Self {
        let title = format_title(table);
        let mut values = Vec::new();

        if let Some(index) = table.column_index(column) {
            match table.column_type(index) {
                ColumnType::Long => values.extend_from_slice(table.longs(index)),
                ColumnType::UnsignedLong => {
                    values.extend(table.unsigned_longs(index).iter().map(|&v| v as i64));
                }
                ColumnType::Double => {
                    values.extend(table.doubles(index).iter().map(|&v| v.trunc() as i64));
                }
                ColumnType::Other => {}
            }
        }

        Self { title, values }
    }
}

fn format_title(table: &Table) -> String {
    let mut title = table
        .group_key()
        .iter()
        .map(|(_, value)| value.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    title.push('\n');
    title
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flux::ColumnValues;

    fn table_with(column: &str, values: ColumnValues) -> Table {
        let mut table = Table::new(vec![
            ("_field".to_string(), "usage_user".to_string()),
            ("_measurement".to_string(), "cpu".to_string()),
        ]);
        table.push_column(column, values);
        table
    }

    #[test]
    fn title_is_group_key_values_comma_joined_newline_terminated() {
        let table = table_with("_value", ColumnValues::Longs(vec![1]));
        let dataset = Dataset::from_table(&table, "_value");
        assert_eq!(dataset.title, "usage_user, cpu\n");
    }

    #[test]
    fn one_value_per_row_in_row_order() {
        let table = table_with("_value", ColumnValues::Longs(vec![3, 1, 2]));
        let dataset = Dataset::from_table(&table, "_value");
        assert_eq!(dataset.values, vec![3, 1, 2]);
    }

    #[test]
    fn doubles_truncate_toward_zero() {
        let table = table_with("_value", ColumnValues::Doubles(vec![2.9, -2.9, 0.4]));
        let dataset = Dataset::from_table(&table, "_value");
        assert_eq!(dataset.values, vec![2, -2, 0]);
    }

    #[test]
    fn unsigned_longs_are_reinterpreted() {
        let table = table_with("_value", ColumnValues::UnsignedLongs(vec![5, 10]));
        let dataset = Dataset::from_table(&table, "_value");
        assert_eq!(dataset.values, vec![5, 10]);
    }

    #[test]
    fn absent_column_keeps_title_with_empty_values() {
        let table = table_with("_value", ColumnValues::Longs(vec![1, 2]));
        let dataset = Dataset::from_table(&table, "no_such_column");
        assert_eq!(dataset.title, "usage_user, cpu\n");
        assert!(dataset.values.is_empty());
    }

    #[test]
    fn non_numeric_declared_type_yields_no_values() {
        let table = table_with(
            "_value",
            ColumnValues::Raw(vec!["up".to_string(), "down".to_string()]),
        );
        let dataset = Dataset::from_table(&table, "_value");
        assert_eq!(dataset.title, "usage_user, cpu\n");
        assert!(dataset.values.is_empty());
    }

    #[test]
    fn empty_group_key_still_terminates_title() {
        let mut table = Table::new(Vec::new());
        table.push_column("_value", ColumnValues::Longs(vec![1]));
        let dataset = Dataset::from_table(&table, "_value");
        assert_eq!(dataset.title, "\n");
    }
}
