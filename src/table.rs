//! In-memory table: ordered labelled columns plus an optional row index
//!
//! Columns carry a [`ColumnLabel`] holding one string per level (outer to inner).
//! Every column has the same number of values, and the index (when present) has
//! one entry per row on each of its levels.

use crate::error::{Result, SyncError};
use crate::types::CellValue;
use std::fmt;

/// Label given to a single unnamed index level when it becomes a column
pub const UNNAMED_INDEX_LABEL: &str = "index";

/// Prefix of the labels given to unnamed levels of a multi-level index
pub const UNNAMED_LEVEL_PREFIX: &str = "level_";

/// Whether `label` is one of the placeholders produced for unnamed index levels
pub fn is_index_placeholder(label: &str) -> bool {
    label == UNNAMED_INDEX_LABEL
        || label
            .strip_prefix(UNNAMED_LEVEL_PREFIX)
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Column label with one entry per header level
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnLabel(Vec<String>);

impl ColumnLabel {
    /// Single-level label
    pub fn single<S: Into<String>>(name: S) -> Self {
        ColumnLabel(vec![name.into()])
    }

    /// Multi-level label, outer level first
    pub fn multi<I, S>(levels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ColumnLabel(levels.into_iter().map(Into::into).collect())
    }

    pub fn levels(&self) -> &[String] {
        &self.0
    }

    pub fn nlevels(&self) -> usize {
        self.0.len()
    }

    /// Innermost level that is not empty
    pub fn last_non_empty(&self) -> Option<&str> {
        self.0.iter().rev().find(|s| !s.is_empty()).map(String::as_str)
    }

    /// Join the non-empty levels with `sep`
    pub fn flatten(&self, sep: &str) -> String {
        self.0
            .iter()
            .filter(|s| !s.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(sep)
    }

    /// Whether any level, or the space-joined label, equals `name`
    pub fn matches(&self, name: &str) -> bool {
        self.0.iter().any(|s| s == name) || self.flatten(" ") == name
    }
}

impl fmt::Display for ColumnLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [single] => f.write_str(single),
            levels => write!(f, "({})", levels.join(", ")),
        }
    }
}

impl From<&str> for ColumnLabel {
    fn from(s: &str) -> Self {
        ColumnLabel::single(s)
    }
}

impl From<String> for ColumnLabel {
    fn from(s: String) -> Self {
        ColumnLabel::single(s)
    }
}

/// A labelled column of values, optionally restricted to a set of categories
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    label: ColumnLabel,
    values: Vec<CellValue>,
    categories: Option<Vec<String>>,
}

impl Column {
    pub fn new<L: Into<ColumnLabel>>(label: L, values: Vec<CellValue>) -> Self {
        Column {
            label: label.into(),
            values,
            categories: None,
        }
    }

    /// Create a categorical column. Every non-null value must be one of `categories`.
    pub fn categorical<L: Into<ColumnLabel>>(
        label: L,
        values: Vec<CellValue>,
        categories: Vec<String>,
    ) -> Result<Self> {
        let column = Column {
            label: label.into(),
            values,
            categories: Some(categories),
        };
        for value in &column.values {
            column.check_category(value)?;
        }
        Ok(column)
    }

    pub fn label(&self) -> &ColumnLabel {
        &self.label
    }

    pub fn values(&self) -> &[CellValue] {
        &self.values
    }

    pub fn categories(&self) -> Option<&[String]> {
        self.categories.as_deref()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Add a category; no-op for non-categorical columns or known categories
    pub fn add_category(&mut self, category: &str) {
        if let Some(categories) = &mut self.categories {
            if !categories.iter().any(|c| c == category) {
                categories.push(category.to_string());
            }
        }
    }

    /// Replace the value at `row`, enforcing the category set
    pub fn set(&mut self, row: usize, value: CellValue) -> Result<()> {
        self.check_category(&value)?;
        let len = self.values.len();
        let slot = self.values.get_mut(row).ok_or_else(|| {
            SyncError::InvalidTable(format!("row {} out of bounds for {} rows", row, len))
        })?;
        *slot = value;
        Ok(())
    }

    fn push(&mut self, value: CellValue) -> Result<()> {
        self.check_category(&value)?;
        self.values.push(value);
        Ok(())
    }

    fn check_category(&self, value: &CellValue) -> Result<()> {
        let Some(categories) = &self.categories else {
            return Ok(());
        };
        if value.is_null() {
            return Ok(());
        }
        let text = value.as_string();
        if categories.iter().any(|c| *c == text) {
            Ok(())
        } else {
            Err(SyncError::InvalidTable(format!(
                "'{}' is not a category of column {}",
                text, self.label
            )))
        }
    }
}

/// One level of a row index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexLevel {
    pub name: Option<String>,
    pub values: Vec<CellValue>,
}

/// Row index with one or more levels
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    levels: Vec<IndexLevel>,
}

impl Index {
    /// Single-level index
    pub fn single(name: Option<&str>, values: Vec<CellValue>) -> Self {
        Index {
            levels: vec![IndexLevel {
                name: name.map(str::to_string),
                values,
            }],
        }
    }

    /// Multi-level index; every level must have the same length
    pub fn multi(levels: Vec<IndexLevel>) -> Result<Self> {
        if levels.is_empty() {
            return Err(SyncError::InvalidTable("index needs at least one level".into()));
        }
        let len = levels[0].values.len();
        if levels.iter().any(|l| l.values.len() != len) {
            return Err(SyncError::InvalidTable(
                "index levels have different lengths".into(),
            ));
        }
        Ok(Index { levels })
    }

    pub fn levels(&self) -> &[IndexLevel] {
        &self.levels
    }

    pub fn nlevels(&self) -> usize {
        self.levels.len()
    }

    pub fn len(&self) -> usize {
        self.levels.first().map_or(0, |l| l.values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Name of a single-level index
    pub fn name(&self) -> Option<&str> {
        match self.levels.as_slice() {
            [level] => level.name.as_deref(),
            _ => None,
        }
    }
}

/// Ordered collection of labelled columns with an optional index
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    index: Option<Index>,
}

impl Table {
    /// Build a table, checking that all columns have equal length
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if let Some(first) = columns.first() {
            if let Some(bad) = columns.iter().find(|c| c.len() != first.len()) {
                return Err(SyncError::InvalidTable(format!(
                    "column {} has {} values, expected {}",
                    bad.label,
                    bad.len(),
                    first.len()
                )));
            }
        }
        Ok(Table {
            columns,
            index: None,
        })
    }

    /// Build a table from row-major data and single-level labels
    pub fn from_rows<L, S>(labels: L, rows: Vec<Vec<CellValue>>) -> Result<Self>
    where
        L: IntoIterator<Item = S>,
        S: Into<ColumnLabel>,
    {
        let labels: Vec<ColumnLabel> = labels.into_iter().map(Into::into).collect();
        let mut columns: Vec<Column> = labels
            .into_iter()
            .map(|label| Column::new(label, Vec::with_capacity(rows.len())))
            .collect();
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != columns.len() {
                return Err(SyncError::InvalidTable(format!(
                    "row {} has {} values, expected {}",
                    i,
                    row.len(),
                    columns.len()
                )));
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.values.push(value);
            }
        }
        Table::new(columns)
    }

    /// Attach an index with one entry per row
    pub fn with_index(mut self, index: Index) -> Result<Self> {
        if index.len() != self.num_rows() {
            return Err(SyncError::InvalidTable(format!(
                "index has {} entries, table has {} rows",
                index.len(),
                self.num_rows()
            )));
        }
        self.index = Some(index);
        Ok(self)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, position: usize) -> Option<&Column> {
        self.columns.get(position)
    }

    pub fn column_mut(&mut self, position: usize) -> Option<&mut Column> {
        self.columns.get_mut(position)
    }

    /// First column whose label matches `name` (see [`ColumnLabel::matches`])
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.label.matches(name))
    }

    pub fn labels(&self) -> Vec<ColumnLabel> {
        self.columns.iter().map(|c| c.label.clone()).collect()
    }

    pub fn index(&self) -> Option<&Index> {
        self.index.as_ref()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        match (&self.index, self.columns.first()) {
            (_, Some(column)) => column.len(),
            (Some(index), None) => index.len(),
            (None, None) => 0,
        }
    }

    /// Number of label levels (1 for an empty table)
    pub fn label_levels(&self) -> usize {
        self.columns
            .iter()
            .map(|c| c.label.nlevels())
            .max()
            .unwrap_or(1)
    }

    /// Number of index levels, 0 without an index
    pub fn index_levels(&self) -> usize {
        self.index.as_ref().map_or(0, Index::nlevels)
    }

    /// Append a row to an unindexed table
    pub fn push_row(&mut self, values: Vec<CellValue>) -> Result<()> {
        if self.index.is_some() {
            return Err(SyncError::InvalidTable(
                "indexed tables need an index key, use push_indexed_row".into(),
            ));
        }
        self.push_values(values)
    }

    /// Append a row together with its index key (one value per index level)
    pub fn push_indexed_row(&mut self, key: Vec<CellValue>, values: Vec<CellValue>) -> Result<()> {
        let Some(index) = &self.index else {
            return Err(SyncError::InvalidTable("table has no index".into()));
        };
        if key.len() != index.nlevels() {
            return Err(SyncError::InvalidTable(format!(
                "index key has {} values, index has {} levels",
                key.len(),
                index.nlevels()
            )));
        }
        self.push_values(values)?;
        if let Some(index) = &mut self.index {
            for (level, value) in index.levels.iter_mut().zip(key) {
                level.values.push(value);
            }
        }
        Ok(())
    }

    fn push_values(&mut self, values: Vec<CellValue>) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(SyncError::InvalidTable(format!(
                "row has {} values, table has {} columns",
                values.len(),
                self.columns.len()
            )));
        }
        // validate categories before mutating anything
        for (column, value) in self.columns.iter().zip(&values) {
            column.check_category(value)?;
        }
        for (column, value) in self.columns.iter_mut().zip(values) {
            column.push(value)?;
        }
        Ok(())
    }

    /// Replace nulls with `fill`. Categorical columns get `fill` added to their
    /// categories first.
    pub fn fillna(&mut self, fill: &str) {
        for column in &mut self.columns {
            if !column.values.iter().any(CellValue::is_null) {
                continue;
            }
            column.add_category(fill);
            for value in &mut column.values {
                if value.is_null() {
                    *value = CellValue::String(fill.to_string());
                }
            }
        }
    }

    /// Move the index levels into leading columns.
    ///
    /// With multi-level column labels the index name goes in the top level and
    /// the lower levels are left blank. Unnamed levels get a placeholder label.
    pub fn reset_index(&mut self) {
        let Some(index) = self.index.take() else {
            return;
        };
        let label_levels = self.label_levels().max(1);
        let single = index.nlevels() == 1;

        let index_columns = index.levels.into_iter().enumerate().map(|(i, level)| {
            let name = level.name.unwrap_or_else(|| {
                if single {
                    UNNAMED_INDEX_LABEL.to_string()
                } else {
                    format!("{}{}", UNNAMED_LEVEL_PREFIX, i)
                }
            });
            let mut levels = vec![String::new(); label_levels];
            levels[0] = name;
            Column::new(ColumnLabel(levels), level.values)
        });

        self.columns.splice(0..0, index_columns);
    }

    /// Turn the column at `position` (0-based) into a single-level index.
    ///
    /// The index name is the innermost non-empty label level, or none.
    pub fn set_index(&mut self, position: usize) -> Result<()> {
        if position >= self.columns.len() {
            return Err(SyncError::InvalidTable(format!(
                "no column at position {}",
                position
            )));
        }
        let column = self.columns.remove(position);
        let name = column.label.last_non_empty().map(str::to_string);
        self.index = Some(Index {
            levels: vec![IndexLevel {
                name,
                values: column.values,
            }],
        });
        Ok(())
    }

    /// Drop the names of all index levels
    pub fn clear_index_names(&mut self) {
        if let Some(index) = &mut self.index {
            for level in &mut index.levels {
                level.name = None;
            }
        }
    }

    /// Values in row-major order
    pub fn to_rows(&self) -> Vec<Vec<CellValue>> {
        (0..self.num_rows())
            .map(|row| self.columns.iter().map(|c| c.values[row].clone()).collect())
            .collect()
    }

    /// Values of one row
    pub fn row(&self, row: usize) -> Option<Vec<CellValue>> {
        if row >= self.num_rows() {
            return None;
        }
        Some(self.columns.iter().map(|c| c.values[row].clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_rows(
            ["col1", "col2"],
            vec![
                vec![CellValue::Int(1), CellValue::Int(2)],
                vec![CellValue::Int(3), CellValue::Int(4)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_fillna_appended_null_row() {
        let mut table = sample();
        table.push_row(vec![CellValue::Null, CellValue::Null]).unwrap();
        table.fillna("n/a");
        assert_eq!(
            table.row(2).unwrap(),
            vec![CellValue::from("n/a"), CellValue::from("n/a")]
        );
        assert_eq!(table.row(0).unwrap(), vec![CellValue::Int(1), CellValue::Int(2)]);
    }

    #[test]
    fn test_fillna_replaces_nan() {
        let mut table = Table::from_rows(
            ["x"],
            vec![vec![CellValue::Float(f64::NAN)], vec![CellValue::Null]],
        )
        .unwrap();
        table.fillna("n/a");
        assert_eq!(
            table.column(0).unwrap().values(),
            [CellValue::from("n/a"), CellValue::from("n/a")]
        );
    }

    #[test]
    fn test_clear_index_names() {
        let mut table = sample();
        table.set_index(0).unwrap();
        assert_eq!(table.index().unwrap().levels()[0].name.as_deref(), Some("col1"));
        table.clear_index_names();
        assert_eq!(table.index().unwrap().levels()[0].name, None);
    }

    #[test]
    fn test_fillna_extends_categories() {
        let column = Column::categorical(
            "grade",
            vec![CellValue::from("a"), CellValue::Null],
            vec!["a".into(), "b".into()],
        )
        .unwrap();
        let mut table = Table::new(vec![column]).unwrap();
        table.fillna("n/a");

        let column = table.column(0).unwrap();
        assert_eq!(column.values()[1], CellValue::from("n/a"));
        assert_eq!(column.categories().unwrap(), ["a", "b", "n/a"]);
    }

    #[test]
    fn test_categorical_rejects_unknown_value() {
        let err = Column::categorical("c", vec![CellValue::from("z")], vec!["a".into()]);
        assert!(err.is_err());

        let mut column = Column::categorical("c", vec![CellValue::Null], vec!["a".into()]).unwrap();
        assert!(column.set(0, CellValue::from("b")).is_err());
        column.add_category("b");
        assert!(column.set(0, CellValue::from("b")).is_ok());
    }

    #[test]
    fn test_unequal_columns_rejected() {
        let columns = vec![
            Column::new("a", vec![CellValue::Int(1)]),
            Column::new("b", vec![]),
        ];
        assert!(matches!(Table::new(columns), Err(SyncError::InvalidTable(_))));
    }

    #[test]
    fn test_reset_index_multi_level_labels() {
        let columns = vec![
            Column::new(ColumnLabel::multi(["col1", "subcol1"]), vec![CellValue::Int(1)]),
            Column::new(ColumnLabel::multi(["col1", "subcol2"]), vec![CellValue::Int(2)]),
        ];
        let mut table = Table::new(columns)
            .unwrap()
            .with_index(Index::single(Some("test_index"), vec![CellValue::Int(0)]))
            .unwrap();
        table.reset_index();

        assert!(table.index().is_none());
        assert_eq!(table.labels()[0], ColumnLabel::multi(["test_index", ""]));
        assert_eq!(table.row(0).unwrap()[0], CellValue::Int(0));
    }

    #[test]
    fn test_reset_unnamed_index_placeholders() {
        let index = Index::multi(vec![
            IndexLevel {
                name: None,
                values: vec![CellValue::from("row1")],
            },
            IndexLevel {
                name: None,
                values: vec![CellValue::from("subrow1")],
            },
        ])
        .unwrap();
        let mut table = Table::from_rows(["a"], vec![vec![CellValue::Int(1)]])
            .unwrap()
            .with_index(index)
            .unwrap();
        table.reset_index();
        assert_eq!(table.labels()[0], ColumnLabel::single("level_0"));
        assert_eq!(table.labels()[1], ColumnLabel::single("level_1"));
        assert!(is_index_placeholder("level_1"));
        assert!(is_index_placeholder("index"));
        assert!(!is_index_placeholder("level_"));
        assert!(!is_index_placeholder("levels"));
    }

    #[test]
    fn test_set_index_uses_innermost_name() {
        let columns = vec![
            Column::new(ColumnLabel::multi(["col1", ""]), vec![CellValue::Int(1)]),
            Column::new(ColumnLabel::multi(["", "subcol1"]), vec![CellValue::Int(2)]),
        ];
        let mut table = Table::new(columns).unwrap();
        table.set_index(0).unwrap();
        assert_eq!(table.index().unwrap().name(), Some("col1"));
        assert_eq!(table.num_columns(), 1);

        let mut blank = Table::from_rows([""], vec![vec![CellValue::Int(1)]]).unwrap();
        blank.set_index(0).unwrap();
        assert_eq!(blank.index().unwrap().name(), None);
        assert!(blank.set_index(3).is_err());
    }

    #[test]
    fn test_push_indexed_row() {
        let mut table = sample()
            .with_index(Index::single(Some("id"), vec![CellValue::Int(10), CellValue::Int(11)]))
            .unwrap();
        assert!(table.push_row(vec![CellValue::Null, CellValue::Null]).is_err());
        table
            .push_indexed_row(vec![CellValue::Int(12)], vec![CellValue::Null, CellValue::Int(5)])
            .unwrap();
        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.index().unwrap().len(), 3);
    }

    #[test]
    fn test_column_label_helpers() {
        let label = ColumnLabel::multi(["col1", "", "leaf"]);
        assert_eq!(label.flatten(": "), "col1: leaf");
        assert_eq!(label.last_non_empty(), Some("leaf"));
        assert!(label.matches("col1"));
        assert!(label.matches("col1 leaf"));
        assert_eq!(label.to_string(), "(col1, , leaf)");
    }
}
