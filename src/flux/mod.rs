// Query backend interface and result model

pub mod client;
pub(crate) mod csv;

pub use client::FluxClient;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned status {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("query failed: {0}")]
    Query(String),

    #[error("malformed result stream: {0}")]
    Decode(String),

    #[error("query canceled")]
    Canceled,
}

/// A request carrying literal query text. Identity and authorization
/// context live on the client, not the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub query: String,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }
}

/// The narrow seam to the query backend. The dashboard never talks to
/// the wire directly; everything goes through this trait, which keeps
/// the whole update pipeline runnable against an in-memory fake.
pub trait QueryService: Send + Sync {
    fn query(&self, request: &QueryRequest) -> Result<ResultCursor, QueryError>;
}

/// Declared type of a result column. A closed set: anything beyond the
/// three numeric types is `Other` and contributes no values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Long,
    UnsignedLong,
    Double,
    Other,
}

impl ColumnType {
    pub(crate) fn from_flux(datatype: &str) -> Self {
        match datatype {
            "long" => Self::Long,
            "unsignedLong" => Self::UnsignedLong,
            "double" => Self::Double,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    pub datatype: ColumnType,
}

/// Column contents in their declared representation. Non-numeric
/// columns keep their raw string form.
#[derive(Debug, Clone)]
pub enum ColumnValues {
    Longs(Vec<i64>),
    UnsignedLongs(Vec<u64>),
    Doubles(Vec<f64>),
    Raw(Vec<String>),
}

impl ColumnValues {
    fn datatype(&self) -> ColumnType {
        match self {
            Self::Longs(_) => ColumnType::Long,
            Self::UnsignedLongs(_) => ColumnType::UnsignedLong,
            Self::Doubles(_) => ColumnType::Double,
            Self::Raw(_) => ColumnType::Other,
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Longs(v) => v.len(),
            Self::UnsignedLongs(v) => v.len(),
            Self::Doubles(v) => v.len(),
            Self::Raw(v) => v.len(),
        }
    }
}

/// One grouped table of a query result: an ordered group key plus
/// columnar data addressed by column index.
#[derive(Debug, Clone, Default)]
pub struct Table {
    group_key: Vec<(String, String)>,
    columns: Vec<ColumnMeta>,
    data: Vec<ColumnValues>,
}

impl Table {
    pub fn new(group_key: Vec<(String, String)>) -> Self {
        Self {
            group_key,
            columns: Vec::new(),
            data: Vec::new(),
        }
    }

    pub fn push_column(&mut self, name: impl Into<String>, values: ColumnValues) {
        self.columns.push(ColumnMeta {
            name: name.into(),
            datatype: values.datatype(),
        });
        self.data.push(values);
    }

    /// Ordered name/value pairs every row of the table shares.
    pub fn group_key(&self) -> &[(String, String)] {
        &self.group_key
    }

    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column_type(&self, index: usize) -> ColumnType {
        self.columns
            .get(index)
            .map(|c| c.datatype)
            .unwrap_or(ColumnType::Other)
    }

    pub fn row_count(&self) -> usize {
        self.data.first().map(ColumnValues::len).unwrap_or(0)
    }

    /// Signed-integer contents of the column, empty unless it is
    /// long-typed. The other accessors behave the same way.
    pub fn longs(&self, index: usize) -> &[i64] {
        match self.data.get(index) {
            Some(ColumnValues::Longs(v)) => v,
            _ => &[],
        }
    }

    pub fn unsigned_longs(&self, index: usize) -> &[u64] {
        match self.data.get(index) {
            Some(ColumnValues::UnsignedLongs(v)) => v,
            _ => &[],
        }
    }

    pub fn doubles(&self, index: usize) -> &[f64] {
        match self.data.get(index) {
            Some(ColumnValues::Doubles(v)) => v,
            _ => &[],
        }
    }
}

/// One result of a query; a query may produce several.
#[derive(Debug, Clone, Default)]
pub struct FluxResult {
    pub tables: Vec<Table>,
}

/// Cursor over a query's results in the order the backend produced
/// them. The backend's terminal error is only known once the stream has
/// been walked, so it is reported by [`ResultCursor::finish`], not by
/// `next`.
#[derive(Debug)]
pub struct ResultCursor {
    results: std::vec::IntoIter<FluxResult>,
    terminal: Option<QueryError>,
    canceled: bool,
}

impl ResultCursor {
    pub fn new(results: Vec<FluxResult>, terminal: Option<QueryError>) -> Self {
        Self {
            results: results.into_iter(),
            terminal,
            canceled: false,
        }
    }

    pub fn next(&mut self) -> Option<FluxResult> {
        if self.canceled {
            return None;
        }
        self.results.next()
    }

    /// Stop yielding results. A canceled cursor finishes with
    /// [`QueryError::Canceled`].
    pub fn cancel(&mut self) {
        self.canceled = true;
    }

    pub fn finish(self) -> Result<(), QueryError> {
        if self.canceled {
            return Err(QueryError::Canceled);
        }
        match self.terminal {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        let mut table = Table::new(vec![("_field".to_string(), "usage".to_string())]);
        table.push_column("_value", ColumnValues::Doubles(vec![1.0, 2.0]));
        table.push_column("host", ColumnValues::Raw(vec!["a".into(), "b".into()]));
        table
    }

    #[test]
    fn typed_accessors_are_empty_on_type_mismatch() {
        let table = sample_table();
        let value_idx = table.column_index("_value").unwrap();
        assert_eq!(table.doubles(value_idx), &[1.0, 2.0]);
        assert!(table.longs(value_idx).is_empty());
        assert!(table.unsigned_longs(value_idx).is_empty());
    }

    #[test]
    fn row_count_follows_first_column() {
        assert_eq!(sample_table().row_count(), 2);
        assert_eq!(Table::new(Vec::new()).row_count(), 0);
    }

    #[test]
    fn canceled_cursor_yields_nothing_and_finishes_canceled() {
        let mut cursor = ResultCursor::new(vec![FluxResult::default()], None);
        cursor.cancel();
        assert!(cursor.next().is_none());
        assert!(matches!(cursor.finish(), Err(QueryError::Canceled)));
    }

    #[test]
    fn terminal_error_surfaces_after_exhaustion() {
        let mut cursor = ResultCursor::new(
            vec![FluxResult::default()],
            Some(QueryError::Query("boom".to_string())),
        );
        assert!(cursor.next().is_some());
        assert!(cursor.next().is_none());
        assert!(matches!(cursor.finish(), Err(QueryError::Query(msg)) if msg == "boom"));
    }
}
