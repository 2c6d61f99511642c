// Flux annotated-CSV decoding

use super::{ColumnType, ColumnValues, FluxResult, QueryError, Table};

#[derive(Debug)]
pub(crate) struct DecodedResponse {
    pub results: Vec<FluxResult>,
    /// Error the backend reported in-stream, surfaced by the cursor
    /// after the results have been walked.
    pub terminal: Option<QueryError>,
}

/// Decode a response body in the annotated CSV dialect: `#datatype`,
/// `#group` and `#default` annotation rows precede each header, blank
/// lines separate result blocks, and the `table` column value delimits
/// tables within a block. An `error`/`reference` table becomes the
/// terminal error.
pub(crate) fn decode_response(body: &str) -> Result<DecodedResponse, QueryError> {
    let mut decoder = Decoder::default();
    for line in body.lines() {
        decoder.push_line(line)?;
        if decoder.terminal.is_some() {
            break;
        }
    }
    decoder.finish()
}

#[derive(Default)]
struct Decoder {
    groups: Vec<bool>,
    defaults: Vec<String>,
    datatypes: Vec<String>,
    columns: Vec<(String, ColumnType)>,
    error_table: bool,
    pending: Option<PendingTable>,
    current_table_id: String,
    tables: Vec<Table>,
    in_block: bool,
    results: Vec<FluxResult>,
    terminal: Option<QueryError>,
}

struct PendingTable {
    group_key: Vec<(String, String)>,
    rows: Vec<Vec<String>>,
}

impl Decoder {
    fn push_line(&mut self, line: &str) -> Result<(), QueryError> {
        if line.is_empty() {
            return self.flush_block();
        }

        if line.starts_with('#') {
            // A new annotation set after data means a new block began
            // without a separating blank line.
            if !self.columns.is_empty() {
                self.flush_block()?;
            }

            let mut fields = split_csv_line(line);
            let kind = std::mem::take(&mut fields[0]);
            match kind.as_str() {
                "#datatype" => self.datatypes = fields,
                "#group" => self.groups = fields.iter().map(|f| f == "true").collect(),
                "#default" => self.defaults = fields,
                // Unknown annotations are allowed by the dialect.
                _ => {}
            }
            return Ok(());
        }

        let fields = split_csv_line(line);

        if self.columns.is_empty() {
            self.columns = fields
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let datatype = self.datatypes.get(i).map(String::as_str).unwrap_or("");
                    (name.clone(), ColumnType::from_flux(datatype))
                })
                .collect();
            self.error_table = fields.iter().any(|name| name == "error");
            self.in_block = true;
            return Ok(());
        }

        if fields.len() != self.columns.len() {
            return Err(QueryError::Decode(format!(
                "row has {} fields, expected {}",
                fields.len(),
                self.columns.len()
            )));
        }

        let mut fields = fields;
        for (i, field) in fields.iter_mut().enumerate() {
            if field.is_empty() {
                if let Some(default) = self.defaults.get(i) {
                    if !default.is_empty() {
                        *field = default.clone();
                    }
                }
            }
        }

        if self.error_table {
            let message = self
                .columns
                .iter()
                .position(|(name, _)| name == "error")
                .map(|i| fields[i].clone())
                .unwrap_or_default();
            self.terminal = Some(QueryError::Query(message));
            return Ok(());
        }

        let table_id = self
            .columns
            .iter()
            .position(|(name, _)| name == "table")
            .map(|i| fields[i].clone())
            .unwrap_or_default();

        if self.pending.is_none() || self.current_table_id != table_id {
            self.finish_pending_table()?;
            self.pending = Some(PendingTable {
                group_key: self.group_key_from(&fields),
                rows: Vec::new(),
            });
            self.current_table_id = table_id;
        }

        if let Some(pending) = &mut self.pending {
            pending.rows.push(fields);
        }
        Ok(())
    }

    fn group_key_from(&self, fields: &[String]) -> Vec<(String, String)> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(i, (name, _))| {
                self.groups.get(*i).copied().unwrap_or(false)
                    && !name.is_empty()
                    && name != "result"
                    && name != "table"
            })
            .map(|(i, (name, _))| (name.clone(), fields[i].clone()))
            .collect()
    }

    fn finish_pending_table(&mut self) -> Result<(), QueryError> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };

        let mut table = Table::new(pending.group_key);
        for (i, (name, datatype)) in self.columns.iter().enumerate() {
            table.push_column(name.clone(), convert_column(&pending.rows, i, *datatype)?);
        }
        self.tables.push(table);
        Ok(())
    }

    fn flush_block(&mut self) -> Result<(), QueryError> {
        self.finish_pending_table()?;
        if self.in_block {
            self.results.push(FluxResult {
                tables: std::mem::take(&mut self.tables),
            });
        }
        self.groups.clear();
        self.defaults.clear();
        self.datatypes.clear();
        self.columns.clear();
        self.error_table = false;
        self.current_table_id.clear();
        self.in_block = false;
        Ok(())
    }

    fn finish(mut self) -> Result<DecodedResponse, QueryError> {
        self.flush_block()?;
        Ok(DecodedResponse {
            results: self.results,
            terminal: self.terminal,
        })
    }
}

fn convert_column(
    rows: &[Vec<String>],
    index: usize,
    datatype: ColumnType,
) -> Result<ColumnValues, QueryError> {
    match datatype {
        ColumnType::Long => rows
            .iter()
            .map(|row| parse_numeric::<i64>(&row[index], "long"))
            .collect::<Result<Vec<_>, _>>()
            .map(ColumnValues::Longs),
        ColumnType::UnsignedLong => rows
            .iter()
            .map(|row| parse_numeric::<u64>(&row[index], "unsignedLong"))
            .collect::<Result<Vec<_>, _>>()
            .map(ColumnValues::UnsignedLongs),
        ColumnType::Double => rows
            .iter()
            .map(|row| parse_numeric::<f64>(&row[index], "double"))
            .collect::<Result<Vec<_>, _>>()
            .map(ColumnValues::Doubles),
        ColumnType::Other => Ok(ColumnValues::Raw(
            rows.iter().map(|row| row[index].clone()).collect(),
        )),
    }
}

fn parse_numeric<T>(field: &str, datatype: &str) -> Result<T, QueryError>
where
    T: std::str::FromStr + Default,
{
    // Null cells decode as the zero value rather than failing the row.
    if field.is_empty() {
        return Ok(T::default());
    }
    field
        .parse()
        .map_err(|_| QueryError::Decode(format!("invalid {datatype} value {field:?}")))
}

/// Split one CSV line into fields, honoring quoted fields with doubled
/// quotes.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => fields.push(std::mem::take(&mut field)),
                _ => field.push(c),
            }
        }
    }
    fields.push(field);
    fields
}
