//! Query request and response payloads.

use super::entity::FetchOptions;
use super::Payload;
use crate::exception::{TgException, TgResult};
use crate::protocol::model::EntityStream;
use crate::protocol::stream::{InputStream, OutputStream};

/// Query command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum QueryCommand {
    /// Plan a query and keep it for later execution
    #[default]
    Create = 1,
    /// Plan and run a query
    Execute = 2,
    /// Run a Gremlin traversal
    ExecuteGremlin = 3,
    /// Run a Gremlin traversal and return its string form
    ExecuteGremlinStr = 4,
    /// Run a previously planned query by hash id
    ExecuteId = 5,
    /// Release a previously planned query
    Close = 6,
}

impl QueryCommand {
    /// Decode from the wire value.
    pub fn from_i32(value: i32) -> TgResult<Self> {
        match value {
            1 => Ok(QueryCommand::Create),
            2 => Ok(QueryCommand::Execute),
            3 => Ok(QueryCommand::ExecuteGremlin),
            4 => Ok(QueryCommand::ExecuteGremlinStr),
            5 => Ok(QueryCommand::ExecuteId),
            6 => Ok(QueryCommand::Close),
            other => Err(TgException::io(format!("Invalid query command {}", other))),
        }
    }

    /// Whether the command refers to a planned query by hash id.
    pub fn uses_hash_id(self) -> bool {
        matches!(self, QueryCommand::ExecuteId | QueryCommand::Close)
    }
}

/// Result ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec {
    /// Attribute to sort by
    pub attribute: String,
    /// Descending order
    pub descending: bool,
    /// Maximum number of sorted results
    pub limit: i32,
}

impl SortSpec {
    /// Ascending sort on an attribute with no limit.
    pub fn ascending(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            descending: false,
            limit: 0,
        }
    }

    /// Descending sort on an attribute with no limit.
    pub fn descending(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            descending: true,
            limit: 0,
        }
    }

    /// Cap the number of sorted results.
    pub fn with_limit(mut self, limit: i32) -> Self {
        self.limit = limit;
        self
    }
}

/// Query request.
///
/// Wire layout: `i32 sub-length | i32 checksum | i32 command | fetch options |
/// sort block`, then either four marker-prefixed clauses or an `i64` query
/// hash id depending on the command. The sub-length counts from its own start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryRequest {
    /// Command
    pub command: QueryCommand,
    /// Paging and traversal limits
    pub fetch: FetchOptions,
    /// Optional ordering
    pub sort: Option<SortSpec>,
    /// Query expression
    pub query_expr: Option<String>,
    /// Edge filter
    pub edge_filter: Option<String>,
    /// Traversal condition
    pub traversal_condition: Option<String>,
    /// End condition
    pub end_condition: Option<String>,
    /// Hash id of a planned query
    pub query_hash_id: i64,
}

impl QueryRequest {
    /// Request carrying a query expression.
    pub fn new(command: QueryCommand, query_expr: impl Into<String>) -> Self {
        Self {
            command,
            query_expr: Some(query_expr.into()),
            ..Self::default()
        }
    }

    /// Plan and run a query.
    pub fn execute(query_expr: impl Into<String>) -> Self {
        Self::new(QueryCommand::Execute, query_expr)
    }

    /// Run a Gremlin traversal.
    pub fn gremlin(query_expr: impl Into<String>) -> Self {
        Self::new(QueryCommand::ExecuteGremlin, query_expr)
    }

    /// Run a planned query.
    pub fn execute_id(query_hash_id: i64) -> Self {
        Self {
            command: QueryCommand::ExecuteId,
            query_hash_id,
            ..Self::default()
        }
    }

    /// Release a planned query.
    pub fn close(query_hash_id: i64) -> Self {
        Self {
            command: QueryCommand::Close,
            query_hash_id,
            ..Self::default()
        }
    }

    /// Set the fetch options.
    pub fn with_fetch(mut self, fetch: FetchOptions) -> Self {
        self.fetch = fetch;
        self
    }

    /// Set the ordering.
    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Set the edge filter.
    pub fn with_edge_filter(mut self, filter: impl Into<String>) -> Self {
        self.edge_filter = Some(filter.into());
        self
    }

    /// Set the traversal condition.
    pub fn with_traversal_condition(mut self, condition: impl Into<String>) -> Self {
        self.traversal_condition = Some(condition.into());
        self
    }

    /// Set the end condition.
    pub fn with_end_condition(mut self, condition: impl Into<String>) -> Self {
        self.end_condition = Some(condition.into());
        self
    }
}

impl Payload for QueryRequest {
    fn write_payload(&self, out: &mut OutputStream) -> TgResult<()> {
        let start = out.position();
        out.write_i32(0);
        out.write_i32(0); // checksum
        out.write_i32(self.command as i32);
        self.fetch.write_to(out);

        match &self.sort {
            Some(sort) => {
                out.write_bool(true);
                out.write_utf(&sort.attribute)?;
                out.write_bool(sort.descending);
                out.write_i32(sort.limit);
            }
            None => out.write_bool(false),
        }

        if self.command.uses_hash_id() {
            if self.query_hash_id < 0 {
                return Err(TgException::general(format!(
                    "Invalid query hash id {}",
                    self.query_hash_id
                )));
            }
            out.write_i64(self.query_hash_id);
        } else {
            out.write_optional_utf(self.query_expr.as_deref())?;
            out.write_optional_utf(self.edge_filter.as_deref())?;
            out.write_optional_utf(self.traversal_condition.as_deref())?;
            out.write_optional_utf(self.end_condition.as_deref())?;
        }

        let length = (out.position() - start) as i32;
        out.write_i32_at(start, length)?;
        Ok(())
    }

    fn read_payload(&mut self, input: &mut InputStream<'_>) -> TgResult<()> {
        *self = Self::default();
        let start = input.position();
        let length = input.read_i32()?;
        input.read_i32()?; // checksum
        self.command = QueryCommand::from_i32(input.read_i32()?)?;
        self.fetch = FetchOptions::read_from(input)?;

        if input.read_bool()? {
            self.sort = Some(SortSpec {
                attribute: input.read_utf()?,
                descending: input.read_bool()?,
                limit: input.read_i32()?,
            });
        }

        if self.command.uses_hash_id() {
            self.query_hash_id = input.read_i64()?;
        } else {
            self.query_expr = input.read_optional_utf()?;
            self.edge_filter = input.read_optional_utf()?;
            self.traversal_condition = input.read_optional_utf()?;
            self.end_condition = input.read_optional_utf()?;
        }

        if (input.position() - start) as i32 != length {
            return Err(TgException::io("Query buffer length mismatch"));
        }
        Ok(())
    }
}

/// Failure reported by the server for a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryError {
    /// Non-zero result code
    pub result: i32,
    /// Server message, if any
    pub message: Option<String>,
}

impl QueryError {
    /// Convert to a general exception carrying the result code.
    pub fn to_exception(&self) -> TgException {
        let message = self
            .message
            .clone()
            .unwrap_or_else(|| "Query failed".to_string());
        TgException::general(message).with_details(format!("query result {}", self.result))
    }
}

/// Query response.
///
/// Wire layout: `i32 sub-length | i32 checksum | i32 result`. A non-zero
/// result is followed by an optional error string. Otherwise `i64 query hash
/// id | u8 syntax | i32 result count` precede the entities; for syntax `1`
/// the entities are led by an `i32` total count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResponse {
    /// Result code, zero on success
    pub result: i32,
    /// Failure reported by the server
    pub error: Option<QueryError>,
    /// Hash id of the planned query
    pub query_hash_id: i64,
    /// Result syntax
    pub syntax: u8,
    /// Number of results
    pub result_count: i32,
    /// Total number of entities, when the syntax carries one
    pub total_count: i32,
    /// Whether any results were returned
    pub has_result: bool,
    /// Undecoded entities
    pub entity_stream: EntityStream,
}

impl QueryResponse {
    /// Successful response.
    pub fn succeeded(query_hash_id: i64, syntax: u8, result_count: i32, entity_stream: EntityStream) -> Self {
        let total_count = if syntax == 1 {
            entity_stream.declared_count().unwrap_or(0)
        } else {
            0
        };
        Self {
            result: 0,
            error: None,
            query_hash_id,
            syntax,
            result_count,
            total_count,
            has_result: result_count > 0,
            entity_stream,
        }
    }

    /// Failed response.
    pub fn failed(result: i32, message: Option<String>) -> Self {
        Self {
            result,
            error: Some(QueryError { result, message }),
            ..Self::default()
        }
    }

    /// Turn a failed response into its exception.
    pub fn into_result(self) -> TgResult<Self> {
        match &self.error {
            Some(error) => Err(error.to_exception()),
            None => Ok(self),
        }
    }
}

impl Payload for QueryResponse {
    fn write_payload(&self, out: &mut OutputStream) -> TgResult<()> {
        let start = out.position();
        out.write_i32(0);
        out.write_i32(0); // checksum
        out.write_i32(self.result);
        if self.result != 0 {
            let message = self.error.as_ref().and_then(|e| e.message.as_deref());
            out.write_optional_utf(message)?;
        } else {
            out.write_i64(self.query_hash_id);
            out.write_u8(self.syntax);
            out.write_i32(self.result_count);
            out.write_raw(self.entity_stream.as_bytes());
        }
        let length = (out.position() - start) as i32;
        out.write_i32_at(start, length)?;
        Ok(())
    }

    fn read_payload(&mut self, input: &mut InputStream<'_>) -> TgResult<()> {
        *self = Self::default();
        if input.is_empty() {
            return Err(TgException::io("Query response has no data"));
        }
        input.read_i32()?; // sub-length
        input.read_i32()?; // checksum
        self.result = input.read_i32()?;
        if self.result != 0 {
            let message = if input.is_empty() {
                None
            } else {
                input.read_optional_utf()?
            };
            self.error = Some(QueryError {
                result: self.result,
                message,
            });
            return Ok(());
        }

        self.query_hash_id = input.read_i64()?;
        self.syntax = input.read_u8()?;
        self.result_count = input.read_i32()?;
        if self.syntax == 1 {
            self.total_count = input.peek_i32()?;
        }
        self.has_result = self.result_count > 0;
        self.entity_stream = EntityStream::capture(input);
        Ok(())
    }
}
