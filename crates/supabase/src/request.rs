//! Operation requests and the Request Assembler.
//!
//! Every operation goes through [`assemble`], which turns a connection
//! config plus one [`Operation`] into a fully-formed [`AssembledRequest`].
//! The per-operation rules live in one `match` so they read as a table:
//!
//! | kind   | method | query                                | `Prefer`                                 | body            |
//! |--------|--------|--------------------------------------|------------------------------------------|-----------------|
//! | select | GET    | `select`, filter, `order`, `limit`, `offset` | -                                | -               |
//! | insert | POST   | `select`, `on_conflict`              | `return=representation[,resolution=..]`  | array of rows   |
//! | update | PATCH  | `select`, filter                     | `return=representation`                  | object          |
//! | delete | DELETE | `select` (unless suppressed), filter | `return=representation` (unless suppressed) | -            |
//! | query  | POST   | -                                    | -                                        | object or `{}`  |
//!
//! Filters and order clauses are PostgREST syntax and are passed through
//! verbatim.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ConnectionConfig;
use crate::endpoint::{rpc_endpoint, table_endpoint};
use crate::SupabaseError;

/// One decoded row: column name to JSON value.
pub type Row = serde_json::Map<String, Value>;

/// Header name to every value sent (or received) under that name.
pub type Headers = BTreeMap<String, Vec<String>>;

/// Conflict strategy used for upserts when none is given.
pub const DEFAULT_RESOLUTION: &str = "merge-duplicates";

/// Default column projection.
pub const SELECT_ALL: &str = "*";

const RETURN_REPRESENTATION: &str = "return=representation";

pub mod header {
    pub const API_KEY: &str = "apikey";
    pub const AUTHORIZATION: &str = "Authorization";
    pub const CONTENT_TYPE: &str = "Content-Type";
    pub const ACCEPT: &str = "Accept";
    pub const ACCEPT_PROFILE: &str = "Accept-Profile";
    pub const CONTENT_PROFILE: &str = "Content-Profile";
    pub const PREFER: &str = "Prefer";
    pub const CONTENT_RANGE: &str = "Content-Range";
}

// ---------------------------------------------------------------------------
// Operation kind / method
// ---------------------------------------------------------------------------

/// The five operations a task can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Select,
    Insert,
    Update,
    Delete,
    Query,
}

impl OperationKind {
    pub fn method(self) -> HttpMethod {
        match self {
            OperationKind::Select => HttpMethod::Get,
            OperationKind::Insert | OperationKind::Query => HttpMethod::Post,
            OperationKind::Update => HttpMethod::Patch,
            OperationKind::Delete => HttpMethod::Delete,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Select => "select",
            OperationKind::Insert => "insert",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
            OperationKind::Query => "query",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Operation requests
// ---------------------------------------------------------------------------

/// Read rows from a table.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectRequest {
    #[serde(default)]
    pub table: String,
    /// Column projection; `*` when absent.
    pub select: Option<String>,
    /// Raw PostgREST filter, e.g. `status=eq.active`.
    pub filter: Option<String>,
    /// Raw PostgREST order clause, e.g. `created_at.desc`.
    pub order: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Rows to insert: a single object or a list of objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InsertPayload {
    Many(Vec<Row>),
    One(Row),
}

impl InsertPayload {
    /// The bulk endpoint only takes arrays, so a single object becomes a
    /// one-element list.
    pub fn to_rows(&self) -> Vec<Row> {
        match self {
            InsertPayload::Many(rows) => rows.clone(),
            InsertPayload::One(row) => vec![row.clone()],
        }
    }
}

impl From<Row> for InsertPayload {
    fn from(row: Row) -> Self {
        InsertPayload::One(row)
    }
}

impl From<Vec<Row>> for InsertPayload {
    fn from(rows: Vec<Row>) -> Self {
        InsertPayload::Many(rows)
    }
}

/// Insert (or upsert, when `on_conflict` is set) rows into a table.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertRequest {
    #[serde(default)]
    pub table: String,
    pub data: Option<InsertPayload>,
    pub select: Option<String>,
    /// Comma-separated conflict target columns.
    pub on_conflict: Option<String>,
    /// `merge-duplicates` (default) or `ignore-duplicates`; not validated here.
    pub resolution: Option<String>,
}

/// Patch the rows matched by `filter`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    #[serde(default)]
    pub table: String,
    pub data: Option<Row>,
    /// Required; an unfiltered PATCH would touch every row.
    pub filter: Option<String>,
    pub select: Option<String>,
}

/// Delete the rows matched by `filter`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    #[serde(default)]
    pub table: String,
    /// Required; an unfiltered DELETE would empty the table.
    pub filter: Option<String>,
    /// `None` returns every column of the deleted rows, an empty string
    /// returns nothing.
    pub select: Option<String>,
}

/// Call a stored procedure over `/rpc`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(default)]
    pub function_name: String,
    pub parameters: Option<Row>,
}

/// Any one of the five operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Select(SelectRequest),
    Insert(InsertRequest),
    Update(UpdateRequest),
    Delete(DeleteRequest),
    Query(QueryRequest),
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Select(_) => OperationKind::Select,
            Operation::Insert(_) => OperationKind::Insert,
            Operation::Update(_) => OperationKind::Update,
            Operation::Delete(_) => OperationKind::Delete,
            Operation::Query(_) => OperationKind::Query,
        }
    }

    /// Table name, or function name for [`Operation::Query`].
    pub fn target(&self) -> &str {
        match self {
            Operation::Select(r) => &r.table,
            Operation::Insert(r) => &r.table,
            Operation::Update(r) => &r.table,
            Operation::Delete(r) => &r.table,
            Operation::Query(r) => &r.function_name,
        }
    }

    /// Whether the response body should be decoded into rows.
    ///
    /// Only a delete with an explicitly empty `select` opts out.
    pub fn returns_rows(&self) -> bool {
        match self {
            Operation::Delete(r) => delete_projection(r.select.as_deref()).is_some(),
            _ => true,
        }
    }
}

impl From<SelectRequest> for Operation {
    fn from(r: SelectRequest) -> Self {
        Operation::Select(r)
    }
}

impl From<InsertRequest> for Operation {
    fn from(r: InsertRequest) -> Self {
        Operation::Insert(r)
    }
}

impl From<UpdateRequest> for Operation {
    fn from(r: UpdateRequest) -> Self {
        Operation::Update(r)
    }
}

impl From<DeleteRequest> for Operation {
    fn from(r: DeleteRequest) -> Self {
        Operation::Delete(r)
    }
}

impl From<QueryRequest> for Operation {
    fn from(r: QueryRequest) -> Self {
        Operation::Query(r)
    }
}

// ---------------------------------------------------------------------------
// Assembled request
// ---------------------------------------------------------------------------

/// A request ready to hand to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledRequest {
    pub kind: OperationKind,
    pub method: HttpMethod,
    /// REST root + endpoint + optional `?query`.
    pub uri: String,
    pub headers: Headers,
    /// UTF-8 JSON text.
    pub body: Option<String>,
}

impl AssembledRequest {
    /// First value sent under `name` (exact match).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Everything after `?`, if there is a query string.
    pub fn query(&self) -> Option<&str> {
        self.uri.split_once('?').map(|(_, query)| query)
    }
}

// ---------------------------------------------------------------------------
// Assembler
// ---------------------------------------------------------------------------

/// Build the HTTP request for `operation`.
///
/// # Errors
/// - [`SupabaseError::InvalidConfig`] for a blank URL or API key.
/// - [`SupabaseError::MissingField`] for a blank target, a missing payload,
///   or a missing filter on update/delete.
/// - [`SupabaseError::Encode`] if the body cannot be serialised.
pub fn assemble(
    config: &ConnectionConfig,
    operation: &Operation,
) -> Result<AssembledRequest, SupabaseError> {
    config.validate()?;

    let kind = operation.kind();
    let mut headers = base_headers(config);
    let mut query: Vec<String> = Vec::new();

    let (endpoint, body) = match operation {
        Operation::Select(req) => {
            require(kind, "table", &req.table)?;

            query.push(select_param(req.select.as_deref()));
            if let Some(filter) = non_blank(req.filter.as_deref()) {
                query.push(filter.to_string());
            }
            if let Some(order) = non_blank(req.order.as_deref()) {
                query.push(format!("order={order}"));
            }
            if let Some(limit) = req.limit {
                query.push(format!("limit={limit}"));
            }
            if let Some(offset) = req.offset {
                query.push(format!("offset={offset}"));
            }

            (table_endpoint(&req.table), None)
        }

        Operation::Insert(req) => {
            require(kind, "table", &req.table)?;
            let data = req
                .data
                .as_ref()
                .ok_or(SupabaseError::MissingField { operation: kind, field: "data" })?;

            query.push(select_param(req.select.as_deref()));

            let mut prefer = RETURN_REPRESENTATION.to_string();
            if let Some(columns) = non_blank(req.on_conflict.as_deref()) {
                query.push(format!("on_conflict={columns}"));
                let resolution = non_blank(req.resolution.as_deref()).unwrap_or(DEFAULT_RESOLUTION);
                prefer.push_str(",resolution=");
                prefer.push_str(resolution);
            }
            add_header(&mut headers, header::PREFER, prefer);

            let body = serde_json::to_string(&data.to_rows())?;
            (table_endpoint(&req.table), Some(body))
        }

        Operation::Update(req) => {
            require(kind, "table", &req.table)?;
            let data = req
                .data
                .as_ref()
                .ok_or(SupabaseError::MissingField { operation: kind, field: "data" })?;
            let filter = required_filter(kind, req.filter.as_deref())?;

            query.push(select_param(req.select.as_deref()));
            query.push(filter.to_string());
            add_header(&mut headers, header::PREFER, RETURN_REPRESENTATION);

            let body = serde_json::to_string(data)?;
            (table_endpoint(&req.table), Some(body))
        }

        Operation::Delete(req) => {
            require(kind, "table", &req.table)?;
            let filter = required_filter(kind, req.filter.as_deref())?;

            if let Some(columns) = delete_projection(req.select.as_deref()) {
                query.push(format!("select={columns}"));
                add_header(&mut headers, header::PREFER, RETURN_REPRESENTATION);
            }
            query.push(filter.to_string());

            (table_endpoint(&req.table), None)
        }

        Operation::Query(req) => {
            require(kind, "functionName", &req.function_name)?;

            let body = match &req.parameters {
                Some(params) => serde_json::to_string(params)?,
                None => "{}".to_string(),
            };
            (rpc_endpoint(&req.function_name), Some(body))
        }
    };

    let mut uri = format!("{}{}", config.rest_url(), endpoint);
    if !query.is_empty() {
        uri.push('?');
        uri.push_str(&query.join("&"));
    }

    Ok(AssembledRequest {
        kind,
        method: kind.method(),
        uri,
        headers,
        body,
    })
}

/// Headers every request carries.
fn base_headers(config: &ConnectionConfig) -> Headers {
    let mut headers = Headers::new();
    add_header(&mut headers, header::API_KEY, config.api_key.as_str());
    add_header(&mut headers, header::AUTHORIZATION, format!("Bearer {}", config.api_key));
    add_header(&mut headers, header::CONTENT_TYPE, "application/json");
    add_header(&mut headers, header::ACCEPT, "application/json");

    if !config.is_default_schema() {
        add_header(&mut headers, header::ACCEPT_PROFILE, config.schema.as_str());
        add_header(&mut headers, header::CONTENT_PROFILE, config.schema.as_str());
    }
    headers
}

fn add_header(headers: &mut Headers, name: &str, value: impl Into<String>) {
    headers.entry(name.to_string()).or_default().push(value.into());
}

fn select_param(select: Option<&str>) -> String {
    format!("select={}", select.unwrap_or(SELECT_ALL))
}

/// Projection a delete asks back for: `*` when not given, nothing when blank.
fn delete_projection(select: Option<&str>) -> Option<&str> {
    match select {
        None => Some(SELECT_ALL),
        Some(columns) => non_blank(Some(columns)),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn require(operation: OperationKind, field: &'static str, value: &str) -> Result<(), SupabaseError> {
    if value.trim().is_empty() {
        return Err(SupabaseError::MissingField { operation, field });
    }
    Ok(())
}

fn required_filter(operation: OperationKind, filter: Option<&str>) -> Result<&str, SupabaseError> {
    non_blank(filter).ok_or(SupabaseError::MissingField { operation, field: "filter" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> ConnectionConfig {
        ConnectionConfig::new("https://abc.supabase.co", "key").expect("valid config")
    }

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn base_headers_carry_credentials() {
        let req = assemble(
            &config(),
            &SelectRequest { table: "users".into(), ..Default::default() }.into(),
        )
        .expect("assembles");

        assert_eq!(req.header(header::API_KEY), Some("key"));
        assert_eq!(req.header(header::AUTHORIZATION), Some("Bearer key"));
        assert_eq!(req.header(header::CONTENT_TYPE), Some("application/json"));
        assert_eq!(req.header(header::ACCEPT), Some("application/json"));
        assert!(req.header(header::ACCEPT_PROFILE).is_none());
        assert!(req.header(header::PREFER).is_none());
    }

    #[test]
    fn rest_root_in_base_url_is_not_repeated() {
        let config = ConnectionConfig::new("https://abc.supabase.co/rest/v1/", "key").expect("valid config");
        let req = assemble(
            &config,
            &SelectRequest { table: "users".into(), ..Default::default() }.into(),
        )
        .expect("assembles");
        assert_eq!(req.uri, "https://abc.supabase.co/rest/v1/users?select=*");
    }

    #[test]
    fn non_public_schema_adds_profile_headers() {
        let req = assemble(
            &config().with_schema("analytics"),
            &SelectRequest { table: "events".into(), ..Default::default() }.into(),
        )
        .expect("assembles");

        assert_eq!(req.header(header::ACCEPT_PROFILE), Some("analytics"));
        assert_eq!(req.header(header::CONTENT_PROFILE), Some("analytics"));
    }

    #[test]
    fn select_query_keeps_parameter_order() {
        let req = assemble(
            &config(),
            &SelectRequest {
                table: "users".into(),
                select: Some("id,name".into()),
                filter: Some("status=eq.active".into()),
                order: Some("created_at.desc".into()),
                limit: Some(50),
                offset: Some(25),
            }
            .into(),
        )
        .expect("assembles");

        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(
            req.uri,
            "https://abc.supabase.co/rest/v1/users?select=id,name&status=eq.active&order=created_at.desc&limit=50&offset=25"
        );
        assert!(req.body.is_none());
    }

    #[test]
    fn select_defaults_to_all_columns() {
        let req = assemble(
            &config(),
            &SelectRequest { table: "users".into(), filter: Some("  ".into()), ..Default::default() }
                .into(),
        )
        .expect("assembles");
        assert_eq!(req.query(), Some("select=*"));
    }

    #[test]
    fn select_without_table_is_a_config_error() {
        let err = assemble(&config(), &SelectRequest::default().into()).unwrap_err();
        assert!(matches!(
            err,
            SupabaseError::MissingField { operation: OperationKind::Select, field: "table" }
        ));
    }

    #[test]
    fn insert_wraps_single_object_in_array() {
        let req = assemble(
            &config(),
            &InsertRequest {
                table: "users".into(),
                data: Some(row(json!({ "name": "John" })).into()),
                ..Default::default()
            }
            .into(),
        )
        .expect("assembles");

        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.body.as_deref(), Some(r#"[{"name":"John"}]"#));
        assert_eq!(req.header(header::PREFER), Some("return=representation"));
        assert_eq!(req.query(), Some("select=*"));
    }

    #[test]
    fn upsert_composes_prefer_and_on_conflict() {
        let req = assemble(
            &config(),
            &InsertRequest {
                table: "users".into(),
                data: Some(row(json!({ "id": 1 })).into()),
                on_conflict: Some("id".into()),
                ..Default::default()
            }
            .into(),
        )
        .expect("assembles");

        assert_eq!(
            req.header(header::PREFER),
            Some("return=representation,resolution=merge-duplicates")
        );
        assert_eq!(req.headers[header::PREFER].len(), 1);
        assert_eq!(req.query(), Some("select=*&on_conflict=id"));
    }

    #[test]
    fn upsert_passes_resolution_through() {
        let req = assemble(
            &config(),
            &InsertRequest {
                table: "users".into(),
                data: Some(vec![row(json!({ "id": 1 })), row(json!({ "id": 2 }))].into()),
                on_conflict: Some("id,email".into()),
                resolution: Some("ignore-duplicates".into()),
                ..Default::default()
            }
            .into(),
        )
        .expect("assembles");

        assert_eq!(
            req.header(header::PREFER),
            Some("return=representation,resolution=ignore-duplicates")
        );
        assert_eq!(req.body.as_deref(), Some(r#"[{"id":1},{"id":2}]"#));
    }

    #[test]
    fn insert_without_data_is_rejected() {
        let err = assemble(
            &config(),
            &InsertRequest { table: "users".into(), ..Default::default() }.into(),
        )
        .unwrap_err();
        assert!(matches!(err, SupabaseError::MissingField { field: "data", .. }));
    }

    #[test]
    fn update_requires_filter() {
        for filter in [None, Some(String::new()), Some("   ".to_string())] {
            let err = assemble(
                &config(),
                &UpdateRequest {
                    table: "users".into(),
                    data: Some(row(json!({ "status": "inactive" }))),
                    filter,
                    select: None,
                }
                .into(),
            )
            .unwrap_err();
            assert!(matches!(
                err,
                SupabaseError::MissingField { operation: OperationKind::Update, field: "filter" }
            ));
            assert!(err.is_config());
        }
    }

    #[test]
    fn update_builds_patch_with_filter() {
        let req = assemble(
            &config(),
            &UpdateRequest {
                table: "users".into(),
                data: Some(row(json!({ "status": "inactive" }))),
                filter: Some("id=eq.123".into()),
                select: Some("id,status".into()),
            }
            .into(),
        )
        .expect("assembles");

        assert_eq!(req.method, HttpMethod::Patch);
        assert_eq!(req.query(), Some("select=id,status&id=eq.123"));
        assert_eq!(req.header(header::PREFER), Some("return=representation"));
        assert_eq!(req.body.as_deref(), Some(r#"{"status":"inactive"}"#));
    }

    #[test]
    fn delete_defaults_to_returning_rows() {
        let req = assemble(
            &config(),
            &DeleteRequest { table: "users".into(), filter: Some("id=eq.1".into()), select: None }
                .into(),
        )
        .expect("assembles");

        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.query(), Some("select=*&id=eq.1"));
        assert_eq!(req.header(header::PREFER), Some("return=representation"));
        assert!(req.body.is_none());
    }

    #[test]
    fn delete_with_empty_select_suppresses_return() {
        let op: Operation = DeleteRequest {
            table: "users".into(),
            filter: Some("status=eq.inactive&last_login=lt.2022-01-01".into()),
            select: Some(String::new()),
        }
        .into();
        let req = assemble(&config(), &op).expect("assembles");

        assert!(!op.returns_rows());
        assert_eq!(req.query(), Some("status=eq.inactive&last_login=lt.2022-01-01"));
        assert!(req.header(header::PREFER).is_none());
    }

    #[test]
    fn delete_requires_filter() {
        let err = assemble(
            &config(),
            &DeleteRequest { table: "users".into(), ..Default::default() }.into(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SupabaseError::MissingField { operation: OperationKind::Delete, field: "filter" }
        ));
    }

    #[test]
    fn query_posts_parameters_or_empty_object() {
        let with_params = assemble(
            &config(),
            &QueryRequest {
                function_name: "get_user_by_id".into(),
                parameters: Some(row(json!({ "user_id": 123 }))),
            }
            .into(),
        )
        .expect("assembles");
        assert_eq!(with_params.uri, "https://abc.supabase.co/rest/v1/rpc/get_user_by_id");
        assert_eq!(with_params.body.as_deref(), Some(r#"{"user_id":123}"#));
        assert!(with_params.query().is_none());

        let without = assemble(
            &config(),
            &QueryRequest { function_name: "get_users".into(), parameters: None }.into(),
        )
        .expect("assembles");
        assert_eq!(without.method, HttpMethod::Post);
        assert_eq!(without.body.as_deref(), Some("{}"));
    }

    #[test]
    fn requests_deserialize_from_step_properties() {
        let insert: InsertRequest = serde_json::from_value(json!({
            "table": "users",
            "data": { "name": "Jane" },
            "onConflict": "id",
            "resolution": "ignore-duplicates",
        }))
        .expect("valid insert");
        assert_eq!(insert.on_conflict.as_deref(), Some("id"));
        assert!(matches!(insert.data, Some(InsertPayload::One(_))));

        let many: InsertRequest = serde_json::from_value(json!({
            "table": "users",
            "data": [{ "name": "Jane" }, { "name": "John" }],
        }))
        .expect("valid insert");
        assert!(matches!(many.data, Some(InsertPayload::Many(ref rows)) if rows.len() == 2));

        let query: QueryRequest = serde_json::from_value(json!({
            "functionName": "get_users",
            "parameters": { "limit": 10 },
        }))
        .expect("valid query");
        assert_eq!(query.function_name, "get_users");
    }
}
