//! Live warehouse session over the Snowflake HTTP session protocol
//!
//! One session is one connection: login, sequential query requests, and an
//! explicit session delete. The session is also closed on drop so it is
//! released on every exit path.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{Executor, PlanInfo, RowSet};
use crate::catalog::{Catalog, InformationSchemaCatalog};
use crate::error::{Diagnostic, ExecError};

/// Response codes meaning "still running, poll the result URL"
const IN_PROGRESS_CODES: [&str; 2] = ["333333", "333334"];
const MAX_POLLS: usize = 600;
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Connection settings, passed explicitly to [`SnowflakeSession::open`]
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct WarehouseConfig {
    pub account: String,
    pub user: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub warehouse: Option<String>,
    pub role: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
    /// Overrides `https://<account>.snowflakecomputing.com`
    pub host: Option<String>,
    /// Per-request timeout in seconds (0 = none)
    #[serde(default)]
    pub timeout_secs: u64,
}

impl WarehouseConfig {
    pub fn base_url(&self) -> String {
        match &self.host {
            Some(host) => host.trim_end_matches('/').to_string(),
            None => format!("https://{}.snowflakecomputing.com", self.account),
        }
    }
}

impl std::fmt::Debug for WarehouseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarehouseConfig")
            .field("account", &self.account)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("warehouse", &self.warehouse)
            .field("role", &self.role)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("host", &self.host)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    code: Option<String>,
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
struct LoginData {
    token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryData {
    #[serde(default)]
    rowtype: Vec<RowType>,
    #[serde(default)]
    rowset: Vec<Vec<Value>>,
    sql_state: Option<String>,
    get_result_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RowType {
    name: String,
}

enum QueryOutcome {
    Done(RowSet),
    Pending(String),
}

/// Interpret a query-request (or result poll) response body
fn parse_query_response(envelope: Envelope<QueryData>) -> Result<QueryOutcome, ExecError> {
    let data = envelope.data.unwrap_or_default();
    let code = envelope.code;

    if let Some(code) = code.as_deref() {
        if IN_PROGRESS_CODES.contains(&code) {
            return match data.get_result_url {
                Some(url) => Ok(QueryOutcome::Pending(url)),
                None => Err(ExecError::Connection(
                    "query still running but no result URL was returned".to_string(),
                )),
            };
        }
    }

    if !envelope.success {
        let mut diag = Diagnostic::new(
            envelope
                .message
                .unwrap_or_else(|| "statement failed without a message".to_string()),
        );
        diag.code = code;
        diag.sql_state = data.sql_state;
        return Err(ExecError::Statement(diag));
    }

    Ok(QueryOutcome::Done(RowSet {
        columns: data.rowtype.into_iter().map(|c| c.name).collect(),
        rows: data
            .rowset
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect(),
    }))
}

fn cell_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn transport(err: reqwest::Error) -> ExecError {
    ExecError::Connection(err.to_string())
}

/// An open warehouse session
pub struct SnowflakeSession {
    client: Client,
    base_url: String,
    token: Option<String>,
    sequence: u64,
}

impl SnowflakeSession {
    /// Log in and open a session
    pub fn open(config: &WarehouseConfig) -> Result<Self, ExecError> {
        let mut builder = Client::builder();
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        let client = builder.build().map_err(transport)?;
        let base_url = config.base_url();

        let request_id = uuid::Uuid::new_v4().to_string();
        let mut params = vec![("requestId", request_id.as_str())];
        for (key, value) in [
            ("warehouse", &config.warehouse),
            ("roleName", &config.role),
            ("databaseName", &config.database),
            ("schemaName", &config.schema),
        ] {
            if let Some(value) = value {
                params.push((key, value.as_str()));
            }
        }

        let body = json!({
            "data": {
                "CLIENT_APP_ID": "sqlgate",
                "CLIENT_APP_VERSION": env!("CARGO_PKG_VERSION"),
                "ACCOUNT_NAME": config.account,
                "LOGIN_NAME": config.user,
                "PASSWORD": config.password,
            }
        });

        tracing::debug!(url = %base_url, user = %config.user, "opening warehouse session");
        let response: Envelope<LoginData> = client
            .post(format!("{}/session/v1/login-request", base_url))
            .query(&params)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .and_then(|res| res.error_for_status())
            .map_err(transport)?
            .json()
            .map_err(transport)?;

        let token = match response.data.and_then(|d| d.token) {
            Some(token) if response.success => token,
            _ => {
                return Err(ExecError::Connection(format!(
                    "login failed: {}",
                    response
                        .message
                        .unwrap_or_else(|| "no session token returned".to_string())
                )))
            }
        };

        tracing::info!(url = %base_url, "warehouse session opened");
        Ok(Self {
            client,
            base_url,
            token: Some(token),
            sequence: 0,
        })
    }

    fn auth_header(&self) -> Result<String, ExecError> {
        self.token
            .as_ref()
            .map(|token| format!("Snowflake Token=\"{}\"", token))
            .ok_or_else(|| ExecError::Connection("session is closed".to_string()))
    }

    fn query(&mut self, sql: &str) -> Result<RowSet, ExecError> {
        let auth = self.auth_header()?;
        self.sequence += 1;
        let request_id = uuid::Uuid::new_v4().to_string();
        let body = json!({
            "sqlText": sql,
            "asyncExec": false,
            "sequenceId": self.sequence,
        });

        let response: Envelope<QueryData> = self
            .client
            .post(format!("{}/queries/v1/query-request", self.base_url))
            .query(&[("requestId", request_id.as_str())])
            .header("Authorization", &auth)
            .header("Accept", "application/snowflake")
            .json(&body)
            .send()
            .and_then(|res| res.error_for_status())
            .map_err(transport)?
            .json()
            .map_err(transport)?;

        let mut outcome = parse_query_response(response)?;
        for _ in 0..MAX_POLLS {
            let url = match outcome {
                QueryOutcome::Done(rows) => return Ok(rows),
                QueryOutcome::Pending(url) => url,
            };
            std::thread::sleep(POLL_INTERVAL);
            tracing::debug!(url = %url, "polling for query result");
            let response: Envelope<QueryData> = self
                .client
                .get(format!("{}{}", self.base_url, url))
                .header("Authorization", &auth)
                .header("Accept", "application/snowflake")
                .send()
                .and_then(|res| res.error_for_status())
                .map_err(transport)?
                .json()
                .map_err(transport)?;
            outcome = parse_query_response(response)?;
        }
        match outcome {
            QueryOutcome::Done(rows) => Ok(rows),
            QueryOutcome::Pending(_) => Err(ExecError::Connection(
                "timed out waiting for query result".to_string(),
            )),
        }
    }

    pub fn is_open(&self) -> bool {
        self.token.is_some()
    }

    /// Delete the session. Idempotent.
    pub fn close(&mut self) -> Result<(), ExecError> {
        if !self.is_open() {
            return Ok(());
        }
        let auth = self.auth_header()?;
        self.token = None;
        self.client
            .post(format!("{}/session", self.base_url))
            .query(&[("delete", "true")])
            .header("Authorization", &auth)
            .header("Accept", "application/json")
            .send()
            .and_then(|res| res.error_for_status())
            .map_err(transport)?;
        tracing::debug!(url = %self.base_url, "warehouse session closed");
        Ok(())
    }
}

impl Drop for SnowflakeSession {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(error = %e, "failed to close warehouse session");
        }
    }
}

impl Executor for SnowflakeSession {
    fn plan_check(&mut self, statement: &str) -> Result<PlanInfo, ExecError> {
        let rows = self.query(&format!("EXPLAIN USING TEXT {}", statement))?;
        let text = rows
            .rows
            .iter()
            .flatten()
            .flatten()
            .cloned()
            .collect::<Vec<_>>()
            .join("\n");
        Ok(PlanInfo { text })
    }

    fn run(&mut self, statement: &str) -> Result<RowSet, ExecError> {
        self.query(statement)
    }
}

impl Catalog for SnowflakeSession {
    fn database_exists(&mut self, name: &str) -> Result<bool, ExecError> {
        InformationSchemaCatalog::new(self).database_exists(name)
    }

    fn schema_exists(&mut self, database: &str, name: &str) -> Result<bool, ExecError> {
        InformationSchemaCatalog::new(self).schema_exists(database, name)
    }

    fn table_exists(
        &mut self,
        database: &str,
        schema: &str,
        name: &str,
    ) -> Result<bool, ExecError> {
        InformationSchemaCatalog::new(self).table_exists(database, schema, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<QueryOutcome, ExecError> {
        parse_query_response(serde_json::from_str(body).unwrap())
    }

    #[test]
    fn test_parse_success_rowset() {
        let body = r#"{
            "success": true, "code": null, "message": null,
            "data": {
                "rowtype": [{"name": "COUNT(*)"}, {"name": "NOTE"}],
                "rowset": [["1", null]],
                "queryId": "01b2"
            }
        }"#;
        let Ok(QueryOutcome::Done(rows)) = parse(body) else {
            panic!("expected rows");
        };
        assert_eq!(rows.columns, vec!["COUNT(*)", "NOTE"]);
        assert_eq!(rows.rows, vec![vec![Some("1".to_string()), None]]);
        assert_eq!(rows.scalar(), Some("1"));
    }

    #[test]
    fn test_parse_failure_keeps_diagnostic_verbatim() {
        let body = r#"{
            "success": false, "code": "002003",
            "message": "SQL compilation error:\nTable 'X' does not exist or not authorized.",
            "data": {"sqlState": "42S02", "errorCode": "002003"}
        }"#;
        let Err(ExecError::Statement(diag)) = parse(body) else {
            panic!("expected statement error");
        };
        assert_eq!(diag.code.as_deref(), Some("002003"));
        assert_eq!(diag.sql_state.as_deref(), Some("42S02"));
        assert_eq!(
            diag.message,
            "SQL compilation error:\nTable 'X' does not exist or not authorized."
        );
    }

    #[test]
    fn test_parse_in_progress() {
        let body = r#"{
            "success": true, "code": "333334", "message": "running",
            "data": {"getResultUrl": "/queries/01b2/result"}
        }"#;
        let Ok(QueryOutcome::Pending(url)) = parse(body) else {
            panic!("expected pending");
        };
        assert_eq!(url, "/queries/01b2/result");
    }

    #[test]
    fn test_non_string_cells() {
        assert_eq!(cell_text(json!(42)), Some("42".to_string()));
        assert_eq!(cell_text(json!(true)), Some("true".to_string()));
        assert_eq!(cell_text(Value::Null), None);
    }

    #[test]
    fn test_config_base_url_and_redaction() {
        let mut config = WarehouseConfig {
            account: "xy12345.eu-west-1".into(),
            password: "hunter2".into(),
            ..Default::default()
        };
        assert_eq!(config.base_url(), "https://xy12345.eu-west-1.snowflakecomputing.com");
        config.host = Some("http://localhost:8080/".into());
        assert_eq!(config.base_url(), "http://localhost:8080");
        assert!(!format!("{:?}", config).contains("hunter2"));
    }

    #[test]
    fn test_close_without_token_sends_nothing() {
        let mut session = SnowflakeSession {
            client: Client::new(),
            base_url: "http://127.0.0.1:9".into(),
            token: None,
            sequence: 0,
        };
        assert!(!session.is_open());
        session.close().unwrap();
        session.close().unwrap();
    }
}
