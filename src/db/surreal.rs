use async_trait::async_trait;
use serde_json::Value;
use base64::{ engine::general_purpose::STANDARD, Engine as _ };
use reqwest::Client;
use log::{ info, error, debug, warn };

use super::{ CollectionGateway, GatewayError };
use crate::schema::{ Direction, IndexSpec };

/// Binds one SurrealDB table, reached over the HTTP `/sql` endpoint.
///
/// SurrealDB indexes carry no sort direction and no expiry, so specs with
/// descending keys or a TTL are rejected before anything is sent.
pub struct SurrealCollection {
    client: Client,
    host: String,
    namespace: String,
    database: String,
    table: String,
    auth_header: Option<String>,
}

impl SurrealCollection {
    pub async fn new(
        host: &str,
        namespace: Option<&str>,
        database: Option<&str>,
        table: &str,
        user: Option<&str>,
        pass: Option<&str>
    ) -> Result<Self, GatewayError> {
        let namespace = namespace.ok_or("SurrealDB namespace not provided")?.to_string();
        let database = database.ok_or("SurrealDB database name not provided")?.to_string();
        if table.is_empty() {
            return Err("SurrealDB table name is empty".into());
        }

        let auth_header = match (user, pass) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => {
                Some(format!("Basic {}", STANDARD.encode(format!("{}:{}", u, p))))
            }
            (Some(_), Some(_)) => {
                warn!("SurrealDB user or pass provided but empty.");
                None
            }
            _ => None,
        };

        let collection = Self {
            client: Client::new(),
            host: host.trim_end_matches('/').to_string(),
            namespace,
            database,
            table: table.to_string(),
            auth_header,
        };

        let define_ns = format!("DEFINE NAMESPACE IF NOT EXISTS {};", escape_ident(&collection.namespace));
        info!("Sending DEFINE NAMESPACE: {}", define_ns);
        collection.send_sql(&define_ns, false, false).await?;

        let define_db = format!("DEFINE DATABASE IF NOT EXISTS {};", escape_ident(&collection.database));
        info!("Sending DEFINE DATABASE: {}", define_db);
        collection.send_sql(&define_db, true, false).await?;

        let define_table = format!("DEFINE TABLE IF NOT EXISTS {};", escape_ident(&collection.table));
        info!("Sending DEFINE TABLE: {}", define_table);
        collection.execute_query(&define_table).await?;

        info!(
            "SurrealDB gateway initialized for ns: {}, db: {}, table: {}",
            collection.namespace,
            collection.database,
            collection.table
        );
        Ok(collection)
    }

    async fn send_sql(&self, sql: &str, with_ns: bool, with_db: bool) -> Result<Value, GatewayError> {
        let sql_url = format!("{}/sql", self.host);
        let mut req = self.client
            .post(&sql_url)
            .header("Content-Type", "text/plain")
            .header("Accept", "application/json")
            .body(sql.to_string());

        if with_ns {
            req = req.header("NS", &self.namespace).header("Surreal-NS", &self.namespace);
        }
        if with_db {
            req = req.header("DB", &self.database).header("Surreal-DB", &self.database);
        }
        if let Some(ref auth) = self.auth_header {
            req = req.header("Authorization", auth);
        }

        debug!("Executing query: {} with NS: {} DB: {}", sql, self.namespace, self.database);

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            error!("Query execution failed (Status: {}): {}", status, text);
            return Err(format!("Query execution failed (Status: {}): {}", status, text).into());
        }

        debug!("Query successful. Response text: {}", text);
        let json: Value = serde_json::from_str(&text)
            .map_err(|e| format!("Failed to parse query response JSON: {}", e))?;
        check_statements(&json)?;
        Ok(json)
    }

    async fn execute_query(&self, query: &str) -> Result<Value, GatewayError> {
        self.send_sql(query, true, true).await
    }

    async fn existing_indexes(&self) -> Result<Vec<(String, String)>, GatewayError> {
        let q = format!("INFO FOR TABLE {};", escape_ident(&self.table));
        let v = self.execute_query(&q).await?;
        debug!("Raw INFO FOR TABLE {} response: {:?}", self.table, v);
        Ok(indexes_from_info(&v))
    }
}

#[async_trait]
impl CollectionGateway for SurrealCollection {
    async fn create_indexes(&self, specs: &[IndexSpec]) -> Result<Vec<String>, GatewayError> {
        if specs.is_empty() {
            return Ok(Vec::new());
        }
        check_supported(specs)?;

        let existing = self.existing_indexes().await?;
        let (names, statements) = pending_statements(&existing, &self.table, specs)?;

        if statements.is_empty() {
            info!("All {} indexes already present on '{}'", specs.len(), self.table);
            return Ok(names);
        }

        info!("Defining {} indexes on '{}'", statements.len(), self.table);
        self.execute_query(&statements.join("\n")).await?;
        Ok(names)
    }
}

/// Rejects specs SurrealDB cannot express: expiring indexes and
/// descending keys.
fn check_supported(specs: &[IndexSpec]) -> Result<(), GatewayError> {
    for spec in specs {
        if spec.expire_after_seconds.is_some() {
            return Err(
                format!(
                    "SurrealDB does not support expiring indexes (index '{}')",
                    spec.effective_name()
                ).into()
            );
        }
        if let Some(key) = spec.keys.iter().find(|k| k.direction == Direction::Descending) {
            return Err(
                format!(
                    "SurrealDB does not support descending index keys (field '{}' in index '{}')",
                    key.field,
                    spec.effective_name()
                ).into()
            );
        }
    }
    Ok(())
}

/// Splits the requested specs against the table's existing definitions.
/// Returns every requested name and the statements still to send; an
/// identical existing index is skipped, a different one under the same
/// name is an error.
fn pending_statements(
    existing: &[(String, String)],
    table: &str,
    specs: &[IndexSpec]
) -> Result<(Vec<String>, Vec<String>), GatewayError> {
    let mut names = Vec::with_capacity(specs.len());
    let mut statements = Vec::new();
    for spec in specs {
        let name = spec.effective_name();
        let statement = define_index_statement(table, spec);
        match existing.iter().find(|(n, _)| *n == name) {
            Some((_, definition)) if normalize(definition) == normalize(&statement) => {
                debug!("Index '{}' already defined on '{}' with identical definition", name, table);
            }
            Some((_, definition)) => {
                return Err(
                    format!(
                        "Index '{}' already exists on '{}' with a different definition: {}",
                        name,
                        table,
                        definition
                    ).into()
                );
            }
            None => statements.push(format!("{};", statement)),
        }
        names.push(name);
    }
    Ok((names, statements))
}

fn escape_ident(ident: &str) -> String {
    let plain = !ident.is_empty() &&
        !ident.starts_with(|c: char| c.is_ascii_digit()) &&
        ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        ident.to_string()
    } else {
        format!("`{}`", ident.replace('`', "\\`"))
    }
}

/// `DEFINE INDEX <name> ON <table> FIELDS <f, ...> [UNIQUE]`, the form
/// `INFO FOR TABLE` reports back. Key direction is checked beforehand.
fn define_index_statement(table: &str, spec: &IndexSpec) -> String {
    let fields = spec.keys
        .iter()
        .map(|k| escape_ident(&k.field))
        .collect::<Vec<_>>()
        .join(", ");
    let mut statement = format!(
        "DEFINE INDEX {} ON {} FIELDS {}",
        escape_ident(&spec.effective_name()),
        escape_ident(table),
        fields
    );
    if spec.is_unique() {
        statement.push_str(" UNIQUE");
    }
    statement
}

fn normalize(definition: &str) -> String {
    definition
        .trim()
        .trim_end_matches(';')
        .replace(" ON TABLE ", " ON ")
        .replace(['`', '⟨', '⟩'], "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fails on the first statement result whose status is not `OK`.
fn check_statements(response: &Value) -> Result<(), GatewayError> {
    let Some(results) = response.as_array() else {
        return Ok(());
    };
    for result in results {
        let status = result.get("status").and_then(Value::as_str).unwrap_or("OK");
        if status != "OK" {
            let detail = result
                .get("result")
                .or_else(|| result.get("detail"))
                .map(|d| d.as_str().map(String::from).unwrap_or_else(|| d.to_string()))
                .unwrap_or_default();
            error!("SurrealDB statement failed: {}", detail);
            return Err(format!("SurrealDB statement failed: {}", detail).into());
        }
    }
    Ok(())
}

fn indexes_from_info(response: &Value) -> Vec<(String, String)> {
    let first = match response.as_array() {
        Some(arr) => arr.first(),
        None => Some(response),
    };
    let info = first.map(|obj| obj.get("result").unwrap_or(obj));
    match info.and_then(|i| i.get("indexes")).and_then(Value::as_object) {
        Some(map) =>
            map
                .iter()
                .filter_map(|(name, def)| def.as_str().map(|d| (name.clone(), d.to_string())))
                .collect(),
        None => {
            debug!("No 'indexes' object in INFO FOR TABLE response.");
            Vec::new()
        }
    }
}
