//! [`RecordStore`] over the PostgREST API of a Supabase project

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::{Filter, RecordStore, Select, StoreError, Table};
use crate::config::StoreConfig;
use crate::fetch::{Fetch, FetchBuilder};

const CLIENT_INFO: &str = concat!("ecobazaar/", env!("CARGO_PKG_VERSION"));

/// Record store backed by `/rest/v1`
#[derive(Debug, Clone)]
pub struct PostgrestStore {
    config: StoreConfig,
    client: Client,
}

impl PostgrestStore {
    /// Create a store with its own HTTP client honouring the configured timeout
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_client(config, builder.build()?))
    }

    /// Create a store sharing an existing HTTP client
    pub fn with_client(config: StoreConfig, client: Client) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/{}", self.config.rest_url(), table)
    }

    fn prepare<'a>(&self, fetch: FetchBuilder<'a>) -> FetchBuilder<'a> {
        let token = self
            .config
            .access_token
            .as_deref()
            .unwrap_or(&self.config.anon_key);
        let mut fetch = fetch
            .header("apikey", &self.config.anon_key)
            .header("X-Client-Info", CLIENT_INFO)
            .bearer_auth(token);
        if self.config.schema != "public" {
            fetch = fetch
                .header("Accept-Profile", &self.config.schema)
                .header("Content-Profile", &self.config.schema);
        }
        fetch
    }
}

fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|f| (f.column.clone(), f.to_param()))
        .collect()
}

fn into_rows(table: Table, value: Value) -> Result<Vec<Value>, StoreError> {
    match value {
        Value::Array(rows) => Ok(rows),
        Value::Null => Ok(Vec::new()),
        Value::Object(_) => Ok(vec![value]),
        other => Err(StoreError::Deserialization(format!(
            "expected rows from {}, got {}",
            table, other
        ))),
    }
}

#[async_trait]
impl RecordStore for PostgrestStore {
    async fn insert(&self, table: Table, records: Vec<Value>) -> Result<Vec<Value>, StoreError> {
        debug!("insert {} row(s) into {}", records.len(), table);
        let body = self
            .prepare(Fetch::post(&self.client, &self.table_url(table)))
            .header("Prefer", "return=representation")
            .json(&records)?
            .execute()
            .await?;
        into_rows(table, body)
    }

    async fn select(&self, table: Table, query: &Select) -> Result<Vec<Value>, StoreError> {
        debug!("select from {} ({} filter(s))", table, query.filters.len());
        let mut params = vec![("select".to_string(), query.columns())];
        params.extend(filter_params(&query.filters));
        if let Some((column, order)) = &query.order {
            params.push(("order".to_string(), format!("{}.{}", column, order.as_str())));
        }
        if let Some(limit) = query.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        let body = self
            .prepare(Fetch::get(&self.client, &self.table_url(table)))
            .query(params)
            .execute()
            .await?;
        into_rows(table, body)
    }

    async fn update(
        &self,
        table: Table,
        patch: Value,
        filters: &[Filter],
    ) -> Result<usize, StoreError> {
        debug!("update {} ({} filter(s))", table, filters.len());
        let body = self
            .prepare(Fetch::patch(&self.client, &self.table_url(table)))
            .header("Prefer", "return=representation")
            .query(filter_params(filters))
            .json(&patch)?
            .execute()
            .await?;
        Ok(into_rows(table, body)?.len())
    }

    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<usize, StoreError> {
        debug!("delete from {} ({} filter(s))", table, filters.len());
        let body = self
            .prepare(Fetch::delete(&self.client, &self.table_url(table)))
            .header("Prefer", "return=representation")
            .query(filter_params(filters))
            .execute()
            .await?;
        Ok(into_rows(table, body)?.len())
    }

    async fn rpc(&self, function: &str, params: Value) -> Result<Value, StoreError> {
        debug!("rpc {}", function);
        let url = format!("{}/rpc/{}", self.config.rest_url(), function);
        self.prepare(Fetch::post(&self.client, &url))
            .json(&params)?
            .execute()
            .await
    }
}
