use std::{collections::BTreeMap, sync::Arc};

use anyhow::anyhow;
use polars::prelude::{Column, DataFrame};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    common::{classify_status, retry_loop, Fetcher, HttpFetcher, KeyedStore, RetryCause, RetryError, StatusClass, Step},
    geography::{column_name, CensusGeographyQuerySpec, GeoFilterSpec},
    geom::string_column,
    Config, Error, Result,
};

/// Metadata for one Census API variable.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub concept: Option<String>,
    #[serde(default)]
    pub predicate_type: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
}

#[derive(Deserialize)]
struct GroupResponse {
    variables: BTreeMap<String, Variable>,
}

/// (dataset, year, variable or group name)
type MetadataKey = (String, u16, String);

impl CensusGeographyQuerySpec {
    /// Full request URL against `host`, with encoded query parameters.
    pub fn url_with_params(&self, host: &str) -> Result<String> {
        let url = reqwest::Url::parse_with_params(&self.base_url(host), self.params())
            .map_err(|e| Error::Config(format!("invalid request URL for {}: {e}", self.base_url(host))))?;
        Ok(url.to_string())
    }
}

/// Blocking client for the Census Data API.
pub struct CensusClient {
    config: Config,
    fetcher: Arc<dyn Fetcher>,
    variables: KeyedStore<MetadataKey, Arc<Variable>>,
    groups: KeyedStore<MetadataKey, Arc<Vec<Variable>>>,
}

/// Parse a JSON array-of-arrays response; the first row is the header.
/// Geography headers are renamed to their tabular column names.
fn parse_table(url: &str, status: u16, body: &[u8], geo_levels: &[&str]) -> Result<DataFrame> {
    let malformed = || Error::DataFetch {
        url: url.to_string(),
        status,
        body: String::from_utf8_lossy(body).into_owned(),
    };

    let table: Vec<Vec<Value>> = serde_json::from_slice(body).map_err(|_| malformed())?;
    let Some((header, rows)) = table.split_first() else { return Err(malformed()) };
    let header: Vec<&str> = header.iter().map(Value::as_str).collect::<Option<_>>().ok_or_else(malformed)?;
    if rows.iter().any(|row| row.len() != header.len()) {
        return Err(malformed());
    }

    let cell = |v: &Value| match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    };

    let columns = header.iter().enumerate()
        .map(|(j, &name)| {
            let name = if geo_levels.contains(&name) { column_name(name) } else { name.to_string() };
            let values: Vec<Option<String>> = rows.iter().map(|row| cell(&row[j])).collect();
            Column::new(name.into(), values)
        })
        .collect::<Vec<_>>();

    Ok(DataFrame::new(columns)?)
}

/// Append the non-geography columns of `next` to `acc`, checking both batches describe the same rows.
fn merge_batch(mut acc: DataFrame, next: DataFrame, geo_columns: &[String]) -> Result<DataFrame> {
    if acc.height() != next.height() {
        return Err(anyhow!("field batches returned {} and {} rows", acc.height(), next.height()).into());
    }
    for name in geo_columns {
        if string_column(&acc, name)? != string_column(&next, name)? {
            return Err(anyhow!("field batches disagree on geography column {name}").into());
        }
    }

    let present: Vec<String> = acc.get_column_names().iter().map(|c| c.to_string()).collect();
    for column in next.get_columns() {
        if !present.iter().any(|p| p.as_str() == column.name().as_str()) {
            acc.with_column(column.clone())?;
        }
    }
    Ok(acc)
}

impl CensusClient {
    /// Client over HTTP using the configured retry policy and timeout.
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = HttpFetcher::new(config.retry.timeout())?;
        Self::with_fetcher(config, Arc::new(fetcher))
    }

    pub fn with_fetcher(config: Config, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            fetcher,
            variables: KeyedStore::new(),
            groups: KeyedStore::new(),
        })
    }

    #[inline] pub fn config(&self) -> &Config { &self.config }

    /// Resolve `filters` and build the request, carrying the configured API key.
    pub fn query(&self, dataset: &str, year: u16, fields: &[impl AsRef<str>], filters: &GeoFilterSpec) -> Result<CensusGeographyQuerySpec> {
        Ok(CensusGeographyQuerySpec::from_filters(dataset, year, fields, filters)?
            .with_api_key(self.config.api_key.clone()))
    }

    /// GET with retry; returns the success status and body.
    fn fetch(&self, url: &str) -> Result<(u16, Vec<u8>)> {
        let result = retry_loop(&self.config.retry, url, |_| {
            let mut body = Vec::new();
            match self.fetcher.get(url, &mut body) {
                Err(e) if e.retryable => Step::Retry(RetryCause::Transient(e.message)),
                Err(e) => Step::Fail(Error::DataFetch { url: url.to_string(), status: 0, body: e.message }),
                Ok(status) => match classify_status(status) {
                    StatusClass::Success => Step::Done((status, body)),
                    StatusClass::Transient => Step::Retry(RetryCause::Transient(format!("HTTP {status}"))),
                    StatusClass::Terminal => Step::Fail(Error::DataFetch {
                        url: url.to_string(),
                        status,
                        body: String::from_utf8_lossy(&body).into_owned(),
                    }),
                },
            }
        });

        match result {
            Ok(response) => Ok(response),
            Err(RetryError::Fatal(e)) => Err(e),
            Err(RetryError::Exhausted { attempts, last }) => Err(Error::Network {
                url: url.to_string(),
                attempts,
                message: last.message().to_string(),
            }),
        }
    }

    /// Fetch `fields` for the geography described by `filters`.
    ///
    /// Long field lists are split into batches of at most `max_fields_per_request`
    /// and merged column-wise. Geography columns are named by [`column_name`].
    pub fn download(&self, dataset: &str, year: u16, fields: &[impl AsRef<str>], filters: &GeoFilterSpec) -> Result<DataFrame> {
        let query = self.query(dataset, year, fields, filters)?;
        self.execute(&query)
    }

    /// Run a prepared query.
    pub fn execute(&self, query: &CensusGeographyQuerySpec) -> Result<DataFrame> {
        let levels: Vec<&str> = query.bound().bindings().iter().map(|(level, _)| *level).collect();
        let geo_columns: Vec<String> = levels.iter().map(|l| column_name(l)).collect();

        let batches = query.batches(self.config.max_fields_per_request);
        info!(dataset = query.dataset(), year = query.year(), code = query.bound().code(), batches = batches.len(), "downloading census data");

        let mut merged: Option<DataFrame> = None;
        for batch in &batches {
            let url = batch.url_with_params(&self.config.api_host)?;
            debug!(url = %url, fields = batch.fields().len(), "requesting field batch");
            let (status, body) = self.fetch(&url)?;
            let frame = parse_table(&url, status, &body, &levels)?;
            merged = Some(match merged {
                None => frame,
                Some(acc) => merge_batch(acc, frame, &geo_columns)?,
            });
        }
        merged.ok_or_else(|| anyhow!("query produced no requests").into())
    }

    fn metadata_url(&self, dataset: &str, year: u16, path: &str) -> Result<String> {
        let base = format!("{}/data/{year}/{}/{path}", self.config.api_host.trim_end_matches('/'), dataset.trim_matches('/'));
        let Some(key) = &self.config.api_key else { return Ok(base) };
        let url = reqwest::Url::parse_with_params(&base, &[("key", key.as_str())])
            .map_err(|e| Error::Config(format!("invalid metadata URL {base}: {e}")))?;
        Ok(url.to_string())
    }

    fn fetch_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let (status, body) = self.fetch(url)?;
        serde_json::from_slice(&body).map_err(|_| Error::DataFetch {
            url: url.to_string(),
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }

    /// Metadata for one variable, cached per (dataset, year, name).
    pub fn variable(&self, dataset: &str, year: u16, name: &str) -> Result<Arc<Variable>> {
        let key = (dataset.to_string(), year, name.to_string());
        self.variables.get_or_try_insert_with(key, || {
            let url = self.metadata_url(dataset, year, &format!("variables/{name}.json"))?;
            let mut variable: Variable = self.fetch_json(&url)?;
            if variable.name.is_empty() { variable.name = name.to_string() }
            Ok(Arc::new(variable))
        })
    }

    /// Every variable in a table group, sorted by name, cached per (dataset, year, group).
    pub fn group_variables(&self, dataset: &str, year: u16, group: &str) -> Result<Arc<Vec<Variable>>> {
        let key = (dataset.to_string(), year, group.to_string());
        self.groups.get_or_try_insert_with(key, || {
            let url = self.metadata_url(dataset, year, &format!("groups/{group}.json"))?;
            let response: GroupResponse = self.fetch_json(&url)?;
            Ok(Arc::new(response.variables.into_iter()
                .map(|(name, variable)| Variable { name, ..variable })
                .collect()))
        })
    }

    /// Drop cached metadata for one variable. Returns whether it was cached.
    pub fn invalidate_variable(&self, dataset: &str, year: u16, name: &str) -> bool {
        self.variables.invalidate(&(dataset.to_string(), year, name.to_string()))
    }

    /// Drop all cached variable and group metadata, returning how many entries were removed.
    pub fn clear_metadata(&self) -> usize {
        self.variables.clear() + self.groups.clear()
    }
}
