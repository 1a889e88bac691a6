//! Google Sheets v4 `spreadsheets.values` client.

use crate::config::SheetConfig;
use crate::database::range::RangeSpec;
use crate::error::SheetOrmError;
use crate::store::credentials::Credentials;
use crate::store::RangeUpdate;
use crate::store::TabularStore;
use crate::store::TransportError;
use crate::store::ValueInputOption;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::Response;
use serde::Deserialize;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

/// Body of a values read, and one entry of a batch write.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    major_dimension: Option<String>,
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

impl ValueRange {
    fn rows(range: &RangeSpec, values: Vec<Vec<String>>) -> Self {
        Self {
            range: Some(range.to_string()),
            major_dimension: Some("ROWS".to_owned()),
            values: values
                .into_iter()
                .map(|row| row.into_iter().map(serde_json::Value::String).collect())
                .collect(),
        }
    }

    /// Cell text of every returned row.
    fn into_text(self) -> Vec<Vec<String>> {
        self.values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateRequest {
    value_input_option: ValueInputOption,
    data: Vec<ValueRange>,
}

/// Renders a JSON cell as text; formatted reads return strings, but
/// numbers and booleans may appear with other render options.
fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text,
        serde_json::Value::Null => String::new(),
        serde_json::Value::Bool(flag) => if flag { "TRUE" } else { "FALSE" }.to_owned(),
        other => other.to_string(),
    }
}

/// A [`TabularStore`] over one Google spreadsheet.
pub struct SheetsStore {
    client: Client,
    endpoint: Url,
    spreadsheet_id: String,
    credentials: Arc<dyn Credentials>,
    /// Bearer token obtained by `authenticate`
    token: RwLock<Option<String>>,
}

impl SheetsStore {
    pub fn new(config: &SheetConfig, credentials: Arc<dyn Credentials>) -> Result<Self, SheetOrmError> {
        config.validate()?;
        let client = Client::builder()
            .user_agent(config.application_name.as_str())
            .timeout(config.timeout())
            .build()
            .map_err(TransportError::from)?;
        Ok(Self {
            client,
            endpoint: Url::parse(&config.endpoint)?,
            spreadsheet_id: config.spreadsheet_id.to_owned(),
            credentials,
            token: RwLock::new(None),
        })
    }

    /// `{endpoint}spreadsheets/{id}/{tail...}` with every segment escaped.
    fn url(&self, tail: &[&str]) -> Result<Url, TransportError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::ResponseError(format!("endpoint '{}' cannot be a base", self.endpoint)))?
            .pop_if_empty()
            .push("spreadsheets")
            .push(&self.spreadsheet_id)
            .extend(tail);
        Ok(url)
    }

    fn values_url(&self, range: &RangeSpec) -> Result<Url, TransportError> {
        self.url(&["values", range.to_string().as_str()])
    }

    fn batch_update_url(&self) -> Result<Url, TransportError> {
        self.url(&["values:batchUpdate"])
    }

    async fn bearer(&self) -> Result<String, TransportError> {
        self.token.read().await.clone().ok_or(TransportError::Unauthenticated)
    }

    /// Turns a non-success status into [`TransportError::StatusError`].
    async fn check(response: Response) -> Result<Response, TransportError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(TransportError::StatusError {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl TabularStore for SheetsStore {
    async fn authenticate(&self) -> Result<(), TransportError> {
        let token = self.credentials.access_token().await?;
        *self.token.write().await = Some(token);
        debug!("Authenticated against spreadsheet '{}'", self.spreadsheet_id);
        Ok(())
    }

    async fn read_range(&self, range: &RangeSpec) -> Result<Vec<Vec<String>>, TransportError> {
        let url = self.values_url(range)?;
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .bearer_auth(self.bearer().await?)
            .query(&[("majorDimension", "ROWS"), ("valueRenderOption", "FORMATTED_VALUE")])
            .send()
            .await?;
        let body: ValueRange = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| TransportError::ResponseError(e.to_string()))?;
        Ok(body.into_text())
    }

    async fn write_range(
        &self,
        range: &RangeSpec,
        values: Vec<Vec<String>>,
        option: ValueInputOption,
    ) -> Result<(), TransportError> {
        let url = self.values_url(range)?;
        debug!("PUT {} ({} rows)", url, values.len());
        let response = self
            .client
            .put(url)
            .bearer_auth(self.bearer().await?)
            .query(&[("valueInputOption", option.as_str())])
            .json(&ValueRange::rows(range, values))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn batch_write(&self, updates: Vec<RangeUpdate>, option: ValueInputOption) -> Result<(), TransportError> {
        let url = self.batch_update_url()?;
        debug!("POST {} ({} ranges)", url, updates.len());
        let request = BatchUpdateRequest {
            value_input_option: option,
            data: updates
                .into_iter()
                .map(|update| ValueRange::rows(&update.range, update.values))
                .collect(),
        };
        let response = self
            .client
            .post(url)
            .bearer_auth(self.bearer().await?)
            .json(&request)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
