use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::models::VotingRecord;

/// Fields requested from the voting locations table
const RECORD_FIELDS: [&str; 11] = [
    "Category",
    "Date and Time",
    "End Time",
    "Name of Voting Location or Voting Event",
    "Borough",
    "Address",
    "Geocode Cache (For Maps Extension)",
    "Address Formatted",
    "Zip Code",
    "Open Hours",
    "CS Open Hours",
];

/// Errors that can occur when interacting with Airtable
#[derive(Debug, Error)]
pub enum AirtableError {
    #[error("Airtable API token or IDs are not configured")]
    NotConfigured,

    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Airtable API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Supplies the full, unfiltered record collection
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<VotingRecord>, AirtableError>;
}

/// Paging limits for a table read
#[derive(Debug, Clone, Copy)]
pub struct FetchLimits {
    pub max_records: usize,
    pub page_size: usize,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            max_records: 400,
            page_size: 100,
        }
    }
}

/// Airtable REST client for the voting locations table
pub struct AirtableClient {
    base_url: String,
    api_token: String,
    base_id: String,
    table_id: String,
    limits: FetchLimits,
    client: Client,
}

impl AirtableClient {
    /// Create a new Airtable client
    pub fn new(
        base_url: String,
        api_token: String,
        base_id: String,
        table_id: String,
        limits: FetchLimits,
        timeout: Duration,
    ) -> Result<Self, AirtableError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            api_token,
            base_id,
            table_id,
            limits,
            client,
        })
    }

    fn is_configured(&self) -> bool {
        !self.api_token.is_empty() && !self.base_id.is_empty() && !self.table_id.is_empty()
    }

    fn page_url(&self, offset: Option<&str>) -> String {
        let fields: String = RECORD_FIELDS
            .iter()
            .map(|f| format!("fields[]={}&", urlencoding::encode(f)))
            .collect();

        let mut url = format!(
            "{}/v0/{}/{}?{}pageSize={}&maxRecords={}",
            self.base_url.trim_end_matches('/'),
            self.base_id,
            self.table_id,
            fields,
            self.limits.page_size,
            self.limits.max_records
        );

        if let Some(offset) = offset {
            url.push_str("&offset=");
            url.push_str(&urlencoding::encode(offset));
        }

        url
    }

    /// Fetch one page, returning its records and the next offset
    async fn fetch_page(
        &self,
        offset: Option<&str>,
    ) -> Result<(Vec<VotingRecord>, Option<String>), AirtableError> {
        let url = self.page_url(offset);
        tracing::debug!("Fetching Airtable URL: {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|body| {
                    body.pointer("/error/type")
                        .or_else(|| body.get("error"))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or_else(|| status.to_string());
            return Err(AirtableError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let json: Value = response.json().await?;

        let documents = json
            .get("records")
            .and_then(|r| r.as_array())
            .ok_or_else(|| AirtableError::InvalidResponse("Missing records array".into()))?;

        let records = documents
            .iter()
            .filter_map(|doc| match serde_json::from_value(doc.clone()) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("Skipping malformed Airtable record: {}", e);
                    None
                }
            })
            .collect();

        let next = json
            .get("offset")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok((records, next))
    }
}

#[async_trait]
impl RecordSource for AirtableClient {
    async fn fetch_all(&self) -> Result<Vec<VotingRecord>, AirtableError> {
        if !self.is_configured() {
            tracing::error!("Airtable API token or IDs are missing");
            return Err(AirtableError::NotConfigured);
        }

        let mut all_records: Vec<VotingRecord> = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let (records, next) = self.fetch_page(offset.as_deref()).await?;
            all_records.extend(records);

            match next {
                Some(next) if all_records.len() < self.limits.max_records => offset = Some(next),
                _ => break,
            }
        }

        all_records.truncate(self.limits.max_records);
        tracing::info!("Successfully fetched {} Airtable records", all_records.len());

        Ok(all_records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_client(token: &str) -> AirtableClient {
        AirtableClient::new(
            "https://airtable.test/".to_string(),
            token.to_string(),
            "app123".to_string(),
            "tbl456".to_string(),
            FetchLimits::default(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_page_url() {
        let client = create_client("token");
        let url = client.page_url(Some("itr/rec9"));

        assert!(url.starts_with("https://airtable.test/v0/app123/tbl456?fields[]=Category&"));
        assert!(url.contains("fields[]=Date%20and%20Time&"));
        assert!(url.contains("pageSize=100&maxRecords=400"));
        assert!(url.ends_with("&offset=itr%2Frec9"));
    }

    #[test]
    fn test_missing_token_is_unconfigured() {
        let client = create_client("");
        let result = tokio_test::block_on(client.fetch_all());
        assert!(matches!(result, Err(AirtableError::NotConfigured)));
    }
}
