//! PubMed abstract fetching through NCBI E-utilities `efetch`

use std::fmt::Display;
use std::time::Duration;

use entox_core::{EntoxError, FetchConfig, Result};
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Abstract text for one PMID
///
/// Serializes with the same `id`/`text` fields as a `Document`, so fetch
/// output can be fed straight to `entox batch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedAbstract {
    pub id: String,
    pub text: String,
    /// False when the connection dropped before the body was complete
    pub complete: bool,
}

pub struct PubMedFetcher {
    client: Client,
    config: FetchConfig,
}

impl PubMedFetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EntoxError::Fetch(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Fetch one abstract; no retries
    pub async fn fetch_abstract(&self, pmid: &str) -> Result<FetchedAbstract> {
        if pmid.is_empty() || !pmid.chars().all(|c| c.is_ascii_digit()) {
            return Err(EntoxError::Fetch(format!("Invalid PMID '{pmid}'")));
        }

        let response = self
            .client
            .get(&self.config.efetch_url)
            .query(&query_params(&self.config, pmid))
            .send()
            .await
            .map_err(|e| EntoxError::Fetch(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(EntoxError::Fetch(format!(
                "efetch returned {status}: {error_text}"
            )));
        }

        let (text, complete) = collect_body(response.bytes_stream()).await;
        if !complete {
            tracing::warn!(pmid, bytes = text.len(), "incomplete abstract body");
        }

        Ok(FetchedAbstract {
            id: pmid.to_string(),
            text,
            complete,
        })
    }
}

fn query_params(config: &FetchConfig, pmid: &str) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("db", "pubmed".to_string()),
        ("id", pmid.to_string()),
        ("retmode", "text".to_string()),
        ("rettype", "abstract".to_string()),
    ];
    if let Some(email) = &config.email {
        params.push(("email", email.clone()));
    }
    if let Some(key) = &config.api_key {
        params.push(("api_key", key.clone()));
    }
    params
}

/// Read a body stream to the end, keeping what arrived before an error
async fn collect_body<S, B, E>(stream: S) -> (String, bool)
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut stream = std::pin::pin!(stream);
    let mut body = Vec::new();

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => body.extend_from_slice(bytes.as_ref()),
            Err(e) => {
                tracing::debug!(error = %e, "body stream interrupted");
                return (String::from_utf8_lossy(&body).into_owned(), false);
            }
        }
    }

    (String::from_utf8_lossy(&body).into_owned(), true)
}
