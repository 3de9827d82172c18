use common::ExportConfig;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{ExportApi, StatusPayload, StatusReply};
use crate::error::ExportError;

/// Export API client speaking the Coda-style `/docs/{doc}/pages/{page}/export` surface
/// with a bearer token.
pub struct RemoteExportApi {
    base_url: String,
    api_token: String,
    output_format: String,
    client: Client,
}

impl RemoteExportApi {
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
            output_format: "html".to_string(),
            client: Client::new(),
        }
    }

    pub fn with_output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = format.into();
        self
    }

    pub fn from_config(config: &ExportConfig, api_token: &str) -> Self {
        Self::new(&config.api_base, api_token).with_output_format(&config.output_format)
    }

    fn export_url(&self, document_id: &str, page_id: &str) -> String {
        format!(
            "{}/docs/{}/pages/{}/export",
            self.base_url, document_id, page_id
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportRequest<'a> {
    output_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct ExportStarted {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportStatusBody {
    status: String,
    download_link: Option<String>,
}

fn unavailable(e: reqwest::Error) -> ExportError {
    ExportError::Unavailable(e.to_string())
}

#[async_trait::async_trait]
impl ExportApi for RemoteExportApi {
    async fn submit(&self, document_id: &str, page_id: &str) -> Result<String, ExportError> {
        let response = self
            .client
            .post(self.export_url(document_id, page_id))
            .bearer_auth(&self.api_token)
            .json(&ExportRequest {
                output_format: &self.output_format,
            })
            .send()
            .await
            .map_err(unavailable)?;

        let status = response.status();
        let body = response.text().await.map_err(unavailable)?;
        if status != StatusCode::OK && status != StatusCode::ACCEPTED {
            return Err(ExportError::Submit {
                status: status.as_u16(),
                body,
            });
        }

        let started: ExportStarted = serde_json::from_str(&body)
            .map_err(|e| ExportError::Parse(format!("export response: {e}")))?;
        Ok(started.id)
    }

    async fn status(
        &self,
        document_id: &str,
        page_id: &str,
        request_id: &str,
    ) -> Result<StatusReply, ExportError> {
        let url = format!("{}/{}", self.export_url(document_id, page_id), request_id);
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(unavailable)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(StatusReply::Expired);
        }
        let body = response.text().await.map_err(unavailable)?;
        if status != StatusCode::OK {
            return Ok(StatusReply::Transient {
                status: status.as_u16(),
                body,
            });
        }

        let raw: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| ExportError::Parse(format!("status response: {e}")))?;
        let parsed: ExportStatusBody = serde_json::from_value(raw.clone())
            .map_err(|e| ExportError::Parse(format!("status response: {e}")))?;

        Ok(StatusReply::Progress(StatusPayload {
            status: parsed.status,
            download_link: parsed.download_link,
            raw,
        }))
    }

    async fn download(&self, link: &str) -> Result<String, ExportError> {
        // Download links are pre-signed; no bearer token.
        let response = self.client.get(link).send().await.map_err(unavailable)?;
        let status = response.status();
        let body = response.text().await.map_err(unavailable)?;
        if status != StatusCode::OK {
            return Err(ExportError::Download {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}
