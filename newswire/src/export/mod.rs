use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::ExportError;

pub mod remote;

/// Lifecycle of an export job. `Complete` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStatus {
    Pending,
    Complete,
    Failed,
    /// The service no longer knows the request id; the job gets resubmitted.
    Expired,
}

impl ExportStatus {
    /// Map the service's status string. Anything that is not terminal counts as pending.
    pub fn from_remote(status: &str) -> Self {
        match status {
            "complete" => ExportStatus::Complete,
            "failed" => ExportStatus::Failed,
            _ => ExportStatus::Pending,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ExportStatus::Complete | ExportStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportJob {
    pub document_id: String,
    pub page_id: String,
    pub request_id: String,
    pub status: ExportStatus,
    pub download_link: Option<String>,
    /// Status string from the latest status reply, verbatim (e.g. "inProgress").
    pub remote_status: Option<String>,
    /// How many times the job was resubmitted after its request id expired.
    pub resubmissions: u32,
}

impl ExportJob {
    pub fn new(
        document_id: impl Into<String>,
        page_id: impl Into<String>,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            page_id: page_id.into(),
            request_id: request_id.into(),
            status: ExportStatus::Pending,
            download_link: None,
            remote_status: None,
            resubmissions: 0,
        }
    }

    fn restart(&mut self, request_id: String) {
        self.request_id = request_id;
        self.status = ExportStatus::Pending;
        self.download_link = None;
        self.remote_status = None;
        self.resubmissions += 1;
    }
}

/// Status body returned for a known request id.
#[derive(Debug, Clone)]
pub struct StatusPayload {
    pub status: String,
    pub download_link: Option<String>,
    /// Full body, surfaced to the caller when the job fails.
    pub raw: serde_json::Value,
}

/// Classified answer to a status query.
#[derive(Debug, Clone)]
pub enum StatusReply {
    Progress(StatusPayload),
    /// HTTP 404: the request id expired.
    Expired,
    /// Any other non-200 status.
    Transient { status: u16, body: String },
}

/// The document-export HTTP surface.
#[async_trait::async_trait]
pub trait ExportApi: Send + Sync {
    /// Start an export and return its request id.
    async fn submit(&self, document_id: &str, page_id: &str) -> Result<String, ExportError>;

    async fn status(
        &self,
        document_id: &str,
        page_id: &str,
        request_id: &str,
    ) -> Result<StatusReply, ExportError>;

    /// Fetch the finished artifact behind a download link.
    async fn download(&self, link: &str) -> Result<String, ExportError>;
}

type ProgressFn = Box<dyn Fn(&ExportJob) + Send + Sync>;

/// Submits export jobs and polls them at a fixed interval until they finish.
///
/// There is no retry cap and no overall timeout: a job the service never
/// finishes is polled forever.
pub struct StatusPoller<A> {
    api: A,
    interval: Duration,
    on_progress: Option<ProgressFn>,
}

impl<A: ExportApi> StatusPoller<A> {
    pub fn new(api: A, interval: Duration) -> Self {
        Self {
            api,
            interval,
            on_progress: None,
        }
    }

    /// Called after every status observation (including expiry).
    pub fn on_progress(mut self, f: impl Fn(&ExportJob) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub async fn submit(&self, document_id: &str, page_id: &str) -> Result<ExportJob, ExportError> {
        let request_id = self.api.submit(document_id, page_id).await?;
        info!(%request_id, document_id, page_id, "export started");
        Ok(ExportJob::new(document_id, page_id, request_id))
    }

    /// Submit a job and wait for it to complete.
    pub async fn run(&self, document_id: &str, page_id: &str) -> Result<ExportJob, ExportError> {
        let mut job = self.submit(document_id, page_id).await?;
        self.wait(&mut job).await?;
        Ok(job)
    }

    /// Poll `job` until it completes, resubmitting whenever its request id expires.
    /// On success the job carries its download link; a failed job returns the
    /// service's payload as `ExportError::JobFailed`. Non-200 replies and
    /// connection failures are retried at the poll interval.
    pub async fn wait(&self, job: &mut ExportJob) -> Result<(), ExportError> {
        loop {
            let reply = match self
                .api
                .status(&job.document_id, &job.page_id, &job.request_id)
                .await
            {
                Ok(reply) => reply,
                Err(ExportError::Unavailable(reason)) => {
                    warn!(%reason, request_id = %job.request_id, "status service unreachable, retrying");
                    tokio::time::sleep(self.interval).await;
                    continue;
                }
                Err(e) => return Err(e),
            };

            match reply {
                StatusReply::Expired => {
                    warn!(request_id = %job.request_id, "export request expired, resubmitting");
                    job.status = ExportStatus::Expired;
                    self.notify(job);
                    let request_id = self.api.submit(&job.document_id, &job.page_id).await?;
                    info!(%request_id, "export restarted");
                    job.restart(request_id);
                    continue;
                }
                StatusReply::Transient { status, body } => {
                    warn!(status, %body, request_id = %job.request_id, "status check failed, retrying");
                }
                StatusReply::Progress(payload) => {
                    job.status = ExportStatus::from_remote(&payload.status);
                    job.remote_status = Some(payload.status);
                    self.notify(job);

                    match job.status {
                        ExportStatus::Complete => {
                            let link = payload.download_link.ok_or_else(|| {
                                ExportError::Parse("complete export has no downloadLink".to_string())
                            })?;
                            job.download_link = Some(link);
                            info!(request_id = %job.request_id, "export completed");
                            return Ok(());
                        }
                        ExportStatus::Failed => {
                            return Err(ExportError::JobFailed {
                                payload: payload.raw,
                            });
                        }
                        _ => {}
                    }
                }
            }

            tokio::time::sleep(self.interval).await;
        }
    }

    fn notify(&self, job: &ExportJob) {
        if let Some(f) = &self.on_progress {
            f(job);
        }
    }
}

/// Download the artifact of a completed job and write it to `path`.
/// Returns the number of bytes written. No retry on failure.
pub async fn save_document<A: ExportApi + ?Sized>(
    api: &A,
    job: &ExportJob,
    path: &Path,
) -> Result<usize, ExportError> {
    let link = job
        .download_link
        .as_deref()
        .filter(|_| job.status == ExportStatus::Complete)
        .ok_or_else(|| ExportError::Parse("export job is not complete".to_string()))?;

    let content = api.download(link).await?;
    tokio::fs::write(path, content.as_bytes()).await?;
    info!(path = %path.display(), bytes = content.len(), "exported document saved");
    Ok(content.len())
}
