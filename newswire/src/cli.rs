//! Interactive terminal flows for the `export` and `news` subcommands.

use anyhow::{Context, Result};
use common::Config;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::auth::TokenAuthority;
use crate::error::ExportError;
use crate::export::remote::RemoteExportApi;
use crate::export::{save_document, ExportJob, ExportStatus, StatusPoller};
use crate::news::format::format_articles;
use crate::news::{ResultSource, SearchContext, SearchQuery};

/// Line-oriented prompt over any reader/writer pair.
pub struct Prompter<R, W> {
    input: R,
    out: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, out: W) -> Self {
        Self { input, out }
    }

    /// Print `label` and read one trimmed line. `None` once input is exhausted.
    pub fn ask(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.out, "{label}")?;
        self.out.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    pub fn say(&mut self, line: impl AsRef<str>) -> Result<()> {
        writeln!(self.out, "{}", line.as_ref())?;
        Ok(())
    }

    pub fn into_inner(self) -> (R, W) {
        (self.input, self.out)
    }
}

/// Placeholder login: any name is accepted and gets a token. There is no
/// credential check.
pub fn login<R: BufRead, W: Write>(
    tokens: &TokenAuthority,
    prompt: &mut Prompter<R, W>,
) -> Result<Option<String>> {
    prompt.say("\n=== Authentication ===")?;
    let Some(username) = prompt.ask("Enter username (or 'demo' for demo): ")? else {
        return Ok(None);
    };
    let username = if username.is_empty() { "demo".to_string() } else { username };

    let token = tokens.issue(&username).context("failed to issue login token")?;
    let preview: String = token.chars().take(20).collect();
    prompt.say(format!("Login successful! Token: {preview}..."))?;
    Ok(Some(token))
}

/// Interactive search loop: login once, then search until the user declines to
/// continue or input ends. Search failures are reported and the loop goes on.
pub async fn news_session<R: BufRead, W: Write>(
    ctx: &mut SearchContext,
    prompt: &mut Prompter<R, W>,
) -> Result<()> {
    prompt.say("Newswire News Search")?;
    prompt.say("Features: JWT Auth, Rate Limiting, Caching")?;
    if ctx.tokens().is_insecure() {
        prompt.say("WARNING: no signing secret configured, tokens use an insecure development secret")?;
    }

    let Some(token) = login(ctx.tokens(), prompt)? else {
        prompt.say("Authentication failed. Exiting...")?;
        return Ok(());
    };

    loop {
        prompt.say(format!("\n{}", "=".repeat(50)))?;
        prompt.say("News Search")?;
        let Some(keyword) = prompt.ask("Enter a keyword to filter (or leave blank): ")? else {
            break;
        };
        let Some(from) = prompt.ask("Enter start date (DD-MM-YYYY, optional): ")? else {
            break;
        };
        let Some(to) = prompt.ask("Enter end date (DD-MM-YYYY, optional): ")? else {
            break;
        };

        let query = match SearchQuery::parse(&keyword, &from, &to) {
            Ok(q) => q,
            Err(e) => {
                prompt.say(e.to_string())?;
                continue;
            }
        };

        let articles = match ctx.search(&token, &query).await {
            Ok(outcome) => {
                match outcome.source {
                    ResultSource::Cache => prompt.say("Data served from cache")?,
                    ResultSource::Remote if !outcome.articles.is_empty() => prompt.say(format!(
                        "API call successful. {} requests remaining this minute.",
                        outcome.remaining
                    ))?,
                    ResultSource::Remote => {}
                }
                outcome.articles
            }
            Err(e) => {
                warn!(error = %e, "search failed");
                prompt.say(format!("Error: {e}"))?;
                Vec::new()
            }
        };

        for line in format_articles(&articles) {
            prompt.say(line)?;
        }

        match prompt.ask("\nSearch again? (y/n): ")? {
            Some(answer) if answer.to_lowercase() == "y" => continue,
            _ => break,
        }
    }
    Ok(())
}

/// Command-line overrides for the export flow.
#[derive(Debug, Default, Clone)]
pub struct ExportOptions {
    pub doc_id: Option<String>,
    pub page_id: Option<String>,
    pub output: Option<PathBuf>,
    pub interval_secs: Option<u64>,
}

/// Submit, poll and download one export. Missing ids or token are errors; any
/// failure of the export itself is reported and yields `Ok(false)`.
pub async fn export_session(config: &Config, opts: ExportOptions) -> Result<bool> {
    let doc_id = opts
        .doc_id
        .or_else(|| config.export.doc_id.clone())
        .context("no document id: pass --doc or set export.doc_id")?;
    let page_id = opts
        .page_id
        .or_else(|| config.export.page_id.clone())
        .context("no page id: pass --page or set export.page_id")?;
    let api_token = common::secret_from_env(&config.export.api_token_env).with_context(|| {
        format!(
            "export API token missing: set the {} environment variable",
            config.export.api_token_env
        )
    })?;
    let output = opts
        .output
        .unwrap_or_else(|| PathBuf::from(&config.export.output_path));
    let interval = opts
        .interval_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.export.poll_interval());

    println!("Document Export");
    println!("{}", "=".repeat(30));

    let api = RemoteExportApi::from_config(&config.export, &api_token);
    let poller = StatusPoller::new(api, interval).on_progress(|job| println!("{}", progress_line(job)));

    println!("Starting export");
    let result = export_and_save(&poller, &doc_id, &page_id, &output).await;
    report_export(&result, &output, &mut std::io::stdout(), &mut std::io::stderr())
}

/// One console line per status observation, showing the service's own status word.
pub fn progress_line(job: &ExportJob) -> String {
    match job.status {
        ExportStatus::Expired => "Request expired, starting new export".to_string(),
        ExportStatus::Complete => "Export completed!".to_string(),
        _ => format!("Status: {}", job.remote_status.as_deref().unwrap_or("unknown")),
    }
}

/// Print the outcome of an export once: the saved path on `out`, or the error on `err`.
fn report_export<O: Write, E: Write>(
    result: &Result<usize, ExportError>,
    output: &Path,
    out: &mut O,
    err: &mut E,
) -> Result<bool> {
    match result {
        Ok(_) => {
            writeln!(out, "Document saved to: {}", output.display())?;
            Ok(true)
        }
        Err(e) => {
            writeln!(err, "{e}")?;
            Ok(false)
        }
    }
}

async fn export_and_save(
    poller: &StatusPoller<RemoteExportApi>,
    doc_id: &str,
    page_id: &str,
    output: &Path,
) -> Result<usize, ExportError> {
    let mut job = poller.submit(doc_id, page_id).await?;
    println!("Export started with ID: {}", job.request_id);
    println!("Waiting for export to complete");
    poller.wait(&mut job).await?;

    println!("Downloading exported document");
    save_document(poller.api(), &job, output).await
}
