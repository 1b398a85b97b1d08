use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::time::Instant;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode, Url};
use tokio::sync::mpsc;
use ttsbatch_common::{Result, TtsBatchError};

use crate::payload::Batch;

/// Outcome of one request, tagged with the index of the payload it carried.
#[derive(Debug)]
pub struct Report {
    pub index: usize,
    pub outcome: core::result::Result<StatusCode, TtsBatchError>,
}

impl Report {
    pub fn is_success(&self) -> bool { self.outcome.is_ok() }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Ok(status) => write!(f, "Request sent with status: {} - {}", status.as_u16(), self.index),
            Err(e) => write!(f, "An error occurred: {} - {}", e, self.index),
        }
    }
}

/// Joins an error with every `source()` below it, outermost first.
fn describe(err: &dyn StdError) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

/// Fires every payload of a batch at one URL over a single shared client.
#[derive(Clone)]
pub struct BatchRequester {
    client: Client,
    url: Url,
}

impl BatchRequester {
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| TtsBatchError::Config(format!("bad url {url}: {e}")))?;
        Ok(Self::with_client(Client::new(), url))
    }

    pub fn with_client(client: Client, url: Url) -> Self {
        Self { client, url }
    }

    pub fn url(&self) -> &Url { &self.url }

    pub async fn send_one(&self, index: usize, body: String) -> Report {
        tracing::debug!(target: "requester", index, "sending");
        let outcome = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map(|resp| resp.status())
            .map_err(|e| TtsBatchError::RequestFailure(describe(&e)));
        Report { index, outcome }
    }

    /// Launches all requests at once and waits for every one of them.
    ///
    /// `on_report` sees each report as soon as its request finishes, so calls
    /// arrive in completion order. The returned vector has the same order and
    /// always holds exactly one report per payload.
    pub async fn dispatch<F>(&self, batch: &Batch, on_report: F) -> Vec<Report>
    where
        F: FnMut(&Report),
    {
        let start = Instant::now();
        tracing::debug!(target: "requester", url = %self.url, requests = batch.len(), "dispatching batch");

        let jobs = batch.iter().map(|(index, body)| (index, body.to_owned()));
        let reports = fan_out(
            jobs,
            |index, body| {
                let this = self.clone();
                async move { this.send_one(index, body).await }
            },
            on_report,
        )
        .await;

        tracing::info!(
            target: "requester",
            requests = reports.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "batch finished"
        );
        reports
    }
}

/// Spawns one task per job; reports flow back over a channel as tasks finish.
async fn fan_out<I, S, Fut, F>(jobs: I, send: S, mut on_report: F) -> Vec<Report>
where
    I: IntoIterator<Item = (usize, String)>,
    S: Fn(usize, String) -> Fut,
    Fut: Future<Output = Report> + Send + 'static,
    F: FnMut(&Report),
{
    let (tx, mut rx) = mpsc::unbounded_channel::<Report>();
    let mut handles = Vec::new();
    for (index, body) in jobs {
        let request = send(index, body);
        let tx = tx.clone();
        handles.push((index, tokio::spawn(async move {
            let _ = tx.send(request.await);
        })));
    }
    drop(tx);

    let mut reports = Vec::with_capacity(handles.len());
    while let Some(report) = rx.recv().await {
        on_report(&report);
        reports.push(report);
    }

    // a task that died before sending still owes a report
    for (index, handle) in handles {
        if let Err(e) = handle.await {
            let report = Report { index, outcome: Err(TtsBatchError::RequestFailure(e.to_string())) };
            on_report(&report);
            reports.push(report);
        }
    }
    reports
}
