//! Resolving human-verification interstitials.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};

use super::fetcher::PendingVerification;
use crate::sources::{PageSource, SourceError};

/// Obtains the real page text once a human has passed the site's robot check.
#[async_trait]
pub trait HumanVerifier: Send + Sync + std::fmt::Debug {
    async fn verify(&self, pending: &PendingVerification) -> Result<String, SourceError>;
}

/// Fails every verification. Used for unattended runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct RefusingVerifier;

#[async_trait]
impl HumanVerifier for RefusingVerifier {
    async fn verify(&self, pending: &PendingVerification) -> Result<String, SourceError> {
        Err(SourceError::VerificationRequired(pending.url.clone()))
    }
}

/// Interactive verification on the controlling terminal.
///
/// Opens the blocked URL in the desktop browser when possible and waits for
/// the operator. An empty answer re-fetches the URL through the transport;
/// otherwise the answer is taken as the path of a saved copy of the page.
#[derive(Debug, Clone)]
pub struct TerminalVerifier {
    transport: Arc<dyn PageSource>,
    open_browser: bool,
    answers: Answers,
}

/// Where the operator's answers come from
#[derive(Debug, Clone)]
enum Answers {
    Stdin,
    Scripted(Arc<Mutex<VecDeque<String>>>),
}

impl TerminalVerifier {
    pub fn new(transport: Arc<dyn PageSource>) -> Self {
        Self {
            transport,
            open_browser: true,
            answers: Answers::Stdin,
        }
    }

    pub fn with_browser(mut self, open_browser: bool) -> Self {
        self.open_browser = open_browser;
        self
    }

    /// Answer prompts from `answers`, in order, instead of reading stdin
    pub fn with_answers<I, S>(mut self, answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let queue = answers.into_iter().map(Into::into).collect();
        self.answers = Answers::Scripted(Arc::new(Mutex::new(queue)));
        self
    }

    async fn answer(&self, url: &str) -> Result<String, SourceError> {
        match &self.answers {
            Answers::Stdin => Self::prompt(url.to_string()).await,
            Answers::Scripted(queue) => {
                let mut queue = queue
                    .lock()
                    .map_err(|_| SourceError::Other("Verification answers poisoned".to_string()))?;
                queue
                    .pop_front()
                    .map(|a| a.trim().to_string())
                    .ok_or_else(|| SourceError::VerificationRequired(url.to_string()))
            }
        }
    }

    async fn prompt(url: String) -> Result<String, SourceError> {
        let answer = tokio::task::spawn_blocking(move || -> std::io::Result<String> {
            let mut stderr = std::io::stderr().lock();
            writeln!(stderr)?;
            writeln!(stderr, "The search engine wants to confirm a human is browsing:")?;
            writeln!(stderr, "  {}", url)?;
            writeln!(
                stderr,
                "Pass the check in your browser, then press Enter to continue \
                 (or type the path of a saved copy of the page):"
            )?;
            stderr.flush()?;

            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            Ok(line.trim().to_string())
        })
        .await
        .map_err(|e| SourceError::Other(format!("Verification prompt failed: {}", e)))??;

        Ok(answer)
    }
}

#[async_trait]
impl HumanVerifier for TerminalVerifier {
    async fn verify(&self, pending: &PendingVerification) -> Result<String, SourceError> {
        if self.open_browser {
            open_in_browser(&pending.url);
        }

        let answer = self.answer(&pending.url).await?;
        if answer.is_empty() {
            return self.transport.fetch(&pending.url).await;
        }

        let path = PathBuf::from(answer);
        tracing::info!(path = %path.display(), "Reading verified page from file");
        Ok(tokio::fs::read_to_string(&path).await?)
    }
}

/// Best effort; failure just means the user opens the URL by hand.
fn open_in_browser(url: &str) {
    let mut command = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else {
        Command::new("xdg-open")
    };

    let spawned = command
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    if let Err(e) = spawned {
        tracing::debug!("Could not launch browser: {}", e);
    }
}
