//! In-process [`ReputationOracle`] for tests.
//!
//! Behaves like a well-behaved remote: submitted content becomes known under
//! its fingerprint straight away, and each analysis reports `queued` until it
//! has been polled `complete_after` times. Every call is counted.

use crate::transport::{AnalysisReport, AnalysisStatus, Lookup, ReputationOracle};
use crate::OracleError;
use async_trait::async_trait;
use bytes::Bytes;
use common::{AnalysisHandle, DetectionStats, Fingerprint, Verdict};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

#[derive(Default)]
struct State {
    known: HashMap<Fingerprint, Verdict>,
    /// analysis id → polls answered so far
    analyses: HashMap<String, u32>,
    next_id: u32,
}

pub struct ScriptedOracle {
    state: Mutex<State>,
    submit_verdict: Verdict,
    /// `None` = never completes.
    complete_after: Option<u32>,
    fail_lookups: bool,
    fail_urls: bool,
    fail_analyses: bool,
    lookups: AtomicU32,
    submissions: AtomicU32,
    polls: AtomicU32,
    url_submissions: AtomicU32,
}

impl Default for ScriptedOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedOracle {
    /// Knows nothing; submissions resolve clean on the first poll.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            submit_verdict: Verdict::default(),
            complete_after: Some(1),
            fail_lookups: false,
            fail_urls: false,
            fail_analyses: false,
            lookups: AtomicU32::new(0),
            submissions: AtomicU32::new(0),
            polls: AtomicU32::new(0),
            url_submissions: AtomicU32::new(0),
        }
    }

    /// Pre-registers a fingerprint the oracle already has on file.
    pub fn with_known(self, fingerprint: Fingerprint, stats: DetectionStats) -> Self {
        self.lock().known.insert(fingerprint, Verdict::from_stats(stats));
        self
    }

    /// Verdict produced for newly submitted content.
    pub fn submit_verdict(mut self, stats: DetectionStats) -> Self {
        self.submit_verdict = Verdict::from_stats(stats);
        self
    }

    /// Analyses complete on the `polls`-th poll.
    pub fn complete_after(mut self, polls: u32) -> Self {
        self.complete_after = Some(polls.max(1));
        self
    }

    pub fn never_complete(mut self) -> Self {
        self.complete_after = None;
        self
    }

    /// Every lookup fails with `RateLimited`.
    pub fn fail_lookups(mut self) -> Self {
        self.fail_lookups = true;
        self
    }

    /// Every URL submission fails with a transport error.
    pub fn fail_urls(mut self) -> Self {
        self.fail_urls = true;
        self
    }

    /// Every analysis status query fails with a transport error.
    pub fn fail_analyses(mut self) -> Self {
        self.fail_analyses = true;
        self
    }

    pub fn lookups(&self) -> u32 {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn submissions(&self) -> u32 {
        self.submissions.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn url_submissions(&self) -> u32 {
        self.url_submissions.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn open_analysis(&self, prefix: &str) -> AnalysisHandle {
        let mut state = self.lock();
        state.next_id += 1;
        let id = format!("{prefix}-{}", state.next_id);
        state.analyses.insert(id.clone(), 0);
        AnalysisHandle::new(id)
    }
}

#[async_trait]
impl ReputationOracle for ScriptedOracle {
    async fn lookup(&self, fingerprint: &Fingerprint) -> Lookup {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookups {
            return Lookup::TransportError(OracleError::RateLimited);
        }
        match self.lock().known.get(fingerprint) {
            Some(verdict) => Lookup::Found(verdict.clone()),
            None => Lookup::NotFound,
        }
    }

    async fn submit(
        &self,
        _file_name: &str,
        content: Bytes,
    ) -> Result<AnalysisHandle, OracleError> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        let fingerprint = forge::digest_bytes(&content);
        self.lock()
            .known
            .insert(fingerprint, self.submit_verdict.clone());
        Ok(self.open_analysis("analysis"))
    }

    async fn analysis(&self, handle: &AnalysisHandle) -> Result<AnalysisReport, OracleError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if self.fail_analyses {
            return Err(OracleError::Transport(format!("analysis {handle} unavailable")));
        }
        let mut state = self.lock();
        let polled = state
            .analyses
            .get_mut(handle.as_str())
            .ok_or_else(|| OracleError::Protocol(format!("unknown analysis {handle}")))?;
        *polled += 1;

        let completed = matches!(self.complete_after, Some(n) if *polled >= n);
        Ok(AnalysisReport {
            status: if completed {
                AnalysisStatus::Completed
            } else {
                AnalysisStatus::Queued
            },
            verdict: if completed {
                self.submit_verdict.clone()
            } else {
                Verdict::default()
            },
        })
    }

    async fn submit_url(&self, url: &str) -> Result<AnalysisHandle, OracleError> {
        self.url_submissions.fetch_add(1, Ordering::SeqCst);
        if self.fail_urls {
            return Err(OracleError::Transport(format!("cannot submit {url}")));
        }
        Ok(self.open_analysis("url"))
    }
}
