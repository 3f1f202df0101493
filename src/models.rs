// src/models.rs
use serde::Serialize;
use tokio_util::sync::CancellationToken;

/// Outcome of one (iteration, parameter value) trial. Never mutated after it
/// lands in the history.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct TrialRecord {
    pub iteration: u32,
    pub param: f64,
    pub metric: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TrialRecord {
    pub fn failed(iteration: u32, param: f64, error: String) -> Self {
        Self { iteration, param, metric: None, stdout: None, stderr: None, error: Some(error) }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum HistoryEntry {
    Trial(TrialRecord),
    /// Terminal entry left behind when the driver itself broke down.
    Fault { error: String },
}

impl HistoryEntry {
    pub fn as_trial(&self) -> Option<&TrialRecord> {
        match self {
            HistoryEntry::Trial(record) => Some(record),
            HistoryEntry::Fault { .. } => None,
        }
    }
}

/// Best trial seen so far. `metric` is `-inf` (serialised as `null`) until a
/// trial produces a score.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct BestTrial {
    pub param: Option<f64>,
    pub metric: f64,
    pub stdout: Option<String>,
}

impl Default for BestTrial {
    fn default() -> Self {
        Self { param: None, metric: f64::NEG_INFINITY, stdout: None }
    }
}

#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Idle,
    Running,
}

/// The process-wide search job. Only one may be running at a time.
#[derive(Debug, Default)]
pub struct Job {
    pub status: JobStatus,
    pub id: Option<String>,
    pub history: Vec<HistoryEntry>,
    pub best: BestTrial,
    pub cancel: Option<CancellationToken>,
}

impl Job {
    pub fn is_running(&self) -> bool {
        self.status == JobStatus::Running
    }

    /// Append a trial and promote it to best if its metric is strictly greater.
    pub fn record(&mut self, record: TrialRecord) {
        if let Some(metric) = record.metric {
            if metric > self.best.metric {
                self.best = BestTrial {
                    param: Some(record.param),
                    metric,
                    stdout: record.stdout.clone(),
                };
            }
        }
        self.history.push(HistoryEntry::Trial(record));
    }

    pub fn record_fault(&mut self, error: String) {
        self.history.push(HistoryEntry::Fault { error });
    }

    /// Return to idle and drop the job id.
    pub fn finish(&mut self) {
        self.status = JobStatus::Idle;
        self.id = None;
        self.cancel = None;
    }

    pub fn recent_history(&self, limit: usize) -> Vec<HistoryEntry> {
        let start = self.history.len().saturating_sub(limit);
        self.history[start..].to_vec()
    }
}
