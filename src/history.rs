//! history.rs: bounded in-memory log of recent run reports, served on /debug/runs.

use std::sync::Mutex;

use crate::engine::RunReport;

#[derive(Debug)]
pub struct History {
    inner: Mutex<Vec<RunReport>>,
    cap: usize,
}

impl History {
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.clamp(1, 10_000);
        Self {
            inner: Mutex::new(Vec::with_capacity(cap)),
            cap,
        }
    }

    pub fn push(&self, report: RunReport) {
        let mut v = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        v.push(report);
        if v.len() > self.cap {
            let excess = v.len() - self.cap;
            v.drain(0..excess);
        }
    }

    /// Most recent last.
    pub fn snapshot_last_n(&self, n: usize) -> Vec<RunReport> {
        let v = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let start = v.len().saturating_sub(n);
        v[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
