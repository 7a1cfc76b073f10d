use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use metrics_transfer::load::{LoadStatus, LoadStatusGetter};

/// Returns OK for a fixed number of calls, then a fixed status forever
#[derive(Debug)]
pub struct CountdownStatus {
    ok_calls: usize,
    then: LoadStatus,
    calls: AtomicUsize,
}

impl CountdownStatus {
    pub fn new(ok_calls: usize, then: LoadStatus) -> Self {
        Self {
            ok_calls,
            then,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LoadStatusGetter for CountdownStatus {
    fn latest_status(&self) -> LoadStatus {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.ok_calls {
            LoadStatus::Ok
        } else {
            self.then
        }
    }
}

/// Plays back a script of statuses, then repeats the last one
#[derive(Debug)]
pub struct ScriptedStatus {
    script: Mutex<VecDeque<LoadStatus>>,
    last: Mutex<LoadStatus>,
}

impl ScriptedStatus {
    pub fn new(script: impl IntoIterator<Item = LoadStatus>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            last: Mutex::new(LoadStatus::Ok),
        }
    }
}

impl LoadStatusGetter for ScriptedStatus {
    fn latest_status(&self) -> LoadStatus {
        let mut last = self.last.lock();
        if let Some(next) = self.script.lock().pop_front() {
            *last = next;
        }
        *last
    }
}
