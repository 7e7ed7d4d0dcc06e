//! Shared window host fixture for window integration tests.

use std::sync::Mutex;

use mtpdesk_core::{WindowContent, WindowId, WindowSpec};
use mtpdesk_window::{WindowError, WindowHost};

/// Host that records every call and keeps a minimized flag per window.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub calls: Mutex<Vec<String>>,
    pub specs: Mutex<Vec<WindowSpec>>,
    pub minimized: Mutex<bool>,
    next_id: Mutex<u64>,
}

#[allow(dead_code)]
impl RecordingHost {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn set_minimized(&self, minimized: bool) {
        *self.minimized.lock().expect("minimized lock") = minimized;
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

impl WindowHost for RecordingHost {
    fn create(&self, spec: &WindowSpec, _content: &WindowContent) -> Result<WindowId, WindowError> {
        let mut next_id = self.next_id.lock().expect("id lock");
        *next_id += 1;
        self.specs.lock().expect("specs lock").push(spec.clone());
        self.record(format!("create:{}", *next_id));
        Ok(WindowId(*next_id))
    }

    fn show(&self, id: WindowId) -> Result<(), WindowError> {
        self.record(format!("show:{}", id.0));
        Ok(())
    }

    fn focus(&self, id: WindowId) -> Result<(), WindowError> {
        self.record(format!("focus:{}", id.0));
        Ok(())
    }

    fn maximize(&self, id: WindowId) -> Result<(), WindowError> {
        self.record(format!("maximize:{}", id.0));
        Ok(())
    }

    fn minimize(&self, id: WindowId) -> Result<(), WindowError> {
        self.set_minimized(true);
        self.record(format!("minimize:{}", id.0));
        Ok(())
    }

    fn restore(&self, id: WindowId) -> Result<(), WindowError> {
        self.set_minimized(false);
        self.record(format!("restore:{}", id.0));
        Ok(())
    }

    fn is_minimized(&self, _id: WindowId) -> Result<bool, WindowError> {
        Ok(*self.minimized.lock().expect("minimized lock"))
    }
}
