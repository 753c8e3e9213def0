use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

/// Collects every payload a handler receives.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    seen: Arc<Mutex<Vec<Value>>>,
}

impl Recorder {
    pub fn handler(&self) -> impl Fn(&Value) + Send + Sync + 'static {
        let seen = self.seen.clone();
        move |payload| seen.lock().push(payload.clone())
    }

    pub fn seen(&self) -> Vec<Value> {
        self.seen.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.seen.lock().len()
    }
}
