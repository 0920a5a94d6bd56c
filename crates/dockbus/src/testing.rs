//! An in-memory [`DockBus`] that records every call, for tests of code talking to the dock.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;

use crate::{DockBus, Error, Result, Target, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub target: Target,
    pub method: String,
    pub args: Vec<Value>,
}

#[derive(Debug, Default)]
struct BusState {
    calls: Vec<RecordedCall>,
    replies: HashMap<String, Vec<Value>>,
    failing: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingBus(Arc<Mutex<BusState>>);

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call made so far, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.0.lock().unwrap().calls.clone()
    }

    /// Calls made to `method`, oldest first.
    pub fn calls_to(&self, method: &str) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|c| c.method == method).collect()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().calls.clear();
    }

    /// Answer every later call to `method` with `reply`.
    pub fn reply_with(&self, method: &str, reply: Vec<Value>) {
        self.0.lock().unwrap().replies.insert(method.to_string(), reply);
    }

    /// Make every later call fail, as if the dock went away.
    pub fn set_failing(&self, failing: bool) {
        self.0.lock().unwrap().failing = failing;
    }
}

#[async_trait]
impl DockBus for RecordingBus {
    async fn call(&self, target: Target, method: &str, args: Vec<Value>) -> Result<Vec<Value>> {
        let mut state = self.0.lock().unwrap(); // unwrap: mutex poisoning is okay
        if state.failing {
            return Err(Error::DbusError(zbus::Error::Failure(format!("{} failed", method))));
        }
        state.calls.push(RecordedCall { target, method: method.to_string(), args });
        Ok(state.replies.get(method).cloned().unwrap_or_default())
    }
}
