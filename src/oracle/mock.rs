//! Scriptable oracle for tests.
//!
//! Responses can be queued in order or keyed on a needle matched against the
//! system prompt, the user prompt or the model name — the keyed form keeps
//! tests deterministic when calls arrive from concurrent debate tasks.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::{GenerationOracle, OracleError};

#[derive(Debug, Clone)]
enum Scripted {
    Text(String),
    Empty,
    Fail,
}

/// One recorded oracle invocation.
#[derive(Debug, Clone)]
pub struct OracleCall {
    pub system: String,
    pub user: String,
    pub json_mode: bool,
    pub model: String,
}

#[derive(Default)]
pub struct MockOracle {
    rules: Vec<(String, Scripted)>,
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<OracleCall>>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response, consumed in call order.
    pub fn respond_with(self, text: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Text(text.to_string()));
        self
    }

    /// Queue an `Ok(None)` reply (provider returned an empty choice).
    pub fn respond_empty(self) -> Self {
        self.script.lock().unwrap().push_back(Scripted::Empty);
        self
    }

    /// Queue a transport failure.
    pub fn fail_next(self) -> Self {
        self.script.lock().unwrap().push_back(Scripted::Fail);
        self
    }

    /// Reply with `text` whenever `needle` appears in the system prompt, the
    /// user prompt or the model name. Rules win over the queue and are
    /// checked in registration order.
    pub fn respond_when(mut self, needle: &str, text: &str) -> Self {
        self.rules
            .push((needle.to_string(), Scripted::Text(text.to_string())));
        self
    }

    /// Fail with a transport error whenever `needle` matches.
    pub fn fail_when(mut self, needle: &str) -> Self {
        self.rules.push((needle.to_string(), Scripted::Fail));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for_model(&self, needle: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.model.contains(needle))
            .count()
    }

    pub fn recorded_calls(&self) -> Vec<OracleCall> {
        self.calls.lock().unwrap().clone()
    }

    fn next_response(&self, system: &str, user: &str, model: &str) -> Scripted {
        for (needle, scripted) in &self.rules {
            if system.contains(needle) || user.contains(needle) || model.contains(needle) {
                return scripted.clone();
            }
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Scripted::Empty)
    }
}

impl GenerationOracle for MockOracle {
    fn generate(
        &self,
        system: &str,
        user: &str,
        json_mode: bool,
        model: &str,
    ) -> Result<Option<String>, OracleError> {
        self.calls.lock().unwrap().push(OracleCall {
            system: system.to_string(),
            user: user.to_string(),
            json_mode,
            model: model.to_string(),
        });

        match self.next_response(system, user, model) {
            Scripted::Text(text) => Ok(Some(text)),
            Scripted::Empty => Ok(None),
            Scripted::Fail => Err(OracleError::Connection("mock transport failure".into())),
        }
    }
}
