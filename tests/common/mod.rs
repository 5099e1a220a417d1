#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use das_import::das::{Clock, Transport};
use das_import::error::DasError;
use das_import::sync::Confirm;

pub const TOKEN: &str = "0123456789abcdef0123456789abcdef";

#[derive(Debug, Clone)]
pub struct Call {
    pub url: String,
    pub params: Vec<(String, String)>,
}

impl Call {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

fn record(calls: &Mutex<Vec<Call>>, url: &str, params: &[(&'static str, String)]) {
    calls.lock().unwrap().push(Call {
        url: url.to_string(),
        params: params
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect(),
    });
}

/// Replies with a fixed sequence of responses, one per request.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<Vec<u8>, DasError>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Result<Vec<u8>, DasError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn tokens_then(count: usize, last: &str) -> Self {
        let mut responses = (0..count)
            .map(|_| Ok(TOKEN.as_bytes().to_vec()))
            .collect::<Vec<_>>();
        responses.push(Ok(last.as_bytes().to_vec()));
        Self::new(responses)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, url: &str, params: &[(&'static str, String)]) -> Result<Vec<u8>, DasError> {
        record(&self.calls, url, params);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(DasError::Http("script exhausted".to_string())))
    }
}

/// Replies based on the prefix of the `input` parameter.
pub struct RoutedTransport {
    routes: Vec<(String, Vec<u8>)>,
    calls: Mutex<Vec<Call>>,
}

impl RoutedTransport {
    pub fn new(routes: Vec<(&str, String)>) -> Self {
        Self {
            routes: routes
                .into_iter()
                .map(|(prefix, body)| (prefix.to_string(), body.into_bytes()))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl Transport for RoutedTransport {
    fn get(&self, url: &str, params: &[(&'static str, String)]) -> Result<Vec<u8>, DasError> {
        record(&self.calls, url, params);
        let input = params
            .iter()
            .find(|(name, _)| *name == "input")
            .map(|(_, value)| value.as_str())
            .unwrap_or_default();
        self.routes
            .iter()
            .find(|(prefix, _)| input.starts_with(prefix.as_str()))
            .map(|(_, body)| body.clone())
            .ok_or_else(|| DasError::Status {
                status: 404,
                message: format!("no route for {input}"),
            })
    }
}

/// Clock that only moves when slept on.
pub struct ManualClock {
    start: Instant,
    elapsed: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn sleeps(&self) -> Vec<u64> {
        self.sleeps
            .lock()
            .unwrap()
            .iter()
            .map(|delay| delay.as_secs())
            .collect()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + *self.elapsed.lock().unwrap()
    }

    fn sleep(&self, duration: Duration) {
        *self.elapsed.lock().unwrap() += duration;
        self.sleeps.lock().unwrap().push(duration);
    }
}

/// Gives a fixed answer and remembers what it was asked.
pub struct RecordingPrompt {
    answer: bool,
    asked: RefCell<Vec<(String, bool)>>,
}

impl RecordingPrompt {
    pub fn answering(answer: bool) -> Self {
        Self {
            answer,
            asked: RefCell::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<(String, bool)> {
        self.asked.borrow().clone()
    }
}

impl Confirm for RecordingPrompt {
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, DasError> {
        self.asked.borrow_mut().push((prompt.to_string(), default));
        Ok(self.answer)
    }
}

pub struct BrokenPrompt;

impl Confirm for BrokenPrompt {
    fn confirm(&self, _prompt: &str, _default: bool) -> Result<bool, DasError> {
        Err(DasError::Prompt("terminal closed".to_string()))
    }
}
