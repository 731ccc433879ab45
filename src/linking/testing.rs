use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use parking_lot::Mutex;

use super::base::{EntityLinker, LabelSource, LinkingError};
use crate::core::models::{EntityUri, Label};
use crate::text::language::Language;

/// Serves `router` on an ephemeral local port and returns its base URL.
pub(crate) async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}


/// In-memory linker answering from a fixed table, with scripted failures.
pub(crate) struct ScriptedLinker {
    name: &'static str,
    answers: HashMap<String, String>,
    transient_failures: Mutex<HashMap<String, u32>>,
    permanent_failures: Vec<String>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedLinker {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            answers: HashMap::new(),
            transient_failures: Mutex::new(HashMap::new()),
            permanent_failures: Vec::new(),
            delays: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn answer(mut self, label: &str, uri: &str) -> Self {
        self.answers.insert(label.to_string(), uri.to_string());
        self
    }

    pub(crate) fn fail_transiently(self, label: &str, times: u32) -> Self {
        self.transient_failures.lock().insert(label.to_string(), times);
        self
    }

    pub(crate) fn fail_permanently(mut self, label: &str) -> Self {
        self.permanent_failures.push(label.to_string());
        self
    }

    pub(crate) fn delay(mut self, label: &str, delay: Duration) -> Self {
        self.delays.insert(label.to_string(), delay);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub(crate) fn call_count(&self, label: &str) -> usize {
        self.calls.lock().iter().filter(|call| call.as_str() == label).count()
    }

    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntityLinker for ScriptedLinker {
    async fn resolve(
        &self,
        label: &str,
        _language: Language,
    ) -> Result<Option<EntityUri>, LinkingError> {
        self.calls.lock().push(label.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self.delays.get(label).copied().unwrap_or(Duration::from_millis(5));
        tokio::time::sleep(delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let fail_now = {
            let mut failures = self.transient_failures.lock();
            match failures.get_mut(label) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false,
            }
        };
        if fail_now {
            return Err(LinkingError::Status {
                service: self.name,
                status: 503,
            });
        }
        if self.permanent_failures.iter().any(|failing| failing == label) {
            return Err(LinkingError::Status {
                service: self.name,
                status: 404,
            });
        }

        Ok(self.answers.get(label).and_then(|uri| EntityUri::new(uri.as_str())))
    }

    fn service_name(&self) -> &'static str {
        self.name
    }
}


/// Label source answering from a fixed table, counting fetches per URI.
pub(crate) struct StaticLabels {
    prefix: &'static str,
    labels: HashMap<String, Vec<Label>>,
    failing: Vec<String>,
    fetches: Mutex<Vec<String>>,
}

impl StaticLabels {
    pub(crate) fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            labels: HashMap::new(),
            failing: Vec::new(),
            fetches: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with(mut self, uri: &str, labels: Vec<Label>) -> Self {
        self.labels.insert(uri.to_string(), labels);
        self
    }

    pub(crate) fn failing(mut self, uri: &str) -> Self {
        self.failing.push(uri.to_string());
        self
    }

    pub(crate) fn fetch_count(&self, uri: &str) -> usize {
        self.fetches.lock().iter().filter(|fetch| fetch.as_str() == uri).count()
    }
}

#[async_trait]
impl LabelSource for StaticLabels {
    async fn labels(&self, uri: &EntityUri) -> Result<Vec<Label>, LinkingError> {
        self.fetches.lock().push(uri.to_string());
        if self.failing.iter().any(|failing| failing == uri.as_str()) {
            return Err(LinkingError::Status {
                service: "static-labels",
                status: 500,
            });
        }
        Ok(self.labels.get(uri.as_str()).cloned().unwrap_or_default())
    }

    fn handles(&self, uri: &EntityUri) -> bool {
        uri.as_str().starts_with(self.prefix)
    }

    fn service_name(&self) -> &'static str {
        "static-labels"
    }
}
