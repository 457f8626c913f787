//! Shared test fixtures
//!
//! A recording fake dispatcher and a broker pipeline wired to a temporary
//! data directory.

#![allow(dead_code)]

use async_trait::async_trait;
use butterknife::{
    AuthMethod, BrokerError, BrokerResult, CallPipeline, CostUnit, DispatchRequest,
    DispatchResponse, HttpDispatcher, ProviderConfig, ProviderRegistry, ReceiptLedger, Vault,
    Wallet,
};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Fake dispatcher: records every outgoing request and replays queued
/// responses in order. An empty queue answers 200 with an empty JSON object.
pub struct RecordingDispatcher {
    requests: Mutex<Vec<DispatchRequest>>,
    responses: Mutex<VecDeque<BrokerResult<DispatchResponse>>>,
}

impl RecordingDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            responses: Mutex::new(VecDeque::new()),
        })
    }

    /// Queue a JSON response
    pub fn push_json(&self, status: u16, body: Value) {
        self.responses.lock().unwrap().push_back(Ok(DispatchResponse {
            status,
            headers: HashMap::from([(
                "content-type".to_string(),
                "application/json".to_string(),
            )]),
            body: serde_json::to_vec(&body).unwrap(),
        }));
    }

    /// Queue a plain-text response
    pub fn push_text(&self, status: u16, body: &str) {
        self.responses.lock().unwrap().push_back(Ok(DispatchResponse {
            status,
            headers: HashMap::from([("content-type".to_string(), "text/plain".to_string())]),
            body: body.as_bytes().to_vec(),
        }));
    }

    /// Queue a transport failure
    pub fn push_error(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(BrokerError::Network(message.to_string())));
    }

    /// Every request dispatched so far
    pub fn requests(&self) -> Vec<DispatchRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests dispatched so far
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpDispatcher for RecordingDispatcher {
    async fn dispatch(&self, request: DispatchRequest) -> BrokerResult<DispatchResponse> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(DispatchResponse {
                    status: 200,
                    headers: HashMap::from([(
                        "content-type".to_string(),
                        "application/json".to_string(),
                    )]),
                    body: b"{}".to_vec(),
                })
            })
    }
}

/// A pipeline over temp-dir stores and the recording dispatcher
pub struct TestBroker {
    pub dir: tempfile::TempDir,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub pipeline: CallPipeline,
}

/// Build a broker with the built-in registry and the given budget
pub fn test_broker(budget: u64) -> TestBroker {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = RecordingDispatcher::new();

    let pipeline = CallPipeline::new(
        ProviderRegistry::new(),
        Vault::open(dir.path().join("vault.json")),
        Wallet::open(dir.path().join("wallet.json"), budget),
        ReceiptLedger::open(dir.path().join("receipts.json")),
        dispatcher.clone(),
    );

    TestBroker {
        dir,
        dispatcher,
        pipeline,
    }
}

/// A flat-rate provider billed per request
pub fn per_request_provider(id: &str, cost_per_unit: u64) -> ProviderConfig {
    ProviderConfig {
        id: id.to_string(),
        name: id.to_string(),
        base_url: "https://api.example.com/v1".to_string(),
        auth_method: AuthMethod::Header,
        auth_field: "Authorization".to_string(),
        auth_prefix: Some("Bearer ".to_string()),
        cost_per_unit,
        cost_unit: CostUnit::PerRequest,
    }
}

/// A provider that carries its credential inside the JSON body
pub fn body_auth_provider(id: &str, auth_field: &str) -> ProviderConfig {
    ProviderConfig {
        id: id.to_string(),
        name: id.to_string(),
        base_url: "https://api.example.com/v1".to_string(),
        auth_method: AuthMethod::Body,
        auth_field: auth_field.to_string(),
        auth_prefix: None,
        cost_per_unit: 1,
        cost_unit: CostUnit::PerRequest,
    }
}
