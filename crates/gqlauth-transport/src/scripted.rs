//! An in-memory transport that replays scripted responses.
//!
//! Tests need to answer three questions about the scheme: what did it
//! send, how many times, and how does it react to a given response.
//! `ScriptedTransport` answers all three without a network.
//!
//! Operations can also be *held*: calls block until released. That is how
//! tests prove several callers are waiting on one refresh at the same time.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use gqlauth_protocol::{MutationRequest, Operation, QueryRequest, Response};
use tokio::sync::watch;

use crate::{GraphqlTransport, TransportError};

/// One call the transport received, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Mutation(MutationRequest),
    Query(QueryRequest),
}

impl RecordedCall {
    pub fn operation(&self) -> Operation {
        match self {
            Self::Mutation(req) => req.operation,
            Self::Query(req) => req.operation,
        }
    }
}

type Outcome = Result<Response, TransportError>;

#[derive(Default)]
struct Script {
    /// One-shot responses, consumed front to back.
    queued: HashMap<Operation, VecDeque<Outcome>>,
    /// Used once the queue for an operation is empty.
    fallback: HashMap<Operation, Outcome>,
    calls: Vec<RecordedCall>,
    gates: HashMap<Operation, watch::Sender<bool>>,
}

/// A [`GraphqlTransport`] backed by canned responses.
///
/// ```rust
/// use gqlauth_protocol::Operation;
/// use gqlauth_transport::ScriptedTransport;
/// use serde_json::json;
///
/// let transport = ScriptedTransport::new();
/// transport.respond(Operation::Login, Ok(json!({ "data": { "login": null } })));
/// assert_eq!(transport.call_count(Operation::Login), 0);
/// ```
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<Script>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a one-shot outcome for `operation`.
    pub fn respond(&self, operation: Operation, outcome: Outcome) {
        self.lock()
            .queued
            .entry(operation)
            .or_default()
            .push_back(outcome);
    }

    /// Sets the outcome returned whenever nothing is queued.
    pub fn respond_always(&self, operation: Operation, outcome: Outcome) {
        self.lock().fallback.insert(operation, outcome);
    }

    /// Makes calls to `operation` wait until [`release`](Self::release).
    pub fn hold(&self, operation: Operation) {
        let mut script = self.lock();
        match script.gates.get(&operation) {
            Some(gate) => {
                gate.send_replace(false);
            }
            None => {
                let (gate, _) = watch::channel(false);
                script.gates.insert(operation, gate);
            }
        }
    }

    /// Lets held calls to `operation` proceed.
    pub fn release(&self, operation: Operation) {
        if let Some(gate) = self.lock().gates.get(&operation) {
            gate.send_replace(true);
        }
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// How many times `operation` was called.
    pub fn call_count(&self, operation: Operation) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    /// The most recent mutation for `operation`, if any.
    pub fn last_mutation(&self, operation: Operation) -> Option<MutationRequest> {
        self.lock().calls.iter().rev().find_map(|call| match call {
            RecordedCall::Mutation(req) if req.operation == operation => {
                Some(req.clone())
            }
            _ => None,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records the call, waits on the gate if held, then pops an outcome.
    async fn execute(&self, call: RecordedCall) -> Outcome {
        let operation = call.operation();
        let gate = {
            let mut script = self.lock();
            script.calls.push(call);
            script.gates.get(&operation).map(watch::Sender::subscribe)
        };

        if let Some(mut gate) = gate {
            tracing::debug!(%operation, "scripted call held");
            // A dropped sender means the transport itself is gone.
            let _ = gate.wait_for(|open| *open).await;
        }

        let mut script = self.lock();
        if let Some(outcome) = script
            .queued
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
        {
            return outcome;
        }
        script.fallback.get(&operation).cloned().unwrap_or_else(|| {
            Err(TransportError::Network(format!(
                "no scripted response for {operation}"
            )))
        })
    }
}

impl GraphqlTransport for ScriptedTransport {
    async fn mutate(&self, request: MutationRequest) -> Outcome {
        self.execute(RecordedCall::Mutation(request)).await
    }

    async fn query(&self, request: QueryRequest) -> Outcome {
        self.execute(RecordedCall::Query(request)).await
    }
}
