//! Test support utilities shared across unit and integration tests.

use std::collections::{BTreeSet, VecDeque};
use std::env;
use std::ffi::OsString;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use serde_json::{Value, json};
use tokio::sync::{Mutex, MutexGuard};

use crate::api::{ApiError, HttpRequest, HttpResponse, Transport, TransportFuture};

/// Scripted transport that returns pre-seeded responses in FIFO order and
/// records every request it receives.
///
/// Clones share the same queue and request log, so a test can keep one
/// handle while the client owns another.
#[derive(Clone, Debug, Default)]
pub struct ScriptedTransport {
    state: Arc<StdMutex<ScriptState>>,
}

#[derive(Debug, Default)]
struct ScriptState {
    responses: VecDeque<Scripted>,
    requests: Vec<HttpRequest>,
}

/// One queued reply.
#[derive(Clone, Debug)]
enum Scripted {
    Response(HttpResponse),
    TransportError(String),
}

impl Scripted {
    fn into_reply(self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        match self {
            Self::Response(response) => Ok(response),
            Self::TransportError(message) => Err(ApiError::Transport {
                url: request.url.clone(),
                message,
            }),
        }
    }
}

impl ScriptedTransport {
    /// Creates a transport with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, apply: impl FnOnce(&mut ScriptState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        apply(&mut state)
    }

    /// Queues a `200 OK` response carrying `body` as JSON.
    pub fn push_json(&self, body: &Value) {
        self.push_status(200, body.to_string());
    }

    /// Queues a response with an explicit status and raw body.
    pub fn push_status(&self, status: u16, body: impl Into<String>) {
        let response = HttpResponse {
            status,
            body: body.into(),
        };
        self.with_state(|state| state.responses.push_back(Scripted::Response(response)));
    }

    /// Queues a transport failure (no response received).
    pub fn push_transport_error(&self, message: impl Into<String>) {
        let reply = Scripted::TransportError(message.into());
        self.with_state(|state| state.responses.push_back(reply));
    }

    /// Returns a snapshot of all requests recorded so far.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.with_state(|state| state.requests.clone())
    }

    /// Returns the number of requests recorded so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.with_state(|state| state.requests.len())
    }

    /// Returns the number of queued responses not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.with_state(|state| state.responses.len())
    }
}

impl Transport for ScriptedTransport {
    fn send<'a>(&'a self, request: &'a HttpRequest) -> TransportFuture<'a> {
        let next = self.with_state(|state| {
            state.requests.push(request.clone());
            state.responses.pop_front()
        });
        Box::pin(async move {
            next.unwrap_or_else(|| {
                Scripted::TransportError(String::from("no scripted response available"))
            })
            .into_reply(request)
        })
    }
}

/// Produces a token issuance payload.
#[must_use]
pub fn json_token(token: &str) -> Value {
    json!({ "$key": token })
}

/// Produces a `vms` listing where each entry maps to a machine identifier.
#[must_use]
pub fn json_vms(machines: &[u64]) -> Value {
    Value::Array(
        machines
            .iter()
            .map(|machine| json!({ "name": "vm", "machine": machine }))
            .collect(),
    )
}

/// Produces a `machine_nics` listing; `None` omits the hardware address.
#[must_use]
pub fn json_nics(macs: &[Option<&str>]) -> Value {
    Value::Array(
        macs.iter()
            .zip(1_u64..)
            .map(|(mac, key)| match mac {
                Some(address) => json!({ "$key": key, "macaddress": address }),
                None => json!({ "$key": key }),
            })
            .collect(),
    )
}

/// Produces a `vnet_addresses` listing bound to `mac`.
#[must_use]
pub fn json_addresses(mac: &str, ips: &[&str]) -> Value {
    Value::Array(
        ips.iter()
            .map(|ip| json!({ "mac": mac, "ip": ip }))
            .collect(),
    )
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: Mutex<()> = Mutex::const_new(());

/// Guard that holds the env mutex and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets and removes environment variables while holding a global mutex.
    ///
    /// A `None` value removes the variable for the guard's lifetime.
    pub async fn set_vars(pairs: &[(&str, Option<&str>)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe {
                match value {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
