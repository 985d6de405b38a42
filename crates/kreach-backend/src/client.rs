//! Blocking backend client over TCP.
//!
//! One connection serves one proof session; connections are never shared
//! across proof tasks. Every call is synchronous with a socket deadline;
//! a deadline miss is retried with the same inputs up to the configured
//! retry limit before surfacing as [`BackendError::Timeout`]. Dropping the
//! client closes the socket, so teardown happens on every exit path.

use crate::error::{BackendError, BackendResult};
use crate::protocol::{
    ExecuteOutcome, ExecuteParams, ImpliesOutcome, ImpliesParams, ModelOutcome, Request,
    Response, SimplifyParams, SimplifyResult, SMT_TIMEOUT_CODE,
};
use kreach_core::State;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, warn};

/// The four backend operations, seam for the transport.
pub trait Backend: Send {
    fn execute(
        &mut self,
        state: &State,
        max_depth: usize,
        terminal_rules: &[String],
        cut_point_rules: &[String],
    ) -> BackendResult<ExecuteOutcome>;

    fn simplify(&mut self, state: &State) -> BackendResult<State>;

    fn implies(&mut self, antecedent: &State, consequent: &State)
        -> BackendResult<ImpliesOutcome>;

    fn get_model(&mut self, state: &State) -> BackendResult<ModelOutcome>;
}

/// Connection settings for the RPC backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// `host:port` of the backend service
    pub addr: String,
    /// Per-call deadline
    pub timeout: Duration,
    /// How many times a timed-out call is reissued with identical inputs
    pub retry_limit: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:31425".to_string(),
            timeout: Duration::from_secs(30),
            retry_limit: 3,
        }
    }
}

impl BackendConfig {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }
}

/// JSON-RPC backend client owning one TCP session.
#[derive(Debug)]
pub struct RpcBackend {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    config: BackendConfig,
    next_id: u64,
}

impl RpcBackend {
    /// Open a session. Failure here is fatal for the whole run: no proof
    /// task can do anything without a backend.
    pub fn connect(config: BackendConfig) -> BackendResult<Self> {
        let connect_err = |reason: String| BackendError::Connect {
            addr: config.addr.clone(),
            reason,
        };
        let addr = config
            .addr
            .to_socket_addrs()
            .map_err(|e| connect_err(e.to_string()))?
            .next()
            .ok_or_else(|| connect_err("address resolved to nothing".to_string()))?;
        let stream = TcpStream::connect_timeout(&addr, config.timeout)
            .map_err(|e| connect_err(e.to_string()))?;
        stream
            .set_read_timeout(Some(config.timeout))
            .and_then(|_| stream.set_write_timeout(Some(config.timeout)))
            .map_err(|e| connect_err(e.to_string()))?;
        let writer = stream
            .try_clone()
            .map_err(|e| connect_err(e.to_string()))?;
        debug!(addr = %config.addr, "backend session opened");
        Ok(Self {
            reader: BufReader::new(stream),
            writer,
            config,
            next_id: 0,
        })
    }

    fn call<P: Serialize, R: DeserializeOwned>(
        &mut self,
        method: &'static str,
        params: &P,
    ) -> BackendResult<R> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.call_once(method, params) {
                Err(e) if e.is_timeout() && attempts <= self.config.retry_limit => {
                    warn!(method, attempts, "backend call timed out, retrying");
                    continue;
                }
                Err(e) if e.is_timeout() => {
                    return Err(BackendError::Timeout { attempts });
                }
                other => return other,
            }
        }
    }

    fn call_once<P: Serialize, R: DeserializeOwned>(
        &mut self,
        method: &'static str,
        params: &P,
    ) -> BackendResult<R> {
        self.next_id += 1;
        let request = Request {
            jsonrpc: "2.0",
            id: self.next_id,
            method,
            params,
        };
        let mut line = serde_json::to_string(&request)
            .map_err(|e| BackendError::Protocol(e.to_string()))?;
        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .map_err(io_to_backend_error)?;

        let mut reply = String::new();
        let read = self
            .reader
            .read_line(&mut reply)
            .map_err(io_to_backend_error)?;
        if read == 0 {
            return Err(BackendError::Crash("backend closed the connection".into()));
        }
        let response: Response<R> = serde_json::from_str(&reply)
            .map_err(|e| BackendError::Protocol(format!("{method}: {e}")))?;
        if let Some(error) = response.error {
            if error.code == SMT_TIMEOUT_CODE {
                return Err(BackendError::Timeout { attempts: 1 });
            }
            return Err(BackendError::Crash(format!(
                "{method} failed with code {}: {}",
                error.code, error.message
            )));
        }
        response
            .result
            .ok_or_else(|| BackendError::Protocol(format!("{method}: empty response")))
    }
}

fn io_to_backend_error(e: std::io::Error) -> BackendError {
    match e.kind() {
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => {
            BackendError::Timeout { attempts: 1 }
        }
        _ => BackendError::Crash(e.to_string()),
    }
}

impl Backend for RpcBackend {
    fn execute(
        &mut self,
        state: &State,
        max_depth: usize,
        terminal_rules: &[String],
        cut_point_rules: &[String],
    ) -> BackendResult<ExecuteOutcome> {
        self.call(
            "execute",
            &ExecuteParams {
                state,
                max_depth,
                terminal_rules,
                cut_point_rules,
            },
        )
    }

    fn simplify(&mut self, state: &State) -> BackendResult<State> {
        let result: SimplifyResult = self.call("simplify", &SimplifyParams { state })?;
        Ok(result.state)
    }

    fn implies(
        &mut self,
        antecedent: &State,
        consequent: &State,
    ) -> BackendResult<ImpliesOutcome> {
        self.call(
            "implies",
            &ImpliesParams {
                antecedent,
                consequent,
            },
        )
    }

    fn get_model(&mut self, state: &State) -> BackendResult<ModelOutcome> {
        self.call("get-model", &SimplifyParams { state })
    }
}
