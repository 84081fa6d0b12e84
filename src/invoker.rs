//! Resilient RPC invocation: bounded retries with endpoint failover.
//!
//! The invoker is the sole path to the remote service. It owns the endpoint
//! pool and the active transport, rotating to the next endpoint once the
//! per-endpoint retry budget is spent. Rotation is a deliberate side effect
//! of `invoke`; no other component touches the pool.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::{
    error::{PayoutError, Result},
    pool::{EndpointPool, RetryPolicy},
    transport::{RpcTransport, TransportFactory},
};

pub struct ResilientInvoker {
    pool: EndpointPool,
    policy: RetryPolicy,
    factory: TransportFactory,
    transport: Box<dyn RpcTransport>,
}

impl ResilientInvoker {
    pub fn new(pool: EndpointPool, policy: RetryPolicy, factory: TransportFactory) -> Self {
        let transport = factory(pool.active_url(), policy.timeout);
        Self {
            pool,
            policy,
            factory,
            transport,
        }
    }

    /// Replaces the endpoint pool and, optionally, parts of the retry
    /// policy. All inputs are validated before any state changes; on success
    /// the active endpoint resets to the first in the pool and the transport
    /// is rebuilt.
    pub fn configure(
        &mut self,
        urls: &[String],
        max_retries: Option<usize>,
        backoff: Option<Duration>,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let pool = EndpointPool::new(urls)?;
        let policy = RetryPolicy::new(
            max_retries.unwrap_or(self.policy.max_retries_per_endpoint),
            backoff.unwrap_or(self.policy.backoff),
            timeout.unwrap_or(self.policy.timeout),
        )?;
        self.transport = (self.factory)(pool.active_url(), policy.timeout);
        debug!(endpoints = pool.len(), active = pool.active_url(), "rpc pool configured");
        self.pool = pool;
        self.policy = policy;
        Ok(())
    }

    pub fn pool(&self) -> &EndpointPool {
        &self.pool
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs `op` against the active transport, retrying on any failure with
    /// capped linear backoff. Every `max_retries_per_endpoint` consecutive
    /// failures the pool rotates to the next endpoint. The total budget is
    /// `pool_len * max_retries_per_endpoint` attempts; once spent, the last
    /// underlying error is surfaced inside [`PayoutError::RetryExhausted`].
    pub fn invoke<T>(
        &mut self,
        op: impl Fn(&dyn RpcTransport) -> anyhow::Result<T>,
    ) -> Result<T> {
        let max_attempts = self.pool.len() * self.policy.max_retries_per_endpoint;
        let mut attempts = 0;
        let mut last_error: Option<anyhow::Error> = None;
        while attempts < max_attempts {
            match op(self.transport.as_ref()) {
                Ok(value) => return Ok(value),
                Err(err) => {
                    attempts += 1;
                    warn!(
                        endpoint = self.pool.active_url(),
                        attempt = attempts,
                        max_attempts,
                        error = %err,
                        "rpc call failed",
                    );
                    last_error = Some(err);
                    if attempts == max_attempts {
                        break;
                    }
                    std::thread::sleep(self.policy.backoff_for_attempt(attempts));
                    if self.pool.len() > 1 && attempts % self.policy.max_retries_per_endpoint == 0 {
                        self.pool.rotate();
                        self.transport = (self.factory)(self.pool.active_url(), self.policy.timeout);
                        debug!(endpoint = self.pool.active_url(), "rotated rpc endpoint");
                    }
                }
            }
        }
        Err(PayoutError::RetryExhausted {
            attempts: max_attempts,
            endpoints: self.pool.len(),
            source: last_error
                .unwrap_or_else(|| anyhow::anyhow!("rpc call failed with no recorded error")),
        })
    }

    /// Connectivity check. Fails with [`PayoutError::Unhealthy`] when the
    /// endpoint answers but reports itself not-connected, and with
    /// [`PayoutError::PingTimeout`] when a successful answer arrives slower
    /// than `limit` (a slow endpoint is as useless as a dead one here).
    pub fn ping(&mut self, limit: Duration) -> Result<Duration> {
        let start = Instant::now();
        let healthy = self.invoke(|transport| transport.check_connectivity())?;
        let elapsed = start.elapsed();
        if !healthy {
            return Err(PayoutError::Unhealthy);
        }
        if elapsed > limit {
            return Err(PayoutError::PingTimeout { elapsed, limit });
        }
        Ok(elapsed)
    }
}
