use crate::{RpcEndpoint, RpcList};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tandem::RpcError;
use tandem::codec::RpcArgs;
use tandem::lifetime::Lifetime;
use tandem::rpc::{RpcCallKind, RpcResponseHandler, RpcResponseMessage, RpcTask};
use tandem::utils::lock_or_recover;

/// The generic half of every generated proxy: "invoke member N with these
/// arguments".
///
/// Generated proxy methods only pick the member id and the call kind; all
/// marshaling, correlation and waiting happens here.
#[derive(Clone)]
pub struct RpcProxyCore {
    endpoint: RpcEndpoint,
    lifetime: Lifetime,
    contract_name: &'static str,
    contract_id: u64,
    /// Correlation ids of this proxy's calls that are still awaiting a
    /// response.
    issued: Arc<Mutex<HashSet<u32>>>,
}

impl RpcProxyCore {
    pub(crate) fn new(
        endpoint: RpcEndpoint,
        lifetime: Lifetime,
        contract_name: &'static str,
        contract_id: u64,
    ) -> Self {
        let issued = Arc::new(Mutex::new(HashSet::new()));

        // Calls still in flight when the proxy's scope ends are dropped
        // uncompleted, same as at endpoint teardown.
        let owned = Arc::clone(&issued);
        let inner = Arc::downgrade(&endpoint.inner);
        lifetime.on_ended(move || {
            let ids: Vec<u32> = lock_or_recover(&owned).drain().collect();
            let Some(inner) = inner.upgrade() else {
                return;
            };
            let mut pending = lock_or_recover(&inner.pending);
            let dropped = ids.iter().filter(|id| pending.take(**id).is_some()).count();
            if dropped > 0 {
                tracing::debug!(
                    "[{}] Abandoned {} calls of `{}` with their proxy",
                    inner.name(),
                    dropped,
                    contract_name
                );
            }
        });

        Self {
            endpoint,
            lifetime,
            contract_name,
            contract_id,
            issued,
        }
    }

    pub fn endpoint(&self) -> &RpcEndpoint {
        &self.endpoint
    }

    pub fn contract_name(&self) -> &'static str {
        self.contract_name
    }

    pub fn contract_id(&self) -> u64 {
        self.contract_id
    }

    /// True while both the proxy's lifetime and its endpoint are alive.
    pub fn is_alive(&self) -> bool {
        self.lifetime.is_alive() && self.endpoint.is_alive()
    }

    /// Encodes and sends one call, registering `task` to receive its
    /// outcome. The message is fully encoded before anything is registered
    /// or sent.
    fn issue_call<A, R>(
        &self,
        member_id: u64,
        kind: RpcCallKind,
        args: &A,
        task: RpcTask<R>,
    ) -> Result<(), RpcError>
    where
        A: RpcArgs,
        R: Send + Sync + 'static,
    {
        if !self.is_alive() {
            return Err(RpcError::Abandoned);
        }

        let inner = &self.endpoint.inner;
        let mut call = inner
            .codec
            .encode_call(self.contract_id, member_id, kind, 0, args)?;

        let codec = inner.codec.clone();
        let contract_id = self.contract_id;
        let issued = Arc::clone(&self.issued);
        let handler: RpcResponseHandler = Box::new(move |response: RpcResponseMessage| {
            lock_or_recover(&issued).remove(&response.correlation_id);
            task.complete(codec.decode_result::<R>(&response, contract_id, member_id));
        });

        call.correlation_id = {
            let mut pending = lock_or_recover(&inner.pending);
            let correlation_id = pending.register(member_id, handler);
            lock_or_recover(&self.issued).insert(correlation_id);
            correlation_id
        };

        tracing::trace!(
            "[{}] Calling `{}` member {:#018x} as {:?} ({})",
            inner.name(),
            self.contract_name,
            member_id,
            kind,
            call.correlation_id
        );

        // Either scope may have ended between the liveness check and the
        // registration above.
        if !self.is_alive() {
            self.forget(call.correlation_id);
            return Err(RpcError::Abandoned);
        }

        if let Err(e) = inner.send(call.encode()) {
            self.forget(call.correlation_id);
            return Err(e);
        }

        Ok(())
    }

    fn forget(&self, correlation_id: u32) {
        lock_or_recover(&self.issued).remove(&correlation_id);
        lock_or_recover(&self.endpoint.inner.pending).take(correlation_id);
    }

    /// Calls a member and blocks until its response has been processed by
    /// this endpoint's scheduler.
    ///
    /// On the scheduler's own thread the wait pumps queued work instead of
    /// blocking, so the response can still be processed. Returns `Abandoned`
    /// if the endpoint ends first.
    pub fn call_sync<A, R>(&self, member_id: u64, args: A) -> Result<R, RpcError>
    where
        A: RpcArgs,
        R: Clone + Send + Sync + 'static,
    {
        let task = RpcTask::<R>::new();
        self.issue_call(member_id, RpcCallKind::Sync, &args, task.clone())?;

        let scheduler = self.endpoint.scheduler();
        let interval = self.endpoint.config().pump_interval;

        if scheduler.is_active_thread() {
            let pumped = scheduler.pump_until(|| task.is_completed() || !self.is_alive(), interval);
            if let Err(e) = pumped {
                tracing::debug!(
                    "[{}] Pump for `{}` ended early: {}",
                    self.endpoint.name(),
                    self.contract_name,
                    e
                );
            }
        } else {
            loop {
                if let Some(outcome) = task.wait_timeout(interval) {
                    return outcome;
                }
                if !self.is_alive() {
                    break;
                }
            }
        }

        task.try_result().unwrap_or(Err(RpcError::Abandoned))
    }

    /// Calls a member and returns at once. The task completes on this
    /// endpoint's scheduler; it never completes if the endpoint ends first.
    pub fn call_async<A, R>(&self, member_id: u64, args: A) -> RpcTask<R>
    where
        A: RpcArgs,
        R: Send + Sync + 'static,
    {
        let task = RpcTask::<R>::new();
        let kind = RpcCallKind::for_async_result::<R>();

        match self.issue_call(member_id, kind, &args, task.clone()) {
            Ok(()) => {}
            Err(RpcError::Abandoned) => {
                tracing::debug!(
                    "[{}] Async call to `{}` issued after teardown",
                    self.endpoint.name(),
                    self.contract_name
                );
            }
            Err(e) => {
                task.set_fault(e);
            }
        }

        task
    }

    /// Sends a call that gets no response.
    pub fn call_oneway<A: RpcArgs>(&self, member_id: u64, args: A) -> Result<(), RpcError> {
        if !self.is_alive() {
            return Err(RpcError::Abandoned);
        }

        let inner = &self.endpoint.inner;
        let call = inner.codec.encode_call(
            self.contract_id,
            member_id,
            RpcCallKind::OneWay,
            tandem::constants::ONE_WAY_CORRELATION_ID,
            &args,
        )?;
        inner.send(call.encode())
    }

    /// A local mirror of a replicated list, linked to this endpoint until the
    /// proxy's lifetime ends.
    pub fn list<T: Send + 'static>(&self, entity_id: u64) -> Result<RpcList<T>, RpcError> {
        let list = RpcList::new();
        self.endpoint.inner.link_list(entity_id, &list)?;

        let sink = list.sink();
        let endpoint = Arc::downgrade(&self.endpoint.inner);
        self.lifetime.on_ended(move || match endpoint.upgrade() {
            Some(inner) => inner.release_list(entity_id, &sink),
            None => sink.unlink(),
        });

        Ok(list)
    }
}

impl std::fmt::Debug for RpcProxyCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcProxyCore")
            .field("contract", &self.contract_name)
            .field("endpoint", &self.endpoint.name())
            .finish()
    }
}
