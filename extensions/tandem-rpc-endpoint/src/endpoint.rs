use crate::rpc_list::{RpcListLink, RpcListSink};
use crate::{
    RpcBindingEntry, RpcContract, RpcEndpointConfig, RpcList, RpcListBinder, RpcMemberDescriptor,
    RpcProxyCore, RpcReply,
};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tandem::RpcError;
use tandem::channel::RpcChannel;
use tandem::codec::SerializerRegistry;
use tandem::lifetime::Lifetime;
use tandem::rpc::{
    RpcCallCodec, RpcCallKind, RpcCallMessage, RpcListDeltaMessage, RpcMessage, RpcPendingCalls,
    RpcResponseMessage, RpcResultStatus,
};
use tandem::scheduler::SingleThreadScheduler;
use tandem::utils::{lock_or_recover, panic_message};

pub(crate) struct EndpointInner {
    pub(crate) config: RpcEndpointConfig,
    pub(crate) scheduler: Arc<SingleThreadScheduler>,
    pub(crate) channel: Arc<dyn RpcChannel>,
    pub(crate) codec: RpcCallCodec,
    pub(crate) pending: Mutex<RpcPendingCalls>,
    bindings: Mutex<HashMap<u64, RpcBindingEntry>>,
    lists: Mutex<HashMap<u64, Arc<dyn RpcListSink>>>,
    next_binding_id: AtomicU64,
    alive: AtomicBool,
}

/// Maps a failure raised while serving a call to the status sent back.
fn fault_status(error: &RpcError) -> RpcResultStatus {
    match error {
        RpcError::Codec(_) | RpcError::UnregisteredType { .. } => RpcResultStatus::DecodeFailure,
        RpcError::UnknownContract { .. } => RpcResultStatus::UnknownContract,
        _ => RpcResultStatus::Fault,
    }
}

fn fault_text(error: &RpcError) -> String {
    match error {
        RpcError::RemoteFault { message } => message.clone(),
        other => other.to_string(),
    }
}

impl EndpointInner {
    pub(crate) fn name(&self) -> &str {
        &self.config.name
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub(crate) fn send(&self, bytes: Vec<u8>) -> Result<(), RpcError> {
        if !self.is_alive() {
            return Err(RpcError::Abandoned);
        }
        self.channel.send(bytes).map_err(RpcError::from)
    }

    fn receive_bytes(self: &Arc<Self>, bytes: Vec<u8>) {
        if !self.is_alive() {
            tracing::debug!(
                "[{}] Dropping {} inbound bytes after teardown",
                self.name(),
                bytes.len()
            );
            return;
        }

        let inner = Arc::clone(self);
        if let Err(e) = self
            .scheduler
            .queue(move || inner.process_message(&bytes))
        {
            tracing::debug!("[{}] Inbound message not queued: {}", self.name(), e);
        }
    }

    /// Routes one inbound message. Always runs on the endpoint's scheduler.
    fn process_message(self: &Arc<Self>, bytes: &[u8]) {
        if !self.is_alive() {
            return;
        }

        let message = match RpcMessage::decode(bytes) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("[{}] Dropping malformed message: {}", self.name(), e);
                return;
            }
        };

        tracing::trace!(
            "[{}] Processing {:?} message",
            self.name(),
            message.message_type()
        );

        match message {
            RpcMessage::Call(call) => self.dispatch_call(call),
            RpcMessage::Response(response) => self.complete_pending(response),
            RpcMessage::ListDelta(delta) => self.apply_list_delta(delta),
        }
    }

    fn respond(&self, response: RpcResponseMessage) {
        let correlation_id = response.correlation_id;
        if let Err(e) = self.send(response.encode()) {
            tracing::error!(
                "[{}] Failed to send response {}: {}",
                self.name(),
                correlation_id,
                e
            );
        }
    }

    fn reject(&self, call: &RpcCallMessage, status: RpcResultStatus, message: &str) {
        if call.kind == RpcCallKind::OneWay {
            tracing::warn!(
                "[{}] One-way call to {:#018x}/{:#018x} failed: {}",
                self.name(),
                call.contract_id,
                call.member_id,
                message
            );
            return;
        }
        self.respond(RpcResponseMessage::fault(call.correlation_id, status, message));
    }

    fn dispatch_call(self: &Arc<Self>, call: RpcCallMessage) {
        let found = {
            let bindings = lock_or_recover(&self.bindings);
            bindings.get(&call.contract_id).map(|entry| {
                (
                    entry.contract_name,
                    entry.lifetime.clone(),
                    entry.table.get(call.member_id),
                )
            })
        };

        let (contract_name, binding_lifetime, handler) = match found {
            None => {
                tracing::debug!(
                    "[{}] No binding for contract {:#018x}",
                    self.name(),
                    call.contract_id
                );
                self.reject(
                    &call,
                    RpcResultStatus::UnknownContract,
                    &format!("no binding for contract {:#018x}", call.contract_id),
                );
                return;
            }
            Some((name, _, None)) => {
                self.reject(
                    &call,
                    RpcResultStatus::UnknownMember,
                    &format!("contract `{}` has no member {:#018x}", name, call.member_id),
                );
                return;
            }
            Some((name, lifetime, Some(handler))) => (name, lifetime, handler),
        };

        tracing::debug!(
            "[{}] Dispatching {:?} call {} on `{}`",
            self.name(),
            call.kind,
            call.correlation_id,
            contract_name
        );

        let outcome = catch_unwind(AssertUnwindSafe(|| handler(&self.codec, &call.payload)))
            .unwrap_or_else(|payload| {
                let message = panic_message(payload.as_ref());
                tracing::error!(
                    "[{}] Implementation of `{}` panicked: {}",
                    self.name(),
                    contract_name,
                    message
                );
                Err(RpcError::RemoteFault {
                    message: format!("implementation panicked: {}", message),
                })
            });

        match outcome {
            Ok(RpcReply::Ready(payload)) => {
                if call.kind.expects_response() {
                    self.respond(RpcResponseMessage {
                        correlation_id: call.correlation_id,
                        status: RpcResultStatus::Success,
                        payload,
                    });
                }
            }
            Ok(RpcReply::Deferred(task)) => {
                if !call.kind.expects_response() {
                    return;
                }
                let weak = Arc::downgrade(self);
                let correlation_id = call.correlation_id;
                task.on_complete(move |result| {
                    let Some(inner) = weak.upgrade() else {
                        return;
                    };
                    let result = result.clone();
                    let responder = Arc::clone(&inner);
                    let queued = inner.scheduler.queue(move || {
                        responder.finish_deferred(correlation_id, &binding_lifetime, result)
                    });
                    if let Err(e) = queued {
                        tracing::debug!(
                            "[{}] Deferred response {} dropped: {}",
                            inner.name(),
                            correlation_id,
                            e
                        );
                    }
                });
            }
            Ok(RpcReply::Silent) => {}
            Err(e) => self.reject(&call, fault_status(&e), &fault_text(&e)),
        }
    }

    /// Sends the response of an asynchronous member, unless its binding has
    /// gone away in the meantime.
    fn finish_deferred(
        &self,
        correlation_id: u32,
        binding_lifetime: &Lifetime,
        result: Result<Vec<u8>, RpcError>,
    ) {
        if !binding_lifetime.is_alive() {
            tracing::debug!(
                "[{}] Binding ended; not answering call {}",
                self.name(),
                correlation_id
            );
            return;
        }

        let response = match result {
            Ok(payload) => RpcResponseMessage {
                correlation_id,
                status: RpcResultStatus::Success,
                payload,
            },
            Err(e) => RpcResponseMessage::fault(correlation_id, fault_status(&e), &fault_text(&e)),
        };
        self.respond(response);
    }

    fn complete_pending(&self, response: RpcResponseMessage) {
        let call = lock_or_recover(&self.pending).take(response.correlation_id);
        match call {
            Some(call) => {
                tracing::trace!(
                    "[{}] Completing call {} with {:?}",
                    self.name(),
                    response.correlation_id,
                    response.status
                );
                call.complete(response);
            }
            None => tracing::warn!(
                "[{}] Response for unknown correlation id {}",
                self.name(),
                response.correlation_id
            ),
        }
    }

    fn apply_list_delta(&self, delta: RpcListDeltaMessage) {
        let sink = lock_or_recover(&self.lists).get(&delta.entity_id).cloned();
        let Some(sink) = sink else {
            tracing::warn!(
                "[{}] Delta for unknown list {:#018x}",
                self.name(),
                delta.entity_id
            );
            return;
        };

        if let Err(e) = sink.apply_delta(&delta) {
            tracing::warn!(
                "[{}] Ignoring {:?} delta for list {:#018x}: {}",
                self.name(),
                delta.op,
                delta.entity_id,
                e
            );
        }
    }

    pub(crate) fn link_list<T: Send + 'static>(
        &self,
        entity_id: u64,
        list: &RpcList<T>,
    ) -> Result<(), RpcError> {
        if !self.codec.registry().contains::<T>() {
            return Err(RpcError::UnregisteredType {
                type_name: std::any::type_name::<T>(),
            });
        }

        list.link(RpcListLink {
            entity_id,
            codec: self.codec.clone(),
            channel: Arc::clone(&self.channel),
            owner: self.name().to_string(),
        });

        let replaced = lock_or_recover(&self.lists).insert(entity_id, list.sink());
        if let Some(previous) = replaced {
            tracing::warn!(
                "[{}] List {:#018x} was already linked; replacing it",
                self.name(),
                entity_id
            );
            previous.unlink();
        }
        Ok(())
    }

    pub(crate) fn unlink_list(&self, entity_id: u64) {
        let removed = lock_or_recover(&self.lists).remove(&entity_id);
        if let Some(sink) = removed {
            sink.unlink();
        }
    }

    /// Unlinks `sink`, and forgets `entity_id` only if it still routes to
    /// that same list.
    pub(crate) fn release_list(&self, entity_id: u64, sink: &Arc<dyn RpcListSink>) {
        {
            let mut lists = lock_or_recover(&self.lists);
            if lists
                .get(&entity_id)
                .is_some_and(|current| Arc::ptr_eq(current, sink))
            {
                lists.remove(&entity_id);
            }
        }
        sink.unlink();
    }

    fn unbind(&self, contract_id: u64, binding_id: u64) {
        let removed = {
            let mut bindings = lock_or_recover(&self.bindings);
            match bindings.get(&contract_id) {
                Some(entry) if entry.binding_id == binding_id => bindings.remove(&contract_id),
                _ => None,
            }
        };

        if let Some(entry) = removed {
            tracing::info!("[{}] Unbound `{}`", self.name(), entry.contract_name);
            for entity_id in entry.list_ids {
                self.unlink_list(entity_id);
            }
        }
    }

    fn verify_members(&self, contract: &str, members: &[RpcMemberDescriptor]) -> Result<(), RpcError> {
        let registry = self.codec.registry();
        for member in members {
            for (type_id, type_name) in member.required_types() {
                if !registry.contains_type_id(*type_id) {
                    tracing::error!(
                        "[{}] `{}.{}` uses `{}`, which has no serializer",
                        self.name(),
                        contract,
                        member.name,
                        type_name
                    );
                    return Err(RpcError::UnregisteredType {
                        type_name: *type_name,
                    });
                }
            }
        }
        Ok(())
    }

    pub(crate) fn terminate(&self) {
        if !self.alive.swap(false, Ordering::SeqCst) {
            return;
        }

        tracing::info!("[{}] Endpoint terminating", self.name());

        self.scheduler.shutdown();

        let bindings: Vec<RpcBindingEntry> = lock_or_recover(&self.bindings)
            .drain()
            .map(|(_, entry)| entry)
            .collect();
        drop(bindings);

        let abandoned = lock_or_recover(&self.pending).abandon_all(self.name());
        if abandoned > 0 {
            tracing::info!("[{}] Abandoned {} pending calls", self.name(), abandoned);
        }

        let lists: Vec<Arc<dyn RpcListSink>> = lock_or_recover(&self.lists)
            .drain()
            .map(|(_, sink)| sink)
            .collect();
        for sink in lists {
            sink.unlink();
        }
    }
}

/// One side of a two-endpoint connection.
///
/// An endpoint owns a scheduler and one end of a channel. Everything that
/// arrives on the channel (calls, responses, list deltas) is processed on the
/// scheduler in arrival order. The endpoint lives as long as the lifetime it
/// was created with; when that ends it shuts the scheduler down, drops its
/// bindings, abandons pending calls and unlinks its lists.
#[derive(Clone)]
pub struct RpcEndpoint {
    pub(crate) inner: Arc<EndpointInner>,
}

impl RpcEndpoint {
    pub fn new(
        config: RpcEndpointConfig,
        lifetime: &Lifetime,
        scheduler: Arc<SingleThreadScheduler>,
        channel: Arc<dyn RpcChannel>,
        registry: Arc<SerializerRegistry>,
    ) -> Self {
        let inner = Arc::new(EndpointInner {
            config,
            scheduler,
            channel: Arc::clone(&channel),
            codec: RpcCallCodec::new(registry),
            pending: Mutex::new(RpcPendingCalls::new()),
            bindings: Mutex::new(HashMap::new()),
            lists: Mutex::new(HashMap::new()),
            next_binding_id: AtomicU64::new(1),
            alive: AtomicBool::new(true),
        });

        let weak: Weak<EndpointInner> = Arc::downgrade(&inner);
        channel.on_receive(Arc::new(move |bytes: Vec<u8>| {
            if let Some(inner) = weak.upgrade() {
                inner.receive_bytes(bytes);
            }
        }));

        let weak: Weak<EndpointInner> = Arc::downgrade(&inner);
        lifetime.on_ended(move || {
            if let Some(inner) = weak.upgrade() {
                inner.terminate();
            }
        });

        tracing::info!("[{}] Endpoint started", inner.name());

        Self { inner }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn config(&self) -> &RpcEndpointConfig {
        &self.inner.config
    }

    pub fn scheduler(&self) -> &Arc<SingleThreadScheduler> {
        &self.inner.scheduler
    }

    pub fn registry(&self) -> &SerializerRegistry {
        self.inner.codec.registry()
    }

    pub fn is_alive(&self) -> bool {
        self.inner.is_alive()
    }

    /// Number of calls still waiting for a response.
    pub fn pending_call_count(&self) -> usize {
        lock_or_recover(&self.inner.pending).len()
    }

    pub fn is_bound<C: RpcContract>(&self) -> bool {
        lock_or_recover(&self.inner.bindings).contains_key(&C::CONTRACT_ID)
    }

    /// Serves `implementation` for contract `C` until `lifetime` ends.
    ///
    /// Every parameter and result type of the contract must already have a
    /// serializer. Binding a contract that is already bound fails with
    /// `AlreadyBound`.
    pub fn bind<C: RpcContract>(
        &self,
        lifetime: &Lifetime,
        implementation: Arc<C::Interface>,
    ) -> Result<(), RpcError> {
        if !self.is_alive() {
            return Err(RpcError::Abandoned);
        }

        self.inner.verify_members(C::NAME, &C::members())?;

        if self.is_bound::<C>() {
            return Err(RpcError::AlreadyBound { contract: C::NAME });
        }

        let table = C::dispatch_table(Arc::clone(&implementation));

        let mut binder = RpcListBinder::new(&self.inner);
        let linked = C::bind_lists(&implementation, &mut binder);
        let list_ids = binder.into_linked();
        if let Err(e) = linked {
            for entity_id in list_ids {
                self.inner.unlink_list(entity_id);
            }
            return Err(e);
        }

        let binding_id = self.inner.next_binding_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut bindings = lock_or_recover(&self.inner.bindings);
            if bindings.contains_key(&C::CONTRACT_ID) {
                drop(bindings);
                for entity_id in list_ids {
                    self.inner.unlink_list(entity_id);
                }
                return Err(RpcError::AlreadyBound { contract: C::NAME });
            }
            bindings.insert(
                C::CONTRACT_ID,
                RpcBindingEntry {
                    contract_name: C::NAME,
                    binding_id,
                    table,
                    lifetime: lifetime.clone(),
                    list_ids,
                },
            );
        }

        tracing::info!(
            "[{}] Bound `{}` ({} members)",
            self.name(),
            C::NAME,
            C::members().len()
        );

        let weak = Arc::downgrade(&self.inner);
        lifetime.on_ended(move || {
            if let Some(inner) = weak.upgrade() {
                inner.unbind(C::CONTRACT_ID, binding_id);
            }
        });

        Ok(())
    }

    /// Creates a proxy for contract `C` that stays usable until `lifetime`
    /// ends.
    pub fn activate_proxy<C: RpcContract>(&self, lifetime: &Lifetime) -> Result<C::Proxy, RpcError> {
        if !self.is_alive() {
            return Err(RpcError::Abandoned);
        }

        self.inner.verify_members(C::NAME, &C::members())?;

        let core = RpcProxyCore::new(self.clone(), lifetime.clone(), C::NAME, C::CONTRACT_ID);
        let proxy = C::create_proxy(core)?;

        tracing::info!("[{}] Activated proxy for `{}`", self.name(), C::NAME);
        Ok(proxy)
    }

    /// Ends the endpoint without waiting for its lifetime.
    pub fn terminate(&self) {
        self.inner.terminate();
    }
}

impl std::fmt::Debug for RpcEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcEndpoint")
            .field("name", &self.inner.config.name)
            .field("alive", &self.is_alive())
            .finish()
    }
}
