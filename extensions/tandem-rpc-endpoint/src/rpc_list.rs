use crate::endpoint::EndpointInner;
use std::sync::{Arc, Mutex, MutexGuard};
use tandem::RpcError;
use tandem::channel::RpcChannel;
use tandem::rpc::{RpcCallCodec, RpcListDeltaMessage, RpcListOp};
use tandem::utils::lock_or_recover;

/// Where a linked list sends its deltas.
#[derive(Clone)]
pub(crate) struct RpcListLink {
    pub entity_id: u64,
    pub codec: RpcCallCodec,
    pub channel: Arc<dyn RpcChannel>,
    pub owner: String,
}

struct RpcListShared<T> {
    items: Mutex<Vec<T>>,
    link: Mutex<Option<RpcListLink>>,
}

/// Receiving side of a linked list, as seen by its endpoint.
pub(crate) trait RpcListSink: Send + Sync {
    fn apply_delta(&self, delta: &RpcListDeltaMessage) -> Result<(), RpcError>;

    fn unlink(&self);
}

/// An ordered list mirrored between two endpoints.
///
/// Each side holds its own copy. A local mutation is applied to the local
/// copy and then sent to the peer as a single delta; deltas from the peer
/// are applied in arrival order and never re-sent. Until it is linked to an
/// endpoint (by binding or by activating a proxy) the list behaves like a
/// plain local `Vec`.
///
/// Clones share the same copy.
pub struct RpcList<T> {
    shared: Arc<RpcListShared<T>>,
}

impl<T> Clone for RpcList<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> Default for RpcList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> RpcList<T> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(RpcListShared {
                items: Mutex::new(Vec::new()),
                link: Mutex::new(None),
            }),
        }
    }

    pub fn is_linked(&self) -> bool {
        lock_or_recover(&self.shared.link).is_some()
    }

    pub(crate) fn link(&self, link: RpcListLink) {
        let mut current = lock_or_recover(&self.shared.link);
        if let Some(previous) = current.as_ref() {
            tracing::warn!(
                "[{}] List {:#018x} was linked to `{}`; relinking",
                link.owner,
                link.entity_id,
                previous.owner
            );
        }
        *current = Some(link);
    }

    pub(crate) fn sink(&self) -> Arc<dyn RpcListSink> {
        self.shared.clone()
    }

    fn current_link(&self) -> Option<RpcListLink> {
        lock_or_recover(&self.shared.link).clone()
    }

    fn items(&self) -> MutexGuard<'_, Vec<T>> {
        lock_or_recover(&self.shared.items)
    }

    /// Appends `value`.
    pub fn push(&self, value: T) -> Result<(), RpcError> {
        self.insert_at(None, value)
    }

    /// Inserts `value` at `index`, shifting later elements.
    pub fn insert(&self, index: usize, value: T) -> Result<(), RpcError> {
        self.insert_at(Some(index), value)
    }

    // The items lock is held from encoding until the delta is sent, so local
    // order and wire order agree.
    fn insert_at(&self, index: Option<usize>, value: T) -> Result<(), RpcError> {
        let link = self.current_link();
        let mut items = self.items();
        let len = items.len();
        let index = index.unwrap_or(len);
        if index > len {
            return Err(RpcError::IndexOutOfRange { index, len });
        }

        let encoded = encode_delta(link.as_ref(), RpcListOp::Insert, index, len, Some(&value))?;
        items.insert(index, value);
        send_delta(link, encoded, RpcListOp::Insert, index)
    }

    /// Removes and returns the element at `index`.
    pub fn remove(&self, index: usize) -> Result<T, RpcError> {
        let link = self.current_link();
        let mut items = self.items();
        let len = items.len();
        if index >= len {
            return Err(RpcError::IndexOutOfRange { index, len });
        }

        let encoded = encode_delta::<T>(link.as_ref(), RpcListOp::Remove, index, len, None)?;
        let removed = items.remove(index);
        send_delta(link, encoded, RpcListOp::Remove, index)?;
        Ok(removed)
    }

    /// Replaces the element at `index`, returning the previous one.
    pub fn set(&self, index: usize, value: T) -> Result<T, RpcError> {
        let link = self.current_link();
        let mut items = self.items();
        let len = items.len();
        if index >= len {
            return Err(RpcError::IndexOutOfRange { index, len });
        }

        let encoded = encode_delta(link.as_ref(), RpcListOp::Set, index, len, Some(&value))?;
        let previous = std::mem::replace(&mut items[index], value);
        send_delta(link, encoded, RpcListOp::Set, index)?;
        Ok(previous)
    }

    pub fn clear(&self) -> Result<(), RpcError> {
        let link = self.current_link();
        let mut items = self.items();
        let len = items.len();

        let encoded = encode_delta::<T>(link.as_ref(), RpcListOp::Clear, 0, len, None)?;
        items.clear();
        send_delta(link, encoded, RpcListOp::Clear, 0)
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }
}

impl<T: Clone + Send + 'static> RpcList<T> {
    pub fn get(&self, index: usize) -> Option<T> {
        self.items().get(index).cloned()
    }

    /// A snapshot of the elements in order.
    pub fn to_vec(&self) -> Vec<T> {
        self.items().clone()
    }
}

fn encode_delta<T: 'static>(
    link: Option<&RpcListLink>,
    op: RpcListOp,
    index: usize,
    len: usize,
    value: Option<&T>,
) -> Result<Option<Vec<u8>>, RpcError> {
    let Some(link) = link else {
        return Ok(None);
    };
    let wire_index =
        u32::try_from(index).map_err(|_| RpcError::IndexOutOfRange { index, len })?;
    let delta = link
        .codec
        .encode_list_delta(link.entity_id, op, wire_index, value)?;
    Ok(Some(delta.encode()))
}

fn send_delta(
    link: Option<RpcListLink>,
    encoded: Option<Vec<u8>>,
    op: RpcListOp,
    index: usize,
) -> Result<(), RpcError> {
    if let (Some(link), Some(bytes)) = (link, encoded) {
        tracing::trace!(
            "[{}] Sending {:?} delta for list {:#018x} at {}",
            link.owner,
            op,
            link.entity_id,
            index
        );
        link.channel.send(bytes)?;
    }
    Ok(())
}

impl<T: Send + 'static> RpcListSink for RpcListShared<T> {
    fn apply_delta(&self, delta: &RpcListDeltaMessage) -> Result<(), RpcError> {
        let Some(link) = lock_or_recover(&self.link).clone() else {
            tracing::debug!(
                "Dropping delta for unlinked list {:#018x}",
                delta.entity_id
            );
            return Ok(());
        };

        let mut items = lock_or_recover(&self.items);
        let index = delta.index as usize;
        let len = items.len();

        match delta.op {
            RpcListOp::Insert => {
                if index > len {
                    return Err(RpcError::IndexOutOfRange { index, len });
                }
                let value = link.codec.decode_list_value::<T>(&delta.payload)?;
                items.insert(index, value);
            }
            RpcListOp::Remove => {
                if index >= len {
                    return Err(RpcError::IndexOutOfRange { index, len });
                }
                items.remove(index);
            }
            RpcListOp::Set => {
                if index >= len {
                    return Err(RpcError::IndexOutOfRange { index, len });
                }
                items[index] = link.codec.decode_list_value::<T>(&delta.payload)?;
            }
            RpcListOp::Clear => items.clear(),
        }

        tracing::trace!(
            "[{}] Applied remote {:?} to list {:#018x}; {} elements",
            link.owner,
            delta.op,
            delta.entity_id,
            items.len()
        );
        Ok(())
    }

    fn unlink(&self) {
        lock_or_recover(&self.link).take();
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for RpcList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(lock_or_recover(&self.shared.items).iter())
            .finish()
    }
}

/// Links an implementation's lists to the endpoint it is being bound on.
pub struct RpcListBinder<'a> {
    endpoint: &'a Arc<EndpointInner>,
    linked: Vec<u64>,
}

impl<'a> RpcListBinder<'a> {
    pub(crate) fn new(endpoint: &'a Arc<EndpointInner>) -> Self {
        Self {
            endpoint,
            linked: Vec::new(),
        }
    }

    pub fn link<T: Send + 'static>(
        &mut self,
        entity_id: u64,
        list: &RpcList<T>,
    ) -> Result<(), RpcError> {
        self.endpoint.link_list(entity_id, list)?;
        self.linked.push(entity_id);
        Ok(())
    }

    pub(crate) fn into_linked(self) -> Vec<u64> {
        self.linked
    }
}
