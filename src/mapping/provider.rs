//! The pull protocol connecting mapping providers.
//!
//! A provider owns its upstream. `prepare` pulls the next upstream buffer and returns
//! `false` once the upstream is exhausted; `take` then yields every extension of that
//! buffer and `None` when there are no more. Callers alternate until `prepare` fails.

use std::collections::VecDeque;

use delegate::delegate;
use indexmap::IndexSet;

use super::{buffer::IndexMappingBuffer, holder::FromToHolder};
use crate::settings::MappingSettings;

pub trait MappingProvider {
    fn prepare(&mut self) -> bool;
    fn take(&mut self) -> Option<IndexMappingBuffer>;
}

pub type BoxedProvider<'a> = Box<dyn MappingProvider + 'a>;

/// The upstream of a provider together with the buffer currently being extended.
pub(crate) struct Register<'a> {
    upstream: BoxedProvider<'a>,
    pub(crate) current: Option<IndexMappingBuffer>,
}

impl<'a> Register<'a> {
    pub(crate) fn new(upstream: BoxedProvider<'a>) -> Self {
        Register {
            upstream,
            current: None,
        }
    }

    /// Loads the next upstream buffer into `current`, re-preparing the upstream as
    /// often as needed.
    pub(crate) fn pull(&mut self) -> bool {
        loop {
            if let Some(buffer) = self.upstream.take() {
                self.current = Some(buffer);
                return true;
            }
            if !self.upstream.prepare() {
                self.current = None;
                return false;
            }
        }
    }
}

pub(crate) struct EmptyProvider;

impl MappingProvider for EmptyProvider {
    fn prepare(&mut self) -> bool {
        false
    }

    fn take(&mut self) -> Option<IndexMappingBuffer> {
        None
    }
}

/// Emits its buffer once.
pub(crate) struct Singleton {
    buffer: Option<IndexMappingBuffer>,
}

impl MappingProvider for Singleton {
    fn prepare(&mut self) -> bool {
        self.buffer.is_some()
    }

    fn take(&mut self) -> Option<IndexMappingBuffer> {
        self.buffer.take()
    }
}

pub(crate) fn singleton<'a>(buffer: IndexMappingBuffer) -> BoxedProvider<'a> {
    Box::new(Singleton {
        buffer: Some(buffer),
    })
}

pub(crate) fn empty<'a>() -> BoxedProvider<'a> {
    Box::new(EmptyProvider)
}

/// Forwards every upstream buffer unchanged.
pub(crate) struct PassThrough<'a> {
    register: Register<'a>,
}

impl<'a> PassThrough<'a> {
    pub(crate) fn boxed(upstream: BoxedProvider<'a>) -> BoxedProvider<'a> {
        Box::new(PassThrough {
            register: Register::new(upstream),
        })
    }
}

impl MappingProvider for PassThrough<'_> {
    fn prepare(&mut self) -> bool {
        self.register.pull()
    }

    fn take(&mut self) -> Option<IndexMappingBuffer> {
        self.register.current.take()
    }
}

/// Emits every upstream buffer twice, with its sign and with the opposite one.
pub(crate) struct PlusMinus<'a> {
    register: Register<'a>,
    queue: VecDeque<IndexMappingBuffer>,
}

impl<'a> PlusMinus<'a> {
    pub(crate) fn boxed(upstream: BoxedProvider<'a>) -> BoxedProvider<'a> {
        Box::new(PlusMinus {
            register: Register::new(upstream),
            queue: VecDeque::new(),
        })
    }
}

impl MappingProvider for PlusMinus<'_> {
    fn prepare(&mut self) -> bool {
        self.queue.clear();
        let ready = self.register.pull();
        if let Some(plus) = self.register.current.take() {
            let mut minus = plus.clone();
            minus.add_sign(true);
            self.queue.push_back(plus);
            self.queue.push_back(minus);
        }
        ready
    }

    fn take(&mut self) -> Option<IndexMappingBuffer> {
        self.queue.pop_front()
    }
}

/// Flips the sign of everything the wrapped provider yields.
pub(crate) struct Negating<'a> {
    inner: BoxedProvider<'a>,
}

impl<'a> Negating<'a> {
    pub(crate) fn boxed(inner: BoxedProvider<'a>) -> BoxedProvider<'a> {
        Box::new(Negating { inner })
    }
}

impl MappingProvider for Negating<'_> {
    delegate! {
        to self.inner {
            fn prepare(&mut self) -> bool;
        }
    }

    fn take(&mut self) -> Option<IndexMappingBuffer> {
        let mut buffer = self.inner.take()?;
        buffer.add_sign(true);
        Some(buffer)
    }
}

/// Strips contracted records from everything the wrapped provider yields.
pub(crate) struct RemovingContracted<'a> {
    inner: BoxedProvider<'a>,
}

impl<'a> RemovingContracted<'a> {
    pub(crate) fn boxed(inner: BoxedProvider<'a>) -> BoxedProvider<'a> {
        Box::new(RemovingContracted { inner })
    }
}

impl MappingProvider for RemovingContracted<'_> {
    delegate! {
        to self.inner {
            fn prepare(&mut self) -> bool;
        }
    }

    fn take(&mut self) -> Option<IndexMappingBuffer> {
        let mut buffer = self.inner.take()?;
        buffer.remove_contracted();
        Some(buffer)
    }
}

/// Holders drawn from a port on demand and kept, deduplicated, for replay.
pub(crate) struct CachedHolders<'a> {
    source: Option<MappingsPort<'a>>,
    seen: IndexSet<FromToHolder>,
}

impl<'a> CachedHolders<'a> {
    pub(crate) fn new(source: MappingsPort<'a>) -> Self {
        CachedHolders {
            source: Some(source),
            seen: IndexSet::new(),
        }
    }

    /// The `k`-th distinct holder, pulling from the source as far as needed.
    fn get(&mut self, k: usize) -> Option<&FromToHolder> {
        while self.seen.len() <= k {
            let Some(buffer) = self.source.as_mut().and_then(MappingsPort::take) else {
                self.source = None;
                break;
            };
            self.seen.insert(buffer.export());
        }
        self.seen.get_index(k)
    }
}

impl From<Vec<FromToHolder>> for CachedHolders<'_> {
    fn from(holders: Vec<FromToHolder>) -> Self {
        CachedHolders {
            source: None,
            seen: holders.into_iter().collect(),
        }
    }
}

/// Extends every upstream buffer with each holder of a cached source, skipping the
/// ones that conflict.
pub(crate) struct HolderMerge<'a> {
    register: Register<'a>,
    holders: CachedHolders<'a>,
    cursor: usize,
    settings: MappingSettings,
}

impl<'a> HolderMerge<'a> {
    pub(crate) fn boxed(
        upstream: BoxedProvider<'a>,
        holders: impl Into<CachedHolders<'a>>,
        settings: MappingSettings,
    ) -> BoxedProvider<'a> {
        Box::new(HolderMerge {
            register: Register::new(upstream),
            holders: holders.into(),
            cursor: 0,
            settings,
        })
    }
}

impl MappingProvider for HolderMerge<'_> {
    fn prepare(&mut self) -> bool {
        self.cursor = 0;
        self.register.pull()
    }

    fn take(&mut self) -> Option<IndexMappingBuffer> {
        let current = self.register.current.as_ref()?.export();
        while let Some(holder) = self.holders.get(self.cursor) {
            self.cursor += 1;
            if let Some(merged) = current.merge_with(holder) {
                return Some(IndexMappingBuffer::from_holder(&merged, self.settings));
            }
        }
        None
    }
}

/// Output cursor over all mappings a provider produces.
///
/// Buffers are yielded in search order; every one is an independent value.
pub struct MappingsPort<'a> {
    provider: BoxedProvider<'a>,
}

impl<'a> MappingsPort<'a> {
    /// Prepares `provider` once and wraps it.
    pub fn new(mut provider: BoxedProvider<'a>) -> Self {
        provider.prepare();
        MappingsPort { provider }
    }

    pub fn take(&mut self) -> Option<IndexMappingBuffer> {
        loop {
            if let Some(buffer) = self.provider.take() {
                return Some(buffer);
            }
            if !self.provider.prepare() {
                return None;
            }
        }
    }
}

impl Iterator for MappingsPort<'_> {
    type Item = IndexMappingBuffer;

    fn next(&mut self) -> Option<Self::Item> {
        self.take()
    }
}
