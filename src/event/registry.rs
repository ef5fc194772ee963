//! Ordered, mutation-tolerant subscriber registry for one notification interface.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::Weak;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use log::trace;

use super::BaseEventMarker;

/// Live subscriber list of one notification interface.
///
/// Records are non-owning (`Weak`) references compared by allocation address. The
/// list may be mutated while dispatch passes walk it: every open [`DispatchCursor`]
/// is registered here and shifted by structural mutations, so a pass never repeats
/// or skips a record because of an insertion or removal elsewhere in the list.
///
/// The lock is never held while user code runs.
pub struct Registry<I: ?Sized + BaseEventMarker> {
    entries: Mutex<Entries<I>>,
    next_cursor_id: AtomicU64,
}

struct Entries<I: ?Sized> {
    subscribers: Vec<Weak<I>>,
    /// Open cursors as `(id, index of the next record to visit)`.
    cursors: Vec<(u64, usize)>,
}

impl<I: ?Sized> Entries<I> {
    fn position(&self, subscriber: &Weak<I>) -> Option<usize> {
        self.subscribers
            .iter()
            .position(|entry| Weak::ptr_eq(entry, subscriber))
    }

    fn remove_at(&mut self, index: usize) -> Weak<I> {
        let removed = self.subscribers.remove(index);
        for (_, next) in &mut self.cursors {
            if index < *next {
                *next -= 1;
            }
        }
        removed
    }

    fn insert_front(&mut self, subscriber: Weak<I>) {
        self.subscribers.insert(0, subscriber);
        for (_, next) in &mut self.cursors {
            if *next > 0 {
                *next += 1;
            }
        }
    }
}

impl<I: ?Sized + BaseEventMarker> Registry<I> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Entries {
                subscribers: Vec::new(),
                cursors: Vec::new(),
            }),
            next_cursor_id: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries<I>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `subscriber` to the end. Returns `false` if it is already present.
    pub fn append(&self, subscriber: Weak<I>) -> bool {
        let mut entries = self.lock();
        if entries.position(&subscriber).is_some() {
            trace!(
                "Ignoring duplicate subscription to {}",
                std::any::type_name::<I>()
            );
            return false;
        }
        entries.subscribers.push(subscriber);
        trace!(
            "Subscribed to {} ({} subscribers)",
            std::any::type_name::<I>(),
            entries.subscribers.len()
        );
        true
    }

    /// Removes `subscriber`. Returns `false` if it was not present.
    pub fn remove(&self, subscriber: &Weak<I>) -> bool {
        let mut entries = self.lock();
        let Some(index) = entries.position(subscriber) else {
            return false;
        };
        // Only a `Weak` is dropped here, subscriber destructors never run under the lock
        entries.remove_at(index);
        trace!(
            "Unsubscribed from {} at index {index} ({} subscribers)",
            std::any::type_name::<I>(),
            entries.subscribers.len()
        );
        true
    }

    /// Moves `subscriber` to index 0. Returns `false` if it is not present.
    ///
    /// Open cursors that already passed the front are shifted with the list, so
    /// the promotion takes effect for them from their next pass.
    pub fn promote_to_front(&self, subscriber: &Weak<I>) -> bool {
        let mut entries = self.lock();
        let Some(index) = entries.position(subscriber) else {
            return false;
        };
        if index == 0 {
            return true;
        }
        let record = entries.remove_at(index);
        entries.insert_front(record);
        trace!(
            "Promoted subscriber of {} from index {index} to the front",
            std::any::type_name::<I>()
        );
        true
    }

    pub fn contains(&self, subscriber: &Weak<I>) -> bool {
        self.lock().position(subscriber).is_some()
    }

    /// Number of records, including records whose subscriber is already gone.
    pub fn len(&self) -> usize {
        self.lock().subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().subscribers.is_empty()
    }

    /// Number of records whose subscriber is still alive.
    pub fn live_len(&self) -> usize {
        self.lock()
            .subscribers
            .iter()
            .filter(|record| record.strong_count() > 0)
            .count()
    }

    /// Returns the live subscriber currently at `index`.
    pub fn get(&self, index: usize) -> Option<Arc<I>> {
        let record = self.lock().subscribers.get(index).cloned();
        record?.upgrade()
    }

    /// Live subscribers in visitation order.
    pub fn subscribers(&self) -> Vec<Arc<I>> {
        let records = self.lock().subscribers.clone();
        records.iter().filter_map(Weak::upgrade).collect()
    }

    /// Drops every record. Open passes finish without visiting anything else.
    pub fn clear(&self) {
        let mut entries = self.lock();
        entries.subscribers.clear();
        for (_, next) in &mut entries.cursors {
            *next = 0;
        }
    }

    /// Opens a cursor at the front of the live list.
    pub fn cursor(&self) -> DispatchCursor<'_, I> {
        let id = self.next_cursor_id.fetch_add(1, Ordering::Relaxed);
        self.lock().cursors.push((id, 0));
        DispatchCursor { registry: self, id }
    }
}

impl<I: ?Sized + BaseEventMarker> Default for Registry<I> {
    fn default() -> Self {
        Self::new()
    }
}

/// Position of one dispatch pass inside a [`Registry`].
///
/// Each call to [`advance`](DispatchCursor::advance) re-reads the current length and
/// contents of the list. The cursor unregisters itself when dropped.
pub struct DispatchCursor<'a, I: ?Sized + BaseEventMarker> {
    registry: &'a Registry<I>,
    id: u64,
}

impl<I: ?Sized + BaseEventMarker> DispatchCursor<'_, I> {
    /// Index of the next record this cursor will visit.
    pub fn position(&self) -> usize {
        let entries = self.registry.lock();
        entries
            .cursors
            .iter()
            .find(|(id, _)| *id == self.id)
            .map_or(0, |(_, next)| *next)
    }

    /// Returns the next record and moves past it, or `None` once the list is exhausted.
    pub fn advance(&mut self) -> Option<Weak<I>> {
        let mut entries = self.registry.lock();
        let Entries {
            subscribers,
            cursors,
        } = &mut *entries;
        let (_, next) = cursors.iter_mut().find(|(id, _)| *id == self.id)?;
        let record = subscribers.get(*next)?.clone();
        *next += 1;
        Some(record)
    }
}

impl<I: ?Sized + BaseEventMarker> Drop for DispatchCursor<'_, I> {
    fn drop(&mut self) {
        self.registry.lock().cursors.retain(|(id, _)| *id != self.id);
    }
}
