//! Fixed-capacity FIFO that evicts its oldest entry instead of blocking.
//!
//! # Overview
//! - One queue per consumer; the completion handler is the only producer.
//! - `push` never waits and never fails. On a full queue the entry at `head`
//!   is discarded before the new one is stored.
//! - `pop` never waits; it returns `None` when nothing is pending.
//! - Capacity is a power of two so indices wrap by masking. A capacity of 1
//!   degenerates to "keep only the latest".
//!
//! # State encoding
//! A slot holds `Some(_)` while pending. The queue is empty when the slot at
//! `head` is `None`, and full when `head == tail` and that slot is occupied.
//! Every read-modify-write happens inside [`critical::with`].

use core::cell::RefCell;

use critical_section::Mutex;

use crate::critical;
use crate::error::{Error, Result};

struct Slots<T, const N: usize> {
    head: usize,
    tail: usize,
    slots: [Option<T>; N],
    dropped: u32,
}

impl<T: Copy, const N: usize> Slots<T, N> {
    const MASK: usize = N - 1;

    #[inline(always)]
    const fn advance(idx: usize) -> usize {
        (idx + 1) & Self::MASK
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.slots[self.head].is_none()
    }

    #[inline]
    fn is_full(&self) -> bool {
        self.head == self.tail && self.slots[self.head].is_some()
    }

    fn len(&self) -> usize {
        if self.is_full() {
            N
        } else {
            self.tail.wrapping_sub(self.head) & Self::MASK
        }
    }

    fn push(&mut self, value: T) -> Option<T> {
        let evicted = if self.is_full() {
            let oldest = self.slots[self.head].take();
            self.head = Self::advance(self.head);
            self.dropped = self.dropped.wrapping_add(1);
            oldest
        } else {
            None
        };

        self.slots[self.tail] = Some(value);
        self.tail = Self::advance(self.tail);
        evicted
    }

    fn pop(&mut self) -> Option<T> {
        let value = self.slots[self.head].take()?;
        self.head = Self::advance(self.head);
        Some(value)
    }
}

/// Lossy ring of `N` entries. `N` must be a power of two.
pub struct LossyQueue<T: Copy, const N: usize> {
    inner: Mutex<RefCell<Slots<T, N>>>,
}

impl<T: Copy, const N: usize> LossyQueue<T, N> {
    /// Create an empty queue. A capacity that is not a power of two fails to compile.
    pub const fn new() -> Self {
        const { assert!(N.is_power_of_two(), "queue capacity must be a power of two") };
        Self::empty()
    }

    /// Create an empty queue, rejecting a bad capacity at run time.
    pub fn try_new() -> Result<Self> {
        if !N.is_power_of_two() {
            return Err(Error::CapacityNotPowerOfTwo { capacity: N });
        }
        Ok(Self::empty())
    }

    const fn empty() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Slots {
                head: 0,
                tail: 0,
                slots: [None; N],
                dropped: 0,
            })),
        }
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Append `value`, evicting the oldest pending entry if the queue is full.
    /// Returns the evicted entry.
    #[inline]
    pub fn push(&self, value: T) -> Option<T> {
        critical::with(|cs| self.inner.borrow_ref_mut(cs).push(value))
    }

    /// Take the oldest pending entry.
    #[inline]
    pub fn pop(&self) -> Option<T> {
        critical::with(|cs| self.inner.borrow_ref_mut(cs).pop())
    }

    pub fn len(&self) -> usize {
        critical::with(|cs| self.inner.borrow_ref(cs).len())
    }

    pub fn is_empty(&self) -> bool {
        critical::with(|cs| self.inner.borrow_ref(cs).is_empty())
    }

    pub fn is_full(&self) -> bool {
        critical::with(|cs| self.inner.borrow_ref(cs).is_full())
    }

    /// How many entries `push` has evicted since creation or the last
    /// [`clear`](Self::clear) (wrapping).
    pub fn dropped(&self) -> u32 {
        critical::with(|cs| self.inner.borrow_ref(cs).dropped)
    }

    /// Discard everything but the newest pending entry.
    /// Returns how many entries were discarded.
    pub fn skip_to_latest(&self) -> usize {
        critical::with(|cs| {
            let mut slots = self.inner.borrow_ref_mut(cs);
            let mut skipped = 0;
            while slots.len() > 1 {
                slots.pop();
                skipped += 1;
            }
            skipped
        })
    }

    /// Drop all pending entries, rewind the indices and reset the
    /// [`dropped`](Self::dropped) counter. The queue is as good as new.
    pub fn clear(&self) {
        critical::with(|cs| {
            let mut slots = self.inner.borrow_ref_mut(cs);
            slots.slots = [None; N];
            slots.head = 0;
            slots.tail = 0;
            slots.dropped = 0;
        });
    }
}

impl<T: Copy, const N: usize> Default for LossyQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::LossyQueue;
    use crate::critical;
    use crate::error::Error;
    use std::thread;
    use std::vec::Vec;

    fn drain<const N: usize>(queue: &LossyQueue<u32, N>) -> Vec<u32> {
        let mut out = Vec::new();
        while let Some(v) = queue.pop() {
            out.push(v);
        }
        out
    }

    fn indices<const N: usize>(queue: &LossyQueue<u32, N>) -> (usize, usize) {
        critical::with(|cs| {
            let slots = queue.inner.borrow_ref(cs);
            (slots.head, slots.tail)
        })
    }

    #[test]
    fn overflow_evicts_oldest() {
        let queue = LossyQueue::<char, 4>::new();
        for c in ['A', 'B', 'C', 'D'] {
            assert_eq!(queue.push(c), None);
        }
        assert!(queue.is_full());
        assert_eq!(queue.push('E'), Some('A'));

        assert_eq!(queue.pop(), Some('B'));
        assert_eq!(queue.pop(), Some('C'));
        assert_eq!(queue.pop(), Some('D'));
        assert_eq!(queue.pop(), Some('E'));
        assert_eq!(queue.pop(), None);
        assert_eq!(queue.dropped(), 1);
    }

    #[test]
    fn keeps_last_capacity_entries_in_push_order() {
        fn check<const N: usize>(pushes: u32) {
            let queue = LossyQueue::<u32, N>::new();
            for i in 0..pushes {
                queue.push(i);
            }
            let expected: Vec<u32> = (pushes - N as u32..pushes).collect();
            assert_eq!(drain(&queue), expected, "capacity {}, {} pushes", N, pushes);
            assert_eq!(queue.dropped(), pushes - N as u32);
        }

        check::<1>(5);
        check::<2>(3);
        check::<4>(9);
        check::<8>(8 * 3 + 5);
        check::<16>(100);
    }

    #[test]
    fn pop_on_empty_leaves_indices_alone() {
        let queue = LossyQueue::<u32, 4>::new();
        queue.push(1);
        queue.push(2);
        assert_eq!(drain(&queue), [1, 2]);

        let before = indices(&queue);
        assert_eq!(queue.pop(), None);
        assert_eq!(queue.pop(), None);
        assert_eq!(indices(&queue), before);
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn capacity_one_keeps_latest() {
        let queue = LossyQueue::<u32, 1>::new();
        assert_eq!(queue.push(1), None);
        assert_eq!(queue.push(2), Some(1));
        assert_eq!(queue.push(3), Some(2));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop(), Some(3));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn len_tracks_wrapped_indices() {
        let queue = LossyQueue::<u32, 4>::new();
        for i in 0..6 {
            queue.push(i);
        }
        assert_eq!(queue.len(), 4);
        queue.pop();
        assert_eq!(queue.len(), 3);
        queue.push(6);
        queue.push(7);
        assert_eq!(queue.len(), 4);
        assert_eq!(drain(&queue), [4, 5, 6, 7]);
    }

    #[test]
    fn skip_to_latest_keeps_newest() {
        let queue = LossyQueue::<u32, 8>::new();
        assert_eq!(queue.skip_to_latest(), 0);
        for i in 0..5 {
            queue.push(i);
        }
        assert_eq!(queue.skip_to_latest(), 4);
        assert_eq!(drain(&queue), [4]);
    }

    #[test]
    fn clear_empties_and_rewinds() {
        let queue = LossyQueue::<u32, 4>::new();
        for i in 0..7 {
            queue.push(i);
        }
        assert_eq!(queue.dropped(), 3);
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(indices(&queue), (0, 0));
        assert_eq!(queue.dropped(), 0);
        queue.push(9);
        assert_eq!(queue.pop(), Some(9));
    }

    #[test]
    fn try_new_rejects_non_power_of_two() {
        assert_eq!(
            LossyQueue::<u32, 3>::try_new().err(),
            Some(Error::CapacityNotPowerOfTwo { capacity: 3 })
        );
        assert_eq!(
            LossyQueue::<u32, 0>::try_new().err(),
            Some(Error::CapacityNotPowerOfTwo { capacity: 0 })
        );
        assert!(LossyQueue::<u32, 32>::try_new().is_ok());
    }

    #[test]
    fn concurrent_pop_sees_increasing_values() {
        const PUSHES: u32 = 20_000;
        let queue = LossyQueue::<u32, 8>::new();

        let seen = thread::scope(|s| {
            let producer = s.spawn(|| {
                for i in 1..=PUSHES {
                    queue.push(i);
                }
            });

            let mut seen = Vec::new();
            while !producer.is_finished() || !queue.is_empty() {
                if let Some(v) = queue.pop() {
                    seen.push(v);
                }
            }
            seen
        });

        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(seen.last(), Some(&PUSHES));
        assert_eq!(seen.len() as u32 + queue.dropped(), PUSHES);
    }
}
