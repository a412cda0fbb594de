//! Bounded / unbounded FIFO channel with a closed state.
//!
//! A channel is the input queue of exactly one block. Any number of producers
//! (upstream workers, external callers) enqueue; the block's workers compete
//! to dequeue, and each item goes to exactly one worker.
//!
//! Blocked senders (threads in [`Channel::enqueue`] and futures from
//! [`Channel::enqueue_async`]) take a ticket and are admitted strictly in
//! ticket order once space frees up. A non-blocking [`Channel::try_enqueue`]
//! never overtakes a queued sender.

use crate::dataflow::error::PostError;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};

/// Lifecycle of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    /// Accepting items.
    Open,
    /// No new items accepted; queued items remain drainable.
    CompleteRequested,
    /// Closed and drained. Dequeue reports end-of-stream.
    Closed,
}

struct Waiter {
    ticket: u64,
    waker: Option<Waker>,
}

struct State<T> {
    queue: VecDeque<T>,
    capacity: Option<usize>,
    status: ChannelStatus,
    next_ticket: u64,
    waiting: VecDeque<Waiter>,
    peak_len: usize,
}

impl<T> State<T> {
    #[inline]
    fn has_space(&self) -> bool {
        self.capacity.map_or(true, |cap| self.queue.len() < cap)
    }

    #[inline]
    fn is_open(&self) -> bool {
        self.status == ChannelStatus::Open
    }

    fn push(&mut self, item: T) {
        self.queue.push_back(item);
        self.peak_len = self.peak_len.max(self.queue.len());
    }

    fn take_ticket(&mut self) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        ticket
    }

    fn is_front(&self, ticket: u64) -> bool {
        self.waiting.front().is_some_and(|w| w.ticket == ticket)
    }

    fn remove_waiter(&mut self, ticket: u64) {
        if let Some(pos) = self.waiting.iter().position(|w| w.ticket == ticket) {
            self.waiting.remove(pos);
        }
    }

    /// Wake the async sender at the head of the queue, if there is one.
    fn wake_front(&mut self) {
        if let Some(waker) = self.waiting.front_mut().and_then(|w| w.waker.take()) {
            waker.wake();
        }
    }

    fn wake_all(&mut self) {
        for waiter in self.waiting.iter_mut() {
            if let Some(waker) = waiter.waker.take() {
                waker.wake();
            }
        }
    }
}

/// Outcome of one admission attempt by an async sender.
enum Admission<T> {
    Accepted,
    Closed(T),
    Waiting(T),
}

/// FIFO buffer with optional capacity and a closed state.
pub struct Channel<T> {
    state: Mutex<State<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> Channel<T> {
    /// Create an unbounded channel.
    pub fn unbounded() -> Self {
        Self::with_capacity(None)
    }

    /// Create a channel holding at most `capacity` items.
    pub fn bounded(capacity: usize) -> Self {
        Self::with_capacity(Some(capacity))
    }

    /// `None` means unbounded.
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                capacity,
                status: ChannelStatus::Open,
                next_ticket: 0,
                waiting: VecDeque::new(),
                peak_len: 0,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    // Nothing panics while holding the lock, so a poisoned lock still
    // guards consistent state.
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Non-blocking enqueue.
    pub fn try_enqueue(&self, item: T) -> Result<(), PostError<T>> {
        let mut st = self.lock();
        if !st.is_open() {
            return Err(PostError::Declined(item));
        }
        if !st.waiting.is_empty() || !st.has_space() {
            return Err(PostError::CapacityExceeded(item));
        }
        st.push(item);
        drop(st);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Blocking enqueue. Suspends the calling thread while the channel is
    /// full. Returns the item if the channel stops accepting input first.
    pub fn enqueue(&self, item: T) -> Result<(), T> {
        let mut st = self.lock();
        if !st.is_open() {
            return Err(item);
        }
        if st.waiting.is_empty() && st.has_space() {
            st.push(item);
            drop(st);
            self.not_empty.notify_one();
            return Ok(());
        }

        let ticket = st.take_ticket();
        st.waiting.push_back(Waiter {
            ticket,
            waker: None,
        });

        loop {
            st = self.not_full.wait(st).unwrap_or_else(PoisonError::into_inner);

            if !st.is_open() {
                st.remove_waiter(ticket);
                return Err(item);
            }
            if st.is_front(ticket) && st.has_space() {
                st.waiting.pop_front();
                st.push(item);
                self.pass_turn(&mut st);
                drop(st);
                self.not_empty.notify_one();
                return Ok(());
            }
        }
    }

    /// Suspending enqueue for async callers. Resolves to `true` once the item
    /// is accepted, `false` if the channel stops accepting input first.
    pub fn enqueue_async(self: &Arc<Self>, item: T) -> SendFuture<T> {
        SendFuture {
            channel: Arc::clone(self),
            item: Some(item),
            ticket: None,
        }
    }

    fn poll_enqueue(&self, item: T, ticket: &mut Option<u64>, waker: &Waker) -> Admission<T> {
        let mut st = self.lock();
        if !st.is_open() {
            if let Some(t) = ticket.take() {
                st.remove_waiter(t);
            }
            return Admission::Closed(item);
        }

        let at_front = match *ticket {
            Some(t) => st.is_front(t),
            None => st.waiting.is_empty(),
        };
        if at_front && st.has_space() {
            if ticket.take().is_some() {
                st.waiting.pop_front();
            }
            st.push(item);
            self.pass_turn(&mut st);
            drop(st);
            self.not_empty.notify_one();
            return Admission::Accepted;
        }

        match *ticket {
            Some(t) => {
                if let Some(w) = st.waiting.iter_mut().find(|w| w.ticket == t) {
                    w.waker = Some(waker.clone());
                }
            }
            None => {
                let t = st.take_ticket();
                st.waiting.push_back(Waiter {
                    ticket: t,
                    waker: Some(waker.clone()),
                });
                *ticket = Some(t);
            }
        }
        Admission::Waiting(item)
    }

    fn withdraw(&self, ticket: u64) {
        let mut st = self.lock();
        let was_front = st.is_front(ticket);
        st.remove_waiter(ticket);
        if was_front && st.has_space() {
            self.pass_turn(&mut st);
        }
    }

    /// Let the next queued sender try, if there is still room.
    fn pass_turn(&self, st: &mut State<T>) {
        if !st.waiting.is_empty() && st.has_space() {
            st.wake_front();
            self.not_full.notify_all();
        }
    }

    /// Blocking dequeue. Returns `None` once the channel is closed and drained.
    pub fn dequeue(&self) -> Option<T> {
        let mut st = self.lock();
        loop {
            if let Some(item) = st.queue.pop_front() {
                if st.queue.is_empty() && st.status == ChannelStatus::CompleteRequested {
                    st.status = ChannelStatus::Closed;
                    // Other consumers may be parked on an empty queue.
                    self.not_empty.notify_all();
                }
                st.wake_front();
                drop(st);
                self.not_full.notify_all();
                return Some(item);
            }
            if !st.is_open() {
                st.status = ChannelStatus::Closed;
                return None;
            }
            st = self.not_empty.wait(st).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Non-blocking dequeue.
    pub fn try_dequeue(&self) -> Option<T> {
        let mut st = self.lock();
        let item = st.queue.pop_front()?;
        if st.queue.is_empty() && st.status == ChannelStatus::CompleteRequested {
            st.status = ChannelStatus::Closed;
            self.not_empty.notify_all();
        }
        st.wake_front();
        drop(st);
        self.not_full.notify_all();
        Some(item)
    }

    /// Stop accepting input. Queued items stay drainable. Idempotent;
    /// returns `true` on the call that closed the channel.
    pub fn close(&self) -> bool {
        let mut st = self.lock();
        if !st.is_open() {
            return false;
        }
        st.status = if st.queue.is_empty() {
            ChannelStatus::Closed
        } else {
            ChannelStatus::CompleteRequested
        };
        st.wake_all();
        drop(st);
        self.not_empty.notify_all();
        self.not_full.notify_all();
        true
    }

    /// Close immediately, discarding everything still queued. Returns the
    /// number of discarded items.
    pub fn close_and_clear(&self) -> usize {
        let mut st = self.lock();
        let discarded = std::mem::take(&mut st.queue);
        st.status = ChannelStatus::Closed;
        st.wake_all();
        drop(st);
        self.not_empty.notify_all();
        self.not_full.notify_all();
        discarded.len()
    }

    pub fn status(&self) -> ChannelStatus {
        self.lock().status
    }

    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.lock().capacity
    }

    /// Highest number of items ever held at once.
    pub fn peak_len(&self) -> usize {
        self.lock().peak_len
    }

    /// Number of senders currently suspended waiting for space.
    pub fn pending_senders(&self) -> usize {
        self.lock().waiting.len()
    }
}

/// Future returned by [`Channel::enqueue_async`].
///
/// Dropping it before completion withdraws its place in the sender queue.
#[must_use = "futures do nothing unless polled"]
pub struct SendFuture<T> {
    channel: Arc<Channel<T>>,
    item: Option<T>,
    ticket: Option<u64>,
}

// The item is never pinned; it is moved in and out by value.
impl<T> Unpin for SendFuture<T> {}

impl<T> Future for SendFuture<T> {
    type Output = bool;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        let this = self.get_mut();
        let Some(item) = this.item.take() else {
            return Poll::Ready(false);
        };
        match this.channel.poll_enqueue(item, &mut this.ticket, cx.waker()) {
            Admission::Accepted => Poll::Ready(true),
            Admission::Closed(_) => Poll::Ready(false),
            Admission::Waiting(item) => {
                this.item = Some(item);
                Poll::Pending
            }
        }
    }
}

impl<T> Drop for SendFuture<T> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            self.channel.withdraw(ticket);
        }
    }
}
