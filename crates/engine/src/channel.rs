//! Single-slot rendezvous between two threads.
//!
//! One side asks (`query`), the other answers. A message moves into the slot
//! on `query`, out to the answering thread on `try_query`/`wait_query`, back
//! into the slot on `answer` and finally out to the asking thread. At most one
//! exchange is in flight; anything else is reported as an error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use thiserror::Error;

/// Misuse of a channel, or a vanished peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// A query was issued before the previous answer was collected.
    #[error("a query is already outstanding")]
    QueryOutstanding,

    /// An answer was given, or collected, with no query taken.
    #[error("no pending query")]
    NoPendingQuery,

    /// The other side was dropped.
    #[error("peer disconnected")]
    Disconnected,
}

enum Slot<Q> {
    Empty,
    Query(Q),
    Taken,
    Answer(Q),
}

struct State<Q> {
    slot: Slot<Q>,
    closed: bool,
}

struct Shared<Q> {
    state: Mutex<State<Q>>,
    cond: Condvar,
    has_query: AtomicBool,
    poll: Duration,
}

impl<Q> Shared<Q> {
    fn lock(&self) -> MutexGuard<'_, State<Q>> {
        // A panic on the other side poisons the lock; the slot itself is still sound.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, State<Q>>) -> MutexGuard<'a, State<Q>> {
        match self.cond.wait_timeout(guard, self.poll) {
            Ok((guard, _)) => guard,
            Err(poisoned) => poisoned.into_inner().0,
        }
    }

    fn close(&self) {
        self.lock().closed = true;
        // Wake a busy answering side so it notices.
        self.has_query.store(true, Ordering::Release);
        self.cond.notify_all();
    }
}

/// Asking half of a channel.
pub struct QuerySide<Q> {
    shared: Arc<Shared<Q>>,
}

/// Answering half of a channel.
pub struct AnswerSide<Q> {
    shared: Arc<Shared<Q>>,
}

/// Create a channel whose blocking waits re-check their condition every
/// `poll`.
pub fn sync_channel<Q>(poll: Duration) -> (QuerySide<Q>, AnswerSide<Q>) {
    let shared = Arc::new(Shared {
        state: Mutex::new(State {
            slot: Slot::Empty,
            closed: false,
        }),
        cond: Condvar::new(),
        has_query: AtomicBool::new(false),
        poll,
    });
    (
        QuerySide {
            shared: shared.clone(),
        },
        AnswerSide { shared },
    )
}

impl<Q> QuerySide<Q> {
    /// Hand `msg` to the answering side.
    pub fn query(&self, msg: Q) -> Result<(), ChannelError> {
        let mut state = self.shared.lock();
        if !matches!(state.slot, Slot::Empty) {
            return Err(ChannelError::QueryOutstanding);
        }
        if state.closed {
            return Err(ChannelError::Disconnected);
        }
        state.slot = Slot::Query(msg);
        self.shared.has_query.store(true, Ordering::Release);
        drop(state);
        self.shared.cond.notify_all();
        Ok(())
    }

    /// Collect the answer if it is ready.
    pub fn try_answer(&self) -> Result<Option<Q>, ChannelError> {
        let mut state = self.shared.lock();
        Self::take_answer(&mut state)
    }

    /// Block until the answer arrives.
    pub fn wait_answer(&self) -> Result<Q, ChannelError> {
        let mut state = self.shared.lock();
        loop {
            if let Some(msg) = Self::take_answer(&mut state)? {
                return Ok(msg);
            }
            state = self.shared.wait(state);
        }
    }

    /// Whether a query has been issued and its answer not yet collected.
    pub fn is_pending(&self) -> bool {
        !matches!(self.shared.lock().slot, Slot::Empty)
    }

    fn take_answer(state: &mut State<Q>) -> Result<Option<Q>, ChannelError> {
        match std::mem::replace(&mut state.slot, Slot::Empty) {
            Slot::Answer(msg) => Ok(Some(msg)),
            Slot::Empty => Err(ChannelError::NoPendingQuery),
            waiting => {
                state.slot = waiting;
                if state.closed {
                    Err(ChannelError::Disconnected)
                } else {
                    Ok(None)
                }
            }
        }
    }
}

impl<Q> AnswerSide<Q> {
    /// Whether a query is waiting to be taken, or the querying side is gone.
    /// Lock-free.
    #[inline]
    pub fn has_query(&self) -> bool {
        self.shared.has_query.load(Ordering::Acquire)
    }

    /// Take the waiting query, if any.
    pub fn try_query(&self) -> Result<Option<Q>, ChannelError> {
        let mut state = self.shared.lock();
        self.take_query(&mut state)
    }

    /// Block until a query arrives and take it.
    pub fn wait_query(&self) -> Result<Q, ChannelError> {
        let mut state = self.shared.lock();
        loop {
            if let Some(msg) = self.take_query(&mut state)? {
                return Ok(msg);
            }
            state = self.shared.wait(state);
        }
    }

    /// Return the taken query, possibly modified, as the answer.
    pub fn answer(&self, msg: Q) -> Result<(), ChannelError> {
        let mut state = self.shared.lock();
        if !matches!(state.slot, Slot::Taken) {
            return Err(ChannelError::NoPendingQuery);
        }
        if state.closed {
            return Err(ChannelError::Disconnected);
        }
        state.slot = Slot::Answer(msg);
        drop(state);
        self.shared.cond.notify_all();
        Ok(())
    }

    fn take_query(&self, state: &mut State<Q>) -> Result<Option<Q>, ChannelError> {
        match std::mem::replace(&mut state.slot, Slot::Empty) {
            Slot::Query(msg) => {
                state.slot = Slot::Taken;
                self.shared.has_query.store(false, Ordering::Release);
                Ok(Some(msg))
            }
            other => {
                state.slot = other;
                if state.closed {
                    Err(ChannelError::Disconnected)
                } else {
                    Ok(None)
                }
            }
        }
    }
}

impl<Q> Drop for QuerySide<Q> {
    fn drop(&mut self) {
        self.shared.close();
    }
}

impl<Q> Drop for AnswerSide<Q> {
    fn drop(&mut self) {
        self.shared.close();
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    const POLL: Duration = Duration::from_millis(1);

    #[test]
    fn query_and_answer_alternate() {
        let (q, a) = sync_channel::<u32>(POLL);
        assert!(!a.has_query());
        q.query(1).unwrap();
        assert!(a.has_query());
        assert!(q.is_pending());
        assert_eq!(q.try_answer(), Ok(None));

        let msg = a.try_query().unwrap().unwrap();
        assert!(!a.has_query());
        a.answer(msg + 1).unwrap();
        assert_eq!(q.try_answer(), Ok(Some(2)));
        assert!(!q.is_pending());
    }

    #[test]
    fn second_query_is_rejected() {
        let (q, a) = sync_channel::<u32>(POLL);
        q.query(1).unwrap();
        assert_eq!(q.query(2), Err(ChannelError::QueryOutstanding));
        let msg = a.wait_query().unwrap();
        assert_eq!(q.query(3), Err(ChannelError::QueryOutstanding));
        a.answer(msg).unwrap();
        // The answer has not been collected yet.
        assert_eq!(q.query(4), Err(ChannelError::QueryOutstanding));
        assert_eq!(q.wait_answer(), Ok(1));
        q.query(5).unwrap();
    }

    #[test]
    fn answer_without_query_is_rejected() {
        let (q, a) = sync_channel::<u32>(POLL);
        assert_eq!(a.answer(0), Err(ChannelError::NoPendingQuery));
        q.query(1).unwrap();
        // Not taken yet.
        assert_eq!(a.answer(0), Err(ChannelError::NoPendingQuery));
        let msg = a.try_query().unwrap().unwrap();
        a.answer(msg).unwrap();
        assert_eq!(a.answer(msg), Err(ChannelError::NoPendingQuery));
        assert_eq!(q.try_answer(), Ok(Some(1)));
        assert_eq!(q.try_answer(), Err(ChannelError::NoPendingQuery));
    }

    #[test]
    fn dropped_peer_is_reported() {
        let (q, a) = sync_channel::<u32>(POLL);
        q.query(7).unwrap();
        drop(a);
        assert_eq!(q.wait_answer(), Err(ChannelError::Disconnected));

        let (q, a) = sync_channel::<u32>(POLL);
        drop(q);
        assert_eq!(a.wait_query(), Err(ChannelError::Disconnected));
    }

    #[test]
    fn answer_survives_answering_side_exit() {
        let (q, a) = sync_channel::<String>(POLL);
        q.query("ping".to_owned()).unwrap();
        let worker = thread::spawn(move || {
            let mut msg = a.wait_query().unwrap();
            msg.push_str(" pong");
            a.answer(msg).unwrap();
        });
        worker.join().unwrap();
        assert_eq!(q.wait_answer().unwrap(), "ping pong");
    }

    #[test]
    fn blocking_round_trips_across_threads() {
        let (q, a) = sync_channel::<u64>(POLL);
        let echo = thread::spawn(move || {
            let mut seen = 0;
            while let Ok(n) = a.wait_query() {
                seen += 1;
                a.answer(n * 2).unwrap();
            }
            seen
        });
        for n in 0..100 {
            q.query(n).unwrap();
            assert_eq!(q.wait_answer().unwrap(), n * 2);
        }
        drop(q);
        assert_eq!(echo.join().unwrap(), 100);
    }
}
