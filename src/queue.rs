use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

use crate::agent::Agent;

/// Attacker/defender pair found by the movement worker.
#[derive(Debug, Clone)]
pub struct Engagement {
    pub attacker: Arc<Agent>,
    pub defender: Arc<Agent>,
}

impl Engagement {
    pub fn new(attacker: Arc<Agent>, defender: Arc<Agent>) -> Self {
        Self { attacker, defender }
    }

    pub fn is_stale(&self) -> bool {
        !self.attacker.is_alive() || !self.defender.is_alive()
    }
}

pub type BattleQueue = WorkQueue<Engagement>;
pub type LogQueue = WorkQueue<String>;

/// Returned by `push` once the queue is closed; hands the item back.
#[derive(Debug)]
pub struct Closed<T>(pub T);

/// FIFO handoff between one or more producers and a consumer task.
///
/// `push` wakes one waiter, `close` wakes all of them. After `close`,
/// `pop` keeps returning queued items and yields `None` once the queue is
/// drained, so consumers finish what was accepted before shutdown.
#[derive(Debug)]
pub struct WorkQueue<T> {
    name: &'static str,
    items: Mutex<VecDeque<T>>,
    closed: AtomicBool,
    notify: Notify,
}

impl<T> WorkQueue<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            items: Mutex::new(VecDeque::new()),
            closed: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn push(&self, item: T) -> Result<(), Closed<T>> {
        {
            let mut items = self.items.lock();
            // checked under the lock so nothing lands after close() returns
            if self.closed.load(Ordering::Acquire) {
                return Err(Closed(item));
            }
            items.push_back(item);
        }
        self.notify.notify_one();
        Ok(())
    }

    pub fn try_pop(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    pub async fn pop(&self) -> Option<T> {
        loop {
            // Registered before the checks so a close() in between still wakes us
            let notified = self.notify.notified();

            if let Some(item) = self.try_pop() {
                return Some(item);
            }
            if self.is_closed() {
                return None;
            }

            notified.await;
        }
    }

    pub fn close(&self) {
        {
            let _items = self.items.lock();
            self.closed.store(true, Ordering::Release);
        }
        self.notify.notify_waiters();
        // covers a consumer that checked the flag but hasn't parked yet
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn drain(&self) -> Vec<T> {
        self.items.lock().drain(..).collect()
    }
}
