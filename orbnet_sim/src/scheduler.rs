//! Single-threaded discrete-event scheduler.
//!
//! Events are closures keyed by simulated time. Running an event hands it
//! the world and the scheduler, so it can mutate state and schedule
//! follow-ups (which is how the update loop re-arms its tick).

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A scheduled action on world `W`.
pub type Event<W> = Box<dyn FnOnce(&mut W, &mut EventScheduler<W>)>;

struct Scheduled<W> {
    time: f64,
    seq: u64,
    event: Event<W>,
}

impl<W> PartialEq for Scheduled<W> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<W> Eq for Scheduled<W> {}

impl<W> PartialOrd for Scheduled<W> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<W> Ord for Scheduled<W> {
    // Reversed: BinaryHeap is a max-heap and we want the earliest event,
    // ties broken by insertion order.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Virtual clock plus event queue.
pub struct EventScheduler<W> {
    /// Current simulated time (seconds)
    now: f64,

    /// Insertion counter for FIFO tie-breaking
    next_seq: u64,

    /// Pending events
    queue: BinaryHeap<Scheduled<W>>,

    /// Events executed so far
    processed: u64,

    /// Set by `stop`; pending events are discarded
    stopped: bool,
}

impl<W: 'static> EventScheduler<W> {
    /// Creates a scheduler whose clock starts at `start_time`.
    pub fn new(start_time: f64) -> Self {
        Self {
            now: start_time,
            next_seq: 0,
            queue: BinaryHeap::new(),
            processed: 0,
            stopped: false,
        }
    }

    /// Current simulated time.
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Number of pending events.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Number of events executed.
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Schedules `event` at absolute time `time`.
    ///
    /// Times in the past are clamped to now.
    pub fn schedule_at<F>(&mut self, time: f64, event: F)
    where
        F: FnOnce(&mut W, &mut EventScheduler<W>) + 'static,
    {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Scheduled {
            time: time.max(self.now),
            seq,
            event: Box::new(event),
        });
    }

    /// Schedules `event` `delay` seconds from now.
    pub fn schedule_in<F>(&mut self, delay: f64, event: F)
    where
        F: FnOnce(&mut W, &mut EventScheduler<W>) + 'static,
    {
        self.schedule_at(self.now + delay, event);
    }

    /// Stops the scheduler; no further events run.
    pub fn stop(&mut self) {
        self.stopped = true;
        self.queue.clear();
    }

    /// True after `stop`.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Runs the next event, if any. Returns false when nothing ran.
    pub fn step(&mut self, world: &mut W) -> bool {
        if self.stopped {
            return false;
        }
        match self.queue.pop() {
            Some(scheduled) => {
                self.now = scheduled.time;
                self.processed += 1;
                (scheduled.event)(world, self);
                true
            }
            None => false,
        }
    }

    /// Runs events until the queue drains or the scheduler is stopped.
    pub fn run(&mut self, world: &mut W) -> u64 {
        let before = self.processed;
        while self.step(world) {}
        self.processed - before
    }

    /// Runs every event scheduled at or before `end_time`.
    pub fn run_until(&mut self, world: &mut W, end_time: f64) -> u64 {
        let before = self.processed;
        while !self.stopped && self.queue.peek().is_some_and(|next| next.time <= end_time) {
            self.step(world);
        }
        if !self.stopped && self.now < end_time {
            self.now = end_time;
        }
        self.processed - before
    }
}
