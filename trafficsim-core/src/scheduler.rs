use crate::time::SimTime;
use core::cmp::Reverse;
use std::{
    collections::{BinaryHeap, HashSet},
    fmt,
    time::Duration,
};

/// Handle on an event scheduled in a [`Scheduler`], used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(u64);

/// Discrete-event clock.
///
/// Events are delivered one at a time, in non-decreasing simulated time.
/// Events scheduled for the same instant are delivered in the order they
/// were scheduled. A cancelled event is never delivered.
///
/// ```
/// # use trafficsim_core::{scheduler::Scheduler, time::SimTime};
/// # use std::time::Duration;
/// let mut scheduler = Scheduler::new();
/// scheduler.schedule_in(Duration::from_secs(2), "late");
/// let early = scheduler.schedule_in(Duration::from_secs(1), "early");
/// scheduler.cancel(early);
///
/// let (_, event) = scheduler.pop_until(SimTime::from_secs(10)).unwrap();
/// assert_eq!(event, "late");
/// assert_eq!(scheduler.now(), SimTime::from_secs(2));
/// ```
pub struct Scheduler<E> {
    now: SimTime,
    queue: BinaryHeap<Reverse<Scheduled<E>>>,
    pending: HashSet<EventId>,
    next_id: u64,
}

struct Scheduled<E> {
    at: SimTime,
    id: EventId,
    event: E,
}

impl<E> PartialEq for Scheduled<E> {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.id == other.id
    }
}

impl<E> Eq for Scheduled<E> {}

impl<E> PartialOrd for Scheduled<E> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Scheduled<E> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.at, self.id).cmp(&(other.at, other.id))
    }
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Self {
            now: SimTime::ZERO,
            queue: BinaryHeap::new(),
            pending: HashSet::new(),
            next_id: 0,
        }
    }

    /// the time of the last delivered event (or of the last
    /// [`Scheduler::advance_to`])
    #[inline]
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// number of events scheduled and not cancelled yet
    #[inline]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    #[inline]
    pub fn is_pending(&self, id: EventId) -> bool {
        self.pending.contains(&id)
    }

    /// Schedule `event` at `at`. An instant in the past is moved to
    /// [`Scheduler::now`], the clock never goes backward.
    pub fn schedule_at(&mut self, at: SimTime, event: E) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;

        let at = at.max(self.now);
        self.pending.insert(id);
        self.queue.push(Reverse(Scheduled { at, id, event }));

        id
    }

    /// Schedule `event` `delay` after [`Scheduler::now`].
    pub fn schedule_in(&mut self, delay: Duration, event: E) -> EventId {
        self.schedule_at(self.now + delay, event)
    }

    /// Cancel a pending event. Returns `false` if the event was already
    /// delivered or cancelled.
    pub fn cancel(&mut self, id: EventId) -> bool {
        self.pending.remove(&id)
    }

    /// the time of the next event to deliver, if any
    pub fn time_to_next_event(&mut self) -> Option<SimTime> {
        self.discard_cancelled();
        self.queue.peek().map(|entry| entry.0.at)
    }

    /// Deliver the next event if it is due strictly before `horizon`,
    /// advancing the clock to its time.
    pub fn pop_until(&mut self, horizon: SimTime) -> Option<(EventId, E)> {
        self.discard_cancelled();

        if self.queue.peek()?.0.at >= horizon {
            return None;
        }

        let Reverse(Scheduled { at, id, event }) = self.queue.pop()?;
        self.pending.remove(&id);
        self.now = at;

        Some((id, event))
    }

    /// Move the clock forward to `time` without delivering anything.
    /// Moving backward is ignored.
    pub fn advance_to(&mut self, time: SimTime) {
        self.now = self.now.max(time);
    }

    fn discard_cancelled(&mut self) {
        while let Some(entry) = self.queue.peek() {
            if self.pending.contains(&entry.0.id) {
                break;
            }
            self.queue.pop();
        }
    }
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HORIZON: SimTime = SimTime::from_secs(100);

    #[test]
    fn empty() {
        let mut c = Scheduler::<()>::new();

        assert!(c.is_empty());
        assert_eq!(c.len(), 0);
        assert!(c.pop_until(HORIZON).is_none());
        assert!(c.time_to_next_event().is_none());
        assert_eq!(c.now(), SimTime::ZERO);
    }

    #[test]
    fn delivered_in_time_order() {
        let mut c = Scheduler::new();
        c.schedule_at(SimTime::from_secs(3), 3);
        c.schedule_at(SimTime::from_secs(1), 1);
        c.schedule_at(SimTime::from_secs(2), 2);

        let mut order = Vec::new();
        while let Some((_, event)) = c.pop_until(HORIZON) {
            order.push((c.now(), event));
        }

        assert_eq!(
            order,
            vec![
                (SimTime::from_secs(1), 1),
                (SimTime::from_secs(2), 2),
                (SimTime::from_secs(3), 3)
            ]
        );
    }

    #[test]
    fn same_instant_is_fifo() {
        let mut c = Scheduler::new();
        for i in 0..10 {
            c.schedule_at(SimTime::from_secs(1), i);
        }

        let order: Vec<_> = std::iter::from_fn(|| c.pop_until(HORIZON).map(|(_, e)| e)).collect();
        assert_eq!(order, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn cancelled_never_fires() {
        let mut c = Scheduler::new();
        let id = c.schedule_in(Duration::from_secs(1), "cancelled");
        c.schedule_in(Duration::from_secs(2), "kept");

        assert!(c.is_pending(id));
        assert!(c.cancel(id));
        assert!(!c.cancel(id));
        assert!(!c.is_pending(id));
        assert_eq!(c.len(), 1);

        assert_eq!(c.time_to_next_event(), Some(SimTime::from_secs(2)));
        assert_eq!(c.pop_until(HORIZON).map(|(_, e)| e), Some("kept"));
        assert!(c.pop_until(HORIZON).is_none());
    }

    #[test]
    fn horizon_is_exclusive() {
        let mut c = Scheduler::new();
        c.schedule_at(SimTime::from_secs(5), ());

        assert!(c.pop_until(SimTime::from_secs(5)).is_none());
        assert_eq!(c.len(), 1);
        assert!(c.pop_until(SimTime::from_secs(6)).is_some());
    }

    #[test]
    fn past_is_clamped_to_now() {
        let mut c = Scheduler::new();
        c.advance_to(SimTime::from_secs(4));
        c.schedule_at(SimTime::from_secs(1), ());

        assert_eq!(c.time_to_next_event(), Some(SimTime::from_secs(4)));

        c.advance_to(SimTime::from_secs(2));
        assert_eq!(c.now(), SimTime::from_secs(4));
    }

    #[test]
    fn delivered_event_cannot_be_cancelled() {
        let mut c = Scheduler::new();
        let id = c.schedule_in(Duration::ZERO, ());
        assert!(c.pop_until(HORIZON).is_some());
        assert!(!c.cancel(id));
    }
}
