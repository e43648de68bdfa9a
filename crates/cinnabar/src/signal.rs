//! Typed signals: lightweight observer lists owned by primitives.
//!
//! Signals are notifications, never errors. Subscribers receive the
//! payload together with the current run context so any follow-on work
//! they trigger stays inside the current run; a primitive's lifetime
//! bounds the lifetime of its emitted signals.

use std::cell::RefCell;
use std::fmt;

use crate::context::RunContext;

type Subscriber<T> = Box<dyn Fn(&T, &RunContext)>;

/// An observer list for one payload type.
pub struct Signal<T> {
    subscribers: RefCell<Vec<Subscriber<T>>>,
}

impl<T> Signal<T> {
    /// Creates a signal with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: RefCell::new(Vec::new()),
        }
    }

    /// Registers a subscriber.
    ///
    /// Subscribers must not connect further subscribers to the same
    /// signal from inside an emission.
    pub fn connect(&self, subscriber: impl Fn(&T, &RunContext) + 'static) {
        self.subscribers.borrow_mut().push(Box::new(subscriber));
    }

    /// Delivers the payload to every subscriber, in connection order.
    pub fn emit(&self, payload: &T, ctx: &RunContext) {
        for subscriber in self.subscribers.borrow().iter() {
            subscriber(payload, ctx);
        }
    }

    /// Number of connected subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::context::testing::test_context;

    #[test]
    fn emits_to_all_subscribers_in_order() {
        let signal: Signal<u32> = Signal::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        for tag in ["a", "b"] {
            let seen = Rc::clone(&seen);
            signal.connect(move |value, _ctx| seen.borrow_mut().push((tag, *value)));
        }

        let ctx = test_context();
        signal.emit(&7, &ctx);
        assert_eq!(*seen.borrow(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn emit_without_subscribers_is_a_no_op() {
        let signal: Signal<u32> = Signal::new();
        let ctx = test_context();
        signal.emit(&1, &ctx);
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn subscribers_see_the_context_clock() {
        let signal: Signal<()> = Signal::new();
        let seen = Rc::new(RefCell::new(None));
        {
            let seen = Rc::clone(&seen);
            signal.connect(move |(), ctx| *seen.borrow_mut() = Some(ctx.clock()));
        }

        let ctx = test_context();
        signal.emit(&(), &ctx);
        assert_eq!(*seen.borrow(), Some(0.0));
    }
}
