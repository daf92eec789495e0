//! User-defined message payloads.

use std::any::Any;
use std::fmt::Debug;

///
/// A payload carried between nodes.
///
/// The kernel never hands the sender's instance to a receiver: every send
/// operation transports a [`clone_message`](Message::clone_message) copy, so
/// a receiver mutating its inbox cannot affect the sender's state.
///
/// # Example
///
/// ```
/// use algosim::prelude::*;
///
/// #[derive(Debug, Clone)]
/// struct Beacon {
///     hops: u32,
/// }
///
/// impl Message for Beacon {
///     fn clone_message(&self) -> Box<dyn Message> {
///         Box::new(self.clone())
///     }
/// }
/// ```
///
pub trait Message: Any + Debug {
    ///
    /// Produces an independent copy of this message.
    ///
    /// Implementations for `Clone` types are one-liners; the boxed return
    /// makes a "clone that produced nothing" unrepresentable.
    ///
    fn clone_message(&self) -> Box<dyn Message>;
}

impl dyn Message {
    /// Indicates whether the payload is of type `T`.
    #[must_use]
    pub fn is<T: Message>(&self) -> bool {
        (self as &dyn Any).is::<T>()
    }

    ///
    /// Returns the payload by reference casted to the given type `T`, or
    /// `None` if the payload is of a different type.
    ///
    #[must_use]
    pub fn downcast_ref<T: Message>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Ping(u32);
    impl Message for Ping {
        fn clone_message(&self) -> Box<dyn Message> {
            Box::new(self.clone())
        }
    }

    #[derive(Debug, Clone)]
    struct Pong;
    impl Message for Pong {
        fn clone_message(&self) -> Box<dyn Message> {
            Box::new(self.clone())
        }
    }

    #[test]
    fn downcasting() {
        let msg: Box<dyn Message> = Box::new(Ping(7));
        assert!(msg.is::<Ping>());
        assert!(!msg.is::<Pong>());
        assert_eq!(msg.downcast_ref::<Ping>(), Some(&Ping(7)));
        assert!(msg.downcast_ref::<Pong>().is_none());
    }

    #[test]
    fn clones_are_independent() {
        let original = Ping(1);
        let copy = original.clone_message();
        assert_eq!(copy.downcast_ref::<Ping>(), Some(&Ping(1)));
        // The copy is a distinct allocation; dropping it leaves the
        // original untouched.
        drop(copy);
        assert_eq!(original, Ping(1));
    }
}
