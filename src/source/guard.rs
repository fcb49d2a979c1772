//! Scoped ownership of a live [`Session`].

use std::ops::{Deref, DerefMut};

use tracing::{info, warn};

use super::Session;
use crate::error::SourceError;

/// Closes the wrapped session exactly once.
///
/// The normal path calls [`finish`](SessionGuard::finish) to close and see
/// the result.  On any other exit (early return, `?`, or unwinding) the
/// [`Drop`] impl closes the session instead and logs a failure.
pub struct SessionGuard<S: Session> {
    session: S,
    source_name: String,
    closed: bool,
}

impl<S: Session> SessionGuard<S> {
    pub fn new(session: S, source_name: impl Into<String>) -> Self {
        Self {
            session,
            source_name: source_name.into(),
            closed: false,
        }
    }

    /// Close the session and report how that went.
    pub fn finish(mut self) -> Result<(), SourceError> {
        self.close_once()
    }

    fn close_once(&mut self) -> Result<(), SourceError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let result = self.session.close();
        info!(stage = "close", source = %self.source_name, ok = result.is_ok(), "session released");
        result
    }
}

impl<S: Session> Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.session
    }
}

impl<S: Session> DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

impl<S: Session> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        if let Err(e) = self.close_once() {
            warn!(stage = "close", source = %self.source_name, error = %e, "failed to release session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::RawItem;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    struct CountingSession {
        closes: Rc<Cell<u32>>,
    }

    impl Session for CountingSession {
        fn open(&mut self, _profile: &str) -> Result<(), SourceError> {
            Ok(())
        }
        fn wait_for_initial_content(&mut self, _timeout: Duration) -> bool {
            true
        }
        fn list_visible_items(&mut self) -> Result<Vec<RawItem>, SourceError> {
            Ok(vec![])
        }
        fn reveal_more(&mut self) -> Result<(), SourceError> {
            Ok(())
        }
        fn growth_signal(&mut self) -> Result<u64, SourceError> {
            Ok(0)
        }
        fn close(&mut self) -> Result<(), SourceError> {
            self.closes.set(self.closes.get() + 1);
            Ok(())
        }
    }

    fn guard(closes: &Rc<Cell<u32>>) -> SessionGuard<CountingSession> {
        SessionGuard::new(
            CountingSession {
                closes: Rc::clone(closes),
            },
            "test",
        )
    }

    #[test]
    fn finish_closes_once() {
        let closes = Rc::new(Cell::new(0));
        guard(&closes).finish().unwrap();
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn drop_closes_when_not_finished() {
        let closes = Rc::new(Cell::new(0));
        {
            let mut g = guard(&closes);
            g.open("someone").unwrap();
        }
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn early_return_still_closes() {
        fn fails(g: SessionGuard<CountingSession>) -> Result<(), SourceError> {
            let _g = g;
            Err(SourceError::Unavailable("gone".into()))
        }

        let closes = Rc::new(Cell::new(0));
        assert!(fails(guard(&closes)).is_err());
        assert_eq!(closes.get(), 1);
    }
}
