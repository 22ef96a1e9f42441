#![forbid(unsafe_code)]

//! Error boundary for decorated and render-prop components.

use std::cell::RefCell;
use std::fmt;

use crate::RenderResult;
use crate::error::RenderError;

/// Catches a failed child render and renders a fallback in its place.
///
/// The caught error is kept until [`reset`](ErrorBoundary::reset), the way a
/// host boundary stays in its fallback state until it is told to retry.
pub struct ErrorBoundary<O> {
    fallback: Box<dyn Fn(&RenderError) -> O>,
    caught: RefCell<Option<RenderError>>,
}

impl<O> ErrorBoundary<O> {
    pub fn new(fallback: impl Fn(&RenderError) -> O + 'static) -> Self {
        Self {
            fallback: Box::new(fallback),
            caught: RefCell::new(None),
        }
    }

    /// Render `child`, or the fallback if it fails. `None` means the child
    /// rendered nothing (still loading).
    pub fn render(&self, child: impl FnOnce() -> RenderResult<O>) -> Option<O> {
        match child() {
            Ok(output) => output,
            Err(err) => {
                tracing::warn!(message = "boundary.caught", error = %err);
                let output = (self.fallback)(&err);
                *self.caught.borrow_mut() = Some(err);
                Some(output)
            }
        }
    }

    #[must_use]
    pub fn caught(&self) -> Option<RenderError> {
        self.caught.borrow().clone()
    }

    /// Forget the caught error.
    pub fn reset(&self) {
        self.caught.borrow_mut().take();
    }
}

impl<O> fmt::Debug for ErrorBoundary<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorBoundary")
            .field("caught", &self.caught.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obsbind_core::EmissionError;
    use tracing_test::traced_test;

    #[test]
    fn passes_through_and_catches() {
        let boundary = ErrorBoundary::new(|err: &RenderError| format!("oops: {err}"));
        assert_eq!(boundary.render(|| Ok(Some("fine".to_owned()))), Some("fine".to_owned()));
        assert_eq!(boundary.render(|| Ok(None)), None);
        assert!(boundary.caught().is_none());

        let out = boundary.render(|| Err(RenderError::from(EmissionError::msg("down"))));
        assert_eq!(out.as_deref(), Some("oops: source error: down"));
        assert!(boundary.caught().is_some());

        boundary.reset();
        assert!(boundary.caught().is_none());
    }

    #[traced_test]
    #[test]
    fn logs_caught_error() {
        let boundary = ErrorBoundary::new(|_: &RenderError| ());
        let _ = boundary.render(|| Err(RenderError::from(EmissionError::msg("kaput"))));
        assert!(logs_contain("boundary.caught"));
        assert!(logs_contain("kaput"));
    }
}
