#![forbid(unsafe_code)]

//! Front ends over [`obsbind_core::Binding`].
//!
//! All three shapes share one engine and differ only in how they surface the
//! combined state:
//!
//! | Shape | Loading | Errored | Ready |
//! |---|---|---|---|
//! | [`with_observables`] (decorator) | `Ok(None)` | `Err(RenderError)` | inner rendered with merged props |
//! | [`ObservablesRender`] (render prop) | `Ok(None)` | `Err(RenderError)` | `children(data)` |
//! | [`use_observables`] (hook) | raw [`CombinedState`](obsbind_core::CombinedState) | raw state | raw state |
//!
//! [`ErrorBoundary`] catches the `Err` of the first two.

pub mod boundary;
pub mod component;
pub mod decorator;
pub mod error;
pub mod hook;
pub mod render_prop;

pub use boundary::ErrorBoundary;
pub use component::{Component, FnComponent, Statics, component};
pub use decorator::{ObservablesDecorator, WithObservables, with_observables};
pub use error::RenderError;
pub use hook::{UseObservables, use_observables};
pub use render_prop::{ObservablesProps, ObservablesRender};

/// What a decorated or render-prop component produces.
pub type RenderResult<T> = Result<Option<T>, RenderError>;
