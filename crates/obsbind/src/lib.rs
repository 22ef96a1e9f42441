#![forbid(unsafe_code)]

//! obsbind public facade crate.
//!
//! Re-exports the combination core and, with the default `view` feature, the
//! three component front ends.
//!
//! ```
//! use obsbind::prelude::*;
//!
//! let count = Subject::new();
//! let mut hook = use_observables(["page"], {
//!     let count = count.clone();
//!     move |_: &Props| SourceMap::new().with("count", count.clone())
//! });
//!
//! let state = hook.combine(&Props::new().with("page", 1))?;
//! assert_eq!(state.status(), Status::Loading);
//!
//! count.emit(Value::from(3));
//! assert_eq!(hook.state().get("count"), Some(&Value::from(3)));
//! # Ok::<(), SourceProtocolError>(())
//! ```

pub use obsbind_core as core;
#[cfg(feature = "view")]
pub use obsbind_view as view;

pub mod prelude {
    pub use obsbind_core::{
        Binding, BindingConfig, CombinedState, Data, EmissionError, Props, Source, SourceMap,
        SourceProtocolError, Status, Subject, Subscription, Value, WatchList,
    };
    #[cfg(feature = "view")]
    pub use obsbind_view::{
        Component, ErrorBoundary, ObservablesProps, ObservablesRender, RenderError, component,
        use_observables, with_observables,
    };
}
