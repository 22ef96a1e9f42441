#![forbid(unsafe_code)]

//! Core: source adapter, trigger-key tracking, and the combination engine.
//!
//! A [`Binding`] joins a named set of independently-timed [`Source`]s into a
//! single [`CombinedState`]: `Loading` until every source has emitted once,
//! `Ready` with a snapshot of the latest values afterwards, or `Errored` as
//! soon as any source reports an error.
//!
//! # Architecture
//!
//! - [`adapter`] normalizes every supported source shape into one
//!   subscription contract.
//! - [`trigger`] decides, on each evaluation, whether the driving inputs still
//!   describe the same generation.
//! - [`engine`] owns the per-generation subscriptions and the published state.
//! - [`binding`] ties the three together behind a render/commit API.
//!
//! Everything is single-threaded (`Rc`/`RefCell`); callbacks run on the host's
//! event thread and no locking is performed.

pub mod adapter;
pub mod binding;
pub mod config;
pub mod engine;
pub mod error;
pub mod observable;
pub mod observer;
pub mod producer;
pub mod props;
pub mod source;
pub mod state;
pub mod trigger;
pub mod value;

pub use binding::Binding;
pub use config::BindingConfig;
pub use engine::{CombineEngine, EngineStats};
pub use error::{EmissionError, SourceProtocolError};
#[cfg(feature = "policy-config")]
pub use error::ConfigError;
pub use observable::{Observable, Subscription};
pub use observer::{FnObserver, Observer, SharedObserver};
pub use producer::{IntoProducer, PushProducer, Subject, defer, failing, just};
pub use props::Props;
pub use source::{
    ReactiveQuery, ReactiveRecord, RecordChange, Resolved, Source, SourceMap, SourceShape,
};
pub use state::{CombinedState, Data, Status};
pub use trigger::{Decision, TriggerTracker, WatchList};
pub use value::{Identity, Value};
