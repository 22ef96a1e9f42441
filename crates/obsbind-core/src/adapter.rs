#![forbid(unsafe_code)]

//! Source adapter: one subscription contract for every source shape.
//!
//! [`subscribe`] resolves the source (see [`Source::resolve`]) and attaches the
//! observer:
//!
//! | Shape | Behavior |
//! |---|---|
//! | record | emits `current()` synchronously, re-emits on `Updated`, completes on `Deleted` |
//! | query | forwards every snapshot; never completes |
//! | convertible | converts, then attaches like a producer |
//! | producer | attaches directly |
//!
//! An unrecognized shape is returned as `Err` before anything is attached.
//! The returned [`Subscription`] is idempotent.

use std::rc::Rc;

use crate::error::SourceProtocolError;
use crate::observable::Subscription;
use crate::observer::SharedObserver;
use crate::source::{RecordChange, Resolved, Source};

/// Attach `observer` to `source`.
///
/// # Errors
///
/// Returns [`SourceProtocolError`] if the source exposes none of the
/// supported capabilities. The observer is not called in that case.
pub fn subscribe<V: 'static>(
    source: &Source<V>,
    observer: SharedObserver<V>,
) -> Result<Subscription, SourceProtocolError> {
    let resolved = source.resolve()?;
    tracing::trace!(
        message = "source.subscribe",
        shape = %source.describe(),
        kind = resolved.kind()
    );

    let subscription = match resolved {
        Resolved::Record(record) => {
            observer.next(record.current());
            let weak = Rc::downgrade(&record);
            let mut inner = record.on_change(Box::new(move |change| match change {
                RecordChange::Updated => {
                    if let Some(record) = weak.upgrade() {
                        observer.next(record.current());
                    }
                }
                RecordChange::Deleted => observer.complete(),
            }));
            // The listener holds the record weakly; the subscription keeps it alive.
            Subscription::new(move || {
                inner.unsubscribe();
                drop(record);
            })
        }
        Resolved::Query(query) => query.observe(Box::new(move |snapshot| observer.next(snapshot))),
        Resolved::Convertible(convertible) => {
            let producer = convertible.to_producer();
            let mut inner = producer.subscribe(observer);
            // The converted producer lives exactly as long as the subscription.
            Subscription::new(move || {
                inner.unsubscribe();
                drop(producer);
            })
        }
        Resolved::Producer(producer) => producer.subscribe(observer),
    };
    Ok(subscription)
}
