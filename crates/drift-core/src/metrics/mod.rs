//! Metric events emitted by bucket writers.
//!
//! Metrics go through the `metrics` facade; whichever recorder the host
//! process installs receives them. Without a recorder they are no-ops.

pub mod events;

/// Emit a metric event.
///
/// Calls [`events::InternalEvent::emit`] on the given event.
///
/// ```ignore
/// use drift_core::emit;
/// use drift_core::metrics::events::EventsWritten;
///
/// emit!(EventsWritten { count: 1, target: "/data/events".to_string() });
/// ```
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::metrics::events::InternalEvent::emit($event)
    };
}

pub use emit;
