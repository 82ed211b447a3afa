use crate::errors::Error;
use crate::walk::NodeKind;

/// Structured events emitted by the copier, one pair per visited node.
///
/// The copier reports what it is doing through this interface instead of
/// logging directly; the concrete destination (tracing, a test recorder,
/// nothing at all) is picked by the caller.
pub trait EventSink {
    fn entry_started(&self, kind: NodeKind, src: &std::path::Path, dst: &std::path::Path);
    fn entry_copied(&self, kind: NodeKind, src: &std::path::Path, dst: &std::path::Path);
    fn entry_failed(&self, src: &std::path::Path, error: &Error);
}

/// Forwards copy events to `tracing`.
#[derive(Copy, Clone, Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn entry_started(&self, kind: NodeKind, src: &std::path::Path, dst: &std::path::Path) {
        tracing::debug!("copying {} {:?} to {:?}", kind, src, dst);
    }

    fn entry_copied(&self, kind: NodeKind, src: &std::path::Path, dst: &std::path::Path) {
        tracing::info!("copied {} {:?} to {:?}", kind, src, dst);
    }

    fn entry_failed(&self, src: &std::path::Path, error: &Error) {
        tracing::error!("failed copying {:?}: {}", src, error);
    }
}

/// Discards every event.
#[derive(Copy, Clone, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn entry_started(&self, _kind: NodeKind, _src: &std::path::Path, _dst: &std::path::Path) {}

    fn entry_copied(&self, _kind: NodeKind, _src: &std::path::Path, _dst: &std::path::Path) {}

    fn entry_failed(&self, _src: &std::path::Path, _error: &Error) {}
}
