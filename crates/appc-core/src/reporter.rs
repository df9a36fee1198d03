//! Reporter trait for dependency injection
//!
//! Phases report progress, computed updates and warnings through this trait
//! instead of printing directly, so the CLI decides presentation and tests can
//! count what was said.

use appc_schema::DependencyUpdate;

use crate::runner::DuplicateGroup;

pub trait Reporter: Send + Sync {
    /// A phase has started (e.g. "Building uber jar").
    fn phase(&self, title: &str);

    /// A dependency update was computed.
    fn update_available(&self, update: &DependencyUpdate);

    /// Several dependencies contributed the same entries to an uber jar.
    fn duplicates(&self, group: &DuplicateGroup);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn phase(&self, title: &str) {
        (**self).phase(title);
    }
    fn update_available(&self, update: &DependencyUpdate) {
        (**self).update_available(update);
    }
    fn duplicates(&self, group: &DuplicateGroup) {
        (**self).duplicates(group);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
}

/// Forwards everything to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn phase(&self, title: &str) {
        tracing::info!("{title}");
    }

    fn update_available(&self, update: &DependencyUpdate) {
        tracing::info!("{} -> {}", update.artifact, update.new_version);
    }

    fn duplicates(&self, group: &DuplicateGroup) {
        tracing::warn!("{group}");
    }

    fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    fn warning(&self, msg: &str) {
        tracing::warn!("{msg}");
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn phase(&self, _title: &str) {}
    fn update_available(&self, _update: &DependencyUpdate) {}
    fn duplicates(&self, _group: &DuplicateGroup) {}
    fn info(&self, _msg: &str) {}
    fn warning(&self, _msg: &str) {}
}
