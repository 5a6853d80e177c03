//! Diagnostic events emitted by the data access layer.
//!
//! Every event is a structured `tracing` record under a `portal_store::*`
//! target. None of them carries a secret value.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::{BackendMode, ConfigLayer};

/// Which configuration layer supplied each descriptor field.
pub fn config_provenance(mode: BackendMode, provenance: &BTreeMap<String, ConfigLayer>) {
    let sources = provenance
        .iter()
        .map(|(field, layer)| format!("{}={}", field, layer))
        .collect::<Vec<_>>()
        .join(" ");

    tracing::info!(
        target: "portal_store::config",
        mode = %mode,
        sources = %sources,
        "resolved connection descriptor"
    );
}

/// A live endpoint is running without a password.
pub fn missing_password(tier: &str, key: &str) {
    tracing::warn!(
        target: "portal_store::config",
        tier,
        key,
        "no password configured; connecting with an empty password"
    );
}

/// A fallback tier failed to connect.
pub fn connect_failed(adapter: &str, endpoint: &str, error: &str) {
    tracing::warn!(
        target: "portal_store::facade",
        adapter,
        endpoint,
        error,
        "adapter failed to connect; trying next tier"
    );
}

/// A tier was skipped because its feature is compiled out.
pub fn tier_unavailable(adapter: &str) {
    tracing::warn!(
        target: "portal_store::facade",
        adapter,
        "adapter support is not compiled in; skipping tier"
    );
}

/// An adapter became active.
pub fn adapter_selected(adapter: &str, reason: &str, attempts: usize) {
    if reason == "fallback" {
        tracing::warn!(
            target: "portal_store::facade",
            adapter,
            reason,
            failed_tiers = attempts,
            "adapter selected"
        );
    } else {
        tracing::info!(
            target: "portal_store::facade",
            adapter,
            reason,
            failed_tiers = attempts,
            "adapter selected"
        );
    }
}

/// Mock fixtures could not be loaded from disk; built-ins are used instead.
pub fn fixtures_fallback(path: &str, error: &str) {
    tracing::warn!(
        target: "portal_store::mock",
        path,
        error,
        "failed to load fixture file; using built-in fixtures"
    );
}

/// The adapter was disconnected, possibly with operations still running.
pub fn adapter_shutdown(adapter: &str, in_flight: usize, grace: Duration) {
    if in_flight > 0 {
        tracing::warn!(
            target: "portal_store::facade",
            adapter,
            in_flight,
            grace_ms = grace.as_millis() as u64,
            "grace period elapsed with operations in flight; disconnecting"
        );
    } else {
        tracing::info!(target: "portal_store::facade", adapter, "adapter disconnected");
    }
}

/// Provisioning finished against a live backend.
pub fn provisioned(adapter: &str, collections_created: usize, indexes_created: usize) {
    tracing::info!(
        target: "portal_store::provision",
        adapter,
        collections_created,
        indexes_created,
        "schema provisioned"
    );
}

/// Provisioning was a no-op because the mock adapter is active.
pub fn provision_skipped(adapter: &str) {
    tracing::warn!(
        target: "portal_store::provision",
        adapter,
        "provisioning skipped; fixtures are held in memory"
    );
}

#[cfg(test)]
pub(crate) mod capture {
    //! Collects formatted events so tests can assert on diagnostics.

    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    pub struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

    impl CaptureWriter {
        pub fn contents(&self) -> String {
            let buf = self.0.lock().unwrap();
            String::from_utf8_lossy(&buf).to_string()
        }
    }

    impl io::Write for CaptureWriter {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CaptureWriter {
        type Writer = CaptureWriter;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// Run `f` with a subscriber that records every event at DEBUG and above.
    pub fn capture<F: FnOnce()>(f: F) -> String {
        let writer = CaptureWriter::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(writer.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        writer.contents()
    }

    /// Capture events on the current thread until the guard drops. For
    /// async tests on the current-thread runtime.
    pub fn scoped() -> (CaptureWriter, tracing::subscriber::DefaultGuard) {
        let writer = CaptureWriter::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(writer.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (writer, guard)
    }
}
