//! Tests for the error module.
//!
//! This module contains tests for error handling and error types.

use crate::error::protocol::ProtocolError;
use crate::error::{
    get_error_reporting, set_error_reporter, ErrorContext, ErrorReporter, SketchError, StoreError,
    TracingErrorReporter,
};
use crate::store::InstanceKind;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Test that error context can be created and displayed properly.
#[test]
fn test_error_context_display() {
    let error = SketchError::Custom("test error".to_string());
    let context = ErrorContext::new(error, "test_component").with_details("additional details");

    let display_string = format!("{context}");
    assert!(display_string.contains("test error"));
    assert!(display_string.contains("test_component"));
    assert!(display_string.contains("additional details"));
}

/// Test that nested errors work correctly.
#[test]
fn test_nested_errors() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error = SketchError::Io(io_error);
    assert!(error.to_string().contains("file not found"));

    let error: SketchError = StoreError::TypeMismatch {
        name: "words".to_string(),
        expected: InstanceKind::TopK,
        actual: InstanceKind::HyperLogLog,
    }
    .into();
    assert_eq!(
        error.to_string(),
        "Store error: Instance words holds a hyperloglog, operation requires a topk"
    );
}

/// Test that wire kinds pass through the top-level error.
#[test]
fn test_error_kinds() {
    let store: SketchError = StoreError::CapacityExceeded("small".to_string()).into();
    assert_eq!(store.kind(), "capacity_exceeded");

    let protocol: SketchError = ProtocolError::MessageTooLarge {
        size: 10,
        max_size: 5,
    }
    .into();
    assert_eq!(protocol.kind(), "message_too_large");

    assert_eq!(SketchError::Custom("x".to_string()).kind(), "internal");
}

/// Mock error reporter for testing.
#[derive(Debug, Default)]
struct CountingReporter {
    reported_count: AtomicUsize,
}

impl ErrorReporter for CountingReporter {
    fn report(&self, _context: ErrorContext) {
        self.reported_count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Test that the global error reporter works correctly.
#[test]
fn test_global_error_reporter() {
    let reporter = Arc::new(CountingReporter::default());
    set_error_reporter(reporter.clone());

    let context = ErrorContext::new(SketchError::Custom("test error".to_string()), "test_component");
    get_error_reporting().report(context);

    assert!(reporter.reported_count.load(Ordering::SeqCst) >= 1);
}

/// Test that the default tracing error reporter can be created.
#[test]
fn test_tracing_error_reporter() {
    let reporter = TracingErrorReporter;
    let context = ErrorContext::new(SketchError::Custom("test error".to_string()), "test_component")
        .with_span_trace();

    // Just make sure this doesn't panic
    reporter.report(context);
}
