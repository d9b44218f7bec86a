//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use dataflow_rs::pipeline::{conduit, ConduitReceiver};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Create a test timeout duration
pub fn test_timeout() -> Duration {
    Duration::from_millis(100)
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// A `Write` sink whose bytes stay readable after the writer moves into a
/// stage thread.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8(self.inner.lock().unwrap().clone()).unwrap()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A conduit fed with `items` by a helper thread, closed afterwards.
///
/// The feeder stops quietly if the consumer leaves early.
pub fn feed<T: Send + 'static>(name: &str, items: Vec<T>) -> ConduitReceiver<T> {
    let (mut tx, rx) = conduit(name);
    thread::spawn(move || {
        for item in items {
            if tx.send(item).is_err() {
                return;
            }
        }
        let _ = tx.close();
    });
    rx
}

/// Drain a conduit on a helper thread.
pub fn collect<T: Send + 'static>(rx: ConduitReceiver<T>) -> JoinHandle<Vec<T>> {
    thread::spawn(move || rx.iter().collect())
}
