#![allow(dead_code)]

use std::sync::Mutex;

use splice::telemetry::LogSink;

/// Keeps every log entry in memory so tests can inspect them.
#[derive(Default)]
pub struct RecordingSink {
    pub access: Mutex<Vec<(String, String)>>,
    pub errors: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn access(&self) -> Vec<(String, String)> {
        self.access.lock().unwrap().clone()
    }

    pub fn has_error(&self, needle: &str) -> bool {
        self.errors().iter().any(|e| e.contains(needle))
    }
}

impl LogSink for RecordingSink {
    fn access(&self, peer: &str, message: &str) {
        self.access
            .lock()
            .unwrap()
            .push((peer.to_string(), message.to_string()));
    }

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

/// Splits a raw response into its head and body at the first blank line.
pub fn split_response(raw: &[u8]) -> (String, Vec<u8>) {
    let end = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response has a blank line");
    (
        String::from_utf8_lossy(&raw[..end]).into_owned(),
        raw[end + 4..].to_vec(),
    )
}

/// Value of a header in a serialized response head.
pub fn header_value(head: &str, name: &str) -> Option<String> {
    head.lines().skip(1).find_map(|line| {
        let (k, v) = line.split_once(':')?;
        k.trim()
            .eq_ignore_ascii_case(name)
            .then(|| v.trim().to_string())
    })
}
