//! Operation counters, exposed to operators as a JSON snapshot using
//! fixed, hyphenated key names.
//!
//! Every field is an independent atomic with `Relaxed` ordering: these
//! are purely observational, never used to make a control decision, so
//! nothing here needs a stronger ordering or a lock.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use serde::Serialize;

use crate::{obuf::OutputBuffer, queue::ContextQueue};

/// Running counters for one plugin instance.
#[derive(Default)]
pub struct Counters {
    pub bytes_read: AtomicU64,
    pub bytes_sent: AtomicU64,
    pub connection_closes: AtomicU32,
    pub connection_errors: AtomicU32,
    pub dplane_contexts: AtomicU64,
    pub buffer_full: AtomicU32,
    pub user_configures: AtomicU32,
    pub user_disables: AtomicU32,
}

/// A point-in-time copy of [`Counters`] plus the two buffer-derived
/// figures (`obuf_bytes`/`obuf_bytes_peak`, `ctxqueue_len`/`ctxqueue_len_peak`)
/// that live on [`OutputBuffer`] and [`ContextQueue`] themselves rather
/// than being independently tracked atomics here.
#[derive(Debug, Default, Clone, Serialize)]
pub struct CountersSnapshot {
    #[serde(rename = "bytes-read")]
    pub bytes_read: u64,
    #[serde(rename = "bytes-sent")]
    pub bytes_sent: u64,
    #[serde(rename = "obuf-bytes")]
    pub obuf_bytes: u32,
    #[serde(rename = "obuf-bytes-peak")]
    pub obuf_bytes_peak: u32,
    #[serde(rename = "connection-closes")]
    pub connection_closes: u32,
    #[serde(rename = "connection-errors")]
    pub connection_errors: u32,
    #[serde(rename = "data-plane-contexts")]
    pub data_plane_contexts: u64,
    #[serde(rename = "data-plane-contexts-queue")]
    pub data_plane_contexts_queue: u32,
    #[serde(rename = "data-plane-contexts-queue-peak")]
    pub data_plane_contexts_queue_peak: u32,
    #[serde(rename = "buffer-full-hits")]
    pub buffer_full_hits: u32,
    #[serde(rename = "user-configures")]
    pub user_configures: u32,
    #[serde(rename = "user-disables")]
    pub user_disables: u32,
}

impl Counters {
    pub fn new() -> Self {
        Counters::default()
    }

    /// Build a snapshot, folding in the live buffer/queue figures that
    /// aren't independently tracked atomics on `self`.
    pub fn snapshot(&self, queue: &ContextQueue, obuf: &OutputBuffer) -> CountersSnapshot {
        CountersSnapshot {
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            obuf_bytes: obuf.bytes(),
            obuf_bytes_peak: obuf.peak(),
            connection_closes: self.connection_closes.load(Ordering::Relaxed),
            connection_errors: self.connection_errors.load(Ordering::Relaxed),
            data_plane_contexts: self.dplane_contexts.load(Ordering::Relaxed),
            data_plane_contexts_queue: queue.len(),
            data_plane_contexts_queue_peak: queue.peak(),
            buffer_full_hits: self.buffer_full.load(Ordering::Relaxed),
            user_configures: self.user_configures.load(Ordering::Relaxed),
            user_disables: self.user_disables.load(Ordering::Relaxed),
        }
    }

    /// Zero every atomic this struct owns directly. Buffer/queue byte
    /// and length figures are live state, not history, and are left
    /// untouched: a counters reset clears what has happened so far, not
    /// what is currently buffered.
    pub fn reset(&self) {
        self.bytes_read.store(0, Ordering::Relaxed);
        self.bytes_sent.store(0, Ordering::Relaxed);
        self.connection_closes.store(0, Ordering::Relaxed);
        self.connection_errors.store(0, Ordering::Relaxed);
        self.dplane_contexts.store(0, Ordering::Relaxed);
        self.buffer_full.store(0, Ordering::Relaxed);
        self.user_configures.store(0, Ordering::Relaxed);
        self.user_disables.store(0, Ordering::Relaxed);
    }
}

/// Render a snapshot as `key: value` lines, one per counter, for a human
/// CLI consumer (the JSON form uses [`CountersSnapshot`]'s `Serialize`
/// impl directly).
pub fn render_text(snap: &CountersSnapshot) -> String {
    let json = serde_json::to_value(snap).expect("CountersSnapshot always serializes");
    let mut lines = Vec::new();
    if let serde_json::Value::Object(map) = json {
        for (key, value) in map {
            lines.push(format!("{key}: {value}"));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reset_zeroes_history_but_not_live_state() {
        let c = Counters::new();
        let q = ContextQueue::new();
        let obuf = OutputBuffer::new(64);
        c.dplane_contexts.fetch_add(5, Ordering::Relaxed);
        c.buffer_full.fetch_add(1, Ordering::Relaxed);
        c.reset();
        let snap = c.snapshot(&q, &obuf);
        assert_eq!(snap.data_plane_contexts, 0);
        assert_eq!(snap.buffer_full_hits, 0);
    }

    #[test]
    fn snapshot_serializes_with_hyphenated_keys() {
        let c = Counters::new();
        c.dplane_contexts.fetch_add(3, Ordering::Relaxed);
        let q = ContextQueue::new();
        let obuf = OutputBuffer::new(64);
        let json = serde_json::to_value(c.snapshot(&q, &obuf)).unwrap();
        assert_eq!(json["data-plane-contexts"], 3);
        assert!(json.get("bytes-sent").is_some());
        assert!(json.get("obuf-bytes-peak").is_some());
    }

    #[test]
    fn text_rendering_includes_every_key() {
        let c = Counters::new();
        let q = ContextQueue::new();
        let obuf = OutputBuffer::new(64);
        let text = render_text(&c.snapshot(&q, &obuf));
        assert!(text.contains("data-plane-contexts"));
        assert!(text.contains("user-disables"));
    }
}
