//! The Progress Bus (C7): fan-out of ordered, per-investigation progress
//! events to SSE subscribers (§4.7).
//!
//! The bus is the single serialization point mentioned in §5: every
//! `emit` call for an investigation takes that investigation's mutex, so
//! concurrently running agents still produce a strictly increasing,
//! gap-free sequence.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::domain::{Investigation, ProgressEvent, ProgressEventKind};

struct InvestigationChannel {
    buffer: VecDeque<ProgressEvent>,
    last_sequence: u64,
    terminal_emitted: bool,
    overflow_emitted: bool,
    max_progress_seen: u8,
    subscribers: Vec<mpsc::Sender<ProgressEvent>>,
}

impl InvestigationChannel {
    fn new() -> Self {
        Self {
            buffer: VecDeque::new(),
            last_sequence: 0,
            terminal_emitted: false,
            overflow_emitted: false,
            max_progress_seen: 0,
            subscribers: Vec::new(),
        }
    }
}

fn is_terminal(kind: ProgressEventKind) -> bool {
    matches!(kind, ProgressEventKind::Final | ProgressEventKind::Error)
}

/// Per-process fan-out hub. One instance is shared by the Orchestrator and
/// every agent/tool task it spawns.
pub struct ProgressBus {
    buffer_capacity: usize,
    subscriber_queue_depth: usize,
    channels: Mutex<HashMap<String, InvestigationChannel>>,
}

impl ProgressBus {
    pub fn new(buffer_capacity: usize, subscriber_queue_depth: usize) -> Self {
        Self {
            buffer_capacity,
            subscriber_queue_depth,
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Assign the next sequence number for `investigation_id` and publish.
    /// This is the only way events enter the bus — there is no raw
    /// `publish` that accepts a pre-sequenced event, since every producer
    /// in this crate goes through the same mutex-guarded counter.
    pub async fn emit(
        &self,
        investigation_id: &str,
        kind: ProgressEventKind,
        agent: Option<String>,
        message: impl Into<String>,
        progress: u8,
        payload: Option<Investigation>,
    ) {
        let mut channels = self.channels.lock().await;
        let channel = channels
            .entry(investigation_id.to_string())
            .or_insert_with(InvestigationChannel::new);

        if channel.terminal_emitted {
            // No events follow a terminal event (§3 invariant); this would
            // be a caller bug elsewhere in the crate.
            debug_assert!(false, "event emitted after terminal event for {}", investigation_id);
            return;
        }

        // Progress must be non-decreasing across a single investigation's
        // events (§3 invariant), but producers (the bounded ReAct loop in
        // particular) emit sub-events like ToolCall/ToolResult without
        // tracking the orchestrator's own progress heuristic. Clamp here,
        // the single serialization point every event passes through.
        let progress = progress.max(channel.max_progress_seen);
        channel.max_progress_seen = progress;

        channel.last_sequence += 1;
        let event = ProgressEvent {
            investigation_id: investigation_id.to_string(),
            sequence: channel.last_sequence,
            kind,
            agent,
            message: message.into(),
            progress,
            payload,
        };

        if is_terminal(kind) {
            channel.terminal_emitted = true;
        }

        if channel.buffer.len() >= self.buffer_capacity && !is_terminal(kind) {
            // Drop the oldest non-terminal event and emit a one-shot
            // buffer_overflow marker instead of silently losing history.
            channel.buffer.pop_front();
            if !channel.overflow_emitted {
                channel.overflow_emitted = true;
                channel.last_sequence += 1;
                let overflow = ProgressEvent {
                    investigation_id: investigation_id.to_string(),
                    sequence: channel.last_sequence,
                    kind: ProgressEventKind::Error,
                    agent: None,
                    message: "buffer_overflow".to_string(),
                    progress,
                    payload: None,
                };
                channel.buffer.push_back(overflow.clone());
                broadcast(&mut channel.subscribers, overflow).await;
            }
        }

        channel.buffer.push_back(event.clone());
        broadcast(&mut channel.subscribers, event).await;
    }

    /// Subscribe to `investigation_id`, receiving all buffered events from
    /// sequence 1 onward followed by live events, until the terminal event
    /// closes the stream (§4.7).
    pub async fn subscribe(&self, investigation_id: &str) -> mpsc::Receiver<ProgressEvent> {
        let mut channels = self.channels.lock().await;
        let channel = channels
            .entry(investigation_id.to_string())
            .or_insert_with(InvestigationChannel::new);

        let (tx, rx) = mpsc::channel(self.subscriber_queue_depth);
        for event in &channel.buffer {
            // Best-effort replay of history; a slow new subscriber simply
            // starts behind, which is consistent with "disconnected after
            // a bounded queue fills" for the live portion.
            let _ = tx.try_send(event.clone());
        }
        channel.subscribers.push(tx);
        rx
    }

    /// Drop all state for an investigation once its stream has fully
    /// closed, so long-running processes don't accumulate history forever.
    pub async fn forget(&self, investigation_id: &str) {
        self.channels.lock().await.remove(investigation_id);
    }
}

async fn broadcast(subscribers: &mut Vec<mpsc::Sender<ProgressEvent>>, event: ProgressEvent) {
    // A slow consumer is disconnected rather than allowed to backpressure
    // the producer (§4.7): `try_send` drops the subscriber on a full queue
    // instead of awaiting capacity.
    subscribers.retain(|tx| tx.try_send(event.clone()).is_ok());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sequence_numbers_are_dense_and_increasing() {
        let bus = ProgressBus::new(256, 64);
        bus.emit("inv-1", ProgressEventKind::Progress, None, "start", 0, None)
            .await;
        bus.emit("inv-1", ProgressEventKind::Progress, None, "midway", 50, None)
            .await;
        bus.emit("inv-1", ProgressEventKind::Final, None, "done", 100, None)
            .await;

        let mut rx = bus.subscribe("inv-1").await;
        let mut seqs = Vec::new();
        while let Ok(event) = rx.try_recv() {
            seqs.push(event.sequence);
        }
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn late_subscriber_receives_buffered_history() {
        let bus = ProgressBus::new(256, 64);
        bus.emit("inv-2", ProgressEventKind::Progress, None, "start", 0, None)
            .await;
        let mut rx = bus.subscribe("inv-2").await;
        let first = rx.recv().await.unwrap();
        assert_eq!(first.sequence, 1);
    }

    #[tokio::test]
    async fn terminal_event_is_last() {
        let bus = ProgressBus::new(256, 64);
        bus.emit("inv-3", ProgressEventKind::Final, None, "done", 100, None)
            .await;
        let mut rx = bus.subscribe("inv-3").await;
        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, ProgressEventKind::Final);
    }

    #[tokio::test]
    async fn small_buffer_overflow_inserts_one_shot_marker() {
        let bus = ProgressBus::new(2, 64);
        for i in 0..5 {
            bus.emit("inv-4", ProgressEventKind::Progress, None, format!("step {}", i), i, None)
                .await;
        }
        let mut rx = bus.subscribe("inv-4").await;
        let mut overflow_count = 0;
        while let Ok(event) = rx.try_recv() {
            if event.message == "buffer_overflow" {
                overflow_count += 1;
            }
        }
        assert_eq!(overflow_count, 1);
    }

    #[tokio::test]
    async fn a_lower_progress_value_is_clamped_to_the_max_seen_so_far() {
        let bus = ProgressBus::new(256, 64);
        bus.emit("inv-5", ProgressEventKind::Progress, None, "analysis complete", 80, None)
            .await;
        // A concurrently-running agent's own sub-events (e.g. AgentStart)
        // don't know the orchestrator's progress heuristic and would
        // otherwise regress the field to 0.
        bus.emit(
            "inv-5",
            ProgressEventKind::AgentStart,
            Some("evidence_collection".to_string()),
            "evidence_collection starting",
            0,
            None,
        )
        .await;

        let mut rx = bus.subscribe("inv-5").await;
        let mut progresses = Vec::new();
        while let Ok(event) = rx.try_recv() {
            progresses.push(event.progress);
        }
        assert_eq!(progresses, vec![80, 80]);
    }
}
