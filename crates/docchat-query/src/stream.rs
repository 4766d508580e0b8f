//! Streaming bridge: converts the generator's blocking, push-based call
//! into a pull-based event sequence.
//!
//! One worker thread per streaming query pushes into an unbounded FIFO
//! channel; the consumer side is a blocking iterator. There is no
//! backpressure (single-shot generation, accepted trade-off) and no
//! cancellation: a consumer that stops pulling leaves the worker running
//! to completion, with its sends silently discarded.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use tracing::debug;

use docchat_core::types::StreamEvent;

use crate::QueryEngine;

/// Lazy, single-pass, non-restartable sequence of streaming events.
///
/// Each pull blocks until the worker has produced an event. Exactly one
/// terminal event (`Done` or `Error`) is yielded, after which the
/// iterator is permanently fused.
pub struct EventStream {
    rx: Receiver<StreamEvent>,
    finished: bool,
}

impl Iterator for EventStream {
    type Item = StreamEvent;

    fn next(&mut self) -> Option<StreamEvent> {
        if self.finished {
            return None;
        }
        match self.rx.recv() {
            Ok(event) => {
                if event.is_terminal() {
                    self.finished = true;
                }
                Some(event)
            }
            // The worker always enqueues a terminal before exiting; a
            // disconnect without one still ends the stream cleanly.
            Err(_) => {
                self.finished = true;
                None
            }
        }
    }
}

pub(crate) fn spawn_stream(engine: Arc<QueryEngine>, query: String) -> EventStream {
    let (tx, rx) = channel();
    thread::spawn(move || worker(&engine, &query, &tx));
    EventStream { rx, finished: false }
}

/// Worker body. Every failure in retrieval, embedding or generation is
/// caught here and becomes the single terminal `Error`; the success path
/// ends with `Sources` then `Done`. Never both.
fn worker(engine: &QueryEngine, query: &str, tx: &Sender<StreamEvent>) {
    let result = engine.run_query(query, &mut |piece| {
        let _ = tx.send(StreamEvent::Token { text: piece.to_string() });
    });
    match result {
        Ok(answer) => {
            let _ = tx.send(StreamEvent::Sources { sources: answer.sources });
            let _ = tx.send(StreamEvent::Done);
        }
        Err(e) => {
            debug!(error = %e, "streaming query failed");
            let _ = tx.send(StreamEvent::Error { message: e.to_string() });
        }
    }
}
