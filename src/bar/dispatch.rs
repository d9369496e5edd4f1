//! The central dispatch loop.
//!
//! The main thread blocks on the update queue, drains a bounded batch
//! of ready plugins, pulls each one's latest output from its channel,
//! and emits one full status line. Only the changed plugins are read;
//! everyone else is reprinted from an id-indexed cache, so every output
//! line is a complete redraw.

use anyhow::Result;
use std::io::Write;
use std::sync::Arc;

use crate::bar::protocol::{self, Block, Header};
use crate::plugin::handle::PluginHandle;
use crate::sync::rendezvous::state_mask;
use crate::sync::update_queue::UpdateQueue;
use crate::theme::Theme;

/// Subscribe every plugin's channel to the shared queue, then start the
/// worker threads.
///
/// Wiring strictly precedes the first `run` so no update can be
/// produced without a queue to land in. The callback runs inside the
/// channel's critical section; `UpdateQueue::put` is bounded and
/// allocation-free, which is why this is safe.
pub fn start_plugins(handles: &mut [PluginHandle], queue: &Arc<UpdateQueue>) -> Result<()> {
    for handle in handles.iter() {
        let queue = Arc::clone(queue);
        let id = handle.id();
        handle
            .comm()
            .set_callback(state_mask::VALUE | state_mask::ERROR, move |_| {
                queue.put(id);
            });
    }
    for handle in handles.iter_mut() {
        handle.run()?;
    }
    Ok(())
}

/// The dispatch loop over N plugin handles and the shared update queue.
pub struct Dispatcher<W> {
    handles: Arc<Vec<PluginHandle>>,
    queue: Arc<UpdateQueue>,
    theme: Theme,
    /// Last known wire block per plugin; `None` = hidden or not yet
    /// produced.
    cache: Vec<Option<Block>>,
    out: W,
}

impl<W: Write> Dispatcher<W> {
    pub fn new(
        handles: Arc<Vec<PluginHandle>>,
        queue: Arc<UpdateQueue>,
        theme: Theme,
        out: W,
    ) -> Self {
        let cache = vec![None; handles.len()];
        Self {
            handles,
            queue,
            theme,
            cache,
            out,
        }
    }

    /// Run forever.
    ///
    /// Returns only on a fatal condition: an I/O failure on the output
    /// stream, or a plugin whose channel is latched to an error. One
    /// failed plugin takes the whole bar down, deliberately loudly,
    /// rather than disappearing from the line in silence.
    pub fn run(&mut self) -> Result<()> {
        let click_events = self.handles.iter().any(|h| h.click_events());
        protocol::write_preamble(&mut self.out, &Header::new(click_events))?;
        loop {
            self.process_batch()?;
        }
    }

    /// Block for queued updates, drain one bounded batch, emit one
    /// status line.
    fn process_batch(&mut self) -> Result<()> {
        self.queue.wait_ready();
        // The snapshot bounds the batch: ids queued while we drain are
        // handled next iteration, so the write below never starves.
        let batch = self.queue.len();
        for _ in 0..batch {
            let id = self.queue.pop();
            // Clear the dedup flag before reading the channel so an
            // update arriving mid-read queues a fresh notification.
            self.queue.clear_queued(id);
            let handle = &self.handles[id];
            let update = handle.latest()?;
            self.cache[id] = update
                .map(|content| protocol::render_block(&content, handle.name(), id, &self.theme));
        }
        protocol::write_status_line(&mut self.out, self.cache.iter().flatten())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::loader::PluginSource;
    use crate::plugin::testing::{stub_click_event, stub_to, StubPlugin};
    use pretty_assertions::assert_eq;

    fn stub_handles(stubs: Vec<StubPlugin>) -> Vec<PluginHandle> {
        stubs
            .into_iter()
            .enumerate()
            .map(|(id, stub)| {
                PluginHandle::with_plugin(
                    id,
                    PluginSource::Builtin("stub".to_string()),
                    stub_to(stub),
                    None,
                )
                .unwrap()
            })
            .collect()
    }

    fn wire(handles: &[PluginHandle], queue: &Arc<UpdateQueue>) {
        for handle in handles {
            let queue = Arc::clone(queue);
            let id = handle.id();
            handle
                .comm()
                .set_callback(state_mask::VALUE | state_mask::ERROR, move |_| {
                    queue.put(id);
                });
        }
    }

    fn status_lines(out: &[u8]) -> Vec<serde_json::Value> {
        String::from_utf8(out.to_vec())
            .unwrap()
            .lines()
            .filter_map(|line| {
                let line = line.trim_end_matches(',');
                serde_json::from_str(line).ok()
            })
            .collect()
    }

    #[test]
    fn test_full_redraw_from_cache() {
        // Two plugins, interleaved updates: every emitted line contains
        // the latest known content of both, not just the one that
        // changed.
        let handles = stub_handles(vec![
            StubPlugin::named("alpha"),
            StubPlugin::named("beta"),
        ]);
        let queue = Arc::new(UpdateQueue::new(handles.len()));
        wire(&handles, &queue);
        let handles = Arc::new(handles);

        let mut dispatcher = Dispatcher::new(
            Arc::clone(&handles),
            Arc::clone(&queue),
            Theme::default(),
            Vec::new(),
        );

        // Clicks publish synchronously through the channel callback, so
        // each one deterministically lands in the queue.
        handles[0].send_click_event(stub_click_event(0, 1));
        dispatcher.process_batch().unwrap();

        handles[1].send_click_event(stub_click_event(1, 1));
        dispatcher.process_batch().unwrap();

        handles[0].send_click_event(stub_click_event(0, 1));
        dispatcher.process_batch().unwrap();

        let lines = status_lines(&dispatcher.out);
        assert_eq!(lines.len(), 3);

        // First line: only alpha has produced anything.
        assert_eq!(lines[0].as_array().unwrap().len(), 1);
        assert_eq!(lines[0][0]["name"], "alpha");

        // Second line: beta changed, alpha reprinted from cache.
        assert_eq!(lines[1].as_array().unwrap().len(), 2);
        assert_eq!(lines[1][0]["name"], "alpha");
        assert_eq!(lines[1][0]["full_text"], "clicks=1");
        assert_eq!(lines[1][1]["name"], "beta");

        // Third line: alpha updated, beta unchanged.
        assert_eq!(lines[2][0]["full_text"], "clicks=2");
        assert_eq!(lines[2][1]["full_text"], "clicks=1");
    }

    #[test]
    fn test_blocks_keep_dispatch_order() {
        // Plugin order on the line is id order, not update order.
        let handles = stub_handles(vec![
            StubPlugin::named("first"),
            StubPlugin::named("second"),
        ]);
        let queue = Arc::new(UpdateQueue::new(handles.len()));
        wire(&handles, &queue);
        let handles = Arc::new(handles);

        let mut dispatcher = Dispatcher::new(
            Arc::clone(&handles),
            Arc::clone(&queue),
            Theme::default(),
            Vec::new(),
        );

        handles[1].send_click_event(stub_click_event(1, 1));
        handles[0].send_click_event(stub_click_event(0, 1));
        dispatcher.process_batch().unwrap();

        let lines = status_lines(&dispatcher.out);
        assert_eq!(lines[0][0]["name"], "first");
        assert_eq!(lines[0][1]["name"], "second");
    }

    #[test]
    fn test_hidden_plugin_omitted_from_line() {
        let handles = stub_handles(vec![
            StubPlugin::named("shy"),
            StubPlugin::named("steady"),
        ]);
        let queue = Arc::new(UpdateQueue::new(handles.len()));
        wire(&handles, &queue);
        let handles = Arc::new(handles);

        let mut dispatcher = Dispatcher::new(
            Arc::clone(&handles),
            Arc::clone(&queue),
            Theme::default(),
            Vec::new(),
        );

        handles[0].send_click_event(stub_click_event(0, 1));
        handles[1].send_click_event(stub_click_event(1, 1));
        dispatcher.process_batch().unwrap();

        // Middle click hides plugin 0.
        handles[0].send_click_event(stub_click_event(0, 2));
        dispatcher.process_batch().unwrap();

        let lines = status_lines(&dispatcher.out);
        assert_eq!(lines[0].as_array().unwrap().len(), 2);
        assert_eq!(lines[1].as_array().unwrap().len(), 1);
        assert_eq!(lines[1][0]["name"], "steady");
    }

    #[test]
    fn test_plugin_error_is_fatal_and_qualified() {
        let mut handles = stub_handles(vec![StubPlugin::failing_run("sensor unplugged")]);
        let queue = Arc::new(UpdateQueue::new(handles.len()));
        start_plugins(&mut handles, &queue).unwrap();
        let handles = Arc::new(handles);

        let mut dispatcher = Dispatcher::new(
            Arc::clone(&handles),
            Arc::clone(&queue),
            Theme::default(),
            Vec::new(),
        );

        let err = dispatcher.process_batch().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("stub"));
        assert!(message.contains("sensor unplugged"));
    }

    #[test]
    fn test_preamble_announces_click_support() {
        let handles = stub_handles(vec![StubPlugin::named("clicky")]);
        let queue = Arc::new(UpdateQueue::new(handles.len()));
        wire(&handles, &queue);
        let handles = Arc::new(handles);

        let mut dispatcher = Dispatcher::new(
            Arc::clone(&handles),
            Arc::clone(&queue),
            Theme::default(),
            Vec::new(),
        );

        // run() loops forever, so write the preamble and drive a single
        // batch the way it would.
        let click_events = dispatcher.handles.iter().any(|h| h.click_events());
        protocol::write_preamble(&mut dispatcher.out, &Header::new(click_events)).unwrap();
        handles[0].send_click_event(stub_click_event(0, 1));
        dispatcher.process_batch().unwrap();

        let text = String::from_utf8(dispatcher.out.clone()).unwrap();
        let header: serde_json::Value =
            serde_json::from_str(text.lines().next().unwrap()).unwrap();
        assert_eq!(header["click_events"], true);
        assert_eq!(header["version"], 1);
    }
}
