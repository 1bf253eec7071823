use super::{Reveal, RevealFrame};
use crate::api::TaskApi;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Runs a completion callback at most once.
#[derive(Default)]
pub struct DoneLatch {
    callback: Option<Box<dyn FnOnce() + Send>>,
    fired: bool,
}

impl DoneLatch {
    pub fn new(callback: impl FnOnce() + Send + 'static) -> Self {
        Self {
            callback: Some(Box::new(callback)),
            fired: false,
        }
    }

    pub fn fire(&mut self) {
        if self.fired {
            return;
        }
        self.fired = true;
        if let Some(callback) = self.callback.take() {
            callback();
        }
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }
}

/// Step `reveal` on tokio timers until it has nothing left to do.
///
/// Emits the initial frame and one frame per step. `latch` fires the first
/// time the reveal reports done. Returns `false` if `cancel` fired first, in
/// which case no further frames are emitted.
pub async fn drive<F>(
    reveal: &mut dyn Reveal,
    cancel: &CancellationToken,
    mut on_frame: F,
    latch: &mut DoneLatch,
) -> bool
where
    F: FnMut(RevealFrame),
{
    if cancel.is_cancelled() {
        return false;
    }
    on_frame(reveal.frame());

    loop {
        if reveal.is_done() {
            latch.fire();
        }
        let Some(delay) = reveal.next_delay() else {
            return true;
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return false,
            _ = tokio::time::sleep(delay) => {}
        }
        reveal.advance();
        on_frame(reveal.frame());
    }
}

/// Marks an assistant message as read once its reveal completes.
#[derive(Clone)]
pub struct ReadReceipt {
    pub api: Arc<dyn TaskApi>,
    pub message_id: String,
}

impl ReadReceipt {
    pub fn new(api: Arc<dyn TaskApi>, message_id: impl Into<String>) -> Self {
        Self {
            api,
            message_id: message_id.into(),
        }
    }

    pub async fn send(self) {
        match self.api.mark_message_read(&self.message_id).await {
            Ok(()) => debug!(message_id = %self.message_id, "Marked message as read"),
            Err(err) => warn!(
                message_id = %self.message_id,
                error = %err,
                "Failed to mark message as read"
            ),
        }
    }
}

/// Runs one reveal at a time in the background and streams its frames,
/// tagged with the reveal id returned by [`TypewriterService::start`].
pub struct TypewriterService {
    tx: mpsc::UnboundedSender<(RevealFrame, u64)>,
    current: Option<CancellationToken>,
    next_id: u64,
}

impl TypewriterService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(RevealFrame, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                current: None,
                next_id: 0,
            },
            rx,
        )
    }

    /// Start revealing new content, cancelling whatever was running.
    pub fn start(&mut self, reveal: Box<dyn Reveal>, receipt: Option<ReadReceipt>) -> u64 {
        self.cancel();
        self.next_id += 1;
        let reveal_id = self.next_id;
        let cancel_token = CancellationToken::new();
        self.current = Some(cancel_token.clone());

        let tx_clone = self.tx.clone();
        tokio::spawn(async move {
            let mut reveal = reveal;
            let mut latch = match receipt {
                Some(receipt) => DoneLatch::new(move || {
                    tokio::spawn(receipt.send());
                }),
                None => DoneLatch::default(),
            };

            debug!(reveal_id, "Reveal started");
            let frame_tx = tx_clone.clone();
            let completed = drive(
                reveal.as_mut(),
                &cancel_token,
                |frame| {
                    let _ = frame_tx.send((frame, reveal_id));
                },
                &mut latch,
            )
            .await;

            if completed {
                let _ = tx_clone.send((RevealFrame::Done, reveal_id));
                debug!(reveal_id, "Reveal finished");
            } else {
                debug!(reveal_id, "Reveal cancelled");
            }
        });

        reveal_id
    }

    pub fn cancel(&mut self) {
        if let Some(token) = self.current.take() {
            token.cancel();
        }
    }
}

impl Drop for TypewriterService {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, CreatedTask, Task, TaskStatus};
    use crate::ui::markdown::{rich_nodes, Block, BlockKind};
    use crate::ui::typewriter::{BlockTypewriter, TreeTypewriter, TypewriterOptions};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn paragraph(source: &str) -> Block {
        Block {
            kind: BlockKind::Paragraph,
            source: source.to_string(),
            span: 0..source.len(),
        }
    }

    fn counting_latch() -> (DoneLatch, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let latch = DoneLatch::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (latch, count)
    }

    fn assert_elapsed(start: tokio::time::Instant, expected: Duration) {
        let elapsed = start.elapsed();
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(2),
            "elapsed {elapsed:?}, expected {expected:?}"
        );
    }

    struct ReceiptApi {
        tx: mpsc::UnboundedSender<String>,
    }

    #[async_trait]
    impl TaskApi for ReceiptApi {
        async fn list_tasks(&self, _project_id: &str) -> Result<Vec<Task>, ApiError> {
            Ok(Vec::new())
        }

        async fn create_task(&self, _project_id: &str) -> Result<CreatedTask, ApiError> {
            Ok(CreatedTask { id: "t".into() })
        }

        async fn update_task(&self, _task_id: &str, _status: TaskStatus) -> Result<Task, ApiError> {
            unreachable!("not used by reveals")
        }

        async fn mark_message_read(&self, message_id: &str) -> Result<(), ApiError> {
            let _ = self.tx.send(message_id.to_string());
            Ok(())
        }
    }

    #[test]
    fn latch_fires_once() {
        let (mut latch, count) = counting_latch();
        assert!(!latch.has_fired());
        latch.fire();
        latch.fire();
        assert!(latch.has_fired());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn block_reveal_completes_and_fires_done_once() {
        let mut reveal = BlockTypewriter::new(vec![paragraph("Hi")], TypewriterOptions::block());
        let (mut latch, count) = counting_latch();
        let cancel = CancellationToken::new();
        let mut frames = Vec::new();

        let start = tokio::time::Instant::now();
        let completed = drive(&mut reveal, &cancel, |f| frames.push(f), &mut latch).await;

        assert!(completed);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(reveal.text(), "Hi");
        // two ticks plus the closing pause
        assert_elapsed(start, Duration::from_millis(20 + 20 + 300));
        assert_eq!(
            frames.first(),
            Some(&RevealFrame::Text {
                text: String::new(),
                cursor: "|".into()
            })
        );
        assert_eq!(
            frames.last(),
            Some(&RevealFrame::Text {
                text: "Hi".into(),
                cursor: String::new()
            })
        );

        // driving a finished reveal again never re-fires
        let again = drive(&mut reveal, &cancel, |_| {}, &mut latch).await;
        assert!(again);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn tree_reveal_ticks_once_per_grapheme() {
        let mut reveal = TreeTypewriter::new(rich_nodes("OK"), TypewriterOptions::tree());
        let (mut latch, count) = counting_latch();
        let cancel = CancellationToken::new();

        let start = tokio::time::Instant::now();
        assert!(drive(&mut reveal, &cancel, |_| {}, &mut latch).await);
        assert_elapsed(start, Duration::from_millis(100));
        assert_eq!(reveal.revealed_count(), 2);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        reveal.reset(rich_nodes("again"));
        assert_eq!(reveal.revealed_count(), 0);
    }

    #[tokio::test]
    async fn cancelled_reveal_stops_without_firing() {
        tokio::time::pause();
        let mut reveal =
            BlockTypewriter::new(vec![paragraph("long text")], TypewriterOptions::block());
        let (mut latch, count) = counting_latch();
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        let mut frames = 0;

        let completed = drive(
            &mut reveal,
            &cancel,
            |_| {
                frames += 1;
                if frames == 3 {
                    canceller.cancel();
                }
            },
            &mut latch,
        )
        .await;

        assert!(!completed);
        assert_eq!(frames, 3);
        assert_eq!(reveal.text(), "lo");
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn service_drops_frames_of_superseded_reveals() {
        tokio::time::pause();
        let (mut service, mut rx) = TypewriterService::new();

        let first = service.start(
            Box::new(BlockTypewriter::new(
                vec![paragraph("stale content")],
                TypewriterOptions::block(),
            )),
            None,
        );
        let second = service.start(
            Box::new(BlockTypewriter::new(
                vec![paragraph("ok")],
                TypewriterOptions::block(),
            )),
            None,
        );
        assert_ne!(first, second);

        let mut last_text = None;
        loop {
            let (frame, id) = rx.recv().await.unwrap();
            assert_eq!(id, second);
            match frame {
                RevealFrame::Text { text, .. } => last_text = Some(text),
                RevealFrame::Done => break,
                RevealFrame::Tree { .. } => panic!("unexpected tree frame"),
            }
        }
        assert_eq!(last_text.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn completed_reveal_sends_read_receipt() {
        tokio::time::pause();
        let (receipt_tx, mut receipt_rx) = mpsc::unbounded_channel();
        let api: Arc<dyn TaskApi> = Arc::new(ReceiptApi { tx: receipt_tx });
        let (mut service, mut rx) = TypewriterService::new();

        service.start(
            Box::new(TreeTypewriter::new(rich_nodes("Done"), TypewriterOptions::tree())),
            Some(ReadReceipt::new(api, "m42")),
        );

        while let Some((frame, _)) = rx.recv().await {
            if frame == RevealFrame::Done {
                break;
            }
        }
        assert_eq!(receipt_rx.recv().await.as_deref(), Some("m42"));
    }
}
