use std::{collections::HashMap, sync::Arc};

use clipreel_core::{Dispatcher, Inbound, SessionKey};
use tokio::task::JoinHandle;
use tracing::error;

/// Runs events concurrently across sessions and in arrival order within one.
///
/// Each event gets its own task, which first waits for the previous task of
/// the same session. A long render therefore holds back only its own user.
pub struct SessionLanes {
    dispatcher: Arc<Dispatcher>,
    /// Latest task per session.
    tails: HashMap<SessionKey, JoinHandle<()>>,
}

impl SessionLanes {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            tails: HashMap::new(),
        }
    }

    pub fn submit(&mut self, inbound: Inbound) {
        let key = inbound.origin().session_key();
        let message = inbound.origin().message;
        let previous = self.tails.remove(&key);
        let dispatcher = Arc::clone(&self.dispatcher);

        let task = tokio::spawn(async move {
            if let Some(previous) = previous
                && let Err(e) = previous.await
            {
                error!(session = %key, error = %e, "event handler panicked");
            }
            if let Err(e) = dispatcher.dispatch(inbound).await {
                error!(session = %key, %message, error = %e, "failed to handle event");
            }
        });
        self.tails.insert(key, task);
    }

    /// Forgets lanes whose work is done.
    pub fn reap(&mut self) {
        self.tails.retain(|_, task| !task.is_finished());
    }

    /// Lanes with work still queued or running.
    pub fn pending(&self) -> usize {
        self.tails.len()
    }

    /// Waits for every submitted event to be handled.
    pub async fn drain(&mut self) {
        for (key, task) in self.tails.drain() {
            if let Err(e) = task.await {
                error!(session = %key, error = %e, "event handler panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        path::Path,
        sync::Mutex,
        time::Duration,
    };

    use async_trait::async_trait;
    use clipreel_core::{
        Attachment, AttachmentKind, ChatId, ChatTransport, Command, MessageId, Origin,
        RenderError, RenderSummary, Renderer, Segment, SessionLimits, SessionState, StagingArea,
        TransferError, UserId,
    };

    use super::*;

    type Log = Arc<Mutex<Vec<String>>>;

    struct LoggingTransport(Log);

    #[async_trait]
    impl ChatTransport for LoggingTransport {
        async fn register_commands(&self, _commands: &[Command]) -> Result<(), TransferError> {
            Ok(())
        }

        async fn send_text(
            &self,
            chat: ChatId,
            _reply_to: Option<MessageId>,
            text: &str,
        ) -> Result<(), TransferError> {
            self.0.lock().unwrap().push(format!("{chat}: {text}"));
            Ok(())
        }

        async fn fetch_attachment(
            &self,
            _attachment: &Attachment,
            destination: &Path,
            _max_size: u64,
        ) -> Result<u64, TransferError> {
            tokio::fs::write(destination, b"clip").await?;
            Ok(4)
        }

        async fn send_video(
            &self,
            chat: ChatId,
            _reply_to: Option<MessageId>,
            _video: &Path,
            _caption: Option<&str>,
        ) -> Result<(), TransferError> {
            self.0.lock().unwrap().push(format!("{chat}: <video>"));
            Ok(())
        }
    }

    struct SlowRenderer;

    #[async_trait]
    impl Renderer for SlowRenderer {
        async fn render(
            &self,
            segments: &[Segment],
            destination: &Path,
        ) -> Result<RenderSummary, RenderError> {
            tokio::time::sleep(Duration::from_millis(300)).await;
            tokio::fs::write(destination, b"reel").await?;
            Ok(RenderSummary {
                clips: segments.len(),
                duration_secs: 1.0,
            })
        }
    }

    fn origin(chat: i64, message: i64) -> Origin {
        Origin {
            chat: ChatId(chat),
            user: UserId(chat * 10),
            message: MessageId(message),
            sender_name: "Sam".to_string(),
        }
    }

    fn command(chat: i64, message: i64, command: Command) -> Inbound {
        Inbound::Command {
            origin: origin(chat, message),
            command,
        }
    }

    fn video(chat: i64, message: i64) -> Inbound {
        Inbound::Media {
            origin: origin(chat, message),
            attachment: Some(Attachment {
                kind: AttachmentKind::Video,
                file_id: format!("file-{message}"),
                file_size: Some(4),
                mime_type: Some("video/mp4".to_string()),
            }),
            caption: None,
        }
    }

    fn replies_in(log: &Log, chat: i64) -> Vec<String> {
        let prefix = format!("{chat}: ");
        log.lock()
            .unwrap()
            .iter()
            .filter_map(|line| line.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    #[tokio::test]
    async fn events_of_one_user_run_in_order_without_blocking_others() {
        let staging = tempfile::tempdir().unwrap();
        let log = Log::default();
        let dispatcher = Arc::new(Dispatcher::new(
            SessionLimits::default(),
            StagingArea::new(staging.path()),
            Arc::new(LoggingTransport(Arc::clone(&log))),
            Arc::new(SlowRenderer),
        ));
        let mut lanes = SessionLanes::new(Arc::clone(&dispatcher));

        lanes.submit(command(1, 1, Command::New));
        lanes.submit(video(1, 2));
        lanes.submit(command(1, 3, Command::End));
        lanes.submit(command(1, 4, Command::New));
        lanes.submit(command(2, 10, Command::New));
        assert_eq!(lanes.pending(), 2);

        lanes.drain().await;
        assert_eq!(lanes.pending(), 0);

        let first = replies_in(&log, 1);
        assert_eq!(first.len(), 5, "{first:?}");
        assert!(first[0].starts_with("Ok. I will start"));
        assert!(first[1].starts_with("Got video!"));
        assert_eq!(first[2], "Ok. Rendering...");
        assert_eq!(first[3], "<video>");
        // The second /new found the finished reel back in Idle.
        assert!(first[4].starts_with("Ok. I will start"), "{first:?}");

        // The other chat was answered while the render was still running.
        let lines = log.lock().unwrap().clone();
        let other = lines
            .iter()
            .position(|l| l.starts_with("2: Ok. I will start"))
            .unwrap();
        let delivered = lines.iter().position(|l| l == "1: <video>").unwrap();
        assert!(other < delivered, "{lines:?}");

        let session = dispatcher
            .sessions()
            .get(origin(1, 0).session_key())
            .unwrap();
        assert_eq!(session.lock().await.state(), SessionState::Collecting);
        assert_eq!(dispatcher.sessions().len(), 2);

        dispatcher.shutdown().await;
        assert!(dispatcher.sessions().is_empty());
    }
}
