use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::{
    config::SessionLimits,
    error::{Result, SessionError, StoreError, TransferError},
    format::{format_bytes, format_timestamp},
    inbound::{Command, Inbound, Origin},
    render::Renderer,
    session::{Session, SessionRegistry},
    staging::StagingArea,
    transport::{Attachment, ChatTransport},
    types::Segment,
};

const STARTED: &str = "Ok. I will start creating a new reel. Send me videos or GIFs, with a caption if you like. Send /end when you are done.";
const ALREADY_STARTED: &str = "I am already creating a reel. Send me videos or GIFs, or /end to finish.";
const NOT_STARTED: &str = "I will ignore that. Send /new to start creating a new reel.";
const NOTHING_TO_END: &str = "There is nothing to finish. Send /new to start creating a new reel.";
const NO_CLIPS: &str = "You did not send any clips, so there is nothing to render. Send /new to try again.";
const RENDERING: &str = "Ok. Rendering...";
const RENDER_FAILED: &str = "Sorry, I could not render your reel. Send /new to try again.";
const DELIVERY_FAILED: &str = "Sorry, I rendered your reel but could not send it. Send /new to try again.";
const GOT_VIDEO: &str = "Got video! Give me more or send /end to finish.";
const NOT_A_VIDEO: &str = "Please send videos or GIFs, optionally with a caption.";
const SEND_VIDEO: &str = "I am waiting for videos or GIFs. Send one to start your reel.";
const SEND_MORE: &str = "I will ignore that. Send more videos or GIFs, or /end to finish.";
const NOTHING_TO_UNDO: &str = "There is no clip to remove.";

/// Routes chat events to the session they belong to.
pub struct Dispatcher {
    limits: SessionLimits,
    sessions: SessionRegistry,
    staging: StagingArea,
    transport: Arc<dyn ChatTransport>,
    renderer: Arc<dyn Renderer>,
}

impl Dispatcher {
    pub fn new(
        limits: SessionLimits,
        staging: StagingArea,
        transport: Arc<dyn ChatTransport>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        Self {
            sessions: SessionRegistry::new(limits.max_clips),
            limits,
            staging,
            transport,
            renderer,
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub async fn dispatch(&self, inbound: Inbound) -> Result<()> {
        let origin = inbound.origin().clone();
        debug!(
            session = %origin.session_key(),
            message = %origin.message,
            kind = inbound.kind(),
            "dispatching"
        );

        // Global commands do not touch session state.
        match &inbound {
            Inbound::Command {
                command: Command::Start,
                ..
            } => return self.start(&origin).await,
            Inbound::Command {
                command: Command::Help,
                ..
            } => {
                self.reply(&origin, &self.help_text()).await;
                return Ok(());
            }
            _ => {}
        }

        // Only `/new` opens a session. Everything else reaches an idle
        // placeholder when none is in progress, so chatter leaves no state.
        let key = origin.session_key();
        let registered = match &inbound {
            Inbound::Command {
                command: Command::New,
                ..
            } => Some(self.sessions.session(key)),
            _ => self.sessions.get(key),
        };
        let Some(registered) = registered else {
            let mut idle = Session::new(self.limits.max_clips);
            return self.handle(&mut idle, &origin, inbound).await;
        };

        let mut session = registered.lock().await;
        let result = self.handle(&mut session, &origin, inbound).await;
        if session.is_vacant() {
            self.sessions.release(key, &registered);
        }
        result
    }

    async fn handle(&self, session: &mut Session, origin: &Origin, inbound: Inbound) -> Result<()> {
        match inbound {
            Inbound::Command { command, .. } => match command {
                Command::New => self.new_reel(session, origin).await,
                Command::End => self.end_reel(session, origin).await,
                Command::Undo => self.undo(session, origin).await,
                Command::Cancel => self.cancel(session, origin).await,
                Command::Start | Command::Help => Ok(()),
            },
            Inbound::Media {
                attachment,
                caption,
                ..
            } => self.add_clip(session, origin, attachment, caption).await,
            Inbound::CaptionEdit { caption, .. } => {
                self.edit_caption(session, origin, caption);
                Ok(())
            }
            Inbound::Text { .. } => {
                self.nudge(session, origin).await;
                Ok(())
            }
        }
    }

    /// Discards every unfinished reel.
    pub async fn shutdown(&self) {
        self.sessions.shutdown().await;
    }

    pub fn help_text(&self) -> String {
        format!(
            "I glue short videos into one reel.\n\n\
             /new - start a reel\n\
             Send videos or GIFs; a caption becomes text on top of the clip. \
             Editing the caption later updates it.\n\
             /undo - drop the last clip\n\
             /cancel - throw the reel away\n\
             /end - render the reel and send it back\n\n\
             Up to {} clips, {} each.",
            self.limits.max_clips,
            format_bytes(self.limits.max_file_size)
        )
    }

    async fn start(&self, origin: &Origin) -> Result<()> {
        if let Err(e) = self.transport.register_commands(&Command::MENU).await {
            warn!(error = %e, "failed to register bot commands");
        }
        self.reply(origin, &format!("Hi {}!", origin.sender_name))
            .await;
        Ok(())
    }

    async fn new_reel(&self, session: &mut Session, origin: &Origin) -> Result<()> {
        match session.begin() {
            Ok(()) => {
                info!(session = %origin.session_key(), "reel started");
                self.reply(origin, STARTED).await;
            }
            Err(SessionError::AlreadyCollecting) => self.reply(origin, ALREADY_STARTED).await,
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    async fn add_clip(
        &self,
        session: &mut Session,
        origin: &Origin,
        attachment: Option<Attachment>,
        caption: Option<String>,
    ) -> Result<()> {
        if !session.is_collecting() {
            self.reply(origin, NOT_STARTED).await;
            return Ok(());
        }
        let Some(attachment) = attachment else {
            self.reply(origin, NOT_A_VIDEO).await;
            return Ok(());
        };

        if session.store().is_full() {
            let err = StoreError::Capacity {
                max: session.store().max_clips(),
            };
            self.reply(origin, &format!("Error: {err}")).await;
            return Ok(());
        }

        let max = self.limits.max_file_size;
        if let Some(size) = attachment.file_size.filter(|size| *size > max) {
            let err = TransferError::TooLarge { size, max };
            self.reply(origin, &format!("Error: {err}")).await;
            return Ok(());
        }

        if let Err(e) = self.staging.ensure().await {
            error!(error = %e, "staging directory unavailable");
            self.reply(origin, &format!("Error: {}", TransferError::from(e)))
                .await;
            return Ok(());
        }

        let staged = match self.staging.clip_path() {
            Ok(path) => path,
            Err(e) => {
                error!(error = %e, "could not reserve a staging file");
                self.reply(origin, &format!("Error: {}", TransferError::from(e)))
                    .await;
                return Ok(());
            }
        };

        // `staged` deletes the partial file if anything below fails.
        let bytes = match self
            .transport
            .fetch_attachment(&attachment, &staged, max)
            .await
        {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(session = %origin.session_key(), error = %e, "download failed");
                self.reply(origin, &format!("Error: {e}")).await;
                return Ok(());
            }
        };

        let file = match staged.keep() {
            Ok(file) => file,
            Err(e) => {
                error!(error = %e, "could not keep staged clip");
                self.reply(origin, &format!("Error: {}", TransferError::from(e.error)))
                    .await;
                return Ok(());
            }
        };

        match session
            .store_mut()
            .add_segment(origin.message, &file, caption)
        {
            Ok(_) => {
                info!(
                    session = %origin.session_key(),
                    message = %origin.message,
                    bytes,
                    clips = session.store().len(),
                    "clip added"
                );
                self.reply(origin, GOT_VIDEO).await;
            }
            Err(e) => {
                if let Err(io) = tokio::fs::remove_file(&file).await {
                    warn!(path = %file.display(), error = %io, "failed to remove rejected clip");
                }
                self.reply(origin, &format!("Error: {e}")).await;
            }
        }
        Ok(())
    }

    fn edit_caption(&self, session: &mut Session, origin: &Origin, caption: Option<String>) {
        if !session.is_collecting() {
            return;
        }
        match session.store_mut().edit_caption(origin.message, caption) {
            Ok(()) => info!(
                session = %origin.session_key(),
                message = %origin.message,
                "caption updated"
            ),
            // Edits of messages that are not clips of this reel are dropped.
            Err(e) => debug!(session = %origin.session_key(), error = %e, "caption edit ignored"),
        }
    }

    async fn nudge(&self, session: &Session, origin: &Origin) {
        if !session.is_collecting() {
            return;
        }
        if session.store().is_empty() {
            self.reply(origin, SEND_VIDEO).await;
        } else {
            self.reply(origin, SEND_MORE).await;
        }
    }

    async fn undo(&self, session: &mut Session, origin: &Origin) -> Result<()> {
        if !session.is_collecting() {
            self.reply(origin, NOT_STARTED).await;
            return Ok(());
        }
        let Some(last) = session.store().last_message_id() else {
            self.reply(origin, NOTHING_TO_UNDO).await;
            return Ok(());
        };

        session.store_mut().remove_segment(last).await?;
        let left = session.store().len();
        info!(session = %origin.session_key(), message = %last, clips = left, "clip removed");
        self.reply(
            origin,
            &format!("Removed the last clip. {left} left, send more or /end to finish."),
        )
        .await;
        Ok(())
    }

    async fn cancel(&self, session: &mut Session, origin: &Origin) -> Result<()> {
        if !session.is_collecting() {
            self.reply(origin, NOTHING_TO_END).await;
            return Ok(());
        }
        let discarded = session.store().len();
        session.finish().await;
        info!(session = %origin.session_key(), clips = discarded, "reel cancelled");
        self.reply(
            origin,
            &format!("Ok. Threw away {discarded} clip(s). Send /new to start over."),
        )
        .await;
        Ok(())
    }

    async fn end_reel(&self, session: &mut Session, origin: &Origin) -> Result<()> {
        if !session.is_collecting() {
            self.reply(origin, NOTHING_TO_END).await;
            return Ok(());
        }
        if session.store().is_empty() {
            session.finish().await;
            self.reply(origin, NO_CLIPS).await;
            return Ok(());
        }

        let segments = session.start_render()?;
        self.reply(origin, RENDERING).await;
        info!(session = %origin.session_key(), clips = segments.len(), "rendering reel");

        let outcome = self.render_and_deliver(&segments, origin).await;
        session.finish().await;

        if let Err(notice) = outcome {
            self.reply(origin, notice).await;
        }
        Ok(())
    }

    /// On failure returns the notice to show the user.
    async fn render_and_deliver(
        &self,
        segments: &[Segment],
        origin: &Origin,
    ) -> std::result::Result<(), &'static str> {
        let output = self
            .staging
            .ensure()
            .await
            .and_then(|_| self.staging.output_path())
            .map_err(|e| {
                error!(error = %e, "could not reserve render output");
                RENDER_FAILED
            })?;

        let summary = self
            .renderer
            .render(segments, &output)
            .await
            .map_err(|e| {
                error!(session = %origin.session_key(), error = %e, "render failed");
                RENDER_FAILED
            })?;

        let caption = format!(
            "{} clip(s), {}",
            summary.clips,
            format_timestamp(summary.duration_secs)
        );
        self.transport
            .send_video(origin.chat, Some(origin.message), &output, Some(&caption))
            .await
            .map_err(|e| {
                error!(session = %origin.session_key(), error = %e, "delivery failed");
                DELIVERY_FAILED
            })?;

        info!(session = %origin.session_key(), "reel delivered");
        Ok(())
    }

    async fn reply(&self, origin: &Origin, text: &str) {
        if let Err(e) = self
            .transport
            .send_text(origin.chat, Some(origin.message), text)
            .await
        {
            warn!(chat = %origin.chat, error = %e, "failed to send reply");
        }
    }
}
