use std::panic::{self, AssertUnwindSafe};

use tracing::error;

use crate::{
    HostAction, LoadOutcome, ReloadOutcome, RenderOutcome, Result, VisAction, VisError,
    VisualisationDescriptor, VisualisationId, VisualisationLifecycle,
};

/// Runs one call into plugin code, turning an error or a panic into a logged
/// `None`. Nothing raised by the plugin unwinds past this point.
pub fn isolate<T>(call: &'static str, f: impl FnOnce() -> Result<T>) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(err)) => {
            error!(call, %err, "visualisation call failed");
            None
        }
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            let err = VisError::plugin(reason);
            error!(call, %err, "visualisation call panicked");
            None
        }
    }
}

/// What a single render tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to do: hidden, or unloaded with no audio playing.
    Idle,
    Loaded(LoadOutcome),
    Unloaded,
    Reloaded(LoadOutcome),
    /// The selection moved to the host's now-playing screen.
    HandedOff,
    Rendered,
    RenderFaulted,
    /// Loaded but still waiting for the stream format.
    NotReady,
    /// Internal state was unusable; the frame went ahead without the plugin.
    Failed,
}

/// Messages the surrounding GUI routes to the visualisation control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostMessage {
    QueryVisualisation,
    VisualisationAction(HostAction),
    PlaybackStarted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageReply {
    Visualisation(Option<VisualisationId>),
    Handled(bool),
}

/// Per-frame driver for one visualisation control.
///
/// Each tick either loads, unloads, reloads or renders, never more than one.
#[derive(Debug)]
pub struct RenderCoordinator {
    lifecycle: VisualisationLifecycle,
    visible: bool,
}

impl RenderCoordinator {
    pub fn new(lifecycle: VisualisationLifecycle) -> Self {
        Self {
            lifecycle,
            visible: true,
        }
    }

    pub fn lifecycle(&self) -> &VisualisationLifecycle {
        &self.lifecycle
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Runs one frame's worth of decisions. Never fails; problems are logged.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.visible {
            return TickOutcome::Idle;
        }
        match self.try_tick() {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(%err, "visualisation frame skipped");
                TickOutcome::Failed
            }
        }
    }

    fn try_tick(&self) -> Result<TickOutcome> {
        let host = self.lifecycle.host();
        let playing = host.playback.is_playing_audio();

        let Some(loaded) = self.lifecycle.descriptor()? else {
            if !playing {
                return Ok(TickOutcome::Idle);
            }
            let next =
                VisualisationDescriptor::snapshot(host.config.as_ref(), host.metadata.as_ref());
            return Ok(TickOutcome::Loaded(self.lifecycle.load(next)?));
        };

        if !playing {
            self.lifecycle.free()?;
            return Ok(TickOutcome::Unloaded);
        }

        if loaded.differs_from(&host.config.selected_visualisation()) {
            let next =
                VisualisationDescriptor::snapshot(host.config.as_ref(), host.metadata.as_ref());
            return Ok(match self.lifecycle.reload(next)? {
                ReloadOutcome::HandedOff => TickOutcome::HandedOff,
                ReloadOutcome::Reloaded(outcome) => TickOutcome::Reloaded(outcome),
            });
        }

        Ok(match self.lifecycle.render()? {
            RenderOutcome::NotReady => TickOutcome::NotReady,
            RenderOutcome::Rendered => TickOutcome::Rendered,
            RenderOutcome::Faulted => TickOutcome::RenderFaulted,
        })
    }

    /// Forwards a user action; `false` when no plugin is loaded.
    pub fn on_action(&self, action: HostAction) -> bool {
        self.lifecycle
            .on_action(VisAction::from(action), None)
            .unwrap_or_else(|err| {
                error!(%err, ?action, "dropping visualisation action");
                false
            })
    }

    pub fn on_message(&self, message: HostMessage) -> MessageReply {
        match message {
            HostMessage::QueryVisualisation => MessageReply::Visualisation(
                self.lifecycle.active_identifier().unwrap_or_else(|err| {
                    error!(%err, "cannot query visualisation");
                    None
                }),
            ),
            HostMessage::VisualisationAction(action) => MessageReply::Handled(self.on_action(action)),
            HostMessage::PlaybackStarted => {
                let accepted = self.visible
                    && self.lifecycle.update_album_art().unwrap_or_else(|err| {
                        error!(%err, "cannot refresh album art");
                        false
                    });
                MessageReply::Handled(accepted)
            }
        }
    }

    /// Hiding the control frees an initialized visualisation.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if visible {
            return;
        }
        let initialized = self
            .lifecycle
            .status()
            .map(|status| status.is_initialized())
            .unwrap_or(false);
        if initialized {
            self.release_resources();
        }
    }

    /// Frees the visualisation regardless of state, for control teardown.
    pub fn release_resources(&self) {
        if let Err(err) = self.lifecycle.free() {
            error!(%err, "failed to free visualisation");
        }
    }
}
