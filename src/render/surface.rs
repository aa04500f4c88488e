use crossbeam_channel::{Receiver, Sender};

use crate::render::command::RenderCommand;

/// One-way command sink towards the map view.
///
/// Commands are fire-and-forget; the surface may apply them in its own time.
pub trait RenderSurface: Send {
    fn send(&mut self, command: RenderCommand);

    fn send_all(&mut self, commands: Vec<RenderCommand>) {
        for command in commands {
            self.send(command);
        }
    }
}

impl<S: RenderSurface + ?Sized> RenderSurface for Box<S> {
    fn send(&mut self, command: RenderCommand) {
        (**self).send(command);
    }
}

/// Surface that keeps every command it receives, in order
#[derive(Debug, Default, Clone)]
pub struct RecordingSurface {
    commands: Vec<RenderCommand>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    /// Returns and forgets everything recorded so far
    pub fn take(&mut self) -> Vec<RenderCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn route_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, RenderCommand::ShowRoute { .. }))
            .count()
    }
}

impl RenderSurface for RecordingSurface {
    fn send(&mut self, command: RenderCommand) {
        self.commands.push(command);
    }
}

/// Surface that forwards commands to whatever thread owns the real map view
#[derive(Debug, Clone)]
pub struct ChannelSurface {
    tx: Sender<RenderCommand>,
}

impl ChannelSurface {
    pub fn new() -> (Self, Receiver<RenderCommand>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }
}

impl RenderSurface for ChannelSurface {
    fn send(&mut self, command: RenderCommand) {
        if self.tx.send(command).is_err() {
            log::debug!("Render surface receiver dropped, command discarded");
        }
    }
}

/// Surface that only logs, for headless runs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSurface;

impl RenderSurface for LogSurface {
    fn send(&mut self, command: RenderCommand) {
        match command.to_json() {
            Ok(json) => log::info!("render: {}", json),
            Err(e) => log::warn!("render: unserializable command {:?}: {}", command, e),
        }
    }
}
