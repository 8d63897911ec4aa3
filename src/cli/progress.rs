use std::io::{self, Write};

use crate::models::{ProvisionEvent, ProvisionStage, TransferProgress};

use super::output::format_bytes;

const REDRAW_EVERY_BYTES: u64 = 256 * 1024;
const BAR_WIDTH: usize = 30;

/// In-place download indicator on stderr.
#[derive(Debug, Default)]
pub struct TerminalProgress {
    last_drawn: u64,
    drawing: bool,
}

impl TerminalProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, event: ProvisionEvent<'_>) {
        match event {
            ProvisionEvent::Transfer { id, progress } => self.on_transfer(id, progress),
            ProvisionEvent::Stage { id, stage } => self.on_stage(id, stage),
            ProvisionEvent::Finished { .. } => {}
        }
    }

    fn on_transfer(&mut self, id: &str, progress: TransferProgress) {
        let finished = progress.total == Some(progress.downloaded);
        if !finished
            && self.drawing
            && progress.downloaded.saturating_sub(self.last_drawn) < REDRAW_EVERY_BYTES
        {
            return;
        }
        self.last_drawn = progress.downloaded;
        self.drawing = true;
        let mut stderr = io::stderr().lock();
        let _ = write!(stderr, "\r{}", render_line(id, progress));
        let _ = stderr.flush();
    }

    fn on_stage(&mut self, id: &str, stage: ProvisionStage) {
        match stage {
            ProvisionStage::Extracting | ProvisionStage::Done { .. } => {
                self.finish_line();
                if stage == ProvisionStage::Extracting {
                    eprintln!("Extracting {id}...");
                }
            }
            ProvisionStage::Fetching => {
                self.last_drawn = 0;
                eprintln!("Downloading {id}...");
            }
            ProvisionStage::Pending | ProvisionStage::Ready => {}
        }
    }

    fn finish_line(&mut self) {
        if self.drawing {
            eprintln!();
            self.drawing = false;
        }
    }
}

#[must_use]
pub fn render_line(id: &str, progress: TransferProgress) -> String {
    match (progress.fraction(), progress.total) {
        (Some(fraction), Some(total)) => {
            let filled = ((fraction * BAR_WIDTH as f32) as usize).min(BAR_WIDTH);
            format!(
                "{id}: [{}{}] {:>5.1}% {} / {}",
                "█".repeat(filled),
                "░".repeat(BAR_WIDTH - filled),
                fraction * 100.0,
                format_bytes(progress.downloaded),
                format_bytes(total)
            )
        }
        _ => format!("{id}: {} downloaded", format_bytes(progress.downloaded)),
    }
}
