//! Deferred image persistence.
//!
//! Controllers hand finished images to a background thread through a bounded
//! queue so encoding/IO does not sit between render and oracle calls. Nothing
//! reads back a file written in the same step, so the only synchronization
//! point is [`ImageWriter::flush`].

use std::path::PathBuf;
use std::thread;

use anyhow::{Result, anyhow, bail};
use crossbeam_channel::{Sender, bounded};
use image::DynamicImage;

const QUEUE_DEPTH: usize = 16;

enum WriteJob {
    Image { path: PathBuf, image: DynamicImage },
    Flush(Sender<Option<String>>),
}

pub struct ImageWriter {
    tx: Option<Sender<WriteJob>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ImageWriter {
    pub fn spawn() -> Result<Self> {
        let (tx, rx) = bounded::<WriteJob>(QUEUE_DEPTH);
        let handle = thread::Builder::new()
            .name("image-writer".to_string())
            .spawn(move || {
                let mut first_error: Option<String> = None;
                for job in rx {
                    match job {
                        WriteJob::Image { path, image } => {
                            if let Err(e) = image.save(&path) {
                                let msg = format!("failed to write {}: {e}", path.display());
                                log::error!("[writer] {msg}");
                                first_error.get_or_insert(msg);
                            }
                        }
                        WriteJob::Flush(ack) => {
                            let _ = ack.send(first_error.take());
                        }
                    }
                }
            })
            .map_err(|e| anyhow!("failed to spawn image writer thread: {e}"))?;
        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    pub fn write(&self, path: PathBuf, image: DynamicImage) -> Result<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| anyhow!("image writer is shut down"))?;
        tx.send(WriteJob::Image { path, image })
            .map_err(|_| anyhow!("image writer thread exited"))
    }

    /// Blocks until every queued write has finished; reports the first failure since the last flush.
    pub fn flush(&self) -> Result<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| anyhow!("image writer is shut down"))?;
        let (ack_tx, ack_rx) = bounded(1);
        tx.send(WriteJob::Flush(ack_tx))
            .map_err(|_| anyhow!("image writer thread exited"))?;
        match ack_rx.recv() {
            Ok(None) => Ok(()),
            Ok(Some(msg)) => bail!(msg),
            Err(_) => bail!("image writer thread exited before flush completed"),
        }
    }
}

impl Drop for ImageWriter {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
