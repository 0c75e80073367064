//! The preview pump.
//!
//! While a source is armed (and performance mode is off) the engine holds
//! a live preview stream. The pump is a cooperative task owning the
//! stream: it drains frames, reports the achieved frame rate once per
//! second, checks its cancellation token every iteration, and stops on its
//! own when the stream's channel disconnects.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{RecvTimeoutError, Sender};
use tracing::debug;

use screenrec_capture::VideoStream;
use screenrec_ipc::{CancellationToken, SessionEvent};

pub(crate) struct PreviewPump {
    stream: VideoStream,
    token: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

impl PreviewPump {
    /// Take ownership of the preview stream and start draining it.
    pub fn start(stream: VideoStream, events: Sender<SessionEvent>) -> std::io::Result<Self> {
        let token = CancellationToken::new();
        let frames = stream.frames();

        let thread = thread::Builder::new().name("preview".into()).spawn({
            let token = token.clone();
            move || {
                let mut window_start = Instant::now();
                let mut frames_seen = 0u32;

                while !token.is_cancelled() {
                    match frames.recv_timeout(Duration::from_millis(50)) {
                        Ok(_) => frames_seen += 1,
                        Err(RecvTimeoutError::Timeout) => {}
                        // Owning stream is gone; stop rescheduling.
                        Err(RecvTimeoutError::Disconnected) => break,
                    }

                    if window_start.elapsed() >= Duration::from_secs(1) {
                        let _ = events.try_send(SessionEvent::PreviewFps { fps: frames_seen });
                        frames_seen = 0;
                        window_start = Instant::now();
                    }
                }
                debug!("preview pump exiting");
            }
        })?;

        Ok(Self {
            stream,
            token,
            thread: Some(thread),
        })
    }

    /// Cancel the pump, wait for it, and close the preview stream.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.token.cancel();
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
        self.stream.close();
    }
}

impl Drop for PreviewPump {
    fn drop(&mut self) {
        self.shutdown();
    }
}
