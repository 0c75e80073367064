//! The encode worker shared by both recorder backends.
//!
//! Consumes the combined stream, feeds the platform encoder, and cuts an
//! output chunk at each time-slice boundary of media time. Cutting on media
//! time rather than wall clock keeps the chunk sequence deterministic and
//! in recording order even when delivery is asynchronous.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender};
use tracing::{debug, trace, warn};

use crate::{CombinedStream, EncodedChunk, EncoderError, EncoderResult, MediaEncoder};

pub(crate) struct Worker {
    thread: Option<JoinHandle<EncoderResult<Vec<EncodedChunk>>>>,
    should_stop: Arc<AtomicBool>,
}

impl Worker {
    /// Spawn the encode worker.
    pub fn spawn(
        encoder: Box<dyn MediaEncoder>,
        stream: CombinedStream,
        timeslice_ms: u64,
        delivery: Sender<EncodedChunk>,
    ) -> EncoderResult<Self> {
        let should_stop = Arc::new(AtomicBool::new(false));

        let thread = thread::Builder::new()
            .name("recorder".into())
            .spawn({
                let should_stop = Arc::clone(&should_stop);
                move || encode_loop(encoder, stream, timeslice_ms, delivery, should_stop)
            })
            .map_err(|e| EncoderError::Backend(e.to_string()))?;

        Ok(Self {
            thread: Some(thread),
            should_stop,
        })
    }

    /// Stop the worker and return the complete, ordered chunk sequence.
    pub fn finish(&mut self) -> EncoderResult<Vec<EncodedChunk>> {
        let Some(handle) = self.thread.take() else {
            return Err(EncoderError::NotStarted);
        };

        self.should_stop.store(true, Ordering::SeqCst);
        handle
            .join()
            .map_err(|_| EncoderError::Backend("recorder worker panicked".into()))?
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.should_stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

fn encode_loop(
    mut encoder: Box<dyn MediaEncoder>,
    stream: CombinedStream,
    timeslice_ms: u64,
    delivery: Sender<EncodedChunk>,
    should_stop: Arc<AtomicBool>,
) -> EncoderResult<Vec<EncodedChunk>> {
    debug!(timeslice_ms, "encode worker started");

    let timeslice_100ns = timeslice_ms.saturating_mul(10_000);
    let mut chunks: Vec<EncodedChunk> = Vec::new();
    let mut sequence = 0u64;
    let mut last_cut_pts = 0u64;
    let mut latest_pts = 0u64;

    loop {
        let stopping = should_stop.load(Ordering::SeqCst);

        if let Some(audio) = stream.audio.as_ref() {
            while let Ok(chunk) = audio.try_recv() {
                encoder.write_audio(&chunk)?;
            }
        }

        if stopping {
            // Drain frames the capture already produced before flushing,
            // still cutting at every boundary crossed.
            while let Ok(frame) = stream.video.try_recv() {
                latest_pts = latest_pts.max(frame.timestamp.pts_100ns);
                encoder.write_video(&frame)?;
                cut_ready_slices(
                    &mut *encoder,
                    latest_pts,
                    &mut last_cut_pts,
                    timeslice_100ns,
                    &mut sequence,
                    &delivery,
                    &mut chunks,
                );
            }
            break;
        }

        match stream.video.recv_timeout(Duration::from_millis(10)) {
            Ok(frame) => {
                latest_pts = latest_pts.max(frame.timestamp.pts_100ns);
                encoder.write_video(&frame)?;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                warn!("video stream disconnected");
                break;
            }
        }

        // The slice clock follows the video track's media time, so chunk
        // boundaries do not depend on arrival timing.
        cut_ready_slices(
            &mut *encoder,
            latest_pts,
            &mut last_cut_pts,
            timeslice_100ns,
            &mut sequence,
            &delivery,
            &mut chunks,
        );
    }

    // Final flush: remaining container bytes become the tail chunk.
    let tail = encoder.finish()?;
    if !tail.is_empty() {
        let chunk = EncodedChunk {
            data: tail,
            sequence,
            pts_100ns: latest_pts,
        };
        let _ = delivery.try_send(chunk.clone());
        chunks.push(chunk);
    }

    // Recording order, independent of delivery/arrival order.
    chunks.sort_by_key(|chunk| chunk.sequence);

    debug!(chunks = chunks.len(), "encode worker exiting");
    Ok(chunks)
}

fn cut_ready_slices(
    encoder: &mut dyn MediaEncoder,
    latest_pts: u64,
    last_cut_pts: &mut u64,
    timeslice_100ns: u64,
    sequence: &mut u64,
    delivery: &Sender<EncodedChunk>,
    chunks: &mut Vec<EncodedChunk>,
) {
    while latest_pts >= *last_cut_pts + timeslice_100ns {
        *last_cut_pts += timeslice_100ns;

        let data = encoder.take_output();
        if data.is_empty() {
            continue;
        }

        let chunk = EncodedChunk {
            data,
            sequence: *sequence,
            pts_100ns: *last_cut_pts,
        };
        *sequence += 1;

        if delivery.try_send(chunk.clone()).is_err() {
            trace!("chunk delivery channel full");
        }
        chunks.push(chunk);
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use screenrec_capture::{CaptureTimestamp, CapturedFrame};

    use crate::testsupport::FakeEncoder;
    use crate::CHUNK_CHANNEL_CAPACITY;

    use super::*;

    fn frame(pts_ms: u64, sequence: u64) -> CapturedFrame {
        CapturedFrame::new(
            Bytes::from_static(&[1, 2, 3, 4]),
            2,
            1,
            CaptureTimestamp::from_pts_100ns(pts_ms * 10_000),
            sequence,
        )
    }

    #[test]
    fn cuts_one_chunk_per_timeslice_of_media_time() {
        let (video_tx, video_rx) = crossbeam_channel::bounded(64);
        let (delivery_tx, delivery_rx) = crossbeam_channel::bounded(CHUNK_CHANNEL_CAPACITY);

        let stream = CombinedStream {
            video: video_rx,
            audio: None,
        };
        let mut worker =
            Worker::spawn(Box::new(FakeEncoder::default()), stream, 1000, delivery_tx).unwrap();

        // Two seconds of media time at 10 fps.
        for (i, pts_ms) in (0..=2000).step_by(100).enumerate() {
            video_tx.send(frame(pts_ms, i as u64)).unwrap();
        }

        // Let the worker drain the queue before stopping.
        std::thread::sleep(Duration::from_millis(300));
        let chunks = worker.finish().unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].sequence, 0);
        assert_eq!(chunks[1].sequence, 1);
        assert!(chunks.iter().all(|c| !c.data.is_empty()));

        // Progressive delivery saw the same chunks.
        assert_eq!(delivery_rx.try_iter().count(), 2);
    }

    #[test]
    fn short_recording_flushes_a_tail_chunk() {
        let (video_tx, video_rx) = crossbeam_channel::bounded(16);
        let (delivery_tx, _delivery_rx) = crossbeam_channel::bounded(CHUNK_CHANNEL_CAPACITY);

        let stream = CombinedStream {
            video: video_rx,
            audio: None,
        };
        let mut worker =
            Worker::spawn(Box::new(FakeEncoder::default()), stream, 1000, delivery_tx).unwrap();

        // Half a second of media time: no full slice, only the final flush.
        for (i, pts_ms) in (0..500).step_by(100).enumerate() {
            video_tx.send(frame(pts_ms, i as u64)).unwrap();
        }
        std::thread::sleep(Duration::from_millis(200));
        let chunks = worker.finish().unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].sequence, 0);
    }

    #[test]
    fn finish_twice_reports_not_started() {
        let (_video_tx, video_rx) = crossbeam_channel::bounded::<CapturedFrame>(1);
        let (delivery_tx, _delivery_rx) = crossbeam_channel::bounded(CHUNK_CHANNEL_CAPACITY);

        let stream = CombinedStream {
            video: video_rx,
            audio: None,
        };
        let mut worker =
            Worker::spawn(Box::new(FakeEncoder::default()), stream, 1000, delivery_tx).unwrap();
        worker.finish().unwrap();
        assert!(matches!(worker.finish(), Err(EncoderError::NotStarted)));
    }
}
