//! Audio input device listing.

use screenrec_ipc::AudioDeviceInfo;
use tracing::{debug, instrument};

use crate::backend::{AudioBackend, MicrophoneConstraints};
use crate::AudioResult;

/// Enumerate audio input devices with populated labels.
///
/// Device labels are unavailable before a microphone permission grant on
/// most platforms, so this opens a probe stream and releases it immediately
/// before enumerating.
#[instrument(name = "list_audio_devices", skip(backend))]
pub fn list_audio_devices(backend: &dyn AudioBackend) -> AudioResult<Vec<AudioDeviceInfo>> {
    let mut probe = backend.open_microphone(None, &MicrophoneConstraints::default())?;
    probe.close();

    let devices = backend.enumerate_inputs()?;
    debug!(count = devices.len(), "enumerated audio input devices");
    Ok(devices)
}

/// Resolve a persisted device id against the current enumeration.
///
/// The persisted selection is a weak reference: if the device has been
/// unplugged since it was saved, `None` is returned and the caller falls
/// back to the platform default.
pub fn resolve_device<'a>(
    devices: &'a [AudioDeviceInfo],
    device_id: Option<&str>,
) -> Option<&'a AudioDeviceInfo> {
    let wanted = device_id?;
    devices.iter().find(|device| device.id == wanted)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::stream::{AudioStream, StreamHandle};
    use crate::AudioError;

    use super::*;

    fn device(id: &str) -> AudioDeviceInfo {
        AudioDeviceInfo {
            id: id.to_string(),
            label: format!("Microphone {id}"),
            is_default: false,
        }
    }

    struct CountingStop(Arc<AtomicUsize>);

    impl StreamHandle for CountingStop {
        fn stop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct ProbeBackend {
        opened: AtomicUsize,
        closed: Arc<AtomicUsize>,
        deny: bool,
    }

    impl AudioBackend for ProbeBackend {
        fn enumerate_inputs(&self) -> crate::AudioResult<Vec<AudioDeviceInfo>> {
            // Labels are only available once the probe has run.
            assert_eq!(self.closed.load(Ordering::SeqCst), 1);
            Ok(vec![device("a")])
        }

        fn open_microphone(
            &self,
            _device_id: Option<&str>,
            _constraints: &crate::MicrophoneConstraints,
        ) -> crate::AudioResult<AudioStream> {
            if self.deny {
                return Err(AudioError::PermissionDenied);
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            let (_tx, rx) = crossbeam_channel::bounded(1);
            Ok(AudioStream::new(
                rx,
                None,
                Box::new(CountingStop(Arc::clone(&self.closed))),
            ))
        }

        fn open_loopback(&self, _source_id: &str) -> crate::AudioResult<Option<AudioStream>> {
            Ok(None)
        }
    }

    #[test]
    fn listing_probes_permission_then_releases() {
        let backend = ProbeBackend {
            opened: AtomicUsize::new(0),
            closed: Arc::new(AtomicUsize::new(0)),
            deny: false,
        };
        let devices = list_audio_devices(&backend).unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(backend.opened.load(Ordering::SeqCst), 1);
        assert_eq!(backend.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn denied_probe_propagates() {
        let backend = ProbeBackend {
            opened: AtomicUsize::new(0),
            closed: Arc::new(AtomicUsize::new(0)),
            deny: true,
        };
        assert!(matches!(
            list_audio_devices(&backend),
            Err(AudioError::PermissionDenied)
        ));
    }

    #[test]
    fn resolves_present_device() {
        let devices = vec![device("a"), device("b")];
        let found = resolve_device(&devices, Some("b"));
        assert_eq!(found.map(|d| d.id.as_str()), Some("b"));
    }

    #[test]
    fn unplugged_device_falls_back_to_default() {
        let devices = vec![device("a")];
        assert!(resolve_device(&devices, Some("gone")).is_none());
        assert!(resolve_device(&devices, None).is_none());
    }
}
