//! Minimal WebM/EBML container framing.
//!
//! Platform encoder hosts emit fully containerized bytes; this module
//! provides the framing they need for a stream-shaped WebM file (an EBML
//! header, an unknown-size Segment, a Tracks element, and per-slice
//! Clusters) plus a read-side probe that walks the element tree and counts
//! the declared tracks. Only the elements the recorder produces are
//! understood; anything else is skipped by size.

use bytes::{BufMut, Bytes, BytesMut};

/// EBML element ids (stored with their marker bits).
pub const ID_EBML_HEADER: u32 = 0x1A45_DFA3;
pub const ID_DOC_TYPE: u32 = 0x4282;
pub const ID_SEGMENT: u32 = 0x1853_8067;
pub const ID_TRACKS: u32 = 0x1654_AE6B;
pub const ID_TRACK_ENTRY: u32 = 0xAE;
pub const ID_TRACK_NUMBER: u32 = 0xD7;
pub const ID_TRACK_TYPE: u32 = 0x83;
pub const ID_CLUSTER: u32 = 0x1F43_B675;
pub const ID_TIMECODE: u32 = 0xE7;
pub const ID_SIMPLE_BLOCK: u32 = 0xA3;

/// TrackType values.
pub const TRACK_TYPE_VIDEO: u8 = 1;
pub const TRACK_TYPE_AUDIO: u8 = 2;

/// Kind of a declared track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
}

impl TrackKind {
    fn track_type(self) -> u8 {
        match self {
            Self::Video => TRACK_TYPE_VIDEO,
            Self::Audio => TRACK_TYPE_AUDIO,
        }
    }
}

fn push_id(buf: &mut BytesMut, id: u32) {
    let length = match id {
        0..=0xFF => 1,
        0x100..=0xFFFF => 2,
        0x1_0000..=0xFF_FFFF => 3,
        _ => 4,
    };
    for i in (0..length).rev() {
        buf.put_u8((id >> (8 * i)) as u8);
    }
}

/// Append a data size as a minimal-length EBML vint.
fn push_size(buf: &mut BytesMut, value: u64) {
    let mut length = 1usize;
    while length < 8 {
        // The all-ones pattern is reserved for "unknown size".
        let max = (1u64 << (7 * length)) - 2;
        if value <= max {
            break;
        }
        length += 1;
    }

    let encoded = (1u64 << (7 * length)) | value;
    for i in (0..length).rev() {
        buf.put_u8((encoded >> (8 * i)) as u8);
    }
}

/// Append the 8-byte "unknown size" marker (used for the streamed Segment).
fn push_unknown_size(buf: &mut BytesMut) {
    buf.put_u8(0x01);
    buf.put_slice(&[0xFF; 7]);
}

fn push_element(buf: &mut BytesMut, id: u32, payload: &[u8]) {
    push_id(buf, id);
    push_size(buf, payload.len() as u64);
    buf.put_slice(payload);
}

fn push_uint_element(buf: &mut BytesMut, id: u32, value: u64) {
    let mut payload = [0u8; 8];
    let mut length = 1usize;
    while length < 8 && (value >> (8 * length)) != 0 {
        length += 1;
    }
    for i in 0..length {
        payload[length - 1 - i] = (value >> (8 * i)) as u8;
    }
    push_element(buf, id, &payload[..length]);
}

/// Build the container header: EBML header, unknown-size Segment opening,
/// and a Tracks element declaring the given tracks. Clusters are appended
/// after this.
pub fn build_header(tracks: &[TrackKind]) -> Bytes {
    let mut ebml = BytesMut::new();
    push_element(&mut ebml, ID_DOC_TYPE, b"webm");

    let mut track_entries = BytesMut::new();
    for (index, kind) in tracks.iter().enumerate() {
        let mut entry = BytesMut::new();
        push_uint_element(&mut entry, ID_TRACK_NUMBER, index as u64 + 1);
        push_uint_element(&mut entry, ID_TRACK_TYPE, kind.track_type() as u64);
        push_element(&mut track_entries, ID_TRACK_ENTRY, &entry);
    }

    let mut out = BytesMut::new();
    push_element(&mut out, ID_EBML_HEADER, &ebml);
    push_id(&mut out, ID_SEGMENT);
    push_unknown_size(&mut out);
    push_element(&mut out, ID_TRACKS, &track_entries);
    out.freeze()
}

/// Build one Cluster carrying a single block of encoded payload.
pub fn build_cluster(timecode_ms: u64, block: &[u8]) -> Bytes {
    let mut cluster = BytesMut::new();
    push_uint_element(&mut cluster, ID_TIMECODE, timecode_ms);
    push_element(&mut cluster, ID_SIMPLE_BLOCK, block);

    let mut out = BytesMut::new();
    push_element(&mut out, ID_CLUSTER, &cluster);
    out.freeze()
}

fn read_id(data: &[u8], pos: &mut usize) -> Option<u32> {
    let first = *data.get(*pos)?;
    if first == 0 {
        return None;
    }
    let length = first.leading_zeros() as usize + 1;
    if length > 4 || *pos + length > data.len() {
        return None;
    }

    let mut id = 0u32;
    for i in 0..length {
        id = (id << 8) | data[*pos + i] as u32;
    }
    *pos += length;
    Some(id)
}

/// Read a data size vint. Returns `(value, is_unknown)`.
fn read_size(data: &[u8], pos: &mut usize) -> Option<(u64, bool)> {
    let first = *data.get(*pos)?;
    if first == 0 {
        return None;
    }
    let length = first.leading_zeros() as usize + 1;
    if length > 8 || *pos + length > data.len() {
        return None;
    }

    let mut value = (first as u64) & ((1u64 << (8 - length)) - 1);
    for i in 1..length {
        value = (value << 8) | data[*pos + i] as u64;
    }
    *pos += length;

    let unknown = value == (1u64 << (7 * length)) - 1;
    Some((value, unknown))
}

fn bounded_end(pos: usize, size: u64, limit: usize) -> Option<usize> {
    let size: usize = size.try_into().ok()?;
    let end = pos.checked_add(size)?;
    (end <= limit).then_some(end)
}

/// Count the (video, audio) tracks declared by a container.
///
/// Returns `None` when the bytes are not a container this recorder
/// produces (missing EBML header, truncated elements, no Tracks).
pub fn count_tracks(data: &[u8]) -> Option<(u32, u32)> {
    let mut pos = 0usize;

    if read_id(data, &mut pos)? != ID_EBML_HEADER {
        return None;
    }
    let (header_size, unknown) = read_size(data, &mut pos)?;
    if unknown {
        return None;
    }
    pos = bounded_end(pos, header_size, data.len())?;

    if read_id(data, &mut pos)? != ID_SEGMENT {
        return None;
    }
    let (segment_size, unknown) = read_size(data, &mut pos)?;
    let segment_end = if unknown {
        data.len()
    } else {
        bounded_end(pos, segment_size, data.len())?
    };

    while pos < segment_end {
        let id = read_id(data, &mut pos)?;
        let (size, unknown) = read_size(data, &mut pos)?;
        if unknown {
            return None;
        }
        let element_end = bounded_end(pos, size, segment_end)?;

        if id == ID_TRACKS {
            return count_track_entries(data, pos, element_end);
        }
        pos = element_end;
    }

    None
}

fn count_track_entries(data: &[u8], mut pos: usize, end: usize) -> Option<(u32, u32)> {
    let mut video = 0u32;
    let mut audio = 0u32;

    while pos < end {
        let id = read_id(data, &mut pos)?;
        let (size, _) = read_size(data, &mut pos)?;
        let entry_end = bounded_end(pos, size, end)?;

        if id == ID_TRACK_ENTRY {
            let mut field_pos = pos;
            while field_pos < entry_end {
                let field_id = read_id(data, &mut field_pos)?;
                let (field_size, _) = read_size(data, &mut field_pos)?;
                let field_end = bounded_end(field_pos, field_size, entry_end)?;

                if field_id == ID_TRACK_TYPE && field_size >= 1 {
                    match data[field_pos] {
                        TRACK_TYPE_VIDEO => video += 1,
                        TRACK_TYPE_AUDIO => audio += 1,
                        _ => {}
                    }
                }
                field_pos = field_end;
            }
        }
        pos = entry_end;
    }

    Some((video, audio))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_vint_round_trips() {
        for value in [0u64, 1, 126, 127, 128, 16_000, 2_000_000, 0xFFFF_FFFF] {
            let mut buf = BytesMut::new();
            push_size(&mut buf, value);
            let mut pos = 0;
            let (decoded, unknown) = read_size(&buf, &mut pos).unwrap();
            assert_eq!(decoded, value);
            assert!(!unknown);
            assert_eq!(pos, buf.len());
        }
    }

    #[test]
    fn unknown_size_marker_is_recognized() {
        let mut buf = BytesMut::new();
        push_unknown_size(&mut buf);
        let mut pos = 0;
        let (_, unknown) = read_size(&buf, &mut pos).unwrap();
        assert!(unknown);
    }

    #[test]
    fn ids_round_trip() {
        for id in [ID_EBML_HEADER, ID_SEGMENT, ID_TRACKS, ID_TRACK_ENTRY, ID_TRACK_TYPE] {
            let mut buf = BytesMut::new();
            push_id(&mut buf, id);
            let mut pos = 0;
            assert_eq!(read_id(&buf, &mut pos), Some(id));
        }
    }

    #[test]
    fn counts_video_and_audio_tracks() {
        let mut data = BytesMut::new();
        data.extend_from_slice(&build_header(&[TrackKind::Video, TrackKind::Audio]));
        data.extend_from_slice(&build_cluster(0, &[0xDE, 0xAD]));
        data.extend_from_slice(&build_cluster(1000, &[0xBE, 0xEF]));

        assert_eq!(count_tracks(&data), Some((1, 1)));
    }

    #[test]
    fn counts_video_only() {
        let data = build_header(&[TrackKind::Video]);
        assert_eq!(count_tracks(&data), Some((1, 0)));
    }

    #[test]
    fn rejects_non_container_bytes() {
        assert_eq!(count_tracks(b""), None);
        assert_eq!(count_tracks(b"not a container"), None);
        // A truncated header fails cleanly.
        let full = build_header(&[TrackKind::Video]);
        assert_eq!(count_tracks(&full[..5]), None);
    }
}
