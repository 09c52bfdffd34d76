//! Detection list wire codec
//!
//! Serializes a [`DetectionList`] into the frame body and back. All
//! multi-byte fields are little-endian, fixed width:
//!
//! ```text
//! timestamp_ms:u64  image_width:u32  image_height:u32
//! crop_width:u32    crop_height:u32  elapsed_ms:u32
//! count:u16
//! count × detection:
//!   class_id:i32  name_len:u16  name:utf8[name_len]
//!   x:i32  y:i32  width:i32  height:i32  confidence:f32
//! ```
//!
//! Encoding never fails; oversize bodies are the framer's concern. Decoding
//! rejects truncated input and class names that are not valid UTF-8.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::detections::{BoundingBox, Detection, DetectionList, MetaInfo};

/// Fixed-size prefix: metadata fields plus the detection count
const META_LENGTH: usize = 8 + 4 * 5 + 2;

/// Fixed-size part of one encoded detection (class id, name length,
/// rectangle, confidence)
const DETECTION_FIXED_LENGTH: usize = 4 + 2 + 4 * 4 + 4;

/// Error type for decoding a detection list body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Input ended before the encoded structure did
    Truncated,
    /// A class name was not valid UTF-8
    InvalidClassName,
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::Truncated => write!(f, "Truncated detection list"),
            CodecError::InvalidClassName => write!(f, "Class name is not valid UTF-8"),
        }
    }
}

impl std::error::Error for CodecError {}

/// Serialize a detection list into a frame body
pub fn encode_detection_list(list: &DetectionList) -> Bytes {
    let name_bytes: usize = list.detections.iter().map(|d| d.class_name.len()).sum();
    let mut buf = BytesMut::with_capacity(
        META_LENGTH + list.detections.len() * DETECTION_FIXED_LENGTH + name_bytes,
    );

    buf.put_u64_le(list.meta.timestamp_ms);
    buf.put_u32_le(list.meta.image_width);
    buf.put_u32_le(list.meta.image_height);
    buf.put_u32_le(list.meta.crop_width);
    buf.put_u32_le(list.meta.crop_height);
    buf.put_u32_le(list.meta.elapsed_ms);
    buf.put_u16_le(list.detections.len() as u16);

    for detection in &list.detections {
        buf.put_i32_le(detection.class_id);
        buf.put_u16_le(detection.class_name.len() as u16);
        buf.put_slice(detection.class_name.as_bytes());
        buf.put_i32_le(detection.bounding_box.x);
        buf.put_i32_le(detection.bounding_box.y);
        buf.put_i32_le(detection.bounding_box.width);
        buf.put_i32_le(detection.bounding_box.height);
        buf.put_f32_le(detection.confidence);
    }

    buf.freeze()
}

/// Deserialize a frame body back into a detection list
///
/// Intended for subscriber clients; the server itself only encodes.
pub fn decode_detection_list(buf: &mut impl Buf) -> Result<DetectionList, CodecError> {
    if buf.remaining() < META_LENGTH {
        return Err(CodecError::Truncated);
    }

    let meta = MetaInfo {
        timestamp_ms: buf.get_u64_le(),
        image_width: buf.get_u32_le(),
        image_height: buf.get_u32_le(),
        crop_width: buf.get_u32_le(),
        crop_height: buf.get_u32_le(),
        elapsed_ms: buf.get_u32_le(),
    };
    let count = buf.get_u16_le() as usize;

    let mut detections = Vec::with_capacity(count);
    for _ in 0..count {
        if buf.remaining() < 4 + 2 {
            return Err(CodecError::Truncated);
        }
        let class_id = buf.get_i32_le();
        let name_len = buf.get_u16_le() as usize;

        if buf.remaining() < name_len + 4 * 4 + 4 {
            return Err(CodecError::Truncated);
        }
        let name = buf.copy_to_bytes(name_len);
        let class_name =
            String::from_utf8(name.to_vec()).map_err(|_| CodecError::InvalidClassName)?;

        let bounding_box = BoundingBox {
            x: buf.get_i32_le(),
            y: buf.get_i32_le(),
            width: buf.get_i32_le(),
            height: buf.get_i32_le(),
        };
        let confidence = buf.get_f32_le();

        detections.push(Detection {
            class_id,
            class_name,
            bounding_box,
            confidence,
        });
    }

    Ok(DetectionList { meta, detections })
}
