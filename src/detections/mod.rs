//! Detection data model
//!
//! Value types produced by the external detection pipeline, one
//! [`DetectionList`] per processed frame. The broadcast core treats these as
//! read-only snapshots; dimensions and coordinates are passed through to
//! serialization unchecked.

/// Bounding rectangle of a detected object, in image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// A single detected object
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Classification id returned by the model
    pub class_id: i32,

    /// Class name associated with the id; empty when the id is unresolved
    pub class_name: String,

    /// Bounding rectangle
    pub bounding_box: BoundingBox,

    /// Classification confidence score
    pub confidence: f32,
}

impl std::fmt::Display for Detection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = if self.class_name.is_empty() {
            "?"
        } else {
            self.class_name.as_str()
        };
        write!(
            f,
            "{} (id={}, conf={:.2}) at ({}, {}) {}x{}",
            name,
            self.class_id,
            self.confidence,
            self.bounding_box.x,
            self.bounding_box.y,
            self.bounding_box.width,
            self.bounding_box.height,
        )
    }
}

/// Capture and processing metadata attached to every snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetaInfo {
    /// Capture timestamp, milliseconds since the Unix epoch
    pub timestamp_ms: u64,

    /// Source image dimensions
    pub image_width: u32,
    pub image_height: u32,

    /// Dimensions of the crop handed to the model
    pub crop_width: u32,
    pub crop_height: u32,

    /// Inference time for this frame, milliseconds
    pub elapsed_ms: u32,
}

/// One snapshot of detection results plus metadata
///
/// Produced exactly once per pipeline frame. Value semantics only; the
/// broadcast core never mutates a snapshot after receiving it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetectionList {
    pub meta: MetaInfo,
    pub detections: Vec<Detection>,
}

impl DetectionList {
    /// Create an empty snapshot with the given metadata
    pub fn new(meta: MetaInfo) -> Self {
        Self {
            meta,
            detections: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_display() {
        let detection = Detection {
            class_id: 16,
            class_name: "dog".into(),
            bounding_box: BoundingBox::new(10, 20, 64, 48),
            confidence: 0.875,
        };

        assert_eq!(
            detection.to_string(),
            "dog (id=16, conf=0.88) at (10, 20) 64x48"
        );
    }

    #[test]
    fn test_detection_display_unresolved_name() {
        let detection = Detection {
            class_id: 3,
            class_name: String::new(),
            bounding_box: BoundingBox::default(),
            confidence: 0.5,
        };

        assert!(detection.to_string().starts_with("? (id=3"));
    }

    #[test]
    fn test_empty_list() {
        let list = DetectionList::new(MetaInfo::default());
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
    }
}
