//! Rotation-signal resolution and corrective-transform planning.
//!
//! A downloaded asset can carry up to three independent rotation hints:
//! a stream-level `rotate` tag, a container-level `rotate` tag, and a
//! display-matrix side-data rotation. Any non-zero signal triggers
//! correction. When signals disagree, precedence is display matrix, then
//! stream tag, then format tag.

use serde::{Deserialize, Serialize};

use crate::probe::VideoInfo;

/// Rotation hints observed independently in container metadata.
/// Each is either absent or a signed degree value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationSignals {
    /// Stream-level `rotate` tag
    pub stream_tag: Option<i32>,
    /// Container/format-level `rotate` tag
    pub format_tag: Option<i32>,
    /// Display-matrix side-data rotation
    pub display_matrix: Option<i32>,
}

impl RotationSignals {
    /// Resolve the effective degree value, encoding the stated precedence.
    /// Zero-valued signals count as absent.
    pub fn effective_degrees(&self) -> Option<i32> {
        [self.display_matrix, self.stream_tag, self.format_tag]
            .into_iter()
            .flatten()
            .find(|&d| d % 360 != 0)
    }

    /// True when every signal is absent or zero.
    pub fn is_upright(&self) -> bool {
        self.effective_degrees().is_none()
    }
}

/// Discrete corrective transform applied while trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationTransform {
    /// No correction needed
    #[default]
    None,
    /// Rotate 90 degrees clockwise
    Clockwise90,
    /// Rotate 90 degrees counter-clockwise
    CounterClockwise90,
    /// Rotate 180 degrees
    Rotate180,
}

impl RotationTransform {
    /// Map a resolved degree value to its corrective transform.
    ///
    /// 90 and 270/−90 are inverses of each other; 180 is a double transform;
    /// anything else (including absent) is identity.
    pub fn from_degrees(degrees: Option<i32>) -> Self {
        match degrees.map(|d| d.rem_euclid(360)) {
            Some(90) => RotationTransform::Clockwise90,
            Some(270) => RotationTransform::CounterClockwise90,
            Some(180) => RotationTransform::Rotate180,
            _ => RotationTransform::None,
        }
    }

    /// FFmpeg video filter implementing the transform, if any.
    pub fn filter(&self) -> Option<&'static str> {
        match self {
            RotationTransform::None => None,
            RotationTransform::Clockwise90 => Some("transpose=1"),
            RotationTransform::CounterClockwise90 => Some("transpose=2"),
            RotationTransform::Rotate180 => Some("transpose=1,transpose=1"),
        }
    }

    /// True when no correction is required.
    pub fn is_identity(&self) -> bool {
        matches!(self, RotationTransform::None)
    }
}

/// The analyzer's verdict for one asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RotationPlan {
    /// Corrective transform (possibly identity)
    pub transform: RotationTransform,
    /// Advisory: asset looks mobile-recorded, stabilization may help.
    /// Never overrides the rotation signals above.
    pub stabilize: bool,
}

/// Handler/encoder markers that indicate a mobile recording.
const MOBILE_MARKERS: &[&str] = &["iphone", "ipad", "android", "core media", "samsung", "dji"];

/// Inspect probed metadata and produce the rotation plan.
pub fn analyze_rotation(info: &VideoInfo) -> RotationPlan {
    let transform = RotationTransform::from_degrees(info.rotation.effective_degrees());

    RotationPlan {
        transform,
        stabilize: looks_mobile_recorded(info),
    }
}

/// Heuristic: portrait dimensions plus a known mobile handler/encoder tag.
fn looks_mobile_recorded(info: &VideoInfo) -> bool {
    if info.height <= info.width {
        return false;
    }

    let mut haystack = String::new();
    if let Some(ref h) = info.handler_name {
        haystack.push_str(&h.to_ascii_lowercase());
    }
    haystack.push(' ');
    if let Some(ref e) = info.encoder {
        haystack.push_str(&e.to_ascii_lowercase());
    }

    MOBILE_MARKERS.iter().any(|m| haystack.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info_with(signals: RotationSignals) -> VideoInfo {
        VideoInfo {
            duration: 60.0,
            width: 1920,
            height: 1080,
            codec: "h264".to_string(),
            size: 0,
            rotation: signals,
            handler_name: None,
            encoder: None,
        }
    }

    #[test]
    fn identity_iff_all_signals_absent_or_zero() {
        assert!(RotationSignals::default().is_upright());
        assert!(RotationSignals {
            stream_tag: Some(0),
            format_tag: Some(0),
            display_matrix: Some(0),
        }
        .is_upright());
        assert!(!RotationSignals {
            stream_tag: None,
            format_tag: Some(180),
            display_matrix: None,
        }
        .is_upright());
    }

    #[test]
    fn display_matrix_takes_precedence() {
        let signals = RotationSignals {
            stream_tag: Some(180),
            format_tag: Some(90),
            display_matrix: Some(-90),
        };
        assert_eq!(signals.effective_degrees(), Some(-90));
        assert_eq!(
            RotationTransform::from_degrees(signals.effective_degrees()),
            RotationTransform::CounterClockwise90
        );
    }

    #[test]
    fn stream_tag_beats_format_tag() {
        let signals = RotationSignals {
            stream_tag: Some(90),
            format_tag: Some(180),
            display_matrix: None,
        };
        assert_eq!(signals.effective_degrees(), Some(90));
    }

    #[test]
    fn zero_display_matrix_defers_to_tags() {
        let signals = RotationSignals {
            stream_tag: Some(90),
            format_tag: None,
            display_matrix: Some(0),
        };
        assert_eq!(signals.effective_degrees(), Some(90));
    }

    #[test]
    fn degree_table() {
        use RotationTransform::*;
        assert_eq!(RotationTransform::from_degrees(Some(90)), Clockwise90);
        assert_eq!(RotationTransform::from_degrees(Some(-270)), Clockwise90);
        assert_eq!(RotationTransform::from_degrees(Some(270)), CounterClockwise90);
        assert_eq!(RotationTransform::from_degrees(Some(-90)), CounterClockwise90);
        assert_eq!(RotationTransform::from_degrees(Some(180)), Rotate180);
        assert_eq!(RotationTransform::from_degrees(Some(-180)), Rotate180);
        assert_eq!(RotationTransform::from_degrees(Some(45)), None);
        assert_eq!(RotationTransform::from_degrees(Option::None), None);
    }

    #[test]
    fn display_matrix_only_triggers_correction() {
        let info = info_with(RotationSignals {
            stream_tag: None,
            format_tag: None,
            display_matrix: Some(90),
        });
        let plan = analyze_rotation(&info);
        assert_eq!(plan.transform, RotationTransform::Clockwise90);
        assert_eq!(plan.transform.filter(), Some("transpose=1"));
    }

    #[test]
    fn mobile_heuristic_requires_portrait_and_marker() {
        let mut info = info_with(RotationSignals::default());
        info.width = 1080;
        info.height = 1920;
        info.handler_name = Some("Core Media Video".to_string());
        assert!(analyze_rotation(&info).stabilize);

        // Landscape never matches, marker or not
        info.width = 1920;
        info.height = 1080;
        assert!(!analyze_rotation(&info).stabilize);

        // Portrait without a marker does not match
        info.width = 1080;
        info.height = 1920;
        info.handler_name = Some("VideoHandler".to_string());
        assert!(!analyze_rotation(&info).stabilize);
    }

    #[test]
    fn stabilize_does_not_affect_transform() {
        let mut info = info_with(RotationSignals {
            stream_tag: None,
            format_tag: None,
            display_matrix: Some(90),
        });
        info.width = 1080;
        info.height = 1920;
        info.handler_name = Some("iPhone".to_string());

        let plan = analyze_rotation(&info);
        assert!(plan.stabilize);
        assert_eq!(plan.transform, RotationTransform::Clockwise90);
    }
}
