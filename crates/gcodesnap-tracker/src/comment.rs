//! Slicer comment classification
//!
//! Slicers annotate the G-code they emit with comments naming the feature
//! being printed. The classifier follows those comments as a running state so
//! every position can be stamped with the feature it belongs to. The result
//! is advisory only and never influences coordinate math.

use gcodesnap_core::logging::POSITION_TARGET;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Print feature named by slicer comments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureType {
    Unknown,
    Bridge,
    OuterPerimeter,
    UnknownPerimeter,
    InnerPerimeter,
    Skirt,
    GapFill,
    SolidInfill,
    OozeShield,
    Infill,
    PrimePillar,
    Support,
}

impl Default for FeatureType {
    fn default() -> Self {
        Self::Unknown
    }
}

impl std::fmt::Display for FeatureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Bridge => write!(f, "bridge"),
            Self::OuterPerimeter => write!(f, "outer perimeter"),
            Self::UnknownPerimeter => write!(f, "perimeter"),
            Self::InnerPerimeter => write!(f, "inner perimeter"),
            Self::Skirt => write!(f, "skirt"),
            Self::GapFill => write!(f, "gap fill"),
            Self::SolidInfill => write!(f, "solid infill"),
            Self::OozeShield => write!(f, "ooze shield"),
            Self::Infill => write!(f, "infill"),
            Self::PrimePillar => write!(f, "prime pillar"),
            Self::Support => write!(f, "support"),
        }
    }
}

/// Slicer whose comment grammar is being followed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlicerFamily {
    Unknown,
    Cura,
    /// PrusaSlicer, Slic3r and SuperSlicer
    PrusaSlicer,
    Simplify3d,
}

impl Default for SlicerFamily {
    fn default() -> Self {
        Self::Unknown
    }
}

impl SlicerFamily {
    /// Identify the slicer from a header comment
    pub fn detect(comment: &str) -> Option<Self> {
        let lower = comment.to_ascii_lowercase();
        if lower.contains("cura") || comment.starts_with("FLAVOR:") {
            Some(Self::Cura)
        } else if lower.contains("prusaslicer")
            || lower.contains("slic3r")
            || lower.contains("superslicer")
        {
            Some(Self::PrusaSlicer)
        } else if lower.contains("simplify3d") {
            Some(Self::Simplify3d)
        } else {
            None
        }
    }
}

/// Maps trailing comments to feature tags.
///
/// Implementations keep whatever running state their grammar needs; the
/// tracker consults them once per line that carries a comment.
pub trait CommentClassifier: Send {
    /// Feed one comment. Returns the new feature when the comment names one.
    fn classify(&mut self, comment: &str) -> Option<FeatureType>;

    /// Feature in effect after the comments seen so far
    fn current_feature(&self) -> FeatureType;

    /// Forget all running state
    fn reset(&mut self);
}

/// Boxed classifier as held by the tracker
pub type ClassifierHandle = Box<dyn CommentClassifier>;

/// Classifier for the Cura, PrusaSlicer and Simplify3D comment grammars
#[derive(Debug, Clone, Default)]
pub struct SlicerCommentClassifier {
    family: SlicerFamily,
    feature: FeatureType,
}

impl SlicerCommentClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn family(&self) -> SlicerFamily {
        self.family
    }

    fn layer_marker() -> &'static Regex {
        static LAYER_MARKER: OnceLock<Regex> = OnceLock::new();
        LAYER_MARKER.get_or_init(|| {
            Regex::new(r"(?i)^(layer:-?\d+|layer_change|layer \d+, z = -?[\d.]+)$")
                .expect("invalid regex pattern")
        })
    }

    /// `TYPE:` values from Cura and PrusaSlicer
    fn type_value(&mut self, value: &str) -> FeatureType {
        let cura = match value {
            "WALL-OUTER" => Some(FeatureType::OuterPerimeter),
            "WALL-INNER" => Some(FeatureType::InnerPerimeter),
            "SKIN" => Some(FeatureType::SolidInfill),
            "FILL" => Some(FeatureType::Infill),
            "SKIRT" => Some(FeatureType::Skirt),
            "SUPPORT" | "SUPPORT-INTERFACE" => Some(FeatureType::Support),
            "PRIME-TOWER" => Some(FeatureType::PrimePillar),
            _ => None,
        };
        if let Some(feature) = cura {
            self.adopt(SlicerFamily::Cura);
            return feature;
        }

        let prusa = match value.to_ascii_lowercase().as_str() {
            "external perimeter" => Some(FeatureType::OuterPerimeter),
            "perimeter" => Some(FeatureType::InnerPerimeter),
            "overhang perimeter" => Some(FeatureType::UnknownPerimeter),
            "internal infill" => Some(FeatureType::Infill),
            "solid infill" | "top solid infill" => Some(FeatureType::SolidInfill),
            "bridge infill" | "internal bridge infill" => Some(FeatureType::Bridge),
            "gap fill" => Some(FeatureType::GapFill),
            "skirt" | "skirt/brim" => Some(FeatureType::Skirt),
            "support material" | "support material interface" => Some(FeatureType::Support),
            "wipe tower" => Some(FeatureType::PrimePillar),
            _ => None,
        };
        if let Some(feature) = prusa {
            self.adopt(SlicerFamily::PrusaSlicer);
            return feature;
        }

        FeatureType::Unknown
    }

    fn simplify3d_section(comment: &str) -> Option<FeatureType> {
        match comment {
            "outer perimeter" => Some(FeatureType::OuterPerimeter),
            "inner perimeter" => Some(FeatureType::InnerPerimeter),
            "infill" => Some(FeatureType::Infill),
            "solid layer" => Some(FeatureType::SolidInfill),
            "gap fill" => Some(FeatureType::GapFill),
            "bridge" => Some(FeatureType::Bridge),
            "skirt" => Some(FeatureType::Skirt),
            "support" | "dense support" => Some(FeatureType::Support),
            "ooze shield" => Some(FeatureType::OozeShield),
            "prime pillar" => Some(FeatureType::PrimePillar),
            _ => None,
        }
    }

    /// Slic3r verbose mode comments trailing move commands
    fn slic3r_move_comment(comment: &str) -> Option<FeatureType> {
        match comment {
            "perimeter" | "move to first perimeter point" => Some(FeatureType::UnknownPerimeter),
            "infill" | "move to first infill point" => Some(FeatureType::Infill),
            "skirt" | "move to first skirt point" => Some(FeatureType::Skirt),
            "support material" | "move to first support material point" => {
                Some(FeatureType::Support)
            }
            _ => None,
        }
    }

    fn adopt(&mut self, family: SlicerFamily) {
        if self.family == SlicerFamily::Unknown {
            tracing::debug!(target: POSITION_TARGET, ?family, "slicer comment grammar detected");
            self.family = family;
        }
    }
}

impl CommentClassifier for SlicerCommentClassifier {
    fn classify(&mut self, comment: &str) -> Option<FeatureType> {
        let comment = comment.trim();
        if comment.is_empty() {
            return None;
        }

        if self.family == SlicerFamily::Unknown {
            if let Some(family) = SlicerFamily::detect(comment) {
                self.adopt(family);
                return None;
            }
        }

        if Self::layer_marker().is_match(comment) {
            self.feature = FeatureType::Unknown;
            return Some(FeatureType::Unknown);
        }

        let feature = if let Some(value) = comment.strip_prefix("TYPE:") {
            Some(self.type_value(value.trim()))
        } else {
            match self.family {
                SlicerFamily::Simplify3d | SlicerFamily::Unknown => {
                    Self::simplify3d_section(comment)
                }
                SlicerFamily::PrusaSlicer => Self::slic3r_move_comment(comment),
                SlicerFamily::Cura => None,
            }
        };

        if let Some(feature) = feature {
            self.feature = feature;
        }
        feature
    }

    fn current_feature(&self) -> FeatureType {
        self.feature
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cura_type_comments() {
        let mut classifier = SlicerCommentClassifier::new();
        assert_eq!(classifier.classify("FLAVOR:Marlin"), None);
        assert_eq!(classifier.family(), SlicerFamily::Cura);

        assert_eq!(
            classifier.classify("TYPE:WALL-OUTER"),
            Some(FeatureType::OuterPerimeter)
        );
        assert_eq!(classifier.current_feature(), FeatureType::OuterPerimeter);
        assert_eq!(classifier.classify("TYPE:FILL"), Some(FeatureType::Infill));
        assert_eq!(classifier.classify("LAYER:4"), Some(FeatureType::Unknown));
        assert_eq!(classifier.current_feature(), FeatureType::Unknown);
    }

    #[test]
    fn test_prusaslicer_type_comments() {
        let mut classifier = SlicerCommentClassifier::new();
        assert_eq!(
            classifier.classify("TYPE:External perimeter"),
            Some(FeatureType::OuterPerimeter)
        );
        assert_eq!(classifier.family(), SlicerFamily::PrusaSlicer);
        assert_eq!(
            classifier.classify("TYPE:Bridge infill"),
            Some(FeatureType::Bridge)
        );
        assert_eq!(classifier.classify("perimeter"), Some(FeatureType::UnknownPerimeter));
        assert_eq!(classifier.classify("TYPE:Custom"), Some(FeatureType::Unknown));
    }

    #[test]
    fn test_simplify3d_sections() {
        let mut classifier = SlicerCommentClassifier::new();
        assert_eq!(classifier.classify("G-Code generated by Simplify3D(R) Version 4.1.2"), None);
        assert_eq!(classifier.family(), SlicerFamily::Simplify3d);
        assert_eq!(classifier.classify("outer perimeter"), Some(FeatureType::OuterPerimeter));
        assert_eq!(classifier.classify("ooze shield"), Some(FeatureType::OozeShield));
        assert_eq!(classifier.classify("layer 2, Z = 0.400"), Some(FeatureType::Unknown));
    }

    #[test]
    fn test_unrelated_comments_keep_running_feature() {
        let mut classifier = SlicerCommentClassifier::new();
        classifier.classify("TYPE:SKIN");
        assert_eq!(classifier.classify("retract"), None);
        assert_eq!(classifier.current_feature(), FeatureType::SolidInfill);

        classifier.reset();
        assert_eq!(classifier.current_feature(), FeatureType::Unknown);
        assert_eq!(classifier.family(), SlicerFamily::Unknown);
    }
}
