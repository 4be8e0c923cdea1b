//! # gcodesnap tracker
//!
//! Derives a fully resolved machine state for every G-code command:
//! coordinates and axis modes, extrusion and retraction, priming, layers,
//! z-hops, travel classification and the slicer feature being printed.
//!
//! ```
//! use gcodesnap_tracker::{StateTracker, TrackerConfig};
//!
//! let mut tracker = StateTracker::new(TrackerConfig::default());
//! tracker.update(&gcodesnap_parser::parse("G28"), 1, 1);
//! let position = tracker.update(&gcodesnap_parser::parse("G1 X10 Y10 Z0.2 E1"), 2, 2);
//! assert_eq!(position.layer, 1);
//! ```

pub mod comment;
pub mod config;
pub mod position;
pub mod registry;
pub mod tracker;

pub use comment::{
    ClassifierHandle, CommentClassifier, FeatureType, SlicerCommentClassifier, SlicerFamily,
};
pub use config::{AxisMode, BoundingBox, TrackerConfig, UnitsDefault};
pub use position::{ExtruderState, MachinePosition, PositionUpdate};
pub use registry::TrackerRegistry;
pub use tracker::{is_tracked_command, StateTracker, SLOT_COUNT};
