//! Domain layer - pure business logic
//!
//! This module contains business logic with no external I/O.
//! Types and functions here can be unit tested without mocking.

pub mod gate;
pub mod image;
pub mod promotion;
pub mod scan;

// Re-export commonly used types
pub use gate::{DenyReason, GateDecision, GatePolicy};
pub use image::{parse_image_list, ArtifactRef, ImageReference, Namespaces, RegistryEndpoint};
pub use promotion::{
    ImageOutcome, ImagePromotion, ImageState, PromotionState, PromotionStep, RunSummary, Workflow,
};
pub use scan::{ScanFinding, ScanResult, ScanStatus, Severity};
