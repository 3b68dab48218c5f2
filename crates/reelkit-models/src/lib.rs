//! Shared data models for the reelkit media pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Platform presets, aspect ratios and resize modes
//! - Encoding configuration and quality tiers
//! - Transitions, text styling and time specifications
//! - Per-operation requests and results

pub mod encoding;
pub mod preset;
pub mod request;
pub mod result;
pub mod text;
pub mod timestamp;
pub mod transition;

// Re-export common types
pub use encoding::{EncodingConfig, Quality, ResolutionTier};
pub use preset::{find_preset, AspectRatio, PlatformPreset, ResizeMode, PLATFORM_PRESETS};
pub use request::{
    AudioRemixRequest, CaptionsRequest, MergeRequest, ResizeRequest, ReverseRequest,
    SpeedRequest, TextOverlayRequest, TitleCardRequest, TrimRequest,
};
pub use result::{OperationDetails, OperationResult, RemixShape};
pub use text::{CardPosition, Caption, TextPosition, TextStyle};
pub use timestamp::{TimeSpec, TimestampError};
pub use transition::Transition;
