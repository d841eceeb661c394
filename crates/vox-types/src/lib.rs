//! Shared types for the VoxEmbed widget runtime.
//!
//! This crate owns the widget configuration document: the JSON the
//! configuration service returns for a widget identifier. The document is
//! deeply nested and every field is optional on the wire, so it is
//! normalised exactly once at the boundary into a total [`WidgetConfig`]
//! where every field carries a value. The render engine and the call state
//! machine never look at raw JSON.
//!
//! It also carries the origin allow-list semantics used by the
//! configuration service to gate which host pages may load a widget.

pub mod allowlist;
pub mod config;
mod enums;
mod error;
mod fields;

pub use allowlist::{cors_decision, is_origin_allowed, CorsDecision};
pub use config::{
    Animations, Behavior, ChatColors, Colors, ConsentSettings, Content, Dimensions,
    DisplayConfig, Effects, Footer, InlineStyle, MuteButton, Typography, VoiceCredentials,
    WidgetConfig,
};
pub use enums::{
    Alignment, ConsentMode, Entrance, Intensity, LogoShape, ParseEnumError, Position,
    SlideDirection, Speed, SymbolPosition, WidgetType,
};
pub use error::WidgetConfigError;
