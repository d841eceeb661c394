//! Closed vocabularies used by the configuration document.
//!
//! Every enum parses case-insensitively from its wire string, serialises
//! back to the same kebab-case string, and has a `Default` that matches the
//! documented default for the field it backs.

use serde::{Serialize, Serializer};

/// Error returned when a string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl std::fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown {}: {}", self.kind, self.value)
    }
}

impl std::error::Error for ParseEnumError {}

macro_rules! config_enum {
    (
        $(#[$meta:meta])*
        $name:ident as $kind:literal, default $default:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Returns the wire string for this variant.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $wire ),+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
                match normalized.as_str() {
                    $( $wire => Ok(Self::$variant), )+
                    _ => Err(ParseEnumError {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }
    };
}

config_enum! {
    /// The three mutually exclusive render variants.
    WidgetType as "widget type", default Floating {
        /// Circular trigger button that toggles a floating panel.
        Floating => "floating",
        /// A single call button placed in the host page flow.
        Inline => "inline",
        /// Full-viewport modal panel with no trigger.
        Page => "page",
    }
}

config_enum! {
    /// Screen corner a floating widget is anchored to.
    Position as "position", default BottomRight {
        BottomRight => "bottom-right",
        BottomLeft => "bottom-left",
        TopRight => "top-right",
        TopLeft => "top-left",
    }
}

impl Position {
    /// Vertical edge of the anchor corner.
    pub fn vertical(self) -> &'static str {
        match self {
            Self::BottomRight | Self::BottomLeft => "bottom",
            Self::TopRight | Self::TopLeft => "top",
        }
    }

    /// Horizontal edge of the anchor corner.
    pub fn horizontal(self) -> &'static str {
        match self {
            Self::BottomRight | Self::TopRight => "right",
            Self::BottomLeft | Self::TopLeft => "left",
        }
    }
}

config_enum! {
    /// Four-level intensity used for shadows.
    Intensity as "intensity", default Medium {
        None => "none",
        Light => "light",
        Medium => "medium",
        Heavy => "heavy",
    }
}

config_enum! {
    /// Three-level animation speed.
    Speed as "speed", default Medium {
        Fast => "fast",
        Medium => "medium",
        Slow => "slow",
    }
}

impl Speed {
    /// Transition duration in milliseconds.
    pub fn duration_ms(self) -> u32 {
        match self {
            Self::Fast => 150,
            Self::Medium => 300,
            Self::Slow => 500,
        }
    }
}

config_enum! {
    /// Panel entrance animation.
    Entrance as "entrance animation", default Fade {
        None => "none",
        Fade => "fade",
        Slide => "slide",
        Scale => "scale",
    }
}

config_enum! {
    LogoShape as "logo shape", default Circle {
        Circle => "circle",
        Square => "square",
        Rounded => "rounded",
    }
}

config_enum! {
    Alignment as "alignment", default Left {
        Left => "left",
        Center => "center",
        Right => "right",
    }
}

config_enum! {
    /// Direction the inline label layers travel on hover.
    SlideDirection as "slide direction", default Up {
        Up => "up",
        Down => "down",
        Left => "left",
        Right => "right",
    }
}

config_enum! {
    SymbolPosition as "symbol position", default Leading {
        Leading => "leading",
        Trailing => "trailing",
    }
}

config_enum! {
    /// How the consent prompt is presented.
    ConsentMode as "consent mode", default Modal {
        /// Page-covering modal overlay.
        Modal => "modal",
        /// Block rendered inside the widget panel.
        Inline => "inline",
    }
}
