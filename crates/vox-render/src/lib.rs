//! Render engine for the VoxEmbed widget.
//!
//! [`render`] turns a normalised [`vox_types::WidgetConfig`] into a
//! [`RenderedWidget`]: exactly one root container holding the call control
//! and, for the `floating` and `page` variants, an expandable panel. The
//! same call also produces the generated stylesheet. Rendering is a pure
//! function of the configuration, so rendering the same configuration twice
//! yields structurally equal trees.
//!
//! [`WidgetView`] wraps a rendered widget with the mutations the call state
//! machine drives (labels, disabled state, mute control, transcript), and
//! [`Document`] models the host page the widget is mounted into.

mod document;
mod layout;
mod node;
mod style;
mod view;

pub use document::{Document, MountPoint};
pub use layout::{consent_view, ids, render, RenderedWidget};
pub use node::{Element, Node};
pub use style::{shadow, stylesheet, CUSTOM_STYLESHEET_ID, STYLESHEET_ID};
pub use view::{ControlVisual, SharedView, WidgetView};

#[cfg(test)]
mod tests;
