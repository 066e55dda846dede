//! Quire Core
//!
//! Foundation types shared by the Quire text layer and its host:
//!
//! - **Geometry**: vectors, paddings, axis-aligned ranges and colors in the
//!   Y-down UI coordinate system
//! - **Nodes**: identity of the layout nodes text data is attached to
//! - **Events**: platform-agnostic key codes and modifiers consumed at the
//!   text editing boundary

pub mod events;
pub mod geometry;
pub mod node;

pub use events::{KeyCode, KeyEvent, Modifiers};
pub use geometry::{Color, Padding, Range2D, Vec2};
pub use node::NodeId;
