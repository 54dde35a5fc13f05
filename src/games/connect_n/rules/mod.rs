//! Game rules for connect-N.
//!
//! Pure functions over a [`Grid`](super::Grid). The engine calls them after
//! every disc it places; they never mutate anything.

pub mod draw;
pub mod win;

pub use draw::is_draw;
pub use win::{AXES, completes_run};
