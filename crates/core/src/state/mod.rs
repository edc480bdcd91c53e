//! Save-state serialization.
//!
//! - `PointerWrap`: the single-pass cursor shared by save, load and measure.
//! - `DoState`: the closed set of value shapes the cursor knows how to walk.
//! - `coordinator`: fixed-order whole-machine passes with section markers and
//!   transactional loads.

mod do_state;
mod error;
mod pointer_wrap;

pub mod coordinator;

pub use coordinator::{
    checkpoint, decode_state, load_state, measure_state, require, save_state, save_state_into,
    StateRoot,
};
pub use do_state::DoState;
pub use error::{StateError, StateResult};
pub use pointer_wrap::{Mode, PointerWrap, DEFAULT_MARKER};
