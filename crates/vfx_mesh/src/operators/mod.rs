//! Volume operators: stages that transform other sources' volumes.

pub mod boolean;
pub mod gap_fill;

pub use boolean::{BlendParams, BooleanCombiner, BooleanOp, BooleanSettings};
pub use gap_fill::{GapFillOperator, GapFillSettings};
