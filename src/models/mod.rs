// Data models for keypoint input and analysis output

pub mod analysis;
pub mod biomechanics;
pub mod jump_event;
pub mod keypoint;
pub mod phase;
pub mod scorecard;

pub use analysis::*;
pub use biomechanics::*;
pub use jump_event::*;
pub use keypoint::*;
pub use phase::*;
pub use scorecard::*;
