//! Challenge solver adapter.
//!
//! The portal guards every claim with an image challenge. Recognizing the
//! image is somebody else's job: this module only defines the typed boundary
//! (`ChallengeSolver`) and ships one implementation that delegates to an
//! external command.

mod command;
mod traits;

pub use command::CommandSolver;
pub use traits::{ChallengeSolver, SolverError};
