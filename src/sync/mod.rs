pub mod engine;
pub mod event;
pub mod inference;
pub mod policy;
pub mod workspace;

pub use engine::{Prepared, SyncEngine, SyncError, SyncReport};
pub use event::ChangeEvent;
pub use inference::{NoInference, ProjectInferrer};
pub use policy::Policy;
pub use workspace::{NewTaskRequest, SaveOutcome, Workspace};
