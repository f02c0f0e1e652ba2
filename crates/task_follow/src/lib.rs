//! Observe a task's event stream until the task is done, reconnecting
//! across drops and refreshing credentials along the way.

mod controller;
mod error;
mod follower;
mod outcome;

pub use controller::FollowController;
pub use error::FollowError;
pub use follower::{
    verify_task_ownership, FollowConfig, FollowSession, FollowUpdate, ReconnectingFollower,
    STREAM_REFRESH_REASON,
};
pub use outcome::FollowOutcome;
