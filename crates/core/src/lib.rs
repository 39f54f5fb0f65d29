pub mod config;
pub mod error;
pub mod image;
pub mod pose;
pub mod request;
pub mod tier;

pub use config::{DedupPolicy, SchedulerConfig};
pub use error::*;
pub use image::{Image, PixelBuffer};
pub use pose::Pose;
pub use request::{Frame, RenderRequest, RequestStamp};
pub use tier::{Tier, TierLadder};
