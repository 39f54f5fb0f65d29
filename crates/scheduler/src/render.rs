use freshframe_core::{Image, Pose, Tier};

/// Error type for a single render attempt. Always transient from the
/// scheduler's point of view: the tier is dropped and the worker moves on.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("render backend unavailable: {0}")]
    Unavailable(String),
    #[error("render failed: {0}")]
    Failed(String),
    #[error("render returned invalid output: expected {expected}, got {actual}")]
    InvalidOutput { expected: String, actual: String },
    #[error("render panicked: {0}")]
    Panicked(String),
}

/// The external image generator.
///
/// Called concurrently from every worker, with no scheduler lock held, and
/// may take arbitrarily long. Implementations own whatever internal
/// synchronization their backend needs.
pub trait Renderer: Send + Sync {
    /// Render `pose` at the resolution and field of view of `tier`.
    fn render(&self, pose: &Pose, tier: &Tier) -> Result<Image, RenderError>;
}

impl<F> Renderer for F
where
    F: Fn(&Pose, &Tier) -> Result<Image, RenderError> + Send + Sync,
{
    fn render(&self, pose: &Pose, tier: &Tier) -> Result<Image, RenderError> {
        self(pose, tier)
    }
}
