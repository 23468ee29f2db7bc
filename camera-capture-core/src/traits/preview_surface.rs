/// The rendering surface collaborator, observed but never owned.
///
/// The surface's own lifecycle callbacks feed the session through
/// `CameraSession::on_surface_ready` / `on_surface_lost`; this trait covers
/// the two queries the session makes in the other direction.
pub trait PreviewSurface: Send + Sync {
    /// Whether the surface can currently accept frames.
    fn is_ready(&self) -> bool;

    /// Ask the surface to adopt the negotiated width/height ratio.
    fn request_aspect_ratio(&self, ratio: f64);
}
