use std::path::Path;

/// Import seam provided by the embedding 3D application.
///
/// Implementations are called on the cooperative context only, never
/// from a worker thread.
pub trait SceneImporter {
    /// Whether the host's glTF/GLB importer can be used at all.
    fn is_available(&self) -> bool {
        true
    }

    /// Bring a downloaded `.glb` file into the host scene.
    fn import(&mut self, path: &Path) -> anyhow::Result<()>;
}
