/// Scene registries: mesh parts, models, render nodes and cameras

use crate::error::Result;
use crate::render::{
    Camera, CameraId, CameraType, MaterialId, MeshPart, MeshPartId, ModelId, Projection,
    RenderNodeId, WindowIndex,
};
use crate::renderer::entities::{Model, RenderNode, StoredMeshPart};
use crate::renderer::renderer::Renderer;
use crate::utils::Transform;
use crate::window::Extent2D;

impl Renderer {
    // ===== MESH PARTS =====

    /// Store a mesh part; it is uploaded by the next `draw()`
    pub fn save_mesh_part(&mut self, part: MeshPart) -> MeshPartId {
        self.should_update_mesh_buffers = true;
        self.mesh_parts.push(StoredMeshPart {
            part,
            vertex_offset: 0,
            index_offset: 0,
            is_uploaded: false,
        })
    }

    pub fn destroy_mesh_part(&mut self, id: MeshPartId) {
        if self.mesh_parts.remove(id).is_some() {
            self.should_update_mesh_buffers = true;
        }
    }

    pub fn clear_mesh_parts(&mut self) {
        self.mesh_parts.clear();
        self.should_update_mesh_buffers = true;
    }

    /// Whether a mesh part lives in the shared GPU buffers
    pub fn mesh_part_is_uploaded(&self, id: MeshPartId) -> Option<bool> {
        self.mesh_parts.get(id).map(|p| p.is_uploaded)
    }

    /// Vertex and index offsets of an uploaded mesh part in the shared buffers
    pub fn mesh_part_offsets(&self, id: MeshPartId) -> Option<(u32, u32)> {
        self.mesh_parts
            .get(id)
            .filter(|p| p.is_uploaded)
            .map(|p| (p.vertex_offset, p.index_offset))
    }

    // ===== MODELS =====

    /// Create a model drawing `mesh` with `material`
    pub fn create_model(&mut self, mesh: MeshPartId, material: MaterialId) -> Result<ModelId> {
        if !self.mesh_parts.contains(mesh) {
            return Err(Self::invalid_resource(format!("mesh part {} does not exist", mesh)));
        }
        if !self.materials.contains(material) {
            return Err(Self::invalid_resource(format!("material {} does not exist", material)));
        }

        let id = self.models.push(Model {
            mesh,
            material,
            transform: Transform::default(),
            instances: Vec::new(),
        });
        if let Some(stored) = self.materials.get_mut(material) {
            stored.models.push(id);
        }
        self.draw_cache_version += 1;
        Ok(id)
    }

    /// Destroy a model and its render nodes
    ///
    /// # Errors
    ///
    /// A live material that does not list the model is a
    /// [`ConsistencyError`](crate::railguard::Error::ConsistencyError).
    pub fn destroy_model(&mut self, id: ModelId) -> Result<()> {
        let Some(model) = self.models.remove(id) else {
            return Ok(());
        };

        for node in &model.instances {
            self.render_nodes.remove(*node);
        }

        if let Some(material) = self.materials.get_mut(model.material) {
            let position = material.models.iter().position(|m| *m == id).ok_or_else(|| {
                Self::consistency_error(format!(
                    "model {} missing from the model list of material {}",
                    id, model.material
                ))
            })?;
            material.models.remove(position);
        }

        self.draw_cache_version += 1;
        Ok(())
    }

    pub fn get_model_transform(&self, id: ModelId) -> Option<&Transform> {
        self.models.get(id).map(|m| &m.transform)
    }

    /// Mutable model transform, written to the object buffer every frame
    pub fn get_model_transform_mut(&mut self, id: ModelId) -> Option<&mut Transform> {
        self.models.get_mut(id).map(|m| &mut m.transform)
    }

    pub fn get_model_material(&self, id: ModelId) -> Option<MaterialId> {
        self.models.get(id).map(|m| m.material)
    }

    /// Render nodes placing a model
    pub fn get_model_instances(&self, id: ModelId) -> Option<&[RenderNodeId]> {
        self.models.get(id).map(|m| m.instances.as_slice())
    }

    /// Destroy every model and render node
    pub fn clear_models(&mut self) {
        self.models.clear();
        self.render_nodes.clear();
        for material in self.materials.values_mut() {
            material.models.clear();
        }
        self.draw_cache_version += 1;
    }

    // ===== RENDER NODES =====

    pub fn create_render_node(&mut self, model: ModelId) -> Result<RenderNodeId> {
        if !self.models.contains(model) {
            return Err(Self::invalid_resource(format!("model {} does not exist", model)));
        }
        let id = self.render_nodes.push(RenderNode { model });
        if let Some(stored) = self.models.get_mut(model) {
            stored.instances.push(id);
        }
        Ok(id)
    }

    pub fn destroy_render_node(&mut self, id: RenderNodeId) -> Result<()> {
        let Some(node) = self.render_nodes.remove(id) else {
            return Ok(());
        };
        if let Some(model) = self.models.get_mut(node.model) {
            let position = model.instances.iter().position(|n| *n == id).ok_or_else(|| {
                Self::consistency_error(format!(
                    "render node {} missing from the instances of model {}",
                    id, node.model
                ))
            })?;
            model.instances.remove(position);
        }
        Ok(())
    }

    pub fn get_render_node_model(&self, id: RenderNodeId) -> Option<ModelId> {
        self.render_nodes.get(id).map(|n| n.model)
    }

    pub fn clear_render_nodes(&mut self) {
        self.render_nodes.clear();
        for model in self.models.values_mut() {
            model.instances.clear();
        }
    }

    // ===== CAMERAS =====

    fn connected_extent(&self, window: WindowIndex) -> Result<Extent2D> {
        let index = self.enabled_slot_index(window)?;
        self.swapchains[index]
            .extent()
            .ok_or_else(|| Self::consistency_error(format!("window slot {} has no swapchain", window)))
    }

    /// Orthographic camera covering the window's extent in pixels
    pub fn create_orthographic_camera(&mut self, window: WindowIndex, near: f32, far: f32) -> Result<CameraId> {
        let extent = self.connected_extent(window)?;
        self.create_orthographic_camera_sized(
            window,
            extent.width as f32,
            extent.height as f32,
            near,
            far,
            Transform::default(),
        )
    }

    pub fn create_orthographic_camera_sized(
        &mut self,
        window: WindowIndex,
        width: f32,
        height: f32,
        near: f32,
        far: f32,
        transform: Transform,
    ) -> Result<CameraId> {
        self.enabled_slot_index(window)?;
        let projection = Projection::Orthographic { width, height, near, far };
        Ok(self.cameras.push(Camera::new(window, projection, transform)))
    }

    /// Perspective camera following the window's aspect ratio
    ///
    /// `fov` is the vertical field of view in radians.
    pub fn create_perspective_camera(
        &mut self,
        window: WindowIndex,
        fov: f32,
        near: f32,
        far: f32,
    ) -> Result<CameraId> {
        let extent = self.connected_extent(window)?;
        self.create_perspective_camera_with_aspect(
            window,
            fov,
            extent.aspect_ratio(),
            near,
            far,
            Transform::default(),
        )
    }

    pub fn create_perspective_camera_with_aspect(
        &mut self,
        window: WindowIndex,
        fov: f32,
        aspect: f32,
        near: f32,
        far: f32,
        transform: Transform,
    ) -> Result<CameraId> {
        self.enabled_slot_index(window)?;
        let projection = Projection::Perspective { fov, aspect, near, far };
        Ok(self.cameras.push(Camera::new(window, projection, transform)))
    }

    pub fn remove_camera(&mut self, id: CameraId) {
        self.cameras.remove(id);
    }

    pub fn get_camera_transform(&self, id: CameraId) -> Option<&Transform> {
        self.cameras.get(id).map(|c| &c.transform)
    }

    pub fn get_camera_transform_mut(&mut self, id: CameraId) -> Option<&mut Transform> {
        self.cameras.get_mut(id).map(|c| &mut c.transform)
    }

    pub fn get_camera_type(&self, id: CameraId) -> Option<CameraType> {
        self.cameras.get(id).map(|c| c.camera_type())
    }

    pub fn get_camera_projection(&self, id: CameraId) -> Option<Projection> {
        self.cameras.get(id).map(|c| c.projection)
    }

    pub fn get_camera_window(&self, id: CameraId) -> Option<WindowIndex> {
        self.cameras.get(id).map(|c| c.window)
    }

    pub fn enable_camera(&mut self, id: CameraId) -> Result<()> {
        self.set_camera_enabled(id, true)
    }

    pub fn disable_camera(&mut self, id: CameraId) -> Result<()> {
        self.set_camera_enabled(id, false)
    }

    pub fn is_camera_enabled(&self, id: CameraId) -> Option<bool> {
        self.cameras.get(id).map(|c| c.enabled)
    }

    fn set_camera_enabled(&mut self, id: CameraId, enabled: bool) -> Result<()> {
        let camera = self
            .cameras
            .get_mut(id)
            .ok_or_else(|| Self::invalid_resource(format!("camera {} does not exist", id)))?;
        camera.enabled = enabled;
        Ok(())
    }
}
