//! Render job batching tree
//!
//! Jobs are organized as Root → shader → material → mesh → entities so
//! that draw submission naturally groups state changes: bind a program
//! once, then each material under it, then each mesh, then draw all
//! entities of that mesh in capped instanced calls. Nodes are appended
//! on first use, so sibling order is insertion order, and that order
//! alone determines submission order.
//!
//! The tree has no internal synchronization; callers must not mutate it
//! while the render thread is traversing it.

use crate::ecs::{Entity, TransformComponentManager};
use crate::render::device::DrawCall;
use crate::render::material::{Material, MaterialId};
use crate::render::resources::{ResourceId, ResourceManager};

/// Default cap on instances per draw call.
pub const DEFAULT_MAX_INSTANCES: usize = 128;

#[derive(Debug)]
struct MeshNode {
    mesh: ResourceId,
    entities: Vec<Entity>,
}

#[derive(Debug)]
struct MaterialNode {
    material: MaterialId,
    texture: Option<ResourceId>,
    meshes: Vec<MeshNode>,
}

#[derive(Debug)]
struct ShaderNode {
    program: ResourceId,
    materials: Vec<MaterialNode>,
}

/// Builds instanced draw lists from registered render jobs.
///
/// Each `(shader, material, mesh)` triple appears at most once in the
/// tree, and an entity at most once in its leaf's list. Unready
/// resources never block: their whole subtree is skipped during
/// traversal and picked up again once construction completes.
#[derive(Debug)]
pub struct RenderJobManager {
    shaders: Vec<ShaderNode>,
    max_instances: usize,
}

impl RenderJobManager {
    /// Create an empty tree with the default instance cap.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_instances(DEFAULT_MAX_INSTANCES)
    }

    /// Create an empty tree with a custom cap on instances per call.
    #[must_use]
    pub fn with_max_instances(max_instances: usize) -> Self {
        Self {
            shaders: Vec::new(),
            max_instances: max_instances.max(1),
        }
    }

    /// Associate `entity` with the `(material.program, material, mesh)`
    /// triple for drawing.
    ///
    /// Missing tree levels are created; an entity already present in
    /// the leaf is not added twice.
    pub fn add_render_job(&mut self, entity: Entity, material: &Material, mesh: ResourceId) {
        let shader = match self
            .shaders
            .iter()
            .position(|s| s.program == material.program())
        {
            Some(i) => &mut self.shaders[i],
            None => {
                self.shaders.push(ShaderNode {
                    program: material.program(),
                    materials: Vec::new(),
                });
                self.shaders.last_mut().unwrap()
            }
        };

        let material_node = match shader
            .materials
            .iter()
            .position(|m| m.material == material.id())
        {
            Some(i) => &mut shader.materials[i],
            None => {
                shader.materials.push(MaterialNode {
                    material: material.id(),
                    texture: material.texture(),
                    meshes: Vec::new(),
                });
                shader.materials.last_mut().unwrap()
            }
        };

        let mesh_node = match material_node.meshes.iter().position(|m| m.mesh == mesh) {
            Some(i) => &mut material_node.meshes[i],
            None => {
                material_node.meshes.push(MeshNode {
                    mesh,
                    entities: Vec::new(),
                });
                material_node.meshes.last_mut().unwrap()
            }
        };

        if mesh_node.entities.contains(&entity) {
            log::debug!(
                "entity {} already has a render job for this mesh",
                entity.id()
            );
            return;
        }
        mesh_node.entities.push(entity);
    }

    /// Remove `entity` from the leaf of the given triple.
    ///
    /// Ancestor nodes that become empty are left in place; they cost a
    /// scan step but preserve the insertion order of later re-adds.
    pub fn remove_render_job(&mut self, entity: Entity, material: &Material, mesh: ResourceId) {
        let Some(shader) = self
            .shaders
            .iter_mut()
            .find(|s| s.program == material.program())
        else {
            return;
        };
        let Some(material_node) = shader
            .materials
            .iter_mut()
            .find(|m| m.material == material.id())
        else {
            return;
        };
        let Some(mesh_node) = material_node.meshes.iter_mut().find(|m| m.mesh == mesh) else {
            return;
        };
        if let Some(i) = mesh_node.entities.iter().position(|&e| e == entity) {
            mesh_node.entities.remove(i);
        }
    }

    /// Empty the whole tree.
    pub fn clear_render_jobs(&mut self) {
        self.shaders.clear();
    }

    /// Total number of registered (entity, triple) jobs.
    #[must_use]
    pub fn job_count(&self) -> usize {
        self.shaders
            .iter()
            .flat_map(|s| &s.materials)
            .flat_map(|m| &m.meshes)
            .map(|m| m.entities.len())
            .sum()
    }

    /// Depth-first traversal producing instanced draw calls.
    ///
    /// Any node whose resource is not yet ready is skipped whole, as is
    /// any entity without a transform. Instances are flushed whenever
    /// the cap is reached and again at the end of each mesh's entity
    /// list.
    #[must_use]
    pub fn build_draw_list(
        &self,
        resources: &ResourceManager,
        transforms: &TransformComponentManager,
    ) -> Vec<DrawCall> {
        let mut calls = Vec::new();

        for shader in &self.shaders {
            let Some(program) = resources.payload(shader.program) else {
                log::trace!("program {:?} not ready, skipping subtree", shader.program);
                continue;
            };
            for material_node in &shader.materials {
                let texture = match material_node.texture {
                    None => None,
                    Some(id) => match resources.payload(id) {
                        Some(handle) => Some(handle),
                        None => {
                            log::trace!("texture {id:?} not ready, skipping subtree");
                            continue;
                        }
                    },
                };
                for mesh_node in &material_node.meshes {
                    let Some(mesh) = resources.payload(mesh_node.mesh) else {
                        log::trace!("mesh {:?} not ready, skipping subtree", mesh_node.mesh);
                        continue;
                    };

                    let mut instances = Vec::new();
                    for &entity in &mesh_node.entities {
                        let Some(world) = transforms.world_matrix_of(entity) else {
                            continue;
                        };
                        instances.push(world);
                        if instances.len() == self.max_instances {
                            calls.push(DrawCall {
                                program,
                                mesh,
                                texture,
                                instance_transforms: std::mem::take(&mut instances),
                            });
                        }
                    }
                    if !instances.is_empty() {
                        calls.push(DrawCall {
                            program,
                            mesh,
                            texture,
                            instance_transforms: instances,
                        });
                    }
                }
            }
        }

        calls
    }
}

impl Default for RenderJobManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::EntityManager;
    use crate::foundation::math::{Quat, Vec3};
    use crate::render::device::{MeshDescriptor, ProgramDescriptor};
    use crate::render::headless::HeadlessDevice;

    struct Fixture {
        entities: EntityManager,
        transforms: TransformComponentManager,
        resources: std::sync::Arc<ResourceManager>,
        executor: crate::render::executor::DeviceExecutor,
        material: Material,
        mesh: ResourceId,
    }

    fn fixture() -> Fixture {
        let (resources, executor) = ResourceManager::with_device(Box::new(HeadlessDevice::new()));
        let program = resources.create_program("basic", ProgramDescriptor::new("vs", "fs"));
        let mesh = resources.create_mesh(
            "cube",
            MeshDescriptor {
                vertex_data: vec![0; 36],
                vertex_stride: 12,
                indices: vec![0, 1, 2],
            },
        );
        Fixture {
            entities: EntityManager::new(),
            transforms: TransformComponentManager::new(),
            resources,
            executor,
            material: Material::new(MaterialId(1), program),
            mesh,
        }
    }

    fn spawn(fixture: &Fixture, position: Vec3) -> Entity {
        let entity = fixture.entities.create();
        fixture.transforms.add_component(
            entity,
            position,
            Quat::identity(),
            Vec3::new(1.0, 1.0, 1.0),
        );
        entity
    }

    #[test]
    fn duplicate_jobs_keep_one_entry_per_entity() {
        let mut fx = fixture();
        let mut jobs = RenderJobManager::new();
        let entity = spawn(&fx, Vec3::zeros());

        jobs.add_render_job(entity, &fx.material, fx.mesh);
        jobs.add_render_job(entity, &fx.material, fx.mesh);
        assert_eq!(jobs.job_count(), 1);

        fx.executor.drain();
        let calls = jobs.build_draw_list(&fx.resources, &fx.transforms);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].instance_count(), 1);
    }

    #[test]
    fn instance_cap_splits_draw_calls() {
        let mut fx = fixture();
        let mut jobs = RenderJobManager::with_max_instances(128);

        for i in 0..300 {
            let entity = spawn(&fx, Vec3::new(i as f32, 0.0, 0.0));
            jobs.add_render_job(entity, &fx.material, fx.mesh);
        }

        fx.executor.drain();
        let calls = jobs.build_draw_list(&fx.resources, &fx.transforms);
        let counts: Vec<_> = calls.iter().map(DrawCall::instance_count).collect();
        assert_eq!(counts, vec![128, 128, 44]);
    }

    #[test]
    fn unready_resources_are_skipped_without_blocking() {
        let mut fx = fixture();
        let mut jobs = RenderJobManager::new();
        let entity = spawn(&fx, Vec3::zeros());
        jobs.add_render_job(entity, &fx.material, fx.mesh);

        // No drain yet: everything still Pending.
        let calls = jobs.build_draw_list(&fx.resources, &fx.transforms);
        assert!(calls.is_empty());

        fx.executor.drain();
        let calls = jobs.build_draw_list(&fx.resources, &fx.transforms);
        assert_eq!(calls.len(), 1);
    }

    #[test]
    fn remove_render_job_erases_one_entity() {
        let mut fx = fixture();
        let mut jobs = RenderJobManager::new();
        let a = spawn(&fx, Vec3::zeros());
        let b = spawn(&fx, Vec3::new(1.0, 0.0, 0.0));

        jobs.add_render_job(a, &fx.material, fx.mesh);
        jobs.add_render_job(b, &fx.material, fx.mesh);
        jobs.remove_render_job(a, &fx.material, fx.mesh);
        assert_eq!(jobs.job_count(), 1);

        fx.executor.drain();
        let calls = jobs.build_draw_list(&fx.resources, &fx.transforms);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].instance_count(), 1);
    }

    #[test]
    fn sibling_order_is_insertion_order() {
        let mut fx = fixture();
        let second_mesh = fx.resources.create_mesh(
            "sphere",
            MeshDescriptor {
                vertex_data: vec![0; 24],
                vertex_stride: 12,
                indices: vec![0, 1, 2],
            },
        );

        let mut jobs = RenderJobManager::new();
        let a = spawn(&fx, Vec3::zeros());
        let b = spawn(&fx, Vec3::zeros());
        jobs.add_render_job(a, &fx.material, second_mesh);
        jobs.add_render_job(b, &fx.material, fx.mesh);

        fx.executor.drain();
        let calls = jobs.build_draw_list(&fx.resources, &fx.transforms);
        assert_eq!(calls.len(), 2);

        let second_handle = fx.resources.payload(second_mesh).unwrap();
        let first_handle = fx.resources.payload(fx.mesh).unwrap();
        assert_eq!(calls[0].mesh, second_handle);
        assert_eq!(calls[1].mesh, first_handle);
    }

    #[test]
    fn clear_empties_the_tree() {
        let mut fx = fixture();
        let mut jobs = RenderJobManager::new();
        let entity = spawn(&fx, Vec3::zeros());
        jobs.add_render_job(entity, &fx.material, fx.mesh);

        jobs.clear_render_jobs();
        assert_eq!(jobs.job_count(), 0);

        fx.executor.drain();
        assert!(jobs.build_draw_list(&fx.resources, &fx.transforms).is_empty());
    }
}
