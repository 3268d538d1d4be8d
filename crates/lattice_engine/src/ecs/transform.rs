//! Hierarchical transform component storage
//!
//! Transforms live in fixed-size pages that are allocated once and
//! never moved; only the page-index table grows. Each page carries its
//! own mutex guarding every record on it, so mutations on different
//! pages proceed in parallel. A mutation holds a page lock only for the
//! duration of the field access and releases it before touching any
//! other record's page, so no two page locks are ever held at once.
//!
//! World matrices are recomputed top-down: a node's world matrix is
//! written strictly before its children are revisited.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

use crate::ecs::Entity;
use crate::foundation::math::{trs_matrix, Mat4, Quat, Vec3};

/// Number of transform records per page.
pub const PAGE_SIZE: usize = 256;

/// Hierarchy link of a transform record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parent {
    /// Top-level node; its world matrix equals its local matrix.
    Root,
    /// Child of the record at the given storage index.
    Child(usize),
}

#[derive(Debug, Clone)]
struct TransformRecord {
    entity: Entity,
    position: Vec3,
    orientation: Quat,
    scale: Vec3,
    world: Mat4,
    parent: Parent,
    children: Vec<usize>,
}

/// One fixed-size page of records. Pages are heap-allocated behind a
/// `Box` and never move after creation.
#[derive(Debug)]
struct Page {
    records: Mutex<Vec<TransformRecord>>,
}

impl Page {
    fn new() -> Self {
        Self {
            records: Mutex::new(Vec::with_capacity(PAGE_SIZE)),
        }
    }
}

/// Paged, lock-striped storage of hierarchical transforms.
///
/// Indices returned by [`add_component`](Self::add_component) are dense
/// and append-only; a record is never removed or relocated, so an index
/// stays valid for the lifetime of the manager.
#[derive(Debug)]
pub struct TransformComponentManager {
    /// Page table. The outer lock guards growth of the table itself;
    /// record access takes the shared side plus the page's own mutex.
    pages: RwLock<Vec<Box<Page>>>,
    index_of: Mutex<HashMap<Entity, usize>>,
    len: AtomicUsize,
}

impl TransformComponentManager {
    /// Create an empty transform store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pages: RwLock::new(Vec::new()),
            index_of: Mutex::new(HashMap::new()),
            len: AtomicUsize::new(0),
        }
    }

    /// Number of components stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// `true` if no components have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a transform for `entity`, returning its storage index.
    ///
    /// The new record is a root; its world matrix is its local matrix.
    pub fn add_component(
        &self,
        entity: Entity,
        position: Vec3,
        orientation: Quat,
        scale: Vec3,
    ) -> usize {
        let index = {
            let mut pages = self.pages.write().unwrap();
            let index = self.len.load(Ordering::Relaxed);
            if index / PAGE_SIZE == pages.len() {
                pages.push(Box::new(Page::new()));
            }
            let mut records = pages[index / PAGE_SIZE].records.lock().unwrap();
            records.push(TransformRecord {
                entity,
                position,
                orientation,
                scale,
                world: trs_matrix(&position, &orientation, &scale),
                parent: Parent::Root,
                children: Vec::new(),
            });
            self.len.store(index + 1, Ordering::Release);
            index
        };

        self.index_of.lock().unwrap().insert(entity, index);
        log::trace!("transform {} added for entity {}", index, entity.id());
        index
    }

    /// Storage index of `entity`'s transform, if it has one.
    #[must_use]
    pub fn lookup(&self, entity: Entity) -> Option<usize> {
        self.index_of.lock().unwrap().get(&entity).copied()
    }

    /// Run `f` on the record at `index` under its page lock.
    ///
    /// The lock is released as soon as `f` returns; callers copy data
    /// out rather than holding references across pages.
    fn with_record<R>(&self, index: usize, f: impl FnOnce(&mut TransformRecord) -> R) -> R {
        let pages = self.pages.read().unwrap();
        let mut records = pages[index / PAGE_SIZE].records.lock().unwrap();
        f(&mut records[index % PAGE_SIZE])
    }

    /// Local position of the record at `index`.
    #[must_use]
    pub fn position(&self, index: usize) -> Vec3 {
        self.with_record(index, |r| r.position)
    }

    /// Local orientation of the record at `index`.
    #[must_use]
    pub fn orientation(&self, index: usize) -> Quat {
        self.with_record(index, |r| r.orientation)
    }

    /// Local scale of the record at `index`.
    #[must_use]
    pub fn scale(&self, index: usize) -> Vec3 {
        self.with_record(index, |r| r.scale)
    }

    /// World matrix of the record at `index`.
    #[must_use]
    pub fn world_matrix(&self, index: usize) -> Mat4 {
        self.with_record(index, |r| r.world)
    }

    /// Hierarchy link of the record at `index`.
    #[must_use]
    pub fn parent(&self, index: usize) -> Parent {
        self.with_record(index, |r| r.parent)
    }

    /// Entity owning the record at `index`.
    #[must_use]
    pub fn entity_at(&self, index: usize) -> Entity {
        self.with_record(index, |r| r.entity)
    }

    /// World matrix of `entity`'s transform, if it has one.
    #[must_use]
    pub fn world_matrix_of(&self, entity: Entity) -> Option<Mat4> {
        self.lookup(entity).map(|index| self.world_matrix(index))
    }

    /// Local position of `entity`'s transform, if it has one.
    #[must_use]
    pub fn position_of(&self, entity: Entity) -> Option<Vec3> {
        self.lookup(entity).map(|index| self.position(index))
    }

    /// Local orientation of `entity`'s transform, if it has one.
    #[must_use]
    pub fn orientation_of(&self, entity: Entity) -> Option<Quat> {
        self.lookup(entity).map(|index| self.orientation(index))
    }

    /// Translate by `delta` in parent space and repropagate.
    pub fn translate(&self, index: usize, delta: Vec3) {
        self.with_record(index, |r| r.position += delta);
        self.transform(index);
    }

    /// Apply `delta` as a parent-space rotation and repropagate.
    pub fn rotate(&self, index: usize, delta: Quat) {
        self.with_record(index, |r| r.orientation = delta * r.orientation);
        self.transform(index);
    }

    /// Apply `delta` as a local-space rotation and repropagate.
    pub fn rotate_local(&self, index: usize, delta: Quat) {
        self.with_record(index, |r| r.orientation *= delta);
        self.transform(index);
    }

    /// Multiply the local scale component-wise and repropagate.
    pub fn scale_by(&self, index: usize, factors: Vec3) {
        self.with_record(index, |r| r.scale.component_mul_assign(&factors));
        self.transform(index);
    }

    /// Set the absolute local position and repropagate.
    pub fn set_position(&self, index: usize, position: Vec3) {
        self.with_record(index, |r| r.position = position);
        self.transform(index);
    }

    /// Set the absolute local orientation and repropagate.
    pub fn set_orientation(&self, index: usize, orientation: Quat) {
        self.with_record(index, |r| r.orientation = orientation);
        self.transform(index);
    }

    /// Set the absolute local scale and repropagate.
    pub fn set_scale(&self, index: usize, scale: Vec3) {
        self.with_record(index, |r| r.scale = scale);
        self.transform(index);
    }

    /// Attach the record at `index` to `parent_entity`'s transform.
    ///
    /// Detaches from any previous parent first, then repropagates the
    /// subtree under the new parent's world matrix. A parent entity
    /// without a transform component is logged and ignored.
    pub fn set_parent(&self, index: usize, parent_entity: Entity) {
        let Some(parent_index) = self.lookup(parent_entity) else {
            log::warn!(
                "set_parent: entity {} has no transform component",
                parent_entity.id()
            );
            return;
        };
        if parent_index == index {
            log::warn!("set_parent: transform {index} cannot parent itself");
            return;
        }

        let previous = self.with_record(index, |r| {
            let previous = r.parent;
            r.parent = Parent::Child(parent_index);
            previous
        });
        if let Parent::Child(old_parent) = previous {
            if old_parent != parent_index {
                self.with_record(old_parent, |r| r.children.retain(|&c| c != index));
            }
        }
        self.with_record(parent_index, |r| {
            if !r.children.contains(&index) {
                r.children.push(index);
            }
        });

        self.transform(index);
    }

    /// Recompute the world matrix at `index` and cascade to all
    /// descendants.
    ///
    /// The parent's world matrix is copied out first, then this node's
    /// world matrix is written, and only then are children revisited,
    /// enforcing top-down ordering. Each step locks at most one page at
    /// a time.
    pub fn transform(&self, index: usize) {
        let parent = self.with_record(index, |r| r.parent);
        let parent_world = match parent {
            Parent::Root => Mat4::identity(),
            Parent::Child(p) => self.with_record(p, |r| r.world),
        };

        let children = self.with_record(index, |r| {
            let local = trs_matrix(&r.position, &r.orientation, &r.scale);
            r.world = match parent {
                Parent::Root => local,
                Parent::Child(_) => parent_world * local,
            };
            r.children.clone()
        });

        for child in children {
            self.transform(child);
        }
    }
}

impl Default for TransformComponentManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::EntityManager;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    const EPSILON: f32 = 1e-5;

    fn unit_scale() -> Vec3 {
        Vec3::new(1.0, 1.0, 1.0)
    }

    #[test]
    fn root_world_matrix_matches_local_trs() {
        let entities = EntityManager::new();
        let transforms = TransformComponentManager::new();

        let position = Vec3::new(1.0, 2.0, 3.0);
        let orientation = Quat::from_axis_angle(&Vec3::y_axis(), 0.5);
        let scale = Vec3::new(2.0, 1.5, 0.8);

        let index = transforms.add_component(entities.create(), position, orientation, scale);
        let world = transforms.world_matrix(index);

        assert_relative_eq!(
            world,
            trs_matrix(&position, &orientation, &scale),
            epsilon = EPSILON
        );
        assert_relative_eq!(transforms.position(index), position, epsilon = EPSILON);
        assert_relative_eq!(transforms.scale(index), scale, epsilon = EPSILON);
    }

    #[test]
    fn child_world_is_parent_world_times_local() {
        let entities = EntityManager::new();
        let transforms = TransformComponentManager::new();

        let parent_entity = entities.create();
        let parent = transforms.add_component(
            parent_entity,
            Vec3::new(1.0, 0.0, 0.0),
            Quat::from_axis_angle(&Vec3::y_axis(), std::f32::consts::FRAC_PI_2),
            unit_scale(),
        );
        let child = transforms.add_component(
            entities.create(),
            Vec3::new(0.0, 0.0, 1.0),
            Quat::identity(),
            unit_scale(),
        );

        transforms.set_parent(child, parent_entity);

        let expected = transforms.world_matrix(parent)
            * trs_matrix(
                &Vec3::new(0.0, 0.0, 1.0),
                &Quat::identity(),
                &unit_scale(),
            );
        assert_relative_eq!(transforms.world_matrix(child), expected, epsilon = EPSILON);
        assert_eq!(transforms.parent(child), Parent::Child(parent));
    }

    #[test]
    fn translating_parent_moves_descendants() {
        let entities = EntityManager::new();
        let transforms = TransformComponentManager::new();

        let a_entity = entities.create();
        let a = transforms.add_component(a_entity, Vec3::zeros(), Quat::identity(), unit_scale());
        let b = transforms.add_component(
            entities.create(),
            Vec3::new(1.0, 0.0, 0.0),
            Quat::identity(),
            unit_scale(),
        );
        transforms.set_parent(b, a_entity);

        transforms.translate(a, Vec3::new(5.0, 0.0, 0.0));

        let world = transforms.world_matrix(b);
        assert_relative_eq!(
            crate::foundation::math::translation_of(&world),
            Vec3::new(6.0, 0.0, 0.0),
            epsilon = EPSILON
        );
    }

    #[test]
    fn cascade_reaches_grandchildren_without_explicit_calls() {
        let entities = EntityManager::new();
        let transforms = TransformComponentManager::new();

        let a_entity = entities.create();
        let b_entity = entities.create();
        let a = transforms.add_component(a_entity, Vec3::zeros(), Quat::identity(), unit_scale());
        let b = transforms.add_component(
            b_entity,
            Vec3::new(1.0, 0.0, 0.0),
            Quat::identity(),
            unit_scale(),
        );
        let c = transforms.add_component(
            entities.create(),
            Vec3::new(0.0, 1.0, 0.0),
            Quat::identity(),
            unit_scale(),
        );
        transforms.set_parent(b, a_entity);
        transforms.set_parent(c, b_entity);

        transforms.translate(a, Vec3::new(0.0, 0.0, 4.0));

        let world = transforms.world_matrix(c);
        assert_relative_eq!(
            crate::foundation::math::translation_of(&world),
            Vec3::new(1.0, 1.0, 4.0),
            epsilon = EPSILON
        );
    }

    #[test]
    fn transform_is_idempotent() {
        let entities = EntityManager::new();
        let transforms = TransformComponentManager::new();

        let index = transforms.add_component(
            entities.create(),
            Vec3::new(0.3, -2.0, 1.0),
            Quat::from_axis_angle(&Vec3::x_axis(), 0.7),
            Vec3::new(1.0, 2.0, 3.0),
        );

        transforms.transform(index);
        let first = transforms.world_matrix(index);
        transforms.transform(index);
        let second = transforms.world_matrix(index);

        assert_eq!(first, second);
    }

    #[test]
    fn reparenting_detaches_from_previous_parent() {
        let entities = EntityManager::new();
        let transforms = TransformComponentManager::new();

        let p1_entity = entities.create();
        let p2_entity = entities.create();
        let p1 = transforms.add_component(
            p1_entity,
            Vec3::new(10.0, 0.0, 0.0),
            Quat::identity(),
            unit_scale(),
        );
        let p2 = transforms.add_component(
            p2_entity,
            Vec3::new(0.0, 10.0, 0.0),
            Quat::identity(),
            unit_scale(),
        );
        let child =
            transforms.add_component(entities.create(), Vec3::zeros(), Quat::identity(), unit_scale());

        transforms.set_parent(child, p1_entity);
        transforms.set_parent(child, p2_entity);

        // Moving the old parent must no longer affect the child.
        transforms.translate(p1, Vec3::new(5.0, 0.0, 0.0));
        let world = transforms.world_matrix(child);
        assert_relative_eq!(
            crate::foundation::math::translation_of(&world),
            Vec3::new(0.0, 10.0, 0.0),
            epsilon = EPSILON
        );

        // And the new parent still does.
        transforms.translate(p2, Vec3::new(0.0, 1.0, 0.0));
        let world = transforms.world_matrix(child);
        assert_relative_eq!(
            crate::foundation::math::translation_of(&world),
            Vec3::new(0.0, 11.0, 0.0),
            epsilon = EPSILON
        );
    }

    #[test]
    fn rotate_local_and_rotate_differ_for_child_orientations() {
        let entities = EntityManager::new();
        let transforms = TransformComponentManager::new();

        let base = Quat::from_axis_angle(&Vec3::y_axis(), std::f32::consts::FRAC_PI_2);
        let delta = Quat::from_axis_angle(&Vec3::x_axis(), std::f32::consts::FRAC_PI_2);

        let a = transforms.add_component(entities.create(), Vec3::zeros(), base, unit_scale());
        let b = transforms.add_component(entities.create(), Vec3::zeros(), base, unit_scale());

        transforms.rotate(a, delta);
        transforms.rotate_local(b, delta);

        assert_relative_eq!(transforms.orientation(a), delta * base, epsilon = EPSILON);
        assert_relative_eq!(transforms.orientation(b), base * delta, epsilon = EPSILON);
    }

    #[test]
    fn storage_spans_multiple_pages() {
        let entities = EntityManager::new();
        let transforms = TransformComponentManager::new();

        let count = PAGE_SIZE * 2 + 10;
        for i in 0..count {
            let index = transforms.add_component(
                entities.create(),
                Vec3::new(i as f32, 0.0, 0.0),
                Quat::identity(),
                unit_scale(),
            );
            assert_eq!(index, i);
        }

        assert_eq!(transforms.len(), count);
        // Records on later pages are intact.
        let probe = PAGE_SIZE + 7;
        assert_relative_eq!(
            transforms.position(probe),
            Vec3::new(probe as f32, 0.0, 0.0),
            epsilon = EPSILON
        );
    }

    #[test]
    fn concurrent_adds_do_not_lose_records() {
        let entities = Arc::new(EntityManager::new());
        let transforms = Arc::new(TransformComponentManager::new());

        let mut handles = Vec::new();
        for t in 0..4 {
            let entities = Arc::clone(&entities);
            let transforms = Arc::clone(&transforms);
            handles.push(std::thread::spawn(move || {
                for i in 0..200 {
                    let entity = entities.create();
                    transforms.add_component(
                        entity,
                        Vec3::new(t as f32, i as f32, 0.0),
                        Quat::identity(),
                        Vec3::new(1.0, 1.0, 1.0),
                    );
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(transforms.len(), 800);
        // Every entity resolves to a record holding its own entity id.
        for id in 0..800 {
            let entity = crate::ecs::Entity::new(id);
            let index = transforms.lookup(entity).expect("missing transform");
            assert_eq!(transforms.entity_at(index), entity);
        }
    }
}
