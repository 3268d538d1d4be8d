//! Entity identity and lifecycle

use std::collections::VecDeque;
use std::sync::Mutex;

/// Free ids accumulated before the oldest one is handed out again.
///
/// Recycling only once the free list is this long maximizes the time
/// between an id being freed and reused, so stale handles are likely to
/// be caught by [`EntityManager::alive`].
pub const DEFAULT_REUSE_THRESHOLD: usize = 1024;

/// Entity identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entity {
    id: u32,
}

impl Entity {
    /// Create a new entity with the given ID
    pub(crate) const fn new(id: u32) -> Self {
        Self { id }
    }

    /// Get the entity ID
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }
}

#[derive(Debug, Default)]
struct EntityState {
    /// Liveness flag indexed by entity id.
    alive: Vec<bool>,
    /// Freed ids, oldest first.
    free: VecDeque<u32>,
}

/// Issues and recycles entity ids.
///
/// Freed ids are recycled in strict FIFO order (oldest-freed-first),
/// and only once enough ids have been freed that reuse is preferable to
/// growing the id space. A single mutex guards all state; entity churn
/// is infrequent relative to per-frame component updates.
#[derive(Debug)]
pub struct EntityManager {
    state: Mutex<EntityState>,
    reuse_threshold: usize,
}

impl EntityManager {
    /// Create an entity manager with the default reuse threshold.
    #[must_use]
    pub fn new() -> Self {
        Self::with_reuse_threshold(DEFAULT_REUSE_THRESHOLD)
    }

    /// Create an entity manager that starts recycling once `threshold`
    /// ids have been freed.
    #[must_use]
    pub fn with_reuse_threshold(threshold: usize) -> Self {
        Self {
            state: Mutex::new(EntityState::default()),
            reuse_threshold: threshold,
        }
    }

    /// Create a new entity.
    ///
    /// # Panics
    ///
    /// Panics if the id space is exhausted. Running out of `u32` ids is
    /// a fatal condition: every handle in the engine would be suspect.
    pub fn create(&self) -> Entity {
        let mut state = self.state.lock().unwrap();

        let id = if state.free.len() >= self.reuse_threshold {
            // Oldest freed id first.
            let id = state.free.pop_front().unwrap();
            state.alive[id as usize] = true;
            id
        } else {
            assert!(
                state.alive.len() < u32::MAX as usize,
                "entity id space exhausted"
            );
            state.alive.push(true);
            (state.alive.len() - 1) as u32
        };

        Entity::new(id)
    }

    /// Mark an entity dead and queue its id for eventual reuse.
    ///
    /// Component managers are not notified; removing the entity's
    /// components is their callers' responsibility.
    pub fn destroy(&self, entity: Entity) {
        let mut state = self.state.lock().unwrap();
        match state.alive.get_mut(entity.id() as usize) {
            Some(alive) if *alive => {
                *alive = false;
                state.free.push_back(entity.id());
            }
            _ => log::warn!("destroy of dead or unknown entity {}", entity.id()),
        }
    }

    /// O(1) liveness check.
    #[must_use]
    pub fn alive(&self, entity: Entity) -> bool {
        let state = self.state.lock().unwrap();
        state
            .alive
            .get(entity.id() as usize)
            .copied()
            .unwrap_or(false)
    }

    /// Number of ids ever issued, including dead ones.
    #[must_use]
    pub fn issued(&self) -> usize {
        self.state.lock().unwrap().alive.len()
    }
}

impl Default for EntityManager {
    fn default() -> Self {
        Self::new()
    }
}
