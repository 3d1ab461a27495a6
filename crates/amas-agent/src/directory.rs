//! The id → cell arena index.

use std::sync::{Arc, RwLock};

use amas_core::AgentId;
use amas_core::sync::{reread, rewrite};
use rustc_hash::FxHashMap;

use crate::cell::AgentCell;

/// Resolves agent ids to live cells.
///
/// This is what makes neighbor links plain ids: perception resolves each
/// neighborhood member through the directory and reads its published
/// criticality.  Membership changes happen only at tick boundaries, so
/// mid-tick readers always see a stable population; the `RwLock` covers the
/// free-running agents that resolve neighbors at arbitrary times.
pub struct AgentDirectory<E> {
    cells: RwLock<FxHashMap<AgentId, Arc<AgentCell<E>>>>,
}

impl<E: 'static> AgentDirectory<E> {
    pub fn new() -> AgentDirectory<E> {
        AgentDirectory { cells: RwLock::new(FxHashMap::default()) }
    }

    pub fn insert(&self, cell: Arc<AgentCell<E>>) {
        rewrite(&self.cells).insert(cell.id(), cell);
    }

    pub fn remove(&self, id: AgentId) -> Option<Arc<AgentCell<E>>> {
        rewrite(&self.cells).remove(&id)
    }

    pub fn get(&self, id: AgentId) -> Option<Arc<AgentCell<E>>> {
        reread(&self.cells).get(&id).cloned()
    }

    pub fn contains(&self, id: AgentId) -> bool {
        reread(&self.cells).contains_key(&id)
    }

    pub fn len(&self) -> usize {
        reread(&self.cells).len()
    }

    pub fn is_empty(&self) -> bool {
        reread(&self.cells).is_empty()
    }

    /// All live ids, in no particular order.
    pub fn ids(&self) -> Vec<AgentId> {
        reread(&self.cells).keys().copied().collect()
    }
}

impl<E: 'static> Default for AgentDirectory<E> {
    fn default() -> Self {
        Self::new()
    }
}
