use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Slot index paired with a generation counter so stale handles can be detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct GenerationalId {
    pub index: usize,
    pub generation: u32,
}

impl GenerationalId {
    pub fn new(index: usize, generation: u32) -> Self {
        Self { index, generation }
    }
}

/// Handle to a vehicle slot inside a [`SimulationWorld`](crate::world::SimulationWorld).
///
/// Couplings between vehicles store this handle instead of a reference, so a
/// removed vehicle simply stops resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct VehicleId(pub GenerationalId);

impl VehicleId {
    pub fn new(index: usize, generation: u32) -> Self {
        Self(GenerationalId::new(index, generation))
    }

    pub fn index(&self) -> usize {
        self.0.index
    }

    pub fn generation(&self) -> u32 {
        self.0.generation
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vehicle#{}.{}", self.0.index, self.0.generation)
    }
}

/// Generational arena owning the vehicles of a world.
///
/// Iteration always walks slots in index order, which keeps every pass over
/// the vehicles deterministic.
pub struct Arena<T> {
    items: Vec<Option<T>>,
    generations: Vec<u32>,
    free_list: VecDeque<usize>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            generations: Vec::new(),
            free_list: VecDeque::new(),
        }
    }

    pub fn insert(&mut self, item: T) -> VehicleId {
        if let Some(index) = self.free_list.pop_front() {
            self.items[index] = Some(item);
            return VehicleId::new(index, self.generations[index]);
        }

        let index = self.items.len();
        self.items.push(Some(item));
        self.generations.push(0);
        VehicleId::new(index, 0)
    }

    /// Reserves the id the next [`insert`](Self::insert) will hand out.
    pub fn next_id(&self) -> VehicleId {
        match self.free_list.front() {
            Some(&index) => VehicleId::new(index, self.generations[index]),
            None => VehicleId::new(self.items.len(), 0),
        }
    }

    pub fn contains(&self, id: VehicleId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: VehicleId) -> Option<&T> {
        if self.is_valid(id) {
            self.items.get(id.index()).and_then(|slot| slot.as_ref())
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, id: VehicleId) -> Option<&mut T> {
        if self.is_valid(id) {
            self.items.get_mut(id.index()).and_then(|slot| slot.as_mut())
        } else {
            None
        }
    }

    /// Borrows two distinct slots mutably at once.
    pub fn get2_mut(&mut self, id_a: VehicleId, id_b: VehicleId) -> Option<(&mut T, &mut T)> {
        if id_a.index() == id_b.index() || !self.is_valid(id_a) || !self.is_valid(id_b) {
            return None;
        }

        let (first, second, flipped) = if id_a.index() < id_b.index() {
            (id_a, id_b, false)
        } else {
            (id_b, id_a, true)
        };

        let (left, right) = self.items.split_at_mut(second.index());
        let first_slot = left.get_mut(first.index()).and_then(|slot| slot.as_mut())?;
        let second_slot = right.get_mut(0).and_then(|slot| slot.as_mut())?;

        if flipped {
            Some((second_slot, first_slot))
        } else {
            Some((first_slot, second_slot))
        }
    }

    pub fn remove(&mut self, id: VehicleId) -> Option<T> {
        if !self.is_valid(id) {
            return None;
        }
        let slot = self.items.get_mut(id.index())?;
        let item = slot.take();
        if item.is_some() {
            self.generations[id.index()] = self.generations[id.index()].wrapping_add(1);
            self.free_list.push_back(id.index());
        }
        item
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.items.iter().filter_map(|slot| slot.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.items.iter_mut().filter_map(|slot| slot.as_mut())
    }

    pub fn iter_with_ids(&self) -> impl Iterator<Item = (VehicleId, &T)> + '_ {
        self.items.iter().enumerate().filter_map(|(index, slot)| {
            slot.as_ref()
                .map(|item| (VehicleId::new(index, self.generations[index]), item))
        })
    }

    pub fn ids(&self) -> Vec<VehicleId> {
        self.iter_with_ids().map(|(id, _)| id).collect()
    }

    pub fn len(&self) -> usize {
        self.items.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_valid(&self, id: VehicleId) -> bool {
        self.generations
            .get(id.index())
            .map(|&generation| generation == id.generation())
            .unwrap_or(false)
    }
}

#[cfg(feature = "parallel")]
impl<T: Send> Arena<T> {
    pub fn par_iter_mut(&mut self) -> impl rayon::iter::ParallelIterator<Item = &mut T> + '_ {
        use rayon::prelude::*;
        self.items.par_iter_mut().filter_map(|slot| slot.as_mut())
    }
}
