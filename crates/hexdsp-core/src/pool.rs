use std::fmt::Debug;

/// A stable handle to an entry in a [`Pool`].
///
/// Keys are generational: removing an entry bumps its slot's generation, so
/// a key held past `remove` resolves to `None` rather than to whatever value
/// happens to occupy the slot next.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PoolKey {
    slot: u32,
    generation: u32,
}

impl PoolKey {
    pub const DANGLING: Self = Self {
        slot: u32::MAX,
        generation: 0,
    };

    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl Default for PoolKey {
    fn default() -> Self {
        Self::DANGLING
    }
}

impl Debug for PoolKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.slot, self.generation)
    }
}

enum Slot<T> {
    Occupied { generation: u32, value: T },
    Vacant { generation: u32, next_free: Option<u32> },
}

/// A fixed-capacity object pool with an intrusive free list.
///
/// `with_capacity` eagerly materialises every slot, so insertion through
/// [`Pool::insert_within_capacity`] never touches the heap; that entry point
/// fails instead of growing, which is what real-time callers need. The plain
/// [`Pool::insert`] extends the backing storage when the free list runs dry.
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<u32>,
    len: usize,
}

impl<T> Pool<T> {
    /// Create a pool with `capacity` vacant slots threaded on the free list.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        for i in 0..capacity {
            let next_free = if i + 1 < capacity {
                Some(i as u32 + 1)
            } else {
                None
            };
            slots.push(Slot::Vacant {
                generation: 0,
                next_free,
            });
        }

        Self {
            slots,
            free_head: if capacity > 0 { Some(0) } else { None },
            len: 0,
        }
    }

    /// Insert a value, extending the backing storage if the free list is
    /// empty.
    pub fn insert(&mut self, value: T) -> PoolKey {
        match self.insert_within_capacity(value) {
            Ok(key) => key,
            Err(value) => {
                let slot = self.slots.len() as u32;
                self.slots.push(Slot::Occupied {
                    generation: 0,
                    value,
                });
                self.len += 1;

                PoolKey {
                    slot,
                    generation: 0,
                }
            }
        }
    }

    /// Insert a value without allocating. If the free list is empty the
    /// value is handed back so the caller can surface an out-of-capacity
    /// error.
    pub fn insert_within_capacity(&mut self, value: T) -> Result<PoolKey, T> {
        let Some(slot) = self.free_head else {
            return Err(value);
        };

        // The free list only ever threads through vacant slots.
        let (generation, next_free) = match &self.slots[slot as usize] {
            Slot::Vacant {
                generation,
                next_free,
            } => (*generation, *next_free),
            Slot::Occupied { .. } => unreachable!("occupied slot on the pool free list"),
        };

        self.free_head = next_free;
        self.slots[slot as usize] = Slot::Occupied { generation, value };
        self.len += 1;

        Ok(PoolKey { slot, generation })
    }

    /// Vacate the slot behind `key` and push it back on the free list. Keys
    /// to other entries stay valid.
    pub fn remove(&mut self, key: PoolKey) -> Option<T> {
        let entry = self.slots.get_mut(key.slot as usize)?;

        match entry {
            Slot::Occupied { generation, .. } if *generation == key.generation => {
                let vacant = Slot::Vacant {
                    generation: key.generation.wrapping_add(1),
                    next_free: self.free_head,
                };
                let old = std::mem::replace(entry, vacant);
                self.free_head = Some(key.slot);
                self.len -= 1;

                match old {
                    Slot::Occupied { value, .. } => Some(value),
                    Slot::Vacant { .. } => unreachable!(),
                }
            }
            _ => None,
        }
    }

    pub fn get(&self, key: PoolKey) -> Option<&T> {
        match self.slots.get(key.slot as usize)? {
            Slot::Occupied { generation, value } if *generation == key.generation => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: PoolKey) -> Option<&mut T> {
        match self.slots.get_mut(key.slot as usize)? {
            Slot::Occupied { generation, value } if *generation == key.generation => Some(value),
            _ => None,
        }
    }

    pub fn contains(&self, key: PoolKey) -> bool {
        self.get(key).is_some()
    }

    /// The number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The number of materialised slots, live or vacant.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PoolKey, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| match slot {
            Slot::Occupied { generation, value } => Some((
                PoolKey {
                    slot: i as u32,
                    generation: *generation,
                },
                value,
            )),
            Slot::Vacant { .. } => None,
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (PoolKey, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| match slot {
                Slot::Occupied { generation, value } => Some((
                    PoolKey {
                        slot: i as u32,
                        generation: *generation,
                    },
                    value,
                )),
                Slot::Vacant { .. } => None,
            })
    }
}
