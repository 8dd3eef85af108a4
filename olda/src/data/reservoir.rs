//! Uniform reservoir sampling over an unbounded stream.

use rand::Rng;

/// Fixed-capacity uniform sample of a stream (Vitter's algorithm R).
///
/// After `n >= capacity` offers, every offered item is equally likely to be
/// resident in the reservoir.
#[derive(Clone, Debug)]
pub struct ReservoirSampler<T> {
    capacity: usize,
    seen: usize,
    slots: Vec<T>,
}

impl<T> ReservoirSampler<T> {
    /// Create an empty reservoir holding at most `capacity` items.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            seen: 0,
            slots: Vec::with_capacity(capacity),
        }
    }

    /// Offer an item to the reservoir.
    ///
    /// Returns the slot the item landed in, or `None` when the item was not
    /// retained. A capacity-zero reservoir retains nothing.
    pub fn add<R: Rng>(&mut self, item: T, rng: &mut R) -> Option<usize> {
        let outcome = if self.seen < self.capacity {
            self.slots.push(item);
            Some(self.seen)
        } else if self.capacity == 0 {
            None
        } else {
            let r = rng.random_range(0..=self.seen);
            if r < self.capacity {
                self.slots[r] = item;
                Some(r)
            } else {
                None
            }
        };
        self.seen += 1;
        outcome
    }

    /// The item currently resident in `slot`, if the slot is occupied.
    #[must_use]
    pub fn get(&self, slot: usize) -> Option<&T> {
        self.slots.get(slot)
    }

    /// Number of occupied slots: `min(seen, capacity)`.
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.slots.len()
    }

    /// Number of items ever offered.
    #[must_use]
    pub const fn seen(&self) -> usize {
        self.seen
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterate the occupied slots in slot order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.slots.iter()
    }
}
