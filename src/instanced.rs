//! CPU-side per-instance attribute buffers.
//!
//! Each attribute is a flat `f32` array of `capacity * item_size` values that
//! the loops overwrite in place every frame. `update(count)` flags the first
//! `count` instances for upload; the renderer takes the pending range, writes
//! it to the matching GPU buffer and clears it.

use std::ops::Range;

/// Number of floats per instance for each attribute.
pub const POSITION_SIZE: usize = 3;
pub const QUATERNION_SIZE: usize = 4;
pub const SCALE_SIZE: usize = 3;
pub const COLOR_SIZE: usize = 4;

/// One instanced vertex attribute.
#[derive(Debug, Clone)]
pub struct InstancedAttribute {
    pub values: Vec<f32>,
    item_size: usize,
    pending: Option<usize>,
}

impl InstancedAttribute {
    /// Allocate `capacity` instances, each filled with `initial`.
    pub fn new(capacity: usize, initial: &[f32]) -> Self {
        let item_size = initial.len();
        let mut values = Vec::with_capacity(capacity * item_size);
        for _ in 0..capacity {
            values.extend_from_slice(initial);
        }
        Self {
            values,
            item_size,
            pending: None,
        }
    }

    pub fn item_size(&self) -> usize {
        self.item_size
    }

    /// Number of instances this attribute holds.
    pub fn capacity(&self) -> usize {
        if self.item_size == 0 {
            0
        } else {
            self.values.len() / self.item_size
        }
    }

    /// Values of instance `index`.
    pub fn get(&self, index: usize) -> &[f32] {
        let start = index * self.item_size;
        &self.values[start..start + self.item_size]
    }

    /// Overwrite instance `index` with `data` (must be `item_size` long).
    #[inline]
    pub fn set(&mut self, index: usize, data: &[f32]) {
        let start = index * self.item_size;
        self.values[start..start + self.item_size].copy_from_slice(data);
    }

    /// Flag the first `count` instances for upload. Clamped to capacity.
    pub fn update(&mut self, count: usize) {
        let count = count.min(self.capacity());
        self.pending = Some(self.pending.map_or(count, |p| p.max(count)));
    }

    pub fn is_dirty(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the pending upload as a float range into `values`, clearing it.
    pub fn take_pending(&mut self) -> Option<Range<usize>> {
        self.pending.take().map(|count| 0..count * self.item_size)
    }
}

/// The four attribute buffers of an instanced mesh, kept index-aligned.
#[derive(Debug, Clone)]
pub struct InstancedGeometry {
    pub positions: InstancedAttribute,
    pub quaternions: InstancedAttribute,
    pub scales: InstancedAttribute,
    pub colors: InstancedAttribute,
    count: usize,
}

impl InstancedGeometry {
    /// Allocate buffers for `count` instances at the rest pose: origin,
    /// identity rotation, unit scale, mid-grey opaque colour.
    pub fn new(count: usize) -> Self {
        Self {
            positions: InstancedAttribute::new(count, &[0.0, 0.0, 0.0]),
            quaternions: InstancedAttribute::new(count, &[0.0, 0.0, 0.0, 1.0]),
            scales: InstancedAttribute::new(count, &[1.0, 1.0, 1.0]),
            colors: InstancedAttribute::new(count, &[0.5, 0.5, 0.5, 1.0]),
            count,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Flag all four attributes for upload.
    pub fn update(&mut self, count: usize) {
        self.positions.update(count);
        self.quaternions.update(count);
        self.scales.update(count);
        self.colors.update(count);
    }

    pub fn attributes(&self) -> [&InstancedAttribute; 4] {
        [&self.positions, &self.quaternions, &self.scales, &self.colors]
    }

    pub fn attributes_mut(&mut self) -> [&mut InstancedAttribute; 4] {
        [
            &mut self.positions,
            &mut self.quaternions,
            &mut self.scales,
            &mut self.colors,
        ]
    }
}
