//! Per-worker logical memory pool.
//!
//! All protection is enforced in-process; there is no OS/MMU involvement.
//! Ownership is required for mutation (`write`, `free`, `protect`) but not
//! for observation (`read`), so inspector tasks get a read-only view without
//! ceremony.
//!
//! Not thread-safe: access must be serialized by the owning scheduler (one
//! scheduler per worker, no sharing across workers).

use std::collections::HashMap;

use crate::core::error::MemoryError;

/// Descriptor for one allocated region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Unique region identifier within one pool (e.g. `task_id + "/stack"`).
    pub id: String,
    /// Task that owns and can mutate this region.
    pub owner_task_id: String,
    /// Region size in bytes.
    pub size: usize,
    /// Whether the region has been sealed against writes.
    pub read_only: bool,
}

/// Logical memory pool with ownership, bounds, and capacity invariants.
#[derive(Debug)]
pub struct MemoryPool {
    max_bytes: usize,
    used_bytes: usize,
    regions: HashMap<String, Region>,
    storage: HashMap<String, Vec<u8>>,
}

impl MemoryPool {
    /// Create a pool with `max_bytes` of logical capacity.
    #[must_use]
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            used_bytes: 0,
            regions: HashMap::new(),
            storage: HashMap::new(),
        }
    }

    /// Allocate a new zero-filled region owned by `owner_task_id`.
    ///
    /// Returns the region descriptor.
    ///
    /// # Errors
    ///
    /// [`MemoryError`] on zero size, capacity exhaustion, or duplicate id.
    pub fn alloc(
        &mut self,
        region_id: &str,
        owner_task_id: &str,
        size: usize,
    ) -> Result<Region, MemoryError> {
        if size == 0 {
            return Err(MemoryError::ZeroSize);
        }
        if self.used_bytes + size > self.max_bytes {
            return Err(MemoryError::OutOfMemory {
                needed: size,
                free: self.max_bytes - self.used_bytes,
            });
        }
        if self.regions.contains_key(region_id) {
            return Err(MemoryError::DuplicateRegion(region_id.to_string()));
        }

        let region = Region {
            id: region_id.to_string(),
            owner_task_id: owner_task_id.to_string(),
            size,
            read_only: false,
        };
        self.regions.insert(region_id.to_string(), region.clone());
        self.storage.insert(region_id.to_string(), vec![0; size]);
        self.used_bytes += size;
        Ok(region)
    }

    /// Free a region and release its bytes.
    ///
    /// # Errors
    ///
    /// [`MemoryError`] if the region is unknown or the requester is not the
    /// owner.
    pub fn free(&mut self, region_id: &str, requester_task_id: &str) -> Result<(), MemoryError> {
        let region = self.require_region(region_id)?;
        Self::ensure_owner(region, requester_task_id)?;
        let size = region.size;
        self.regions.remove(region_id);
        self.storage.remove(region_id);
        self.used_bytes -= size;
        Ok(())
    }

    /// Read `length` bytes starting at `offset`. No ownership check.
    ///
    /// Zero-length reads return an empty slice, including at
    /// `offset == region.size`.
    ///
    /// # Errors
    ///
    /// [`MemoryError`] on unknown region or out-of-bounds access.
    pub fn read(
        &self,
        region_id: &str,
        offset: usize,
        length: usize,
    ) -> Result<&[u8], MemoryError> {
        let region = self.require_region(region_id)?;
        Self::ensure_bounds(region, offset, length)?;
        let buf = &self.storage[region_id];
        Ok(&buf[offset..offset + length])
    }

    /// Write `data` into the region at `offset`. Owner-only.
    ///
    /// # Errors
    ///
    /// [`MemoryError`] on unknown region, read-only region, owner mismatch,
    /// or out-of-bounds access.
    pub fn write(
        &mut self,
        region_id: &str,
        requester_task_id: &str,
        offset: usize,
        data: &[u8],
    ) -> Result<(), MemoryError> {
        let region = self.require_region(region_id)?;
        if region.read_only {
            return Err(MemoryError::ReadOnly(region_id.to_string()));
        }
        Self::ensure_owner(region, requester_task_id)?;
        Self::ensure_bounds(region, offset, data.len())?;
        let buf = self
            .storage
            .get_mut(region_id)
            .expect("storage tracks regions");
        buf[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Seal a region against further writes. Owner-only.
    ///
    /// # Errors
    ///
    /// [`MemoryError`] if the region is unknown or the requester is not the
    /// owner.
    pub fn protect(&mut self, region_id: &str, requester_task_id: &str) -> Result<(), MemoryError> {
        let region = self.require_region(region_id)?;
        Self::ensure_owner(region, requester_task_id)?;
        self.regions
            .get_mut(region_id)
            .expect("region exists")
            .read_only = true;
        Ok(())
    }

    /// Free every region owned by `owner_task_id`; returns bytes released.
    ///
    /// Called by the scheduler when the owning task reaches a terminal
    /// state.
    pub fn release_owned(&mut self, owner_task_id: &str) -> usize {
        let owned: Vec<String> = self
            .regions
            .values()
            .filter(|r| r.owner_task_id == owner_task_id)
            .map(|r| r.id.clone())
            .collect();
        let mut released = 0;
        for id in owned {
            let region = self.regions.remove(&id).expect("listed above");
            self.storage.remove(&id);
            self.used_bytes -= region.size;
            released += region.size;
        }
        released
    }

    /// Bytes currently allocated.
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    /// Bytes still available.
    #[must_use]
    pub fn free_bytes(&self) -> usize {
        self.max_bytes - self.used_bytes
    }

    /// Number of live regions.
    #[must_use]
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    fn require_region(&self, region_id: &str) -> Result<&Region, MemoryError> {
        self.regions
            .get(region_id)
            .ok_or_else(|| MemoryError::UnknownRegion(region_id.to_string()))
    }

    fn ensure_bounds(region: &Region, offset: usize, length: usize) -> Result<(), MemoryError> {
        // offset + length covers the zero-length edge cases cleanly
        if offset.checked_add(length).map_or(true, |end| end > region.size) {
            return Err(MemoryError::OutOfBounds {
                offset,
                length,
                size: region.size,
            });
        }
        Ok(())
    }

    fn ensure_owner(region: &Region, requester_task_id: &str) -> Result<(), MemoryError> {
        if region.owner_task_id != requester_task_id {
            return Err(MemoryError::OwnerMismatch {
                owner: region.owner_task_id.clone(),
                requester: requester_task_id.to_string(),
            });
        }
        Ok(())
    }
}
