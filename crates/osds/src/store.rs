//! Hobject-keyed object store: an ordered map of objects, each holding an
//! ordered map of fixed-size blocks.

use crate::wire::BLOCK_SIZE;
use denc::HObject;
use std::collections::BTreeMap;

/// A fixed 64 KiB storage unit keyed by its block-aligned offset within an
/// object.
pub struct Block {
    pub offset: u64,
    pub bytes: Box<[u8; BLOCK_SIZE]>,
}

impl Block {
    fn new(offset: u64) -> Self {
        Block {
            offset,
            bytes: Box::new([0u8; BLOCK_SIZE]),
        }
    }
}

/// An in-memory object: its sparse block map, logical size, and mtime.
pub struct Object {
    pub hoid: HObject,
    pub blocks: BTreeMap<u64, Block>,
    pub size: u64,
    pub mtime_sec: u32,
    pub mtime_nsec: u32,
}

impl Object {
    fn new(hoid: HObject) -> Self {
        Object {
            hoid,
            blocks: BTreeMap::new(),
            size: 0,
            mtime_sec: 0,
            mtime_nsec: 0,
        }
    }
}

/// The process-wide, single-threaded store. No locking: the dispatcher is
/// the only mutator and runs to completion without yielding per request.
#[derive(Default)]
pub struct Store {
    objects: BTreeMap<HObject, Object>,
}

impl Store {
    pub fn new() -> Self {
        Store {
            objects: BTreeMap::new(),
        }
    }

    pub fn lookup_object(&mut self, hoid: &HObject) -> Option<&mut Object> {
        self.objects.get_mut(hoid)
    }

    /// Insert an object for `hoid` if absent and return it either way.
    pub fn create_object(&mut self, hoid: &HObject) -> &mut Object {
        self.objects
            .entry(hoid.clone())
            .or_insert_with(|| Object::new(hoid.clone()))
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}

impl Object {
    pub fn lookup_block(&mut self, aligned_off: u64) -> Option<&mut Block> {
        self.blocks.get_mut(&aligned_off)
    }

    /// Create a zero-filled block at `aligned_off` if absent.
    pub fn upsert_block(&mut self, aligned_off: u64) -> &mut Block {
        self.blocks
            .entry(aligned_off)
            .or_insert_with(|| Block::new(aligned_off))
    }

    /// The nearest block with offset >= `aligned_off`, used by READ to
    /// locate sparse-read holes.
    pub fn first_block_at_or_after(&self, aligned_off: u64) -> Option<&Block> {
        self.blocks.range(aligned_off..).next().map(|(_, b)| b)
    }
}
