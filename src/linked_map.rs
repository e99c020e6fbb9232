//! Ordered associative maps stored in a shared, fixed-capacity arena pool.
//!
//! Each map is a singly linked list of `(key, value)` nodes kept in ascending
//! key order. Nodes of every map live in one node [`Arena`]; map headers live
//! in a second, smaller arena, which bounds the number of live maps.
//!
//! Insertion is tuned for the access patterns of the probability engine:
//! - a key below the head or above the tail links in O(1) (descending and
//!   ascending construction);
//! - otherwise the walk starts at the last touched node when that node is not
//!   past the key, so runs of ascending keys stay amortised O(1).
//!
//! Maps are addressed by [`MapId`] and must be released explicitly with
//! [`LinkedMapPool::release`]; there is no implicit reclamation.

use std::ops::AddAssign;

use crate::arena::{Arena, ArenaError, SlotId};
use crate::error::{RaffleError, Result};
use crate::types::Resource;

const NIL: u32 = u32::MAX;

/// Handle to a live map of a [`LinkedMapPool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MapId(SlotId);

#[derive(Clone, Copy, Debug)]
struct Header {
    head: u32,
    tail: u32,
    /// Last inserted or updated node.
    cursor: u32,
    len: u32,
}

impl Header {
    const EMPTY: Header = Header {
        head: NIL,
        tail: NIL,
        cursor: NIL,
        len: 0,
    };
}

#[derive(Clone, Copy, Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    next: u32,
}

/// Position of an in-progress walk over one map. See [`LinkedMapPool::walk`].
#[derive(Clone, Copy, Debug)]
pub struct Walk {
    next: u32,
}

#[derive(Debug)]
pub struct LinkedMapPool<K, V> {
    headers: Arena<Header>,
    nodes: Arena<Node<K, V>>,
}

fn header_error(err: ArenaError) -> RaffleError {
    match err {
        ArenaError::OutOfCapacity { capacity } => {
            RaffleError::capacity(Resource::Distributions, capacity + 1, capacity)
        }
        ArenaError::StaleHandle => RaffleError::StaleHandle,
    }
}

fn node_error(err: ArenaError) -> RaffleError {
    match err {
        ArenaError::OutOfCapacity { capacity } => {
            RaffleError::capacity(Resource::DistributionNodes, capacity + 1, capacity)
        }
        ArenaError::StaleHandle => RaffleError::StaleHandle,
    }
}

impl<K, V> LinkedMapPool<K, V>
where
    K: Copy + Ord,
    V: Copy + Default + AddAssign,
{
    pub fn new(max_maps: usize, max_nodes: usize) -> Self {
        Self {
            headers: Arena::with_capacity(max_maps),
            nodes: Arena::with_capacity(max_nodes),
        }
    }

    /// Number of live maps.
    pub fn live_maps(&self) -> usize {
        self.headers.len()
    }

    /// Number of nodes held by all live maps.
    pub fn live_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, map: MapId) -> bool {
        self.headers.contains(map.0)
    }

    /// Allocate an empty map.
    pub fn create(&mut self) -> Result<MapId> {
        self.headers
            .allocate(Header::EMPTY)
            .map(MapId)
            .map_err(header_error)
    }

    fn header(&self, map: MapId) -> Result<Header> {
        self.headers.get(map.0).copied().map_err(header_error)
    }

    pub fn len(&self, map: MapId) -> Result<usize> {
        Ok(self.header(map)?.len as usize)
    }

    pub fn is_empty(&self, map: MapId) -> Result<bool> {
        Ok(self.header(map)?.len == 0)
    }

    /// Value stored under `key`, or `V::default()` when absent.
    pub fn get(&self, map: MapId, key: K) -> Result<V> {
        let mut at = self.header(map)?.head;
        while at != NIL {
            let node = self.nodes.at(at);
            if node.key >= key {
                return Ok(if node.key == key {
                    node.value
                } else {
                    V::default()
                });
            }
            at = node.next;
        }
        Ok(V::default())
    }

    fn new_node(&mut self, key: K, value: V, next: u32) -> Result<u32> {
        self.nodes
            .allocate(Node { key, value, next })
            .map(SlotId::index)
            .map_err(node_error)
    }

    /// Insert `key → delta`, or add `delta` to the existing value.
    pub fn accumulate(&mut self, map: MapId, key: K, delta: V) -> Result<()> {
        let mut header = self.header(map)?;

        if header.len == 0 {
            let at = self.new_node(key, delta, NIL)?;
            header.head = at;
            header.tail = at;
            header.cursor = at;
            header.len = 1;
            return self.store_header(map, header);
        }

        let head = *self.nodes.at(header.head);
        let tail = *self.nodes.at(header.tail);

        let touched = if key < head.key {
            let at = self.new_node(key, delta, header.head)?;
            header.head = at;
            header.len += 1;
            at
        } else if key > tail.key {
            let at = self.new_node(key, delta, NIL)?;
            self.nodes.at_mut(header.tail).next = at;
            header.tail = at;
            header.len += 1;
            at
        } else {
            let cursor = self.nodes.at(header.cursor);
            let mut prev = if cursor.key <= key {
                header.cursor
            } else {
                header.head
            };
            // Invariant: key(prev) <= key <= key(tail), so `next` exists until a match.
            loop {
                let node = *self.nodes.at(prev);
                if node.key == key {
                    self.nodes.at_mut(prev).value += delta;
                    break prev;
                }
                let next = node.next;
                if self.nodes.at(next).key > key {
                    let at = self.new_node(key, delta, next)?;
                    self.nodes.at_mut(prev).next = at;
                    header.len += 1;
                    break at;
                }
                prev = next;
            }
        };

        header.cursor = touched;
        self.store_header(map, header)
    }

    fn store_header(&mut self, map: MapId, header: Header) -> Result<()> {
        *self.headers.get_mut(map.0).map_err(header_error)? = header;
        Ok(())
    }

    /// Return every node and the header to the pool. The handle is dead afterwards.
    pub fn release(&mut self, map: MapId) -> Result<()> {
        let header = self.header(map)?;
        let mut at = header.head;
        while at != NIL {
            let next = self.nodes.at(at).next;
            self.nodes.release_at(at);
            at = next;
        }
        self.headers.release(map.0).map_err(header_error)
    }

    /// Start a walk in ascending key order.
    ///
    /// Unlike [`Self::iter`], a walk does not borrow the pool between steps,
    /// so other maps of the same pool may be mutated while walking. The walked
    /// map itself must not be mutated or released until the walk ends.
    pub fn walk(&self, map: MapId) -> Result<Walk> {
        Ok(Walk {
            next: self.header(map)?.head,
        })
    }

    pub fn step(&self, walk: &mut Walk) -> Option<(K, V)> {
        if walk.next == NIL {
            return None;
        }
        let node = self.nodes.at(walk.next);
        walk.next = node.next;
        Some((node.key, node.value))
    }

    /// Entries in ascending key order.
    pub fn iter(&self, map: MapId) -> Result<Iter<'_, K, V>> {
        Ok(Iter {
            pool: self,
            walk: self.walk(map)?,
        })
    }
}

pub struct Iter<'a, K, V> {
    pool: &'a LinkedMapPool<K, V>,
    walk: Walk,
}

impl<K, V> Iterator for Iter<'_, K, V>
where
    K: Copy + Ord,
    V: Copy + Default + AddAssign,
{
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        self.pool.step(&mut self.walk)
    }
}
