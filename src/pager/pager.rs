// This file is part of Nitrogen.
//
// Nitrogen is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// Nitrogen is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with Nitrogen.  If not, see <http://www.gnu.org/licenses/>.
use crate::layer::Map;
use crate::model::create_tile_model;
use crate::pager::entry::{Entry, Stage};
use crate::pager::tracker::Tracker;
use crate::profile::TileKey;
use futures::future::join_all;
use log::warn;
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::runtime::Handle;

/// The resident tile table plus the ping/flush tracker and the four deferred
/// work queues (`createChildren`/`loadData`/`mergeData`/`updateData`).
pub struct TilePager {
    tiles: RwLock<HashMap<TileKey, Arc<Entry>>>,
    tracker: Mutex<Tracker>,
    tile_cache_size: u64,
    create_children_queue: Mutex<HashSet<TileKey>>,
    load_data_queue: Mutex<HashSet<TileKey>>,
    merge_data_queue: Mutex<HashSet<TileKey>>,
    update_data_queue: Mutex<HashSet<TileKey>>,
}

impl TilePager {
    pub fn new(tile_cache_size: u64) -> TilePager {
        TilePager {
            tiles: RwLock::new(HashMap::new()),
            tracker: Mutex::new(Tracker::new()),
            tile_cache_size,
            create_children_queue: Mutex::new(HashSet::new()),
            load_data_queue: Mutex::new(HashSet::new()),
            merge_data_queue: Mutex::new(HashSet::new()),
            update_data_queue: Mutex::new(HashSet::new()),
        }
    }

    pub fn resident_count(&self) -> usize {
        self.tiles.read().len()
    }

    pub fn entry(&self, key: &TileKey) -> Option<Arc<Entry>> {
        self.tiles.read().get(key).cloned()
    }

    fn get_or_create(&self, key: &TileKey) -> Arc<Entry> {
        let mut tiles = self.tiles.write();
        tiles
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Entry::new(key.clone())))
            .clone()
    }

    /// Called at the end of render traversal for every visited tile. May run
    /// concurrently from multiple traversal threads; all enqueue operations
    /// below are idempotent (backed by sets, not counters).
    pub fn ping(&self, key: &TileKey, traversal_range: f64, needs_subtiles: bool, needs_update: bool) {
        let entry = self.get_or_create(key);
        *entry.last_traversal_range.lock() = traversal_range;
        entry.needs_subtiles.store(needs_subtiles, Ordering::Relaxed);
        entry.needs_update.store(needs_update, Ordering::Relaxed);
        self.tracker.lock().ping(key);

        if needs_subtiles
            && entry.children_creator.lock().is_empty()
            && entry.data_merger.lock().is_done()
        {
            self.create_children_queue.lock().insert(key.clone());
        }

        if entry.data_loader.lock().is_empty() {
            let ready = match key.create_parent_key() {
                None => true,
                Some(parent_key) => self
                    .tiles
                    .read()
                    .get(&parent_key)
                    .map_or(false, |p| p.data_merger.lock().is_done()),
            };
            if ready {
                self.load_data_queue.lock().insert(key.clone());
            }
        }

        if entry.data_loader.lock().is_done() && entry.data_merger.lock().is_empty() {
            self.merge_data_queue.lock().insert(key.clone());
        }

        if needs_update {
            self.update_data_queue.lock().insert(key.clone());
        }
    }

    /// Runs once per frame on the render thread: drains the four queues in
    /// order, dispatching loader/child-creation work onto `pool` and doing
    /// merge/update work inline, then flushes unpinged tiles.
    pub async fn update(&self, map: &Arc<Map>, pool: &Handle) {
        self.update_data_queue.lock().drain().for_each(|_key| {
            // Tile-local render-side update hook; the render model itself is
            // owned by `render::updater`, invoked by the caller after merge.
        });

        // Fans the (typically small) set of quad-split tiles this frame out
        // across the CPU pool, mirroring tile_builder's rayon-driven child
        // construction rather than walking them one at a time.
        let children_keys: Vec<_> = self.create_children_queue.lock().drain().collect();
        children_keys.par_iter().for_each(|key| {
            if let Some(entry) = self.entry(key) {
                *entry.children_creator.lock() = Stage::Pending;
                for quadrant in 0..4u32 {
                    let child_key = key.create_child_key(quadrant);
                    self.get_or_create(&child_key);
                }
                *entry.children_creator.lock() = Stage::Done;
                entry.needs_subtiles.store(false, Ordering::Relaxed);
            }
        });

        let load_keys: Vec<_> = self.load_data_queue.lock().drain().collect();
        let mut dispatched = Vec::with_capacity(load_keys.len());
        for key in load_keys {
            if let Some(entry) = self.entry(&key) {
                *entry.data_loader.lock() = Stage::Pending;
                let map = map.clone();
                let cancel = entry.cancel.clone();
                let k = key.clone();
                let join = pool.spawn(async move { create_tile_model(&map, &k, &cancel).await });
                dispatched.push((key, entry, join));
            }
        }
        let (keyed, joins): (Vec<_>, Vec<_>) = dispatched.into_iter().map(|(k, e, j)| ((k, e), j)).unzip();
        for ((key, entry), result) in keyed.into_iter().zip(join_all(joins).await) {
            match result {
                Ok(model) => {
                    if entry.cancel.is_canceled() {
                        *entry.data_loader.lock() = Stage::Empty;
                        continue;
                    }
                    *entry.model.lock() = Some(model);
                    *entry.data_loader.lock() = Stage::Done;
                }
                Err(e) => {
                    warn!("load-data job for {} panicked: {}", key, e);
                    *entry.data_loader.lock() = Stage::Empty;
                }
            }
        }

        let merge_keys: Vec<_> = self.merge_data_queue.lock().drain().collect();
        for key in merge_keys {
            if let Some(entry) = self.entry(&key) {
                *entry.data_merger.lock() = Stage::Done;
            }
        }

        self.flush();
    }

    /// Disposes every tracked tile not pinged within `tile_cache_size`
    /// frames, skipping anything marked `do_not_expire`. A non-root tile
    /// only goes away together with its 3 siblings: if any sibling is still
    /// pinned or hasn't itself expired, the whole quad stays resident.
    fn flush(&self) {
        let expired: HashSet<TileKey> = self
            .tracker
            .lock()
            .expired(self.tile_cache_size.max(1))
            .into_iter()
            .collect();
        let mut tiles = self.tiles.write();
        let mut tracker = self.tracker.lock();

        let mut to_evict = Vec::new();
        let mut visited = HashSet::new();

        for key in &expired {
            if visited.contains(key) {
                continue;
            }
            let entry = match tiles.get(key) {
                Some(e) => e,
                None => continue,
            };
            if entry.do_not_expire() {
                visited.insert(key.clone());
                continue;
            }

            match key.create_parent_key() {
                None => {
                    to_evict.push(key.clone());
                    visited.insert(key.clone());
                }
                Some(parent) => {
                    let quad: Vec<TileKey> = (0..4u32).map(|q| parent.create_child_key(q)).collect();
                    let quad_ready = quad.iter().all(|sibling| match tiles.get(sibling) {
                        None => true,
                        Some(sib_entry) => !sib_entry.do_not_expire() && expired.contains(sibling),
                    });
                    for sibling in &quad {
                        visited.insert(sibling.clone());
                    }
                    if quad_ready {
                        to_evict.extend(quad.into_iter().filter(|k| tiles.contains_key(k)));
                    }
                }
            }
        }

        for key in to_evict {
            if let Some(entry) = tiles.get(&key) {
                entry.cancel.cancel();
            }
            tiles.remove(&key);
            tracker.forget(&key);
        }
    }

    pub fn advance_frame(&self) {
        self.tracker.lock().advance_frame();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::profile::Profile;

    fn root_key() -> TileKey {
        let profile = Profile::well_known("global-geodetic").unwrap();
        TileKey::new(0, 0, 0, profile)
    }

    #[test]
    fn root_ping_enqueues_load_data_unconditionally() {
        let pager = TilePager::new(8);
        let key = root_key();
        pager.ping(&key, 100.0, false, false);
        assert!(pager.load_data_queue.lock().contains(&key));
    }

    #[test]
    fn child_ping_does_not_enqueue_load_until_parent_merges() {
        let pager = TilePager::new(8);
        let parent = root_key();
        let child = parent.create_child_key(0);

        pager.ping(&parent, 100.0, false, false);
        pager.ping(&child, 50.0, false, false);
        assert!(!pager.load_data_queue.lock().contains(&child));

        let parent_entry = pager.entry(&parent).unwrap();
        *parent_entry.data_merger.lock() = Stage::Done;
        pager.ping(&child, 50.0, false, false);
        assert!(pager.load_data_queue.lock().contains(&child));
    }

    #[test]
    fn unpinged_tile_is_evicted_on_flush() {
        let pager = TilePager::new(2);
        let key = root_key();
        pager.ping(&key, 10.0, false, false);
        for _ in 0..5 {
            pager.advance_frame();
        }
        pager.flush();
        assert!(pager.entry(&key).is_none());
    }

    #[test]
    fn sibling_quad_is_evicted_together() {
        let pager = TilePager::new(2);
        let parent = root_key();
        let children: Vec<_> = (0..4u32).map(|q| parent.create_child_key(q)).collect();
        for child in &children {
            pager.ping(child, 10.0, false, false);
        }
        for _ in 0..5 {
            pager.advance_frame();
        }
        pager.flush();
        for child in &children {
            assert!(pager.entry(child).is_none());
        }
    }

    #[test]
    fn quad_with_one_unexpired_sibling_stays_resident() {
        let pager = TilePager::new(2);
        let parent = root_key();
        let children: Vec<_> = (0..4u32).map(|q| parent.create_child_key(q)).collect();
        for child in &children {
            pager.ping(child, 10.0, false, false);
        }
        for _ in 0..5 {
            pager.advance_frame();
        }
        // re-ping one sibling this frame so it's no longer expired.
        pager.ping(&children[0], 10.0, false, false);
        pager.flush();
        for child in &children {
            assert!(pager.entry(child).is_some());
        }
    }

    #[test]
    fn do_not_expire_tile_survives_flush() {
        let pager = TilePager::new(1);
        let key = root_key();
        pager.ping(&key, 10.0, false, false);
        pager.entry(&key).unwrap().do_not_expire.store(true, Ordering::Relaxed);
        for _ in 0..5 {
            pager.advance_frame();
        }
        pager.flush();
        assert!(pager.entry(&key).is_some());
    }
}
