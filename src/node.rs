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
use crate::profile::TileKey;
use crate::render::render_model::RenderModel;
use nalgebra::Matrix3;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// The surface region a `TileNode` covers plus the elevation range used for
/// horizon/frustum culling. Derived from the tile's extent and whichever
/// heightfield (own or inherited) last updated `max_height`/`min_height`.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingVolume {
    pub extent: crate::spatial::GeoExtent,
    pub min_height: f32,
    pub max_height: f32,
}

impl BoundingVolume {
    fn for_key(key: &TileKey) -> BoundingVolume {
        BoundingVolume {
            extent: key.extent(),
            min_height: 0.0,
            max_height: 0.0,
        }
    }
}

/// Pulls the texture-space 2D scale-bias out of a `TileKey`'s 4x4 quadrant
/// matrix (which packs it as an affine transform on x/y, identity on z/w).
fn scale_bias_3x3(key: &TileKey) -> Matrix3<f64> {
    let m = key.scale_bias_matrix();
    Matrix3::new(
        m[(0, 0)], 0.0, m[(0, 3)],
        0.0, m[(1, 1)], m[(1, 3)],
        0.0, 0.0, 1.0,
    )
}

/// A rendering tile: a `TileKey`, its current render model, a bounding
/// volume, an optional quad of children, and the traversal bookkeeping the
/// pager reads at ping time. `H` is the graphics context's resource handle
/// type, threaded through from `RenderModel`.
pub struct TileNode<H> {
    pub key: TileKey,
    pub render_model: Mutex<Option<RenderModel<H>>>,
    pub bounding_volume: Mutex<BoundingVolume>,
    pub children: Mutex<Option<Box<[TileNode<H>; 4]>>>,
    last_traversal_frame: AtomicU64,
    last_traversal_range: Mutex<f64>,
    last_traversal_time: Mutex<f64>,
    pub do_not_expire: AtomicBool,
    revision: AtomicU64,
}

impl<H> TileNode<H> {
    pub fn new(key: TileKey) -> TileNode<H> {
        let bounding_volume = BoundingVolume::for_key(&key);
        TileNode {
            key,
            render_model: Mutex::new(None),
            bounding_volume: Mutex::new(bounding_volume),
            children: Mutex::new(None),
            last_traversal_frame: AtomicU64::new(0),
            last_traversal_range: Mutex::new(f64::MAX),
            last_traversal_time: Mutex::new(0.0),
            do_not_expire: AtomicBool::new(false),
            revision: AtomicU64::new(0),
        }
    }

    pub fn record_traversal(&self, frame: u64, range: f64, time: f64) {
        self.last_traversal_frame.store(frame, Ordering::Relaxed);
        *self.last_traversal_range.lock() = range;
        *self.last_traversal_time.lock() = time;
    }

    pub fn last_traversal_frame(&self) -> u64 {
        self.last_traversal_frame.load(Ordering::Relaxed)
    }

    pub fn last_traversal_range(&self) -> f64 {
        *self.last_traversal_range.lock()
    }

    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Relaxed)
    }

    pub fn bump_revision(&self) {
        self.revision.fetch_add(1, Ordering::Relaxed);
    }
}

impl<H: Clone> TileNode<H> {
    /// Seeds this (presumably just-created) node's render model from its
    /// parent's, scaled and biased into this tile's quadrant, so the tile is
    /// immediately renderable as a down-scaled view of the parent until its
    /// own data arrives.
    pub fn inherit_from(&self, parent: &TileNode<H>) {
        let scale_bias = scale_bias_3x3(&self.key);

        let parent_model = parent.render_model.lock().clone();
        let inherited = parent_model.map(|mut model| {
            model.color_matrix = scale_bias * model.color_matrix;
            model.elevation_matrix = scale_bias * model.elevation_matrix;
            model
        });
        *self.render_model.lock() = inherited;

        let parent_bounds = parent.bounding_volume.lock().clone();
        let mut bounds = self.bounding_volume.lock();
        bounds.min_height = parent_bounds.min_height;
        bounds.max_height = parent_bounds.max_height;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::profile::Profile;
    use crate::render::render_model::TileUniform;

    fn key_at(level: u32, x: u32, y: u32) -> TileKey {
        let profile = Profile::well_known("global-geodetic").unwrap();
        TileKey::new(level, x, y, profile)
    }

    #[test]
    fn new_node_has_no_render_model() {
        let node: TileNode<u32> = TileNode::new(key_at(0, 0, 0));
        assert!(node.render_model.lock().is_none());
    }

    #[test]
    fn child_inherits_parent_render_model_scaled() {
        let parent: TileNode<u32> = TileNode::new(key_at(0, 0, 0));
        *parent.render_model.lock() = Some(RenderModel {
            color: Some(7),
            color_matrix: Matrix3::identity(),
            elevation: None,
            elevation_matrix: Matrix3::identity(),
            uniform: TileUniform::default(),
        });
        parent.bounding_volume.lock().max_height = 500.0;

        let child: TileNode<u32> = TileNode::new(key_at(0, 0, 0).create_child_key(2));
        child.inherit_from(&parent);

        let model = child.render_model.lock();
        assert_eq!(model.as_ref().unwrap().color, Some(7));
        assert_ne!(model.as_ref().unwrap().color_matrix, Matrix3::identity());
        assert_eq!(child.bounding_volume.lock().max_height, 500.0);
    }

    #[test]
    fn traversal_bookkeeping_round_trips() {
        let node: TileNode<u32> = TileNode::new(key_at(0, 0, 0));
        node.record_traversal(3, 42.0, 1.5);
        assert_eq!(node.last_traversal_frame(), 3);
        assert_eq!(node.last_traversal_range(), 42.0);
    }
}
