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
use crate::cancel::Cancelable;
use crate::model::TileModel;
use crate::profile::TileKey;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// State of one of a tile's three pipeline stages (`childrenCreator`,
/// `dataLoader`, `dataMerger`). Mirrors the original's future-based
/// `has_value()`/`available()`/`empty()` checks without holding an actual
/// future: `update()` drives the transitions synchronously per frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Stage {
    #[default]
    Empty,
    Pending,
    Done,
}

impl Stage {
    pub fn is_empty(&self) -> bool {
        matches!(self, Stage::Empty)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Stage::Pending)
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Stage::Done)
    }
}

/// A resident tile: the pipeline-stage state machine plus the last fetched
/// model. Held behind `Arc` in the pager's tile table so jobs can hold a
/// clone while they run.
pub struct Entry {
    pub key: TileKey,
    pub do_not_expire: AtomicBool,
    pub needs_subtiles: AtomicBool,
    pub needs_update: AtomicBool,
    pub last_traversal_range: Mutex<f64>,
    pub children_creator: Mutex<Stage>,
    pub data_loader: Mutex<Stage>,
    pub data_merger: Mutex<Stage>,
    pub model: Mutex<Option<TileModel>>,
    pub cancel: Cancelable,
}

impl Entry {
    pub fn new(key: TileKey) -> Entry {
        Entry {
            key,
            do_not_expire: AtomicBool::new(false),
            needs_subtiles: AtomicBool::new(false),
            needs_update: AtomicBool::new(false),
            last_traversal_range: Mutex::new(f64::MAX),
            children_creator: Mutex::new(Stage::Empty),
            data_loader: Mutex::new(Stage::Empty),
            data_merger: Mutex::new(Stage::Empty),
            model: Mutex::new(None),
            cancel: Cancelable::new(),
        }
    }

    pub fn priority(&self) -> f64 {
        -(self.last_traversal_range.lock().max(0.0).sqrt() * self.key.level as f64)
    }

    pub fn do_not_expire(&self) -> bool {
        self.do_not_expire.load(Ordering::Relaxed)
    }
}
