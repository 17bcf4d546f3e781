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
use crate::config::CachePolicy;
use crate::error::{Failure, Result, Status};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_UID: AtomicU64 = AtomicU64::new(1);

/// What a layer produces. Stands in for the C++ inheritance chain
/// `Layer -> TileLayer -> ImageLayer/ElevationLayer`: a `Layer` carries one
/// of these tags plus whichever capability traits apply to that kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Color,
    Elevation,
}

#[derive(Default)]
struct Callbacks {
    on_open: Vec<Box<dyn Fn() + Send + Sync>>,
    on_close: Vec<Box<dyn Fn() + Send + Sync>>,
    on_change: Vec<Box<dyn Fn() + Send + Sync>>,
}

struct State {
    status: Status,
    revision: u64,
}

/// Lifecycle node shared by every tiled data source: open/close state,
/// revision counter, and change callbacks. `TileLayer`/`ImageLayer`/
/// `ElevationLayer` embed one of these rather than inherit from it.
pub struct Layer {
    uid: u64,
    name: RwLock<String>,
    kind: Kind,
    open_automatically: bool,
    cache_policy: CachePolicy,
    opacity: RwLock<f32>,
    state: RwLock<State>,
    callbacks: RwLock<Callbacks>,
}

impl Layer {
    pub fn new(kind: Kind, name: impl Into<String>) -> Layer {
        Layer {
            uid: NEXT_UID.fetch_add(1, Ordering::Relaxed),
            name: RwLock::new(name.into()),
            kind,
            open_automatically: true,
            cache_policy: CachePolicy::ReadWrite,
            opacity: RwLock::new(1.0),
            state: RwLock::new(State {
                status: Status::Ok,
                revision: 0,
            }),
            callbacks: RwLock::new(Callbacks::default()),
        }
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn name(&self) -> String {
        self.name.read().clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        *self.name.write() = name.into();
        self.touch();
    }

    pub fn opacity(&self) -> f32 {
        *self.opacity.read()
    }

    pub fn set_opacity(&self, opacity: f32) {
        *self.opacity.write() = opacity;
        self.touch();
    }

    pub fn cache_policy(&self) -> CachePolicy {
        self.cache_policy
    }

    pub fn open_automatically(&self) -> bool {
        self.open_automatically
    }

    pub fn status(&self) -> Status {
        self.state.read().status.clone()
    }

    pub fn revision(&self) -> u64 {
        self.state.read().revision
    }

    pub fn is_open(&self) -> bool {
        self.state.read().status.ok()
    }

    /// Idempotent: calling `open` on an already-open layer is a no-op that
    /// returns the current status. `body` is the concrete
    /// `openImplementation` (e.g. `TileLayer` fetching its profile).
    pub fn open(&self, body: impl FnOnce() -> Result<()>) -> Status {
        let mut state = self.state.write();
        if state.status.ok() {
            return state.status.clone();
        }
        state.status = match body() {
            Ok(()) => Status::Ok,
            Err(e) => Status::Error(e),
        };
        state.revision += 1;
        let status = state.status.clone();
        drop(state);
        for cb in &self.callbacks.read().on_open {
            cb();
        }
        status
    }

    pub fn close(&self) {
        let mut state = self.state.write();
        state.status = Status::Error(Failure::ResourceUnavailable);
        state.revision += 1;
        drop(state);
        for cb in &self.callbacks.read().on_close {
            cb();
        }
    }

    fn touch(&self) {
        self.state.write().revision += 1;
        for cb in &self.callbacks.read().on_change {
            cb();
        }
    }

    pub fn on_open(&self, f: impl Fn() + Send + Sync + 'static) {
        self.callbacks.write().on_open.push(Box::new(f));
    }

    pub fn on_close(&self, f: impl Fn() + Send + Sync + 'static) {
        self.callbacks.write().on_close.push(Box::new(f));
    }

    pub fn on_change(&self, f: impl Fn() + Send + Sync + 'static) {
        self.callbacks.write().on_change.push(Box::new(f));
    }
}

/// Capability: a layer that can be opened and closed. Every `Layer` has this
/// trivially; the trait exists so `Map` can hold `Arc<dyn OpenClose>` without
/// knowing the concrete layer type.
pub trait OpenClose: Send + Sync {
    fn layer(&self) -> &Layer;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn new_layer_starts_open() {
        let l = Layer::new(Kind::Color, "base");
        assert!(l.is_open());
        assert_eq!(l.revision(), 0);
    }

    #[test]
    fn open_failure_is_recorded_in_status() {
        let l = Layer::new(Kind::Color, "base");
        l.close();
        let status = l.open(|| Err(Failure::ConfigurationError("bad uri".into())));
        assert!(status.failed());
        assert!(!l.is_open());
    }

    #[test]
    fn set_opacity_bumps_revision() {
        let l = Layer::new(Kind::Color, "base");
        let before = l.revision();
        l.set_opacity(0.5);
        assert!(l.revision() > before);
    }

    #[test]
    fn change_callback_fires_on_touch() {
        let l = Layer::new(Kind::Color, "base");
        let fired = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = fired.clone();
        l.on_change(move || flag.store(true, Ordering::SeqCst));
        l.set_name("renamed");
        assert!(fired.load(Ordering::SeqCst));
    }
}
