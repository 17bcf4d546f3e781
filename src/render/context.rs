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
use crate::raster::GeoImage;
use crate::render::render_model::BindCommand;

/// The GPU binding surface the render-model updater targets. No concrete
/// graphics API is implemented in this crate; an embedding application
/// supplies one. `Handle` is whatever opaque resource id that application's
/// GPU layer uses for both textures and bind commands.
pub trait GraphicsContext: Send + Sync {
    type Handle: Clone + Send + Sync;

    /// Submits `bind` for GPU upload.
    fn compile(&self, bind: BindCommand<Self::Handle>);

    /// Schedules `handle` for safe, deferred teardown. Never called
    /// synchronously against in-flight GPU commands.
    fn dispose(&self, handle: Self::Handle);

    /// Queues `task` to run on the render thread at the next safe update
    /// point, ordered by `priority` (lower runs first, matching
    /// `Entry::priority`).
    fn on_next_update(&self, priority: f64, task: Box<dyn FnOnce() + Send>);

    /// Marks the scene dirty so a frame gets drawn even with no other
    /// pending input.
    fn request_frame(&self);

    /// Takes ownership of `image`'s raster bytes and returns a texture
    /// handle the updater can reference from a `BindCommand`.
    fn wrap_image(&self, image: &GeoImage) -> Self::Handle;
}
