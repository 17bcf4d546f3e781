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
use nalgebra::{Matrix3, Matrix4};

/// Per-tile uniform data handed to the graphics context alongside the bind
/// command: the texture matrices plus the elevation range used by the
/// vertex shader to reconstruct the surface.
#[derive(Debug, Clone, PartialEq)]
pub struct TileUniform {
    pub elevation_matrix: Matrix3<f64>,
    pub color_matrix: Matrix3<f64>,
    pub model_matrix: Matrix4<f64>,
    pub min_height: f32,
    pub max_height: f32,
}

impl Default for TileUniform {
    fn default() -> TileUniform {
        TileUniform {
            elevation_matrix: Matrix3::identity(),
            color_matrix: Matrix3::identity(),
            model_matrix: Matrix4::identity(),
            min_height: 0.0,
            max_height: 0.0,
        }
    }
}

/// The GPU-facing descriptors the render-model updater submits for
/// compilation. `H` is the graphics context's opaque resource handle.
#[derive(Debug, Clone)]
pub struct BindCommand<H> {
    pub color: Option<H>,
    pub elevation: Option<H>,
    pub uniform: TileUniform,
}

/// A `TileNode`'s current GPU-visible state: the bind handles currently in
/// use, the texture matrices that map this tile's texture coordinates into
/// those textures, and the uniform last submitted for compilation. Cloning a
/// `RenderModel` shares the underlying handles; it does not duplicate GPU
/// resources.
#[derive(Debug, Clone)]
pub struct RenderModel<H> {
    pub color: Option<H>,
    pub color_matrix: Matrix3<f64>,
    pub elevation: Option<H>,
    pub elevation_matrix: Matrix3<f64>,
    pub uniform: TileUniform,
}

impl<H> Default for RenderModel<H> {
    fn default() -> RenderModel<H> {
        RenderModel {
            color: None,
            color_matrix: Matrix3::identity(),
            elevation: None,
            elevation_matrix: Matrix3::identity(),
            uniform: TileUniform::default(),
        }
    }
}
