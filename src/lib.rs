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
//! Core terrain paging and tile-data pipeline: quadtree addressing
//! (`profile`), layer data extraction with ancestor fallback (`layer`), the
//! resident tile pager (`pager`), the per-tile data model (`model`), and a
//! render-model updater consumed through a pure `GraphicsContext` trait
//! (`render`). GPU bindings, concrete data-source adapters, and the
//! application shell are intentionally out of scope.
pub mod cancel;
pub mod config;
pub mod env;
pub mod error;
pub mod layer;
pub mod model;
pub mod node;
pub mod pager;
pub mod profile;
pub mod raster;
pub mod render;
pub mod spatial;

pub use cancel::Cancelable;
pub use error::{Failure, Result, Status};
pub use layer::{ElevationLayer, ImageLayer, Kind, Layer, LayerSource, Map, MapLayer, OpenClose, TileLayer};
pub use model::{create_tile_model, TileModel};
pub use node::TileNode;
pub use pager::TilePager;
pub use profile::{Profile, TileKey};
pub use render::GraphicsContext;
