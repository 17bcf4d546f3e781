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
use anyhow::Result;
use tokio::runtime::{Builder, Runtime};

/// Builds the background worker pool data-loading and child-creation jobs
/// run on, leaving the render thread free to drain `update()` every frame.
/// Uses `anyhow` rather than `Failure` at this boundary: a pool that fails
/// to spin up is a host-environment problem (thread exhaustion), not one of
/// the closed taxonomy's cases.
pub fn build_loader_pool(worker_threads: usize) -> Result<Runtime> {
    Ok(Builder::new_multi_thread()
        .worker_threads(worker_threads.max(1))
        .thread_name("rocky::terrain_loader")
        .enable_all()
        .build()?)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pool_builds_with_requested_concurrency() {
        let rt = build_loader_pool(2).unwrap();
        let result = rt.block_on(async { 1 + 1 });
        assert_eq!(result, 2);
    }
}
