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
use std::collections::HashMap;

/// Tracks the last frame each tile was pinged. Stands in for the original's
/// intrusive "sentry" doubly linked list: an entry moved to the head on
/// every ping, and `flush` walks from the tail evicting anything older than
/// the cache size. A hash map keyed by last-ping-frame gives the same
/// eviction decision without the intrusive-list plumbing.
#[derive(Default)]
pub struct Tracker {
    frame: u64,
    last_ping: HashMap<TileKey, u64>,
}

impl Tracker {
    pub fn new() -> Tracker {
        Tracker::default()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn advance_frame(&mut self) {
        self.frame += 1;
    }

    /// Moves `key` to the head (marks it pinged this frame).
    pub fn ping(&mut self, key: &TileKey) {
        self.last_ping.insert(key.clone(), self.frame);
    }

    pub fn last_pinged_frame(&self, key: &TileKey) -> Option<u64> {
        self.last_ping.get(key).copied()
    }

    pub fn forget(&mut self, key: &TileKey) {
        self.last_ping.remove(key);
    }

    /// Every tracked key not pinged within `max_age` frames of the current
    /// one.
    pub fn expired(&self, max_age: u64) -> Vec<TileKey> {
        let cutoff = self.frame.saturating_sub(max_age);
        self.last_ping
            .iter()
            .filter(|(_, &last)| last < cutoff)
            .map(|(k, _)| k.clone())
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::profile::Profile;

    #[test]
    fn unpinged_entries_expire_after_max_age() {
        let profile = Profile::well_known("global-geodetic").unwrap();
        let mut tracker = Tracker::new();
        let key = TileKey::new(0, 0, 0, profile);
        tracker.ping(&key);

        for _ in 0..5 {
            tracker.advance_frame();
        }

        assert_eq!(tracker.expired(2), vec![key.clone()]);
    }

    #[test]
    fn repinged_entry_survives() {
        let profile = Profile::well_known("global-geodetic").unwrap();
        let mut tracker = Tracker::new();
        let key = TileKey::new(0, 0, 0, profile);
        tracker.ping(&key);
        tracker.advance_frame();
        tracker.ping(&key);
        tracker.advance_frame();

        assert!(tracker.expired(2).is_empty());
    }
}
