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
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cooperative cancellation flag handed to every dispatched job. Checked
/// at each logical step of a load; canceling never interrupts a step already
/// in flight, it only prevents the next one from starting.
#[derive(Debug, Clone, Default)]
pub struct Cancelable {
    flag: Arc<AtomicBool>,
}

impl Cancelable {
    pub fn new() -> Cancelable {
        Cancelable::default()
    }

    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cancel_is_visible_to_clones() {
        let a = Cancelable::new();
        let b = a.clone();
        assert!(!b.is_canceled());
        a.cancel();
        assert!(b.is_canceled());
    }
}
