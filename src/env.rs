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
use std::env;

/// Looks up `ROCKY_<name>` first, falling back to the bare `<name>`. Used for
/// credential overrides (`AZURE_KEY`, `BING_KEY`) and `ROCKY_FILE_PATH`.
pub fn lookup(name: &str) -> Option<String> {
    env::var(format!("ROCKY_{name}"))
        .or_else(|_| env::var(name))
        .ok()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn prefixed_var_takes_precedence() {
        env::set_var("ROCKY_TEST_KEY_A", "prefixed");
        env::set_var("TEST_KEY_A", "bare");
        assert_eq!(lookup("TEST_KEY_A").as_deref(), Some("prefixed"));
        env::remove_var("ROCKY_TEST_KEY_A");
        env::remove_var("TEST_KEY_A");
    }

    #[test]
    fn falls_back_to_bare_name() {
        env::remove_var("ROCKY_TEST_KEY_B");
        env::set_var("TEST_KEY_B", "bare-only");
        assert_eq!(lookup("TEST_KEY_B").as_deref(), Some("bare-only"));
        env::remove_var("TEST_KEY_B");
    }

    #[test]
    fn missing_var_is_none() {
        env::remove_var("ROCKY_TEST_KEY_C");
        env::remove_var("TEST_KEY_C");
        assert!(lookup("TEST_KEY_C").is_none());
    }
}
