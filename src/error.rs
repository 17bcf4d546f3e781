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
use thiserror::Error;

/// Closed failure taxonomy shared by every layer/model/pager operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Failure {
    #[error("resource unavailable")]
    ResourceUnavailable,
    #[error("configuration error: {0}")]
    ConfigurationError(String),
    #[error("general error: {0}")]
    GeneralError(String),
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("canceled")]
    Canceled,
    #[error("assertion failed: {0}")]
    AssertionFailure(String),
    #[error("not implemented")]
    NotImplemented,
    #[error("not found")]
    NotFound,
    #[error("not modified")]
    NotModified,
    #[error("expired")]
    Expired,
    #[error("timeout")]
    Timeout,
}

impl Failure {
    /// Failures that the pager and tile model factory must treat as silent:
    /// expected outcomes of partial data availability or cancellation, never
    /// logged as warnings.
    pub fn is_silent(&self) -> bool {
        matches!(self, Failure::ResourceUnavailable | Failure::Canceled)
    }
}

pub type Result<T> = std::result::Result<T, Failure>;

/// Status of a `Layer`: either healthy or carrying the failure that closed it.
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Ok,
    Error(Failure),
}

impl Status {
    pub fn ok(&self) -> bool {
        matches!(self, Status::Ok)
    }

    pub fn failed(&self) -> bool {
        !self.ok()
    }

    pub fn error(&self) -> Option<&Failure> {
        match self {
            Status::Ok => None,
            Status::Error(e) => Some(e),
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        // Layers are created closed; closed-but-not-yet-opened is not a
        // failure, so we start at Ok and flip to Error only if open() fails.
        Status::Ok
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn silent_failures_are_resource_unavailable_and_canceled() {
        assert!(Failure::ResourceUnavailable.is_silent());
        assert!(Failure::Canceled.is_silent());
        assert!(!Failure::GeneralError("x".into()).is_silent());
        assert!(!Failure::Timeout.is_silent());
    }

    #[test]
    fn status_default_is_ok() {
        assert!(Status::default().ok());
    }
}
