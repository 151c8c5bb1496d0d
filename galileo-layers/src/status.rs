//! Lifecycle of configuration nodes. See [`LayerStatus`].

use serde::{Deserialize, Serialize};

use crate::error::LayerConfigError;

/// Status of a configuration node.
///
/// The only allowed transitions are:
///
/// ```text
/// Registered -> Processing -> Processed
///                          -> Error
/// ```
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerStatus {
    /// Node is created but its resolution has not started.
    #[default]
    Registered,
    /// Node is being resolved.
    Processing,
    /// Node is resolved successfully.
    Processed,
    /// Node failed to resolve.
    Error,
}

impl LayerStatus {
    /// Returns true if the status is final: either `Processed` or `Error`.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Processed | Self::Error)
    }

    /// Returns true if the transition from `self` to `to` is allowed.
    pub fn can_advance_to(&self, to: LayerStatus) -> bool {
        matches!(
            (self, to),
            (Self::Registered, Self::Processing)
                | (Self::Processing, Self::Processed)
                | (Self::Processing, Self::Error)
        )
    }

    /// Moves the status to `to`. The status is left unchanged if the transition is not allowed.
    pub fn advance(&mut self, to: LayerStatus) -> Result<(), LayerConfigError> {
        if !self.can_advance_to(to) {
            return Err(LayerConfigError::InvalidStatusTransition { from: *self, to });
        }

        *self = to;
        Ok(())
    }

    /// Moves the status to `Error`, passing through `Processing` if the node has not been started
    /// yet. Does nothing if the status is already settled.
    pub(crate) fn fail(&mut self) {
        if *self == Self::Registered {
            *self = Self::Processing;
        }

        if *self == Self::Processing {
            *self = Self::Error;
        }
    }
}
