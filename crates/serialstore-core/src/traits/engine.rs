// SPDX-FileCopyrightText: 2026 SerialStore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engine trait: the factory for context-confined handles.

use crate::error::BoxError;
use crate::traits::handle::StoreHandle;

/// A storage engine that can open handles to one logical store.
///
/// The engine value is shared across contexts, so it must be `Send + Sync`.
/// The handles it produces are not: each context opens its own.
pub trait StoreEngine: Send + Sync + 'static {
    /// The context-confined handle type.
    type Handle: StoreHandle;

    /// Engine-specific settings used when opening a handle.
    type Configuration: Send + Sync + 'static;

    /// Opens a new handle on the calling thread.
    ///
    /// `None` means "use the engine's own defaults".
    fn open(&self, configuration: Option<&Self::Configuration>) -> Result<Self::Handle, BoxError>;

    /// Opens a handle intended only for reading.
    ///
    /// Engines that can enforce read-only access should override this; the
    /// default just opens a regular handle.
    fn open_read_only(
        &self,
        configuration: Option<&Self::Configuration>,
    ) -> Result<Self::Handle, BoxError> {
        self.open(configuration)
    }
}
