// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

/// Lifecycle of the location sync service.
///
/// `Stopped -> Starting -> Active -> Stopping -> Stopped`. Samples are only
/// reported while `Active`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncState {
    #[default]
    Stopped,
    Starting,
    Active,
    Stopping,
}

/// Reason why a begin request was not accepted by the sync service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginRejection {
    /// Location access was revoked between the controller check and the begin.
    PermissionDenied,
    /// The service is not in the `Stopped` state.
    NotStopped,
}
