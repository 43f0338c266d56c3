// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Platform permissions involved in location tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    FineLocation,
    CoarseLocation,
    ForegroundLocation,
}

/// Permissions that must all be granted before tracking may start.
pub const TRACKING_PERMISSIONS: [Permission; 3] = [
    Permission::FineLocation,
    Permission::CoarseLocation,
    Permission::ForegroundLocation,
];

/// Answers whether location access is currently authorized and requests it if not.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    /// Returns `true` if `permission` is currently granted.
    fn is_granted(&self, permission: Permission) -> bool;

    /// Asks the platform to grant `permissions`.
    ///
    /// Resolves to `true` only if every requested permission is granted afterwards.
    async fn request(&self, permissions: &[Permission]) -> bool;

    /// All permissions needed to start tracking are granted.
    fn tracking_authorized(&self) -> bool {
        TRACKING_PERMISSIONS.iter().all(|p| self.is_granted(*p))
    }

    /// At least one location permission is granted, so positions can be read.
    fn location_readable(&self) -> bool {
        self.is_granted(Permission::FineLocation) || self.is_granted(Permission::CoarseLocation)
    }
}

/// A [`PermissionGate`] whose grants are set by configuration.
///
/// Grants can be changed at runtime, which allows revoking access while
/// tracking is running. A request grants the requested permissions only if
/// the gate was built with `grant_on_request`.
pub struct StaticPermissionGate {
    fine: AtomicBool,
    coarse: AtomicBool,
    foreground: AtomicBool,
    grant_on_request: bool,
}

impl StaticPermissionGate {
    pub fn new(granted: bool, grant_on_request: bool) -> Self {
        StaticPermissionGate {
            fine: AtomicBool::new(granted),
            coarse: AtomicBool::new(granted),
            foreground: AtomicBool::new(granted),
            grant_on_request,
        }
    }

    pub fn granted() -> Self {
        StaticPermissionGate::new(true, true)
    }

    pub fn denied() -> Self {
        StaticPermissionGate::new(false, false)
    }

    pub fn set(&self, permission: Permission, granted: bool) {
        debug!("Permission {:?} set to granted={}", permission, granted);
        self.flag(permission).store(granted, Ordering::SeqCst);
    }

    pub fn set_all(&self, granted: bool) {
        for permission in TRACKING_PERMISSIONS {
            self.set(permission, granted);
        }
    }

    fn flag(&self, permission: Permission) -> &AtomicBool {
        match permission {
            Permission::FineLocation => &self.fine,
            Permission::CoarseLocation => &self.coarse,
            Permission::ForegroundLocation => &self.foreground,
        }
    }
}

#[async_trait]
impl PermissionGate for StaticPermissionGate {
    fn is_granted(&self, permission: Permission) -> bool {
        self.flag(permission).load(Ordering::SeqCst)
    }

    async fn request(&self, permissions: &[Permission]) -> bool {
        if self.grant_on_request {
            for permission in permissions {
                self.set(*permission, true);
            }
        }
        let granted = permissions.iter().all(|p| self.is_granted(*p));
        info!("Permission request for {:?} granted={}", permissions, granted);
        granted
    }
}
