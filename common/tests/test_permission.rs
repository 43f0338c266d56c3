// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::permission::{Permission, PermissionGate, StaticPermissionGate, TRACKING_PERMISSIONS};

#[test]
pub fn tracking_requires_all_permissions() {
    let gate = StaticPermissionGate::granted();
    assert!(gate.tracking_authorized());
    gate.set(Permission::ForegroundLocation, false);
    assert!(!gate.tracking_authorized());
    assert!(gate.location_readable());
}

#[test]
pub fn location_readable_with_coarse_only() {
    let gate = StaticPermissionGate::denied();
    assert!(!gate.location_readable());
    gate.set(Permission::CoarseLocation, true);
    assert!(gate.location_readable());
}

#[tokio::test]
pub async fn request_grants_when_allowed() {
    let gate = StaticPermissionGate::new(false, true);
    assert!(gate.request(&TRACKING_PERMISSIONS).await);
    assert!(gate.tracking_authorized());
}

#[tokio::test]
pub async fn request_denied_keeps_permissions_revoked() {
    let gate = StaticPermissionGate::denied();
    assert!(!gate.request(&TRACKING_PERMISSIONS).await);
    assert!(!gate.tracking_authorized());
}
