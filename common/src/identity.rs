// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use std::{fmt::Display, path::Path};
use tracing::{debug, warn};

const PRODUCT_NAME_PATH: &str = "/sys/class/dmi/id/product_name";
const MACHINE_ID_PATH: &str = "/etc/machine-id";
const UNKNOWN_PART: &str = "unknown";

/// Stable identity of this installation.
///
/// The identity is used verbatim as the key of the remote document. It is
/// derived from the hardware model and the build/installation id in the
/// form `<model>_<build>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceIdentity(String);

impl DeviceIdentity {
    pub fn new(identity: &str) -> Self {
        DeviceIdentity(identity.to_owned())
    }

    /// Builds the identity from the device model and build id.
    pub fn from_parts(model: &str, build_id: &str) -> Self {
        DeviceIdentity(format!("{}_{}", model.trim(), build_id.trim()))
    }

    /// Derives the identity from the attributes of the running host.
    ///
    /// Missing attributes are replaced by `unknown` so that detection never fails.
    pub fn detect() -> Self {
        let model = read_attribute(Path::new(PRODUCT_NAME_PATH));
        let build_id = read_attribute(Path::new(MACHINE_ID_PATH));
        let identity = DeviceIdentity::from_parts(&model, &build_id);
        debug!("Detected device identity {}", identity);
        identity
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DeviceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DeviceIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn read_attribute(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(value) if !value.trim().is_empty() => value.trim().replace(char::is_whitespace, "-"),
        Ok(_) => UNKNOWN_PART.to_owned(),
        Err(e) => {
            warn!(
                "Failed to read device attribute {}. Error: {}",
                path.to_string_lossy(),
                e
            );
            UNKNOWN_PART.to_owned()
        }
    }
}
