// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use serde::{Deserialize, Serialize};

/// The locally persisted on/off state of tracking.
///
/// Written on every start and stop, read once when the controller starts.
/// Restoring it does not restart sampling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingState {
    #[serde(rename = "tracking_active")]
    pub active: bool,
    #[serde(rename = "user_name")]
    pub display_name: String,
}

impl TrackingState {
    pub fn active(display_name: &str) -> Self {
        TrackingState {
            active: true,
            display_name: display_name.to_owned(),
        }
    }

    pub fn inactive() -> Self {
        TrackingState::default()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Color hint of the status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusColor {
    Green,
    Red,
}

/// Presentation state exposed by the tracking controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TrackingStatus {
    Online(String),
    #[default]
    Offline,
}

impl TrackingStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, TrackingStatus::Online(_))
    }

    /// Status text, e.g. `Online (Alice)` or `Offline`.
    pub fn label(&self) -> String {
        match self {
            TrackingStatus::Online(name) => format!("Online ({name})"),
            TrackingStatus::Offline => "Offline".to_owned(),
        }
    }

    pub fn color(&self) -> StatusColor {
        match self {
            TrackingStatus::Online(_) => StatusColor::Green,
            TrackingStatus::Offline => StatusColor::Red,
        }
    }

    /// Text of the toggle action that is available in this state.
    pub fn toggle_label(&self) -> &'static str {
        match self {
            TrackingStatus::Online(_) => "Stop tracking",
            TrackingStatus::Offline => "Start tracking",
        }
    }
}

impl From<&TrackingState> for TrackingStatus {
    fn from(state: &TrackingState) -> Self {
        if state.active {
            TrackingStatus::Online(state.display_name.clone())
        } else {
            TrackingStatus::Offline
        }
    }
}
