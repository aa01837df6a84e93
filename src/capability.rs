//! Device capability detection for the interactive map.
//!
//! Capabilities are probed once at startup and the resulting value is handed
//! to every map mount; nothing re-probes later.

use tracing::{info, warn};

use crate::constants::capability::{MOBILE_UA_TOKENS, MOBILE_VIEWPORT_MAX_WIDTH};
use crate::errors::LeadsError;

/// What the host reports about the device.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceProfile {
    /// Raw user-agent string.
    pub user_agent: String,
    /// Maximum simultaneous touch points; `0` means no touch support.
    pub touch_points: u32,
    /// Current viewport width in CSS pixels.
    pub viewport_width: u32,
}

impl DeviceProfile {
    /// Returns `true` for phones and tablets.
    ///
    /// Any known mobile user-agent token is enough; otherwise a touch device
    /// with a narrow viewport counts as mobile too.
    pub fn is_mobile(&self) -> bool {
        let agent = self.user_agent.to_lowercase();
        if MOBILE_UA_TOKENS.iter().any(|token| agent.contains(token)) {
            return true;
        }
        self.touch_points > 0 && self.viewport_width < MOBILE_VIEWPORT_MAX_WIDTH
    }
}

/// Host-specific source of capability answers.
pub trait CapabilityProbe {
    /// Whether a hardware-accelerated graphics context can be created.
    fn graphics_supported(&self) -> Result<bool, LeadsError>;
    /// Current device description.
    fn device(&self) -> DeviceProfile;
}

/// Probe with fixed answers.
#[derive(Clone, Debug, Default)]
pub struct StaticProbe {
    /// Answer for `graphics_supported`.
    pub graphics: bool,
    /// Answer for `device`.
    pub device: DeviceProfile,
}

impl StaticProbe {
    /// Desktop-class device with graphics support.
    pub fn desktop() -> Self {
        Self {
            graphics: true,
            device: DeviceProfile {
                user_agent: "Mozilla/5.0 (X11; Linux x86_64)".into(),
                touch_points: 0,
                viewport_width: 1280,
            },
        }
    }

    /// Phone-class device with graphics support.
    pub fn mobile() -> Self {
        Self {
            graphics: true,
            device: DeviceProfile {
                user_agent: "Mozilla/5.0 (Linux; Android 14) Mobile".into(),
                touch_points: 5,
                viewport_width: 390,
            },
        }
    }

    /// Desktop device whose graphics context cannot be created.
    pub fn without_graphics() -> Self {
        Self {
            graphics: false,
            ..Self::desktop()
        }
    }
}

impl CapabilityProbe for StaticProbe {
    fn graphics_supported(&self) -> Result<bool, LeadsError> {
        Ok(self.graphics)
    }

    fn device(&self) -> DeviceProfile {
        self.device.clone()
    }
}

/// Capability answers computed once and passed to map mounts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    /// A graphics context could be created.
    pub graphics_supported: bool,
    /// The device looks like a phone or tablet.
    pub mobile: bool,
}

impl Capabilities {
    /// Run `probe` once. Probe errors are logged and count as unsupported.
    pub fn detect(probe: &dyn CapabilityProbe) -> Self {
        let graphics_supported = match probe.graphics_supported() {
            Ok(supported) => supported,
            Err(err) => {
                warn!("[construleads:capability] graphics probe failed: {err}");
                false
            }
        };
        let mobile = probe.device().is_mobile();
        let capabilities = Self {
            graphics_supported,
            mobile,
        };
        info!(
            "[construleads:capability] graphics_supported={} mobile={} map_supported={}",
            graphics_supported,
            mobile,
            capabilities.map_supported()
        );
        capabilities
    }

    /// Capabilities of a desktop with working graphics.
    pub fn supported() -> Self {
        Self {
            graphics_supported: true,
            mobile: false,
        }
    }

    /// The interactive map may be created: graphics work and the device is not mobile.
    pub fn map_supported(&self) -> bool {
        self.graphics_supported && !self.mobile
    }
}
