//! Device capability profiles and culling thresholds
//!
//! The host environment supplies a [`DeviceProfile`] through the
//! [`DeviceProvider`] trait; the engine never sniffs platform APIs itself.
//! Thresholds start from a per-tier base and are adjusted by memory, GPU
//! capability, and screen area.

use serde::{Deserialize, Serialize};

/// Device tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceTier {
    Mobile,
    Tablet,
    #[default]
    Desktop,
}

impl DeviceTier {
    /// String representation (matches the serialized form)
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceTier::Mobile => "mobile",
            DeviceTier::Tablet => "tablet",
            DeviceTier::Desktop => "desktop",
        }
    }
}

/// GPU capability tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GpuTier {
    Low,
    #[default]
    Medium,
    High,
}

/// Capabilities of the device the host is rendering on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Device tier
    pub tier: DeviceTier,
    /// Screen width in CSS pixels
    pub screen_width: f32,
    /// Screen height in CSS pixels
    pub screen_height: f32,
    /// Device pixel ratio
    pub pixel_ratio: f32,
    /// Estimated memory in gigabytes
    pub memory_gb: f32,
    /// Logical CPU core count
    pub cpu_cores: usize,
    /// GPU capability tier
    pub gpu: GpuTier,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            tier: DeviceTier::Desktop,
            screen_width: 1920.0,
            screen_height: 1080.0,
            pixel_ratio: 1.0,
            memory_gb: 8.0,
            cpu_cores: 8,
            gpu: GpuTier::Medium,
        }
    }
}

impl DeviceProfile {
    /// Screen area in CSS pixels
    #[must_use]
    pub fn screen_area(&self) -> f32 {
        self.screen_width * self.screen_height
    }
}

/// Supplies the device profile; implemented by the host environment
pub trait DeviceProvider {
    /// Current device capabilities
    fn profile(&self) -> DeviceProfile;
}

/// Fixed-profile provider for hosts and tests
#[derive(Debug, Clone, Default)]
pub struct StaticDeviceProvider {
    profile: DeviceProfile,
}

impl StaticDeviceProvider {
    /// Wrap a fixed profile
    #[must_use]
    pub fn new(profile: DeviceProfile) -> Self {
        Self { profile }
    }
}

impl DeviceProvider for StaticDeviceProvider {
    fn profile(&self) -> DeviceProfile {
        self.profile.clone()
    }
}

/// Culling aggressiveness knobs, derived per device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CullingThresholds {
    /// World-space margin around the viewport
    pub margin: f32,
    /// Node count the device renders comfortably
    pub max_visible_nodes: usize,
    /// Link count the device renders comfortably
    pub max_visible_links: usize,
    /// Scales the margin inversely with zoom
    pub zoom_sensitivity: f32,
    /// Scales clustering aggressiveness
    pub performance_multiplier: f32,
}

impl CullingThresholds {
    /// Per-tier base thresholds before capability adjustment
    #[must_use]
    pub fn base_for(tier: DeviceTier) -> Self {
        match tier {
            DeviceTier::Mobile => Self {
                margin: 100.0,
                max_visible_nodes: 150,
                max_visible_links: 200,
                zoom_sensitivity: 1.5,
                performance_multiplier: 1.5,
            },
            DeviceTier::Tablet => Self {
                margin: 150.0,
                max_visible_nodes: 300,
                max_visible_links: 450,
                zoom_sensitivity: 1.2,
                performance_multiplier: 1.2,
            },
            DeviceTier::Desktop => Self {
                margin: 200.0,
                max_visible_nodes: 600,
                max_visible_links: 900,
                zoom_sensitivity: 1.0,
                performance_multiplier: 1.0,
            },
        }
    }

    /// Thresholds adjusted for a concrete device profile
    #[must_use]
    pub fn for_profile(profile: &DeviceProfile) -> Self {
        let mut t = Self::base_for(profile.tier);

        if profile.memory_gb < 2.0 {
            t.max_visible_nodes = (t.max_visible_nodes as f32 * 0.7) as usize;
            t.max_visible_links = (t.max_visible_links as f32 * 0.7) as usize;
            t.performance_multiplier *= 0.7;
        } else if profile.memory_gb > 8.0 {
            t.max_visible_nodes = (t.max_visible_nodes as f32 * 1.3) as usize;
            t.max_visible_links = (t.max_visible_links as f32 * 1.3) as usize;
            t.performance_multiplier *= 1.2;
        }

        match profile.gpu {
            GpuTier::Low => {
                t.performance_multiplier *= 0.8;
                t.zoom_sensitivity *= 1.25;
            }
            GpuTier::High => {
                t.performance_multiplier *= 1.2;
                t.zoom_sensitivity *= 0.85;
            }
            GpuTier::Medium => {}
        }

        let area = profile.screen_area();
        if area < 1_000_000.0 {
            t.margin *= 0.8;
        } else if area > 3_000_000.0 {
            t.margin *= 1.25;
        }

        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers_scale_down_from_desktop() {
        let mobile = CullingThresholds::base_for(DeviceTier::Mobile);
        let desktop = CullingThresholds::base_for(DeviceTier::Desktop);
        assert!(mobile.max_visible_nodes < desktop.max_visible_nodes);
        assert!(mobile.max_visible_links < desktop.max_visible_links);
        assert!(mobile.margin < desktop.margin);
        assert!(mobile.performance_multiplier > desktop.performance_multiplier);
    }

    #[test]
    fn test_low_memory_shrinks_thresholds() {
        let profile = DeviceProfile {
            memory_gb: 1.0,
            ..Default::default()
        };
        let base = CullingThresholds::base_for(profile.tier);
        let adjusted = CullingThresholds::for_profile(&profile);
        assert!(adjusted.max_visible_nodes < base.max_visible_nodes);
        assert!(adjusted.performance_multiplier < base.performance_multiplier);
    }

    #[test]
    fn test_high_memory_grows_thresholds() {
        let profile = DeviceProfile {
            memory_gb: 16.0,
            ..Default::default()
        };
        let base = CullingThresholds::base_for(profile.tier);
        let adjusted = CullingThresholds::for_profile(&profile);
        assert!(adjusted.max_visible_nodes > base.max_visible_nodes);
    }

    #[test]
    fn test_low_gpu_raises_zoom_sensitivity() {
        let profile = DeviceProfile {
            gpu: GpuTier::Low,
            ..Default::default()
        };
        let base = CullingThresholds::base_for(profile.tier);
        let adjusted = CullingThresholds::for_profile(&profile);
        assert!(adjusted.zoom_sensitivity > base.zoom_sensitivity);
        assert!(adjusted.performance_multiplier < base.performance_multiplier);
    }

    #[test]
    fn test_small_screen_shrinks_margin() {
        let profile = DeviceProfile {
            tier: DeviceTier::Mobile,
            screen_width: 390.0,
            screen_height: 844.0,
            memory_gb: 4.0,
            ..Default::default()
        };
        let base = CullingThresholds::base_for(profile.tier);
        let adjusted = CullingThresholds::for_profile(&profile);
        assert!(adjusted.margin < base.margin);
    }
}
