// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Rendering quality tiers and their strongly typed settings.

use crate::error::{ConfigError, ConfigResult};
use crate::thermal::ThermalState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A named bundle of rendering settings.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum QualityTier {
    /// Everything enabled.
    #[default]
    High,
    /// Reduced detail, no reflections.
    Medium,
    /// Heavy reductions, no post-processing.
    Low,
    /// Bare minimum to keep the application responsive.
    Survival,
}

impl QualityTier {
    /// All tiers, best first.
    pub const ALL: [QualityTier; 4] = [
        QualityTier::High,
        QualityTier::Medium,
        QualityTier::Low,
        QualityTier::Survival,
    ];

    /// The fixed thermal state → tier mapping.
    ///
    /// This is a pure function: the result never depends on call history.
    pub fn for_thermal_state(state: ThermalState) -> QualityTier {
        match state {
            ThermalState::Optimal => QualityTier::High,
            ThermalState::Warm => QualityTier::Medium,
            ThermalState::Hot => QualityTier::Low,
            ThermalState::Critical => QualityTier::Survival,
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Concrete rendering settings bound to a [`QualityTier`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualitySettings {
    /// Texture resolution scale in `[0, 1]`.
    pub texture_quality: f32,
    /// Shadow map resolution scale in `[0, 1]`.
    pub shadow_quality: f32,
    /// Level-of-detail bias in `[0, 1]`; lower swaps to coarse meshes sooner.
    pub lod_bias: f32,
    /// Particle spawn density in `[0, 1]`.
    pub particle_density: f32,
    /// Number of shadow cascades.
    pub shadow_cascades: u32,
    /// Maximum shadow distance in world units.
    pub shadow_distance: f32,
    /// Frame-rate cap for this tier.
    pub target_frame_rate: u32,
    /// Whether post-processing passes run.
    pub post_processing: bool,
    /// Whether screen-space/planar reflections run.
    pub reflections: bool,
}

impl QualitySettings {
    /// Checks that every scalar lies in `[0, 1]` and the distances are sane.
    pub fn validate(&self, tier: QualityTier) -> ConfigResult<()> {
        let unit_scalars = [
            ("texture_quality", self.texture_quality),
            ("shadow_quality", self.shadow_quality),
            ("lod_bias", self.lod_bias),
            ("particle_density", self.particle_density),
        ];
        for (name, value) in unit_scalars {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange {
                    field: format!("quality.{tier:?}.{name}"),
                    value,
                    min: 0.0,
                    max: 1.0,
                });
            }
        }
        if !self.shadow_distance.is_finite() || self.shadow_distance < 0.0 {
            return Err(ConfigError::OutOfRange {
                field: format!("quality.{tier:?}.shadow_distance"),
                value: self.shadow_distance,
                min: 0.0,
                max: f32::MAX,
            });
        }
        if self.target_frame_rate == 0 {
            return Err(ConfigError::NotPositive {
                field: format!("quality.{tier:?}.target_frame_rate"),
                value: 0.0,
            });
        }
        Ok(())
    }

    /// Flattens the settings into a scalar map for downstream consumers.
    ///
    /// Boolean toggles are reported as `0.0` / `1.0`.
    pub fn scalars(&self) -> BTreeMap<QualityScalar, f32> {
        let flag = |on: bool| if on { 1.0 } else { 0.0 };
        BTreeMap::from([
            (QualityScalar::TextureQuality, self.texture_quality),
            (QualityScalar::ShadowQuality, self.shadow_quality),
            (QualityScalar::LodBias, self.lod_bias),
            (QualityScalar::ParticleDensity, self.particle_density),
            (QualityScalar::PostProcessing, flag(self.post_processing)),
            (QualityScalar::Reflections, flag(self.reflections)),
        ])
    }
}

/// Key of a flattened quality value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QualityScalar {
    /// See [`QualitySettings::texture_quality`].
    TextureQuality,
    /// See [`QualitySettings::shadow_quality`].
    ShadowQuality,
    /// See [`QualitySettings::lod_bias`].
    LodBias,
    /// See [`QualitySettings::particle_density`].
    ParticleDensity,
    /// See [`QualitySettings::post_processing`].
    PostProcessing,
    /// See [`QualitySettings::reflections`].
    Reflections,
}

impl QualityScalar {
    /// Stable snake_case name, for hosts that key settings by string.
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityScalar::TextureQuality => "texture_quality",
            QualityScalar::ShadowQuality => "shadow_quality",
            QualityScalar::LodBias => "lod_bias",
            QualityScalar::ParticleDensity => "particle_density",
            QualityScalar::PostProcessing => "post_processing",
            QualityScalar::Reflections => "reflections",
        }
    }
}

impl fmt::Display for QualityScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four tier → settings records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityProfiles {
    /// Settings applied at [`QualityTier::High`].
    pub high: QualitySettings,
    /// Settings applied at [`QualityTier::Medium`].
    pub medium: QualitySettings,
    /// Settings applied at [`QualityTier::Low`].
    pub low: QualitySettings,
    /// Settings applied at [`QualityTier::Survival`].
    pub survival: QualitySettings,
}

impl QualityProfiles {
    /// Returns the settings bound to `tier`.
    pub fn settings(&self, tier: QualityTier) -> &QualitySettings {
        match tier {
            QualityTier::High => &self.high,
            QualityTier::Medium => &self.medium,
            QualityTier::Low => &self.low,
            QualityTier::Survival => &self.survival,
        }
    }

    /// Validates every tier's settings.
    pub fn validate(&self) -> ConfigResult<()> {
        for tier in QualityTier::ALL {
            self.settings(tier).validate(tier)?;
        }
        Ok(())
    }
}

impl Default for QualityProfiles {
    fn default() -> Self {
        Self {
            high: QualitySettings {
                texture_quality: 1.0,
                shadow_quality: 1.0,
                lod_bias: 1.0,
                particle_density: 1.0,
                shadow_cascades: 4,
                shadow_distance: 150.0,
                target_frame_rate: 60,
                post_processing: true,
                reflections: true,
            },
            medium: QualitySettings {
                texture_quality: 0.75,
                shadow_quality: 0.75,
                lod_bias: 0.75,
                particle_density: 0.75,
                shadow_cascades: 3,
                shadow_distance: 100.0,
                target_frame_rate: 60,
                post_processing: true,
                reflections: false,
            },
            low: QualitySettings {
                texture_quality: 0.5,
                shadow_quality: 0.5,
                lod_bias: 0.5,
                particle_density: 0.5,
                shadow_cascades: 2,
                shadow_distance: 50.0,
                target_frame_rate: 30,
                post_processing: false,
                reflections: false,
            },
            survival: QualitySettings {
                texture_quality: 0.25,
                shadow_quality: 0.0,
                lod_bias: 0.25,
                particle_density: 0.25,
                shadow_cascades: 0,
                shadow_distance: 0.0,
                target_frame_rate: 30,
                post_processing: false,
                reflections: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_mapping_is_fixed() {
        assert_eq!(
            QualityTier::for_thermal_state(ThermalState::Optimal),
            QualityTier::High
        );
        assert_eq!(
            QualityTier::for_thermal_state(ThermalState::Warm),
            QualityTier::Medium
        );
        assert_eq!(
            QualityTier::for_thermal_state(ThermalState::Hot),
            QualityTier::Low
        );
        assert_eq!(
            QualityTier::for_thermal_state(ThermalState::Critical),
            QualityTier::Survival
        );
    }

    #[test]
    fn test_default_profiles_are_valid() {
        assert!(QualityProfiles::default().validate().is_ok());
    }

    #[test]
    fn test_default_profiles_degrade_monotonically() {
        let profiles = QualityProfiles::default();
        for pair in QualityTier::ALL.windows(2) {
            let better = profiles.settings(pair[0]);
            let worse = profiles.settings(pair[1]);
            assert!(better.texture_quality >= worse.texture_quality);
            assert!(better.shadow_cascades >= worse.shadow_cascades);
            assert!(better.target_frame_rate >= worse.target_frame_rate);
        }
    }

    #[test]
    fn test_scalar_out_of_range_rejected() {
        let mut profiles = QualityProfiles::default();
        profiles.low.particle_density = 1.5;
        match profiles.validate() {
            Err(ConfigError::OutOfRange { field, .. }) => {
                assert_eq!(field, "quality.Low.particle_density")
            }
            other => panic!("expected OutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn test_scalars_flatten_toggles() {
        let profiles = QualityProfiles::default();
        let high = profiles.high.scalars();
        assert_eq!(high[&QualityScalar::PostProcessing], 1.0);
        assert_eq!(high[&QualityScalar::Reflections], 1.0);

        let medium = profiles.medium.scalars();
        assert_eq!(medium[&QualityScalar::Reflections], 0.0);
        assert_eq!(medium[&QualityScalar::TextureQuality], 0.75);
        assert_eq!(medium.len(), 6);
    }

    #[test]
    fn test_scalar_names_are_stable() {
        assert_eq!(QualityScalar::LodBias.as_str(), "lod_bias");
        assert_eq!(QualityScalar::ParticleDensity.to_string(), "particle_density");
    }
}
