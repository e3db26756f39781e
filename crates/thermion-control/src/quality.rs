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

//! Quality tier selection.

use std::collections::BTreeMap;
use thermion_core::quality::QualityProfiles;
use thermion_core::{
    ConfigResult, ControlEvent, EventBroadcaster, QualityScalar, QualitySettings, QualityTier,
    ThermalState, Transition,
};

/// Receives the settings of every newly applied tier.
///
/// Implemented for any `FnMut(QualityTier, &QualitySettings) + Send` closure.
pub trait RenderSettingsSink: Send {
    /// Applies `settings` to the host's rendering configuration.
    fn apply(&mut self, tier: QualityTier, settings: &QualitySettings);
}

impl<F> RenderSettingsSink for F
where
    F: FnMut(QualityTier, &QualitySettings) + Send,
{
    fn apply(&mut self, tier: QualityTier, settings: &QualitySettings) {
        self(tier, settings)
    }
}

/// Maps thermal states onto quality tiers and pushes changes to the host.
///
/// The tier is a pure function of the thermal state (see
/// [`QualityTier::for_thermal_state`]); the controller only remembers which
/// tier is applied so that changes stay edge-triggered.
pub struct QualityTierController {
    profiles: QualityProfiles,
    active: QualityTier,
    scalars: BTreeMap<QualityScalar, f32>,
    sink: Option<Box<dyn RenderSettingsSink>>,
    changes: u64,
}

impl QualityTierController {
    /// Creates a controller starting at [`QualityTier::High`].
    ///
    /// The sink is not invoked for the initial tier.
    pub fn new(profiles: QualityProfiles) -> ConfigResult<Self> {
        profiles.validate()?;
        let active = QualityTier::High;
        Ok(Self {
            scalars: profiles.settings(active).scalars(),
            profiles,
            active,
            sink: None,
            changes: 0,
        })
    }

    /// Installs the settings sink, replacing any previous one.
    pub fn set_sink(&mut self, sink: impl RenderSettingsSink + 'static) {
        self.sink = Some(Box::new(sink));
    }

    /// Builder variant of [`set_sink`](Self::set_sink).
    pub fn with_sink(mut self, sink: impl RenderSettingsSink + 'static) -> Self {
        self.set_sink(sink);
        self
    }

    /// Applies the tier for `state` if it differs from the active one.
    ///
    /// On a change the sink receives the new settings, the scalar map is
    /// rebuilt and a [`ControlEvent::QualityTierChanged`] is published.
    pub fn on_thermal_state(
        &mut self,
        state: ThermalState,
        events: &mut EventBroadcaster,
    ) -> Option<Transition<QualityTier>> {
        let target = QualityTier::for_thermal_state(state);
        let transition = Transition::between(self.active, target)?;

        self.active = target;
        self.changes += 1;
        let settings = *self.profiles.settings(target);
        self.scalars = settings.scalars();
        self.push_settings();

        log::info!(
            "QualityTierController: {} -> {} (thermal state {})",
            transition.from,
            transition.to,
            state
        );
        events.publish(ControlEvent::QualityTierChanged {
            transition,
            settings,
        });
        Some(transition)
    }

    /// Re-sends the active settings to the sink, e.g. after the host
    /// recreated its renderer.
    pub fn force_apply(&mut self) {
        log::debug!("QualityTierController: re-applying {}", self.active);
        self.push_settings();
    }

    /// The tier currently applied.
    pub fn active_tier(&self) -> QualityTier {
        self.active
    }

    /// Settings of the active tier.
    pub fn active_settings(&self) -> &QualitySettings {
        self.profiles.settings(self.active)
    }

    /// Flattened values of the active tier.
    pub fn scalars(&self) -> &BTreeMap<QualityScalar, f32> {
        &self.scalars
    }

    /// Single flattened value of the active tier.
    pub fn scalar(&self, key: QualityScalar) -> f32 {
        self.scalars.get(&key).copied().unwrap_or_default()
    }

    /// The configured profiles.
    pub fn profiles(&self) -> &QualityProfiles {
        &self.profiles
    }

    /// Number of tier changes applied since creation.
    pub fn change_count(&self) -> u64 {
        self.changes
    }

    fn push_settings(&mut self) {
        let settings = *self.profiles.settings(self.active);
        if let Some(sink) = self.sink.as_mut() {
            sink.apply(self.active, &settings);
        }
    }
}

impl std::fmt::Debug for QualityTierController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QualityTierController")
            .field("active", &self.active)
            .field("has_sink", &self.sink.is_some())
            .field("changes", &self.changes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use thermion_core::ControlEventKind;

    type Applied = Arc<Mutex<Vec<(QualityTier, QualitySettings)>>>;

    fn controller_with_log() -> (QualityTierController, Applied) {
        let applied: Applied = Arc::default();
        let log = Arc::clone(&applied);
        let controller = QualityTierController::new(QualityProfiles::default())
            .unwrap()
            .with_sink(move |tier: QualityTier, settings: &QualitySettings| {
                log.lock().unwrap().push((tier, *settings));
            });
        (controller, applied)
    }

    #[test]
    fn test_starts_high_without_applying() {
        let (controller, applied) = controller_with_log();
        assert_eq!(controller.active_tier(), QualityTier::High);
        assert_eq!(controller.scalar(QualityScalar::TextureQuality), 1.0);
        assert!(applied.lock().unwrap().is_empty());
    }

    #[test]
    fn test_change_applies_and_publishes() {
        let (mut controller, applied) = controller_with_log();
        let mut events = EventBroadcaster::new();
        let (_, rx) = events.channel(ControlEventKind::QualityTierChanged);

        let transition = controller.on_thermal_state(ThermalState::Critical, &mut events);
        assert_eq!(
            transition,
            Some(Transition {
                from: QualityTier::High,
                to: QualityTier::Survival
            })
        );
        assert_eq!(applied.lock().unwrap().len(), 1);
        assert_eq!(controller.scalar(QualityScalar::PostProcessing), 0.0);
        assert_eq!(controller.scalar(QualityScalar::TextureQuality), 0.25);
        assert_eq!(controller.active_settings().target_frame_rate, 30);

        match rx.try_recv().unwrap() {
            ControlEvent::QualityTierChanged { transition, settings } => {
                assert_eq!(transition.to, QualityTier::Survival);
                assert_eq!(settings.shadow_cascades, 0);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_same_tier_is_silent() {
        let (mut controller, applied) = controller_with_log();
        let mut events = EventBroadcaster::new();
        assert!(controller
            .on_thermal_state(ThermalState::Optimal, &mut events)
            .is_none());
        controller.on_thermal_state(ThermalState::Warm, &mut events);
        assert!(controller
            .on_thermal_state(ThermalState::Warm, &mut events)
            .is_none());
        assert_eq!(applied.lock().unwrap().len(), 1);
        assert_eq!(controller.change_count(), 1);
    }

    #[test]
    fn test_force_apply_resends_active() {
        let (mut controller, applied) = controller_with_log();
        controller.force_apply();
        let applied = applied.lock().unwrap();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].0, QualityTier::High);
    }

    #[test]
    fn test_invalid_profile_rejected() {
        let mut profiles = QualityProfiles::default();
        profiles.medium.lod_bias = 1.5;
        assert!(QualityTierController::new(profiles).is_err());
    }
}
