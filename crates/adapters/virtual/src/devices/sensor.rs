//! Virtual sensor: produces a deterministic reading for every tick.

use thingbridge_domain::snapshot::{STATE_UNAVAILABLE, StateSnapshot, attr};
use thingbridge_domain::time::Timestamp;

/// Sine-shaped signal sampled once per tick.
#[derive(Debug, Clone, Copy)]
pub struct Waveform {
    pub base: f64,
    pub amplitude: f64,
    /// Ticks per full cycle.
    pub period: u32,
}

impl Waveform {
    #[must_use]
    pub fn sample(&self, tick: u32) -> f64 {
        let period = self.period.max(1);
        let phase = f64::from(tick % period) / f64::from(period);
        self.base + self.amplitude * (phase * std::f64::consts::TAU).sin()
    }
}

/// A simulated hub sensor entity.
#[derive(Debug, Clone)]
pub struct VirtualSensor {
    pub entity_id: &'static str,
    pub friendly_name: &'static str,
    /// Hub device this entity belongs to, if any.
    pub device_id: Option<&'static str>,
    pub model: Option<&'static str>,
    pub device_class: Option<&'static str>,
    pub unit: Option<&'static str>,
    pub waveform: Waveform,
    /// Report `unavailable` on every n-th tick.
    pub dropout_every: Option<u32>,
}

impl VirtualSensor {
    /// Formatted state for `tick`.
    #[must_use]
    pub fn reading(&self, tick: u32) -> String {
        if let Some(every) = self.dropout_every.filter(|every| *every > 0)
            && tick % every == every - 1
        {
            return STATE_UNAVAILABLE.to_string();
        }
        format!("{:.1}", self.waveform.sample(tick))
    }

    /// Full snapshot for `tick`, stamped `at`.
    #[must_use]
    pub fn snapshot(&self, tick: u32, at: Timestamp) -> StateSnapshot {
        let mut snapshot = StateSnapshot::new(self.reading(tick), at)
            .with_attribute(attr::FRIENDLY_NAME, self.friendly_name);
        snapshot.last_reported = Some(at);
        if let Some(class) = self.device_class {
            snapshot = snapshot.with_attribute(attr::DEVICE_CLASS, class);
        }
        if let Some(unit) = self.unit {
            snapshot = snapshot.with_attribute(attr::UNIT_OF_MEASUREMENT, unit);
        }
        if let Some(model) = self.model {
            snapshot = snapshot.with_attribute(attr::MODEL, model);
        }
        snapshot
    }
}
