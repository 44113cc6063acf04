//! Driver state tracking

/// Slowly adapting neutral head pitch.
///
/// Pitch alerts compare against this baseline rather than zero, so a driver
/// who habitually sits with the head slightly down is not flagged.
#[derive(Debug, Clone)]
pub struct PitchBaseline {
    alpha: f64,
    value: Option<f64>,
}

impl PitchBaseline {
    pub fn new(alpha: f64) -> Self {
        Self { alpha, value: None }
    }

    /// Fold `pitch` into the baseline, then return its deviation from the
    /// updated baseline. The first sample seeds the baseline.
    pub fn deviation(&mut self, pitch: f64) -> f64 {
        let base = match self.value {
            Some(prev) => self.alpha * pitch + (1.0 - self.alpha) * prev,
            None => pitch,
        };
        self.value = Some(base);
        pitch - base
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Reset state (on driver change)
    pub fn reset(&mut self) {
        self.value = None;
    }
}
