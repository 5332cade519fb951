/// Normalized per-sample intensity, produced once per run and read-only after.
#[derive(Clone, Debug, PartialEq)]
pub struct IntensityCurve {
    pub values: Vec<f32>,
    pub sample_rate: u32,
    /// Length of the source audio in seconds.
    pub duration_secs: f64,
}

impl IntensityCurve {
    /// Fixed two-sample curve used for dry runs without audio.
    pub fn demo() -> Self {
        Self {
            values: vec![0.0, 1.0],
            sample_rate: 2,
            duration_secs: 2.0 / 30.0,
        }
    }

    /// Source duration rounded up to whole seconds.
    pub fn duration(&self) -> u64 {
        self.duration_secs.ceil() as u64
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, sample_idx: usize) -> Option<f32> {
        self.values.get(sample_idx).copied()
    }
}
