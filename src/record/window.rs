/// Seconds shown on each side of the slider position.
pub const HALF_WIDTH_SECS: f64 = 1.5;

/// Half-open sample range `[start, end)` of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleWindow {
    pub start: usize,
    pub end: usize,
}

impl SampleWindow {
    pub fn new(start: usize, end: usize) -> Self {
        SampleWindow { start, end: end.max(start) }
    }

    /// The redraw window around `position_secs`: 1.5 s either side,
    /// truncated to whole samples and clamped to the record.
    pub fn around(position_secs: f64, fs: f64, sig_len: usize) -> Self {
        let center = position_secs * fs;
        let half = fs * HALF_WIDTH_SECS;
        let start = clamp_samples((center - half).trunc(), sig_len);
        let end = clamp_samples((center + half).trunc(), sig_len);
        SampleWindow::new(start, end)
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Strictly inside, the way annotation markers are picked.
    pub fn contains_strictly(&self, sample: usize) -> bool {
        sample > self.start && sample < self.end
    }

    /// Timestamps in seconds for each sample of the window, ending at
    /// `end / fs` and spaced evenly.
    pub fn time_axis(&self, fs: f64) -> Vec<f64> {
        let n = self.len();
        if n == 0 {
            return Vec::new();
        }
        let from = self.start as f64 / fs;
        let to = self.end as f64 / fs;
        let step = (to - from) / n as f64;
        (1..=n).map(|i| from + step * i as f64).collect()
    }
}

fn clamp_samples(value: f64, sig_len: usize) -> usize {
    if value.is_nan() || value <= 0.0 {
        0
    } else if value >= sig_len as f64 {
        sig_len
    } else {
        value as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_three_seconds_wide() {
        let w = SampleWindow::around(10.0, 360.0, 650_000);
        assert_eq!(w, SampleWindow { start: 3060, end: 4140 });
        assert_eq!(w.len(), 1080);
    }

    #[test]
    fn window_is_clamped_at_both_ends() {
        assert_eq!(SampleWindow::around(0.0, 250.0, 10_000), SampleWindow { start: 0, end: 375 });
        assert_eq!(SampleWindow::around(40.0, 250.0, 10_000), SampleWindow { start: 9625, end: 10_000 });
        assert!(SampleWindow::around(100.0, 250.0, 10_000).is_empty());
    }

    #[test]
    fn fractional_positions_truncate() {
        // 0.7 * 100 - 150 = -80 and 0.7 * 100 + 150 = 220
        let w = SampleWindow::around(0.7, 100.0, 1000);
        assert_eq!(w, SampleWindow { start: 0, end: 220 });
        let w = SampleWindow::around(2.005, 100.0, 1000);
        assert_eq!(w.start, 50);
    }

    #[test]
    fn strict_containment_excludes_edges() {
        let w = SampleWindow::new(10, 20);
        assert!(!w.contains_strictly(10));
        assert!(w.contains_strictly(11));
        assert!(!w.contains_strictly(20));
    }

    #[test]
    fn time_axis_is_closed_on_the_right() {
        let t = SampleWindow::new(100, 104).time_axis(100.0);
        assert_eq!(t.len(), 4);
        assert!((t[0] - 1.01).abs() < 1e-12);
        assert!((t[3] - 1.04).abs() < 1e-12);
    }
}
