use serde::{Deserialize, Serialize};

use crate::record::window::SampleWindow;

/// WFDB beat labels that mark a QRS complex.
pub const QRS_SYMBOLS: &[&str] = &[
    "N", "L", "R", "a", "V", "F", "J", "A", "S", "E", "j", "/", "f", "Q", "e", "n", "r", "B",
];

/// How a marker is drawn on the strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationKind {
    Qrs,
    WaveBoundary,
    PWave,
    TWave,
    Other,
}

impl AnnotationKind {
    pub fn of_symbol(symbol: &str) -> Self {
        match symbol {
            "(" | ")" => AnnotationKind::WaveBoundary,
            "p" => AnnotationKind::PWave,
            "t" => AnnotationKind::TWave,
            s if QRS_SYMBOLS.contains(&s) => AnnotationKind::Qrs,
            _ => AnnotationKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub sample: usize,
    pub symbol: String,
    #[serde(default)]
    pub subtype: i32,
    #[serde(default)]
    pub aux_note: String,
}

impl Annotation {
    pub fn new(sample: usize, symbol: impl Into<String>) -> Self {
        Annotation {
            sample,
            symbol: symbol.into(),
            subtype: 0,
            aux_note: String::new(),
        }
    }

    pub fn kind(&self) -> AnnotationKind {
        AnnotationKind::of_symbol(&self.symbol)
    }

    pub fn time_secs(&self, fs: f64) -> f64 {
        self.sample as f64 / fs
    }

    pub fn in_window(&self, window: &SampleWindow) -> bool {
        window.contains_strictly(self.sample)
    }

    /// Hover text shown next to the marker.
    pub fn hover_text(&self) -> String {
        format!("Subtype: {} \n Note: {}", self.subtype, self.aux_note)
    }
}

/// Annotations that fall strictly inside `window`, in input order.
pub fn visible<'a>(annotations: &'a [Annotation], window: &'a SampleWindow) -> impl Iterator<Item = &'a Annotation> + 'a {
    annotations.iter().filter(move |a| a.in_window(window))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_symbols() {
        assert_eq!(AnnotationKind::of_symbol("N"), AnnotationKind::Qrs);
        assert_eq!(AnnotationKind::of_symbol("V"), AnnotationKind::Qrs);
        assert_eq!(AnnotationKind::of_symbol("/"), AnnotationKind::Qrs);
        assert_eq!(AnnotationKind::of_symbol("("), AnnotationKind::WaveBoundary);
        assert_eq!(AnnotationKind::of_symbol(")"), AnnotationKind::WaveBoundary);
        assert_eq!(AnnotationKind::of_symbol("p"), AnnotationKind::PWave);
        assert_eq!(AnnotationKind::of_symbol("t"), AnnotationKind::TWave);
        assert_eq!(AnnotationKind::of_symbol("+"), AnnotationKind::Other);
        assert_eq!(AnnotationKind::of_symbol("~"), AnnotationKind::Other);
    }

    #[test]
    fn picks_markers_strictly_inside_the_window() {
        let annotations = vec![
            Annotation::new(100, "N"),
            Annotation::new(150, "p"),
            Annotation::new(200, "N"),
        ];
        let window = SampleWindow::new(100, 200);
        let shown: Vec<usize> = visible(&annotations, &window).map(|a| a.sample).collect();
        assert_eq!(shown, vec![150]);
    }

    #[test]
    fn reads_json_with_defaults() {
        let a: Annotation = serde_json::from_str(r#"{"sample": 720, "symbol": "V"}"#).unwrap();
        assert_eq!(a.kind(), AnnotationKind::Qrs);
        assert_eq!(a.time_secs(360.0), 2.0);
        assert_eq!(a.hover_text(), "Subtype: 0 \n Note: ");
    }
}
