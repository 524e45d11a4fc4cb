use std::fmt;

use sha2::{Digest, Sha256};

use crate::types::{ClipboardSnapshot, RawImage};

/// SHA-256 over the dimensions and raw pixel bytes. Only used as an
/// equality proxy.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn of(image: &RawImage) -> Self {
        let mut hasher = Sha256::new();
        // Same bytes at a different shape are a different picture.
        hasher.update(image.width.to_le_bytes());
        hasher.update(image.height.to_le_bytes());
        hasher.update(&image.rgba);
        let digest = hasher.finalize();

        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 8 hex digits, for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    NewImage(Fingerprint),
    NewText(String),
    Unchanged,
    /// `cleared` is set when this poll wiped a previously stored value.
    Empty { cleared: bool },
}

/// Last content seen on the clipboard. At most one field is set at a time.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DetectionState {
    last_image_fingerprint: Option<Fingerprint>,
    last_text_value: Option<String>,
}

impl DetectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_image_fingerprint(&self) -> Option<&Fingerprint> {
        self.last_image_fingerprint.as_ref()
    }

    pub fn last_text_value(&self) -> Option<&str> {
        self.last_text_value.as_deref()
    }

    pub fn is_clear(&self) -> bool {
        self.last_image_fingerprint.is_none() && self.last_text_value.is_none()
    }

    /// Classifies one poll and advances the state accordingly.
    ///
    /// Images win over text; whitespace-only text counts as empty.
    pub fn classify(&mut self, snapshot: &ClipboardSnapshot) -> Classification {
        match snapshot {
            ClipboardSnapshot::Image(image) => self.observe_image(Fingerprint::of(image)),
            ClipboardSnapshot::Text(text) if !text.trim().is_empty() => self.observe_text(text),
            _ => Classification::Empty {
                cleared: self.reset(),
            },
        }
    }

    pub fn observe_image(&mut self, fingerprint: Fingerprint) -> Classification {
        if self.last_image_fingerprint == Some(fingerprint) {
            return Classification::Unchanged;
        }

        self.last_image_fingerprint = Some(fingerprint);
        self.last_text_value = None;
        Classification::NewImage(fingerprint)
    }

    pub fn observe_text(&mut self, text: &str) -> Classification {
        if self.last_text_value.as_deref() == Some(text) {
            return Classification::Unchanged;
        }

        self.last_text_value = Some(text.to_owned());
        self.last_image_fingerprint = None;
        Classification::NewText(text.to_owned())
    }

    /// Forgets everything. Returns whether anything was stored.
    pub fn reset(&mut self) -> bool {
        let had_content = !self.is_clear();
        self.last_image_fingerprint = None;
        self.last_text_value = None;
        had_content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(fill: u8) -> ClipboardSnapshot {
        ClipboardSnapshot::Image(RawImage {
            width: 2,
            height: 1,
            rgba: vec![fill; 8],
        })
    }

    fn text(value: &str) -> ClipboardSnapshot {
        ClipboardSnapshot::Text(value.to_owned())
    }

    #[test]
    fn same_image_twice_is_new_once() {
        let mut state = DetectionState::new();

        assert!(matches!(state.classify(&image(1)), Classification::NewImage(_)));
        assert_eq!(state.classify(&image(1)), Classification::Unchanged);
        assert!(matches!(state.classify(&image(2)), Classification::NewImage(_)));
    }

    #[test]
    fn same_text_twice_is_new_once() {
        let mut state = DetectionState::new();

        assert_eq!(state.classify(&text("a cat")), Classification::NewText("a cat".into()));
        assert_eq!(state.classify(&text("a cat")), Classification::Unchanged);
    }

    #[test]
    fn new_image_clears_stored_text() {
        let mut state = DetectionState::new();
        state.classify(&text("prompt"));

        let classification = state.classify(&image(7));

        assert!(matches!(classification, Classification::NewImage(_)));
        assert!(state.last_text_value().is_none());
        assert!(state.last_image_fingerprint().is_some());
    }

    #[test]
    fn new_text_clears_stored_fingerprint() {
        let mut state = DetectionState::new();
        state.classify(&image(7));

        state.classify(&text("prompt"));

        assert!(state.last_image_fingerprint().is_none());
        assert_eq!(state.last_text_value(), Some("prompt"));
    }

    #[test]
    fn whitespace_only_text_is_empty() {
        let mut state = DetectionState::new();

        assert_eq!(
            state.classify(&text("   \n\t")),
            Classification::Empty { cleared: false }
        );
        assert!(state.is_clear());
    }

    #[test]
    fn empty_resets_and_allows_same_content_again() {
        let mut state = DetectionState::new();
        state.classify(&image(3));

        assert_eq!(
            state.classify(&ClipboardSnapshot::Empty),
            Classification::Empty { cleared: true }
        );
        assert!(state.is_clear());
        assert_eq!(
            state.classify(&ClipboardSnapshot::Empty),
            Classification::Empty { cleared: false }
        );

        assert!(matches!(state.classify(&image(3)), Classification::NewImage(_)));
    }

    #[test]
    fn text_is_compared_untrimmed_but_stored_verbatim() {
        let mut state = DetectionState::new();

        state.classify(&text("  padded  "));

        assert_eq!(state.last_text_value(), Some("  padded  "));
        assert_eq!(state.classify(&text("padded")), Classification::NewText("padded".into()));
    }

    #[test]
    fn same_bytes_in_a_different_shape_is_a_new_image() {
        let mut state = DetectionState::new();
        let wide = ClipboardSnapshot::Image(RawImage {
            width: 2,
            height: 1,
            rgba: vec![0; 8],
        });
        let tall = ClipboardSnapshot::Image(RawImage {
            width: 1,
            height: 2,
            rgba: vec![0; 8],
        });

        assert!(matches!(state.classify(&wide), Classification::NewImage(_)));
        assert!(matches!(state.classify(&tall), Classification::NewImage(_)));
        assert_eq!(state.classify(&tall), Classification::Unchanged);
    }

    #[test]
    fn fingerprint_hex_and_short_agree() {
        let ClipboardSnapshot::Image(raw) = image(9) else {
            unreachable!()
        };
        let fingerprint = Fingerprint::of(&raw);

        assert_eq!(fingerprint.to_hex().len(), 64);
        assert!(fingerprint.to_hex().starts_with(&fingerprint.short()));
        assert_eq!(fingerprint.short().len(), 8);
    }
}
