/// One verse in posting order.
///
/// Records are built once by the loader and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerseRecord {
    /// Zero-based position in the dataset (posting order)
    pub index: usize,
    /// `chapter:verse` identifier, e.g. `2:255`
    pub reference: String,
    /// Arabic text of the verse
    pub text: String,
    /// English translation, when the dataset provides one
    pub translation: Option<String>,
    /// English chapter name, when the dataset provides one
    pub surah_name: Option<String>,
}

impl VerseRecord {
    pub fn new(index: usize, reference: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            index,
            reference: reference.into(),
            text: text.into(),
            translation: None,
            surah_name: None,
        }
    }

    pub fn with_translation(mut self, translation: impl Into<String>) -> Self {
        self.translation = Some(translation.into());
        self
    }

    pub fn with_surah_name(mut self, name: impl Into<String>) -> Self {
        self.surah_name = Some(name.into());
        self
    }
}

impl std::fmt::Display for VerseRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.surah_name {
            Some(name) => write!(f, "{name} {}", self.reference),
            None => write!(f, "{}", self.reference),
        }
    }
}
