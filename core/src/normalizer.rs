use std::collections::BTreeSet;
use unicode_normalization::UnicodeNormalization;

/// Characters deleted by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Punctuation {
    /// The 32 ASCII punctuation characters ``!"#$%&'()*+,-./:;<=>?@[\]^_`{|}~``.
    #[default]
    Ascii,
    /// An explicit set. Whitespace in the set is ignored so word boundaries survive.
    Custom(BTreeSet<char>),
}

impl Punctuation {
    pub fn custom<I: IntoIterator<Item = char>>(chars: I) -> Self {
        Punctuation::Custom(chars.into_iter().filter(|c| !c.is_whitespace()).collect())
    }

    #[inline]
    pub fn contains(&self, c: char) -> bool {
        match self {
            Punctuation::Ascii => c.is_ascii_punctuation(),
            Punctuation::Custom(set) => set.contains(&c),
        }
    }
}

/// Lower-cases text and deletes punctuation, leaving every other character in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalizer {
    punctuation: Punctuation,
    nfkc: bool,
}

impl Normalizer {
    pub fn new(punctuation: Punctuation) -> Self {
        Self { punctuation, nfkc: false }
    }

    /// Applies NFKC compatibility composition before lower-casing (e.g. `ﬁ` becomes `fi`).
    pub fn with_nfkc(mut self, enabled: bool) -> Self {
        self.nfkc = enabled;
        self
    }

    pub fn punctuation(&self) -> &Punctuation {
        &self.punctuation
    }

    pub fn normalize(&self, raw: &str) -> String {
        if !self.nfkc {
            return self.strip(&raw.to_lowercase());
        }
        // Deleting a character can bring a base letter next to a combining mark, and
        // NFKC can map to upper case or to ASCII punctuation. Repeat until nothing moves.
        let mut current: String = raw.nfkc().collect();
        loop {
            let next: String = self.strip(&current.to_lowercase()).nfkc().collect();
            if next == current {
                return next;
            }
            current = next;
        }
    }

    fn strip(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        out.extend(text.chars().filter(|c| !self.punctuation.contains(*c)));
        out
    }
}

/// Normalizes with the default settings: ASCII punctuation, no Unicode composition.
pub fn normalize(raw: &str) -> String {
    Normalizer::default().normalize(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_deletes_punctuation() {
        assert_eq!(normalize("The cat sat."), "the cat sat");
        assert_eq!(normalize("Don't  STOP-me!"), "dont  stopme");
        assert_eq!(normalize("  leading\tand trailing\n"), "  leading\tand trailing\n");
    }

    #[test]
    fn non_ascii_punctuation_is_kept_by_default() {
        assert_eq!(normalize("Café «crème»"), "café «crème»");
    }

    #[test]
    fn idempotent() {
        let samples = [
            "The cat sat.",
            "Hello, World!!  Multiple   spaces\t\ttabs",
            "ÀÉÎÕÜ naïve coöperate — “quotes”",
            "",
            "...,,,;;;",
            "ﬁnance ＡＢＣ",
            "e.\u{301}",
            "\u{210c}ello\u{ff01}",
            "a-\u{308}b",
        ];
        for normalizer in [Normalizer::default(), Normalizer::default().with_nfkc(true)] {
            for s in samples {
                let once = normalizer.normalize(s);
                assert_eq!(normalizer.normalize(&once), once, "input {s:?}");
            }
        }
    }

    #[test]
    fn custom_punctuation_set() {
        let n = Normalizer::new(Punctuation::custom(['«', '»', ' ', '-']));
        assert_eq!(n.normalize("«Hi-There» you."), "hithere you.");
    }

    #[test]
    fn nfkc_composes_across_deleted_punctuation() {
        let n = Normalizer::default().with_nfkc(true);
        assert_eq!(n.normalize("e.\u{301}"), "\u{e9}");
        assert_eq!(n.normalize("\u{210c}ello\u{ff01}"), "hello");
        assert_eq!(normalize("e.\u{301}"), "e\u{301}");
    }

    #[test]
    fn nfkc_folds_compatibility_forms() {
        let n = Normalizer::default().with_nfkc(true);
        assert_eq!(n.normalize("ﬁnance ＡＢＣ!"), "finance abc");
    }
}
