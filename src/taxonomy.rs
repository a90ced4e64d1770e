//! Genre taxonomy: collapse noisy, multi-valued genre strings into one canonical family.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Canonical genre family. Declaration order is the precedence order (modern mainstream first),
/// so the derived `Ord` doubles as the disambiguation order for multi-genre artists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GenreFamily {
    Pop,
    HipHopRap,
    RockAlternative,
    ElectronicEdm,
    RnbSoul,
    Latin,
    CountryFolk,
    JazzGospel,
    Soundtrack,
    Other,
}

impl GenreFamily {
    pub const ALL: [Self; 10] = [
        Self::Pop,
        Self::HipHopRap,
        Self::RockAlternative,
        Self::ElectronicEdm,
        Self::RnbSoul,
        Self::Latin,
        Self::CountryFolk,
        Self::JazzGospel,
        Self::Soundtrack,
        Self::Other,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pop => "Pop",
            Self::HipHopRap => "Hip-Hop / Rap",
            Self::RockAlternative => "Rock / Alternative",
            Self::ElectronicEdm => "Electronic / EDM",
            Self::RnbSoul => "R&B / Soul",
            Self::Latin => "Latin",
            Self::CountryFolk => "Country / Folk",
            Self::JazzGospel => "Jazz / Gospel",
            Self::Soundtrack => "Soundtrack",
            Self::Other => "Other",
        }
    }

    /// Fixed display color (hex) used by every view for this family.
    pub fn color_hex(self) -> &'static str {
        match self {
            Self::Pop => "#1f77b4",
            Self::HipHopRap => "#ff7f0e",
            Self::RockAlternative => "#8c564b",
            Self::ElectronicEdm => "#2ca02c",
            Self::RnbSoul => "#d62728",
            Self::Latin => "#17becf",
            Self::CountryFolk => "#9467bd",
            Self::JazzGospel => "#e377c2",
            Self::Soundtrack => "#bcbd22",
            Self::Other => "#7f7f7f",
        }
    }

    /// Position in [`GenreFamily::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Parse a display label back into a family (case-insensitive).
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(label))
    }
}

impl std::fmt::Display for GenreFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy)]
enum Needle {
    Contains(&'static str),
    Exact(&'static str),
}

impl Needle {
    fn matches(self, token: &str) -> bool {
        match self {
            Needle::Contains(s) => token.contains(s),
            Needle::Exact(s) => token == s,
        }
    }
}

use Needle::{Contains, Exact};

/// Ordered rule table; the first family whose needles match a token wins for that token.
const RULES: &[(GenreFamily, &[Needle])] = &[
    (
        GenreFamily::Pop,
        &[
            Contains("k-pop"),
            Contains("j-pop"),
            Contains("dance pop"),
            Contains("electropop"),
            Contains("teen pop"),
            Contains("indie pop"),
            Contains("dream pop"),
            Exact("pop"),
            Contains(" pop"),
        ],
    ),
    (
        GenreFamily::HipHopRap,
        &[Contains("trap"), Contains("rap"), Contains("hip")],
    ),
    (
        GenreFamily::RockAlternative,
        &[
            Contains("alternative"),
            Contains("indie rock"),
            Contains("modern rock"),
            Contains("grunge"),
            Contains("metal"),
            Contains("rock"),
        ],
    ),
    (
        GenreFamily::ElectronicEdm,
        &[
            Contains("house"),
            Contains("techno"),
            Contains("dubstep"),
            Contains("trance"),
            Contains("electronic"),
            Contains("edm"),
        ],
    ),
    (
        GenreFamily::RnbSoul,
        &[
            Contains("neo soul"),
            Contains("r&b"),
            Contains("rnb"),
            Contains("soul"),
        ],
    ),
    (GenreFamily::Latin, &[Contains("reggaeton"), Contains("latin")]),
    (
        GenreFamily::CountryFolk,
        &[
            Contains("contemporary country"),
            Contains("country"),
            Contains("folk"),
        ],
    ),
    (GenreFamily::JazzGospel, &[Contains("jazz"), Contains("gospel")]),
    (
        GenreFamily::Soundtrack,
        &[Contains("soundtrack"), Contains("score")],
    ),
];

/// Classify a single genre token. Returns `None` when no rule matches (i.e. "Other").
pub fn classify_token(token: &str) -> Option<GenreFamily> {
    let token = token.trim().to_lowercase();
    if token.is_empty() {
        return None;
    }
    RULES
        .iter()
        .find(|(_, needles)| needles.iter().any(|n| n.matches(&token)))
        .map(|(family, _)| *family)
}

/// True for the literal placeholders the source data uses for "no genres".
pub fn is_placeholder(raw: &str) -> bool {
    let t = raw.trim();
    t.is_empty() || t == "[]" || t == "[ ]" || t.eq_ignore_ascii_case("null")
}

/// Strip bracket/quote punctuation and split on commas into trimmed, non-empty tokens.
pub fn tokenize(raw: &str) -> Vec<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | '\'' | '"'))
        .collect();
    cleaned
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Resolve a token list to one family: gather every matched family, then take the first in
/// precedence order. Token order never matters.
pub fn resolve_tokens<S: AsRef<str>>(tokens: &[S]) -> GenreFamily {
    let matched: BTreeSet<GenreFamily> = tokens
        .iter()
        .filter_map(|t| classify_token(t.as_ref()))
        .collect();
    matched.into_iter().next().unwrap_or(GenreFamily::Other)
}

/// Classify a raw genre string with no fallback.
pub fn classify(raw: &str) -> GenreFamily {
    if is_placeholder(raw) {
        return GenreFamily::Other;
    }
    resolve_tokens(&tokenize(raw))
}

/// Artist name -> raw genre string, from the secondary dataset. Keys are trimmed and lowercased.
#[derive(Debug, Clone, Default)]
pub struct GenreFallback {
    by_artist: HashMap<String, String>,
}

impl GenreFallback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, A, G>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, G)>,
        A: AsRef<str>,
        G: AsRef<str>,
    {
        let mut fallback = Self::new();
        for (artist, genres) in pairs {
            fallback.insert(artist.as_ref(), genres.as_ref());
        }
        fallback
    }

    /// Insert an entry; empty artists or genre strings are ignored. Later entries overwrite earlier ones.
    pub fn insert(&mut self, artist: &str, genres: &str) {
        let artist = artist.trim();
        let genres = genres.trim();
        if artist.is_empty() || genres.is_empty() {
            return;
        }
        self.by_artist
            .insert(artist.to_lowercase(), genres.to_string());
    }

    pub fn lookup(&self, artist: &str) -> Option<&str> {
        self.by_artist
            .get(&artist.trim().to_lowercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_artist.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_artist.is_empty()
    }
}

/// Result of classifying one record's genre field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub family: GenreFamily,
    /// Genre string after placeholder handling, fallback and punctuation stripping.
    pub raw: String,
    pub tokens: Vec<String>,
}

/// Classify a record's genre string, consulting the fallback table by artist when the primary
/// field is empty or a placeholder.
pub fn classify_with_fallback(
    raw: &str,
    artist: &str,
    fallback: &GenreFallback,
) -> Classification {
    let primary = if is_placeholder(raw) { "" } else { raw.trim() };
    let source = if primary.is_empty() {
        fallback.lookup(artist).unwrap_or("")
    } else {
        primary
    };
    let tokens = tokenize(source);
    Classification {
        family: resolve_tokens(&tokens),
        raw: tokens.join(", "),
        tokens,
    }
}

/// Set of enabled (visible) families. Small and `Copy` so recomputes can take a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FamilySet {
    bits: u16,
}

impl FamilySet {
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    pub fn all() -> Self {
        Self {
            bits: (1u16 << GenreFamily::COUNT) - 1,
        }
    }

    pub fn contains(self, family: GenreFamily) -> bool {
        self.bits & (1 << family.index()) != 0
    }

    pub fn insert(&mut self, family: GenreFamily) {
        self.bits |= 1 << family.index();
    }

    pub fn remove(&mut self, family: GenreFamily) {
        self.bits &= !(1 << family.index());
    }

    /// Flip a family's membership; returns whether it is now enabled.
    pub fn toggle(&mut self, family: GenreFamily) -> bool {
        self.bits ^= 1 << family.index();
        self.contains(family)
    }

    pub fn with(mut self, family: GenreFamily) -> Self {
        self.insert(family);
        self
    }

    pub fn without(mut self, family: GenreFamily) -> Self {
        self.remove(family);
        self
    }

    pub fn is_empty(self) -> bool {
        self.bits == 0
    }

    pub fn len(self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = GenreFamily> {
        GenreFamily::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

impl Default for FamilySet {
    fn default() -> Self {
        Self::all()
    }
}

impl FromIterator<GenreFamily> for FamilySet {
    fn from_iter<I: IntoIterator<Item = GenreFamily>>(iter: I) -> Self {
        let mut set = Self::empty();
        for f in iter {
            set.insert(f);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_rules() {
        assert_eq!(classify_token("k-pop"), Some(GenreFamily::Pop));
        assert_eq!(classify_token("Dance Pop"), Some(GenreFamily::Pop));
        assert_eq!(classify_token("pop"), Some(GenreFamily::Pop));
        assert_eq!(classify_token("melodic rap"), Some(GenreFamily::HipHopRap));
        assert_eq!(classify_token("trap latino"), Some(GenreFamily::HipHopRap));
        assert_eq!(classify_token("grunge"), Some(GenreFamily::RockAlternative));
        assert_eq!(classify_token("deep house"), Some(GenreFamily::ElectronicEdm));
        assert_eq!(classify_token("neo soul"), Some(GenreFamily::RnbSoul));
        assert_eq!(classify_token("reggaeton"), Some(GenreFamily::Latin));
        assert_eq!(classify_token("indie folk"), Some(GenreFamily::CountryFolk));
        assert_eq!(classify_token("gospel"), Some(GenreFamily::JazzGospel));
        assert_eq!(classify_token("video game score"), Some(GenreFamily::Soundtrack));
        assert_eq!(classify_token("polka"), None);
        assert_eq!(classify_token(""), None);
    }

    #[test]
    fn pop_needs_word_boundary() {
        // "popgaze" does not contain " pop" and is not exactly "pop"
        assert_eq!(classify_token("popgaze"), None);
    }

    #[test]
    fn precedence_across_tokens() {
        assert_eq!(classify("['contemporary country', 'dance pop']"), GenreFamily::Pop);
        assert_eq!(classify("country, pop"), GenreFamily::Pop);
        assert_eq!(classify("folk, reggaeton"), GenreFamily::Latin);
    }

    #[test]
    fn token_order_does_not_matter() {
        let a = classify("metal, trap, soul");
        let b = classify("soul, metal, trap");
        assert_eq!(a, b);
        assert_eq!(a, GenreFamily::HipHopRap);
    }

    #[test]
    fn placeholders_are_other() {
        for raw in ["", "  ", "[]", "[ ]", "null", "NULL"] {
            assert_eq!(classify(raw), GenreFamily::Other, "{raw:?}");
        }
    }

    #[test]
    fn fallback_used_only_when_primary_empty() {
        let fb = GenreFallback::from_pairs([("  The Band ", "['country rock']"), ("", "pop")]);
        assert_eq!(fb.len(), 1);

        let c = classify_with_fallback("[]", "the band", &fb);
        assert_eq!(c.family, GenreFamily::RockAlternative);
        assert_eq!(c.tokens, vec!["country rock".to_string()]);

        let c = classify_with_fallback("jazz", "The Band", &fb);
        assert_eq!(c.family, GenreFamily::JazzGospel);

        let c = classify_with_fallback("", "unknown artist", &fb);
        assert_eq!(c.family, GenreFamily::Other);
        assert!(c.tokens.is_empty());
    }

    #[test]
    fn family_set_ops() {
        let mut set = FamilySet::all();
        assert_eq!(set.len(), GenreFamily::COUNT);
        assert!(!set.toggle(GenreFamily::Latin));
        assert!(!set.contains(GenreFamily::Latin));
        assert!(set.toggle(GenreFamily::Latin));
        assert_eq!(set, FamilySet::all());

        let only: FamilySet = [GenreFamily::Pop, GenreFamily::Other].into_iter().collect();
        assert_eq!(
            only.iter().collect::<Vec<_>>(),
            vec![GenreFamily::Pop, GenreFamily::Other]
        );
    }

    #[test]
    fn labels_round_trip() {
        for f in GenreFamily::ALL {
            assert_eq!(GenreFamily::from_label(f.as_str()), Some(f));
        }
        assert_eq!(GenreFamily::from_label("r&b / SOUL"), Some(GenreFamily::RnbSoul));
    }
}
