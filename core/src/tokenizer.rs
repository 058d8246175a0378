use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref ALPHABETIC_RE: Regex = Regex::new(r"(?u)\p{L}+").expect("valid regex");
    static ref WORD_RE: Regex = Regex::new(r"(?u)\b\w\w+\b").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref ENGLISH_STOP_WORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","across","after","afterwards","again","against","all","almost","alone","along","already","also","although","always","am","among","amongst","amoungst","amount","an","and","another","any","anyhow","anyone","anything","anyway","anywhere","are","around","as","at",
            "back","be","became","because","become","becomes","becoming","been","before","beforehand","behind","being","below","beside","besides","between","beyond","bill","both","bottom","but","by",
            "call","can","cannot","cant","co","con","could","couldnt","cry",
            "de","describe","detail","do","done","down","due","during",
            "each","eg","eight","either","eleven","else","elsewhere","empty","enough","etc","even","ever","every","everyone","everything","everywhere","except",
            "few","fifteen","fifty","fill","find","fire","first","five","for","former","formerly","forty","found","four","from","front","full","further",
            "get","give","go",
            "had","has","hasnt","have","he","hence","her","here","hereafter","hereby","herein","hereupon","hers","herself","him","himself","his","how","however","hundred",
            "i","ie","if","in","inc","indeed","interest","into","is","it","its","itself",
            "keep","last","latter","latterly","least","less","ltd",
            "made","many","may","me","meanwhile","might","mill","mine","more","moreover","most","mostly","move","much","must","my","myself",
            "name","namely","neither","never","nevertheless","next","nine","no","nobody","none","noone","nor","not","nothing","now","nowhere",
            "of","off","often","on","once","one","only","onto","or","other","others","otherwise","our","ours","ourselves","out","over","own",
            "part","per","perhaps","please","put","rather","re",
            "same","see","seem","seemed","seeming","seems","serious","several","she","should","show","side","since","sincere","six","sixty","so","some","somehow","someone","something","sometime","sometimes","somewhere","still","such","system",
            "take","ten","than","that","the","their","them","themselves","then","thence","there","thereafter","thereby","therefore","therein","thereupon","these","they","thick","thin","third","this","those","though","three","through","throughout","thru","thus","to","together","too","top","toward","towards","twelve","twenty","two",
            "un","under","until","up","upon","us",
            "very","via",
            "was","we","well","were","what","whatever","when","whence","whenever","where","whereafter","whereas","whereby","wherein","whereupon","wherever","whether","which","while","whither","who","whoever","whole","whom","whose","why","will","with","within","without","would",
            "yet","you","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

/// Which character runs count as a token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TokenPattern {
    /// Maximal runs of Unicode letters.
    #[default]
    Alphabetic,
    /// Runs of two or more word characters (letters, digits, underscore).
    Word,
}

impl TokenPattern {
    fn regex(self) -> &'static Regex {
        match self {
            TokenPattern::Alphabetic => &ALPHABETIC_RE,
            TokenPattern::Word => &WORD_RE,
        }
    }
}

impl FromStr for TokenPattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "alphabetic" | "alpha" => Ok(TokenPattern::Alphabetic),
            "word" => Ok(TokenPattern::Word),
            other => Err(format!("unknown token pattern '{other}' (expected 'alphabetic' or 'word')")),
        }
    }
}

impl fmt::Display for TokenPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenPattern::Alphabetic => f.write_str("alphabetic"),
            TokenPattern::Word => f.write_str("word"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StopWordList {
    #[default]
    English,
    None,
}

impl FromStr for StopWordList {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "english" => Ok(StopWordList::English),
            "none" => Ok(StopWordList::None),
            other => Err(format!("unknown stop word list '{other}' (expected 'english' or 'none')")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenizerOptions {
    pub pattern: TokenPattern,
    pub stop_words: StopWordList,
    /// Additional terms dropped on top of `stop_words`, compared after lowercasing.
    pub extra_stop_words: Vec<String>,
    /// Decompose to NFKD and drop combining marks before matching.
    pub strip_accents: bool,
    pub stem: bool,
}

/// Turns text into terms. The same instance is used when building an index
/// and when encoding queries against it.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    options: TokenizerOptions,
    extra_stop_words: HashSet<String>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(TokenizerOptions::default())
    }
}

impl Tokenizer {
    pub fn new(options: TokenizerOptions) -> Self {
        let extra_stop_words = options
            .extra_stop_words
            .iter()
            .map(|w| normalize(w, options.strip_accents))
            .collect();
        Self { options, extra_stop_words }
    }

    pub fn options(&self) -> &TokenizerOptions {
        &self.options
    }

    pub fn is_stop_word(&self, token: &str) -> bool {
        let listed = match self.options.stop_words {
            StopWordList::English => ENGLISH_STOP_WORDS.contains(token),
            StopWordList::None => false,
        };
        listed || self.extra_stop_words.contains(token)
    }

    /// Lowercase, optionally strip accents, split by the configured pattern,
    /// drop stop words and optionally stem. Stop words are checked before stemming.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let normalized = normalize(text, self.options.strip_accents);
        let mut tokens = Vec::new();
        for mat in self.options.pattern.regex().find_iter(&normalized) {
            let token = mat.as_str();
            if self.is_stop_word(token) {
                continue;
            }
            if self.options.stem {
                tokens.push(STEMMER.stem(token).into_owned());
            } else {
                tokens.push(token.to_string());
            }
        }
        tokens
    }
}

/// Lowercase and optionally strip accents. Applied to text and to extra stop words alike.
fn normalize(text: &str, strip_accents: bool) -> String {
    let lowered = text.to_lowercase();
    if strip_accents {
        lowered.nfkd().filter(|c| !is_combining_mark(*c)).collect()
    } else {
        lowered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = Tokenizer::default().tokenize("Diagnosed conditions include: Diabetes.");
        assert_eq!(t, vec!["diagnosed", "conditions", "include", "diabetes"]);
    }

    #[test]
    fn alphabetic_pattern_splits_on_digits() {
        let t = Tokenizer::default().tokenize("birthDate=2101-05-03 id 0a8eebfd");
        assert_eq!(t, vec!["birthdate", "id", "eebfd"]);
    }

    #[test]
    fn word_pattern_keeps_alphanumerics() {
        let tok = Tokenizer::new(TokenizerOptions { pattern: TokenPattern::Word, ..Default::default() });
        let t = tok.tokenize("Patient 0a8eebfd-11 x");
        assert_eq!(t, vec!["patient", "0a8eebfd", "11"]);
    }

    #[test]
    fn extra_stop_words_are_accent_stripped() {
        let tok = Tokenizer::new(TokenizerOptions {
            strip_accents: true,
            extra_stop_words: vec!["Café".into()],
            ..Default::default()
        });
        assert!(tok.is_stop_word("cafe"));
        assert_eq!(tok.tokenize("café menu"), vec!["menu"]);
    }

    #[test]
    fn parses_options_from_strings() {
        assert_eq!("WORD".parse::<TokenPattern>(), Ok(TokenPattern::Word));
        assert_eq!("none".parse::<StopWordList>(), Ok(StopWordList::None));
        assert!("bigram".parse::<TokenPattern>().is_err());
    }
}
