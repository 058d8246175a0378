use summary_core::tokenizer::{StopWordList, Tokenizer, TokenizerOptions};

#[test]
fn it_strips_accents_and_stems() {
    let tok = Tokenizer::new(TokenizerOptions { strip_accents: true, stem: true, ..Default::default() });
    let words = tok.tokenize("Running Runners RUN! The café's menu.");
    assert!(words.contains(&"run".to_string()));
    assert!(words.contains(&"cafe".to_string()));
}

#[test]
fn it_filters_stopwords() {
    let words = Tokenizer::default().tokenize("The quick brown fox and the lazy dog");
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
    assert!(words.contains(&"fox".to_string()));
}

#[test]
fn it_honours_custom_stop_words() {
    let tok = Tokenizer::new(TokenizerOptions {
        stop_words: StopWordList::None,
        extra_stop_words: vec!["Patient".into()],
        ..Default::default()
    });
    assert_eq!(tok.tokenize("The Patient has asthma"), vec!["the", "has", "asthma"]);
}
