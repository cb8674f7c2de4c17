//! End-to-end check of prefix state assignment over a vocabulary file.

use std::io::Write;

use sio_core::lm::{LanguageModel, PrefixLm};
use sio_core::tokenizer::Tokenizer;

fn vocab_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "<blk> 0.0\n<unk> 0.0\n<s> 0.0\na -1.2\nb -1.7\n</s> 0.0\n"
    )
    .unwrap();
    file
}

#[test]
fn prefix_states_are_assigned_in_first_seen_order() {
    let file = vocab_file();
    let tokenizer = Tokenizer::load(file.path()).unwrap();
    assert_eq!(tokenizer.size(), 6);

    let mut prefix_lm = PrefixLm::default();
    prefix_lm.load(&tokenizer).unwrap();
    let m: &mut dyn LanguageModel = &mut prefix_lm;

    let null_state = m.null_state();
    assert_eq!(null_state, 0);

    let bos = m.get_score(null_state, tokenizer.index("<s>").unwrap()).unwrap();
    assert_eq!(bos.dst, 1);
    assert_eq!(bos.score, 0.0);

    let a = m.get_score(bos.dst, tokenizer.index("a").unwrap()).unwrap().dst;
    assert_eq!(a, 2);

    let aa = m.get_score(a, tokenizer.index("a").unwrap()).unwrap().dst;
    assert_eq!(aa, 3);

    let ab = m.get_score(a, tokenizer.index("b").unwrap()).unwrap().dst;
    assert_eq!(ab, 4);

    let ab_eos = m.get_score(ab, tokenizer.index("</s>").unwrap()).unwrap().dst;
    assert_eq!(ab_eos, 5);

    // Revisiting a known prefix never mints a new state.
    assert_eq!(m.get_score(a, tokenizer.index("b").unwrap()).unwrap().dst, 4);
    assert_eq!(m.bos(), tokenizer.bos());
    assert_eq!(m.eos(), tokenizer.eos());
    assert_eq!(m.unk(), tokenizer.unk());
}

#[test]
fn vocabulary_without_bos_fails_to_load() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "<unk> 0\na 0\n</s> 0\n").unwrap();
    assert!(Tokenizer::load(file.path()).is_err());
}

#[test]
fn missing_vocabulary_file_is_an_io_error() {
    let err = Tokenizer::load("/no/such/vocab").unwrap_err();
    assert!(matches!(err, sio_core::SioError::Io(_)));
}
