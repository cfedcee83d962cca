use std::path::PathBuf;

use legalpdf_to_ayat::{extract_pages, raw_pages, ExtractError};

#[test]
fn extract_pages_file_not_found() {
    let p = PathBuf::from("./this/does/not/exist.pdf");
    match extract_pages(&p) {
        Err(ExtractError::FileNotFound(_)) => {}
        other => panic!("expected FileNotFound, got {:?}", other),
    }
}

#[test]
fn raw_pages_are_numbered_from_zero() {
    let pages = raw_pages(vec!["sampul", "isi"]);
    assert_eq!(pages[0].index, 0);
    assert_eq!(pages[1].index, 1);
    assert_eq!(pages[1].text, "isi");
}
