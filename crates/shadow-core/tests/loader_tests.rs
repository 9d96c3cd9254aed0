use std::fs;

use tempfile::TempDir;

use shadow_core::config::DataSettings;
use shadow_core::loader::{FsDocumentLoader, InMemoryLoader};
use shadow_core::traits::DocumentLoader;
use shadow_core::{DocType, Error};

fn settings_in(dir: &TempDir) -> DataSettings {
    DataSettings {
        manual_path: dir.path().join("Secret_Info_Manual.txt"),
        framework_path: dir.path().join("Response_Framework.txt"),
        ..DataSettings::default()
    }
}

#[test]
fn loads_both_documents_with_types() {
    let tmp = TempDir::new().unwrap();
    let settings = settings_in(&tmp);
    fs::write(&settings.manual_path, "# Intro\n\nManual body.").unwrap();
    fs::write(&settings.framework_path, "# Rule 1\n\ntrigger_type: keyword").unwrap();

    let docs = FsDocumentLoader::from_settings(&settings).load().expect("load");
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].name, "Secret Info Manual");
    assert_eq!(docs[0].doc_type, DocType::Classified);
    assert_eq!(docs[1].name, "Response Framework");
    assert_eq!(docs[1].doc_type, DocType::Framework);
    assert!(docs[0].content.contains("Manual body."));
}

#[test]
fn missing_document_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let settings = settings_in(&tmp);
    fs::write(&settings.manual_path, "Manual body.").unwrap();

    let err = FsDocumentLoader::from_settings(&settings).load().unwrap_err();
    match err {
        Error::NotFound(path) => assert!(path.ends_with("Response_Framework.txt")),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[test]
fn invalid_utf8_is_decoded_lossily() {
    let tmp = TempDir::new().unwrap();
    let settings = settings_in(&tmp);
    fs::write(&settings.manual_path, [b'o', b'k', 0xff, b'!']).unwrap();
    fs::write(&settings.framework_path, "framework").unwrap();

    let docs = FsDocumentLoader::from_settings(&settings).load().expect("load");
    assert!(docs[0].content.starts_with("ok"));
    assert!(docs[0].content.ends_with('!'));
}

#[test]
fn in_memory_loader_requires_documents() {
    assert!(matches!(InMemoryLoader::new().load(), Err(Error::NotFound(_))));
    let docs = InMemoryLoader::new().with_document("Secret Info Manual", DocType::Classified, "text").load().unwrap();
    assert_eq!(docs.len(), 1);
}
