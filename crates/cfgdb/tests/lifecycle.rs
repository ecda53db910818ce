mod common;

use cfgdb::{Configuration, DbConfig, ErrorKind};
use common::{Fixture, DATA, SCHEMA};

#[test]
fn operations_on_an_unloaded_handle_fail() {
    let fx = Fixture::new();
    let mut db = fx.open();
    assert!(!db.loaded());
    assert_eq!(db.get_objs("Second").unwrap_err().kind(), ErrorKind::NotLoaded);
    assert_eq!(db.create_obj("Second", "x").unwrap_err().kind(), ErrorKind::NotLoaded);
    assert_eq!(db.commit("nothing").unwrap_err().kind(), ErrorKind::NotLoaded);
    db.unload();
}

#[test]
fn unknown_backend_is_rejected() {
    let err = Configuration::open_with("oracle:db", DbConfig::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn opening_a_missing_database_is_recoverable() {
    let fx = Fixture::new();
    let spec = format!("jsonfile:{}", fx.path("missing.data.json").display());
    let err = Configuration::open_with(&spec, fx.config()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.is_recoverable());
}

#[test]
fn failed_load_keeps_the_current_session() {
    let fx = Fixture::new();
    let mut db = fx.create();
    db.create_obj("Second", "kept").unwrap();
    db.commit("kept").unwrap();
    let session = db.session_id();

    let missing = fx.path("missing.data.json").display().to_string();
    assert!(db.load(&missing).is_err());
    assert!(db.loaded());
    assert_eq!(db.session_id(), session);
    assert!(db.get_obj("Second", "kept").is_ok());
}

#[test]
fn create_refuses_an_existing_path() {
    let fx = Fixture::new();
    let mut db = fx.create();
    db.commit("first").unwrap();

    let mut again = fx.open();
    let err = again.create_db(fx.data(), &[SCHEMA]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(!again.loaded());
}

#[test]
fn recreate_replaces_the_file_on_commit() {
    let fx = Fixture::new();
    let mut db = fx.create();
    db.create_obj("Second", "old").unwrap();
    db.commit("first").unwrap();

    let mut again = fx.open();
    again.recreate_db(fx.data(), &[SCHEMA]).unwrap();
    assert_eq!(again.count("Second").unwrap(), 0);
    assert_eq!(fx.reload().count("Second").unwrap(), 1);

    again.commit("recreated").unwrap();
    assert_eq!(fx.reload().count("Second").unwrap(), 0);
}

#[test]
fn create_with_a_missing_schema_fails() {
    let fx = Fixture::new();
    let mut db = fx.open();
    let err = db.create_db(fx.data(), &["absent.schema.json"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(!db.loaded());
}

#[test]
fn external_change_is_detected_on_commit() {
    let fx = Fixture::new();
    let mut db = fx.create();
    db.commit("first").unwrap();

    let mut rival = fx.reload();
    rival.create_obj("Second", "rival").unwrap();
    rival.commit("rival").unwrap();

    db.create_obj("Second", "mine").unwrap();
    let err = db.commit("mine").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(db.status().unwrap().created.len(), 1);
    assert!(fx.reload().get_obj("Second", "mine").is_err());
}

#[test]
fn change_detection_can_be_disabled() {
    let fx = Fixture::new();
    let config = DbConfig {
        detect_external_changes: false,
        ..fx.config()
    };
    let mut db = Configuration::open_with("jsonfile", config).unwrap();
    db.create_db(fx.data(), &[SCHEMA]).unwrap();
    db.commit("first").unwrap();

    let mut rival = fx.reload();
    rival.create_obj("Second", "rival").unwrap();
    rival.commit("rival").unwrap();

    db.create_obj("Second", "mine").unwrap();
    db.commit("mine wins").unwrap();
    let db = fx.reload();
    assert!(db.get_obj("Second", "mine").is_ok());
    assert!(db.get_obj("Second", "rival").is_err());
}

#[test]
fn relative_load_uses_the_search_path() {
    let fx = Fixture::new();
    let mut db = fx.create();
    db.commit("first").unwrap();
    db.unload();

    db.load(DATA).unwrap();
    assert!(db.loaded());
}
