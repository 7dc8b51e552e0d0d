//! End-to-end tests for the export pipeline
//!
//! Each test lays out directory snapshots and a file-backed code index in a
//! temporary directory, then runs every pass through the coordinator.

use gar_export::config::{load_config, GarExportConfig};
use gar_export::core::export::ExportCoordinator;
use gar_export::domain::{GarError, Health};
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

fn write_json(dir: &Path, name: &str, value: serde_json::Value) -> String {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
    path.to_string_lossy().to_string()
}

fn pupil(uid: &str, last_name: &str) -> serde_json::Value {
    json!({
        "ENTPersonJointure": format!("AAF-{uid}"),
        "uid": uid,
        "ENTPersonSource": "AC-RENNES",
        "sn": last_name,
        "givenName": "Léa",
        "ENTPersonDateNaissance": "04/03/2012",
        "ESCOUAI": "0350063D",
        "ENTPersonStructRattach": "0350063D",
        "ENTEleveClasses": ["0350063D$6A$6ème A"]
    })
}

/// Snapshots of one school with two pupils in 6A and a teacher without facts
fn setup(dir: &Path, dry_run: bool) -> GarExportConfig {
    let structures = write_json(
        dir,
        "structures.json",
        json!([{
            "ENTStructureUAI": "0350063D",
            "ENTStructureNomCourant": "COLLEGE JEAN MOULIN",
            "ENTEtablissementContrat": "PU",
            "ENTStructureClasses": ["0350063D$6A$6ème A", "0350063D$6B$6ème B"]
        }]),
    );
    let pupils = write_json(
        dir,
        "pupils.json",
        json!([pupil("e1", "Martin"), pupil("e2", "Bernard")]),
    );
    let teachers = write_json(
        dir,
        "teachers.json",
        json!([{
            "ENTPersonJointure": "AAF-t1",
            "uid": "t1",
            "ENTPersonSource": "AC-RENNES",
            "sn": "Durand",
            "givenName": "Paul",
            "title": "ENS",
            "mail": "paul.durand@ac-rennes.fr",
            "ESCOUAI": "0350063D"
        }]),
    );
    let index = write_json(
        dir,
        "index.json",
        json!({
            "rennes-mef": [{"identifiant": "10010012110", "libelle": "6EME"}],
            "rennes-matiere": [{"identifiant": "030100", "libelle": "FRANCAIS"}]
        }),
    );

    let output = dir.join("output");
    let config_path = dir.join("gar-export.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[application]
dry_run = {dry_run}

[input]
structures = "{structures}"
pupils = "{pupils}"
teachers = "{teachers}"

[index]
kind = "file"
path = "{index}"
territory = "rennes"

[output]
directory = "{}"
"#,
            output.to_string_lossy()
        ),
    )
    .unwrap();

    load_config(&config_path).unwrap()
}

fn count(xml: &str, element: &str) -> usize {
    xml.matches(&format!("<{element}>")).count()
}

#[tokio::test]
async fn test_export_single_school() {
    let dir = TempDir::new().unwrap();
    let config = setup(dir.path(), false);

    let coordinator = ExportCoordinator::new(config).await.unwrap();
    let summary = coordinator.execute_export().await.unwrap();

    assert_eq!(summary.health, Health::Ok);
    assert!(summary.fatal_error.is_none());
    assert_eq!(summary.report("Eleve").unwrap().emitted, 2);
    assert_eq!(summary.report("Enseignant").unwrap().emitted, 1);
    assert_eq!(summary.report("Etab").unwrap().emitted, 1);

    let groups = summary.report("Groupe").unwrap();
    assert_eq!(groups.files.len(), 1);
    let xml = std::fs::read_to_string(&groups.files[0].path).unwrap();
    assert_eq!(count(&xml, "GARDivision"), 1);
    assert_eq!(count(&xml, "GARGroupe"), 0);
    assert_eq!(count(&xml, "GARPersonGroupe"), 2);
    assert!(xml.contains("<GARDivisionCode>6A</GARDivisionCode>"));
    assert!(!xml.contains("<GARDivisionCode>6B</GARDivisionCode>"));

    for file in summary.files() {
        assert!(file.written);
        assert!(file.path.exists());
        assert_eq!(file.sha256.len(), 64);
    }
}

#[tokio::test]
async fn test_export_dry_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let config = setup(dir.path(), true);
    let output = dir.path().join("output");

    let coordinator = ExportCoordinator::new(config).await.unwrap();
    let summary = coordinator.execute_export().await.unwrap();

    assert!(summary.dry_run);
    assert_eq!(summary.health, Health::Ok);
    assert!(summary.files().count() >= 4);
    assert!(summary.files().all(|file| !file.written));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_missing_structures_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mut config = setup(dir.path(), false);
    config.input.structures = dir
        .path()
        .join("missing.json")
        .to_string_lossy()
        .to_string();

    let coordinator = ExportCoordinator::new(config).await.unwrap();
    let summary = coordinator.execute_export().await.unwrap();

    assert_eq!(summary.health, Health::Fatal);
    assert!(summary.fatal_error.unwrap().contains("missing.json"));
}

#[tokio::test]
async fn test_missing_index_snapshot_fails_setup() {
    let dir = TempDir::new().unwrap();
    let mut config = setup(dir.path(), false);
    config.index.path = Some(dir.path().join("nowhere.json").to_string_lossy().to_string());

    let result = ExportCoordinator::new(config).await;
    assert!(matches!(result, Err(GarError::Configuration(_))));
}
