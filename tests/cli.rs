mod common;

use std::fs;

use assert_cmd::Command;
use common::{PERSON_MANIFEST, TestWorkspace};
use predicates::{prelude::PredicateBooleanExt, str::contains};

const PEOPLE_CSV: &str = "name,AGE,Shoe Size,member,email\n\
Ada,36,38,Y,ada@example.com\n\
Grace,45,40,N,\n\
Linus,29,44,Y,linus@example.org\n";

fn sheet_mapper() -> Command {
    Command::cargo_bin("sheet-mapper").expect("binary exists")
}

#[test]
fn check_prints_the_field_table_without_input() {
    let workspace = TestWorkspace::new();
    let schema = workspace.write("person.yml", PERSON_MANIFEST);

    sheet_mapper()
        .args(["check", "-s", schema.to_str().unwrap()])
        .assert()
        .success()
        .stdout(
            contains("field")
                .and(contains("label"))
                .and(contains("string(pattern)?"))
                .and(contains("bool(flag)")),
        );
}

#[test]
fn check_reports_header_resolution() {
    let workspace = TestWorkspace::new();
    let schema = workspace.write("person.yml", PERSON_MANIFEST);
    let input = workspace.write("people.csv", "AGE,Shoe Size,name,Name\n1,2,3,4\n");

    sheet_mapper()
        .args([
            "check",
            "-s",
            schema.to_str().unwrap(),
            "-i",
            input.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(
            contains("Unknown columns: Shoe Size (1)")
                .and(contains("Shadowed by a later column: name (2)"))
                .and(contains("Unbound fields: email, member")),
        );
}

#[test]
fn import_writes_one_json_object_per_row() {
    let workspace = TestWorkspace::new();
    let schema = workspace.write("person.yml", PERSON_MANIFEST);
    let input = workspace.write("people.csv", PEOPLE_CSV);

    sheet_mapper()
        .args([
            "import",
            "-s",
            schema.to_str().unwrap(),
            "-i",
            input.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(
            contains(r#"{"Name":"Ada","Age":36,"Email":"ada@example.com","Member":true}"#)
                .and(contains(r#"{"Name":"Grace","Age":45,"Email":null,"Member":false}"#))
                .and(contains("Linus")),
        );
}

#[test]
fn import_honours_limit_and_output_path() {
    let workspace = TestWorkspace::new();
    let schema = workspace.write("person.yml", PERSON_MANIFEST);
    let input = workspace.write("people.csv", PEOPLE_CSV);
    let output = workspace.path().join("people.jsonl");

    sheet_mapper()
        .args([
            "import",
            "-s",
            schema.to_str().unwrap(),
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--limit",
            "2",
        ])
        .assert()
        .success();

    let written = fs::read_to_string(&output).expect("read output");
    assert_eq!(written.lines().count(), 2);
    assert!(!written.contains("Linus"));
}

#[test]
fn strict_import_fails_on_unmappable_cells() {
    let workspace = TestWorkspace::new();
    let schema = workspace.write("person.yml", PERSON_MANIFEST);
    let input = workspace.write("people.csv", "Name,Age\nAda,thirty-six\nGrace,45\n");

    sheet_mapper()
        .args([
            "import",
            "-s",
            schema.to_str().unwrap(),
            "-i",
            input.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(contains(r#""Age":null"#).and(contains("Grace")))
        .stderr(contains("Row 2 column 'Age'"));

    sheet_mapper()
        .args([
            "import",
            "-s",
            schema.to_str().unwrap(),
            "-i",
            input.to_str().unwrap(),
            "--strict",
        ])
        .assert()
        .failure()
        .stderr(contains("1 cell(s) could not be mapped"));
}

#[test]
fn export_writes_rows_in_schema_layout() {
    let workspace = TestWorkspace::new();
    let schema = workspace.write("person.yml", PERSON_MANIFEST);
    let input = workspace.write(
        "people.jsonl",
        "{\"Name\":\"Ada\",\"Age\":36,\"Member\":true,\"Extra\":1}\n\n{\"name\":\"Grace, Hopper\",\"Email\":null,\"Member\":false}\n",
    );
    let output = workspace.path().join("people.csv");

    sheet_mapper()
        .args([
            "export",
            "-s",
            schema.to_str().unwrap(),
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .success();

    let written = fs::read_to_string(&output).expect("read output");
    assert_eq!(
        written.lines().collect::<Vec<_>>(),
        vec!["Name,Age,Email,Member", "Ada,36,,Y", "\"Grace, Hopper\",,,N"]
    );
}

#[test]
fn custom_date_fields_import_and_export_as_codec_text() {
    let workspace = TestWorkspace::new();
    let schema = workspace.write(
        "battle.yml",
        "record: Battle\nfields:\n  - label: Name\n    type: string\n  - label: Fought\n    type: custom\n    nullable: true\n    codec: date\n    param: \"%d/%m/%Y\"\n",
    );
    let csv = workspace.write("battles.csv", "Fought,Name\n18/6/1815,Waterloo\n,Ligny\n");

    sheet_mapper()
        .args([
            "import",
            "-s",
            schema.to_str().unwrap(),
            "-i",
            csv.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(
            "{\"Name\":\"Waterloo\",\"Fought\":\"18/06/1815\"}\n{\"Name\":\"Ligny\",\"Fought\":null}\n",
        );

    let jsonl = workspace.write(
        "battles.jsonl",
        "{\"Name\":\"Waterloo\",\"Fought\":\"18/6/1815\"}\n{\"Name\":\"Quatre Bras\",\"Fought\":\"June 16th\"}\n",
    );
    let output = workspace.path().join("battles.csv.out");
    sheet_mapper()
        .args([
            "export",
            "-s",
            schema.to_str().unwrap(),
            "-i",
            jsonl.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stderr(contains("field 'Fought'"));

    let written = fs::read_to_string(&output).expect("read output");
    assert_eq!(
        written.lines().collect::<Vec<_>>(),
        vec!["Name,Fought", "Waterloo,18/06/1815", "Quatre Bras,"]
    );
}

#[test]
fn missing_manifest_is_reported_as_an_error() {
    let workspace = TestWorkspace::new();
    let missing = workspace.path().join("absent.yml");

    sheet_mapper()
        .args(["check", "-s", missing.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("error:").and(contains("Opening manifest file")));
}

#[test]
fn invalid_manifests_name_the_offending_field() {
    let workspace = TestWorkspace::new();
    let schema = workspace.write(
        "bad.yml",
        "record: Bad\ncase_sensitive: false\nfields:\n  - label: Code\n    type: string\n  - label: CODE\n    type: int\n",
    );

    sheet_mapper()
        .args(["check", "-s", schema.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("declares label 'CODE' more than once"));
}
