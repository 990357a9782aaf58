#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use sheet_mapper::{
    CodecRegistry, MappedRecord, Schema, SchemaError,
    codec::{DateCodec, FlagCodec},
};
use tempfile::TempDir;

/// Record used across the integration suites.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Person {
    pub name: String,
    pub age: i32,
    pub email: Option<String>,
    pub height: f64,
    pub initial: char,
    pub active: bool,
    pub born: Option<NaiveDate>,
    pub member: bool,
}

pub const PERSON_LABELS: [&str; 8] = [
    "Name", "Age", "Email", "Height", "Initial", "Active", "Born", "Member",
];

impl MappedRecord for Person {
    fn schema(codecs: &CodecRegistry) -> Result<Schema<Self>, SchemaError> {
        Schema::builder("Person", codecs)
            .case_sensitive(false)
            .field("name", "Name", |p: &Person| &p.name, |p: &mut Person| &mut p.name)
            .field("age", "Age", |p: &Person| &p.age, |p: &mut Person| &mut p.age)
            .field("email", "Email", |p: &Person| &p.email, |p: &mut Person| &mut p.email)
            .field("height", "Height", |p: &Person| &p.height, |p: &mut Person| &mut p.height)
            .field("initial", "Initial", |p: &Person| &p.initial, |p: &mut Person| {
                &mut p.initial
            })
            .field("active", "Active", |p: &Person| &p.active, |p: &mut Person| &mut p.active)
            .optional_codec_field::<DateCodec>(
                "born",
                "Born",
                "%d/%m/%Y",
                |p: &Person| &p.born,
                |p: &mut Person| &mut p.born,
            )
            .codec_field::<FlagCodec>(
                "member",
                "Member",
                "Y|N",
                |p: &Person| &p.member,
                |p: &mut Person| &mut p.member,
            )
            .build()
    }
}

pub fn ada() -> Person {
    Person {
        name: "Ada".to_string(),
        age: 36,
        email: Some("ada@example.com".to_string()),
        height: 1.65,
        initial: 'A',
        active: true,
        born: NaiveDate::from_ymd_opt(1815, 12, 10),
        member: true,
    }
}

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

pub const PERSON_MANIFEST: &str = r#"record: Person
case_sensitive: false
fields:
  - label: Name
    type: string
  - label: Age
    type: int
  - label: Email
    type: string
    nullable: true
    codec: pattern
    param: "^[^@]+@[^@]+$"
  - label: Member
    type: bool
    codec: flag
    param: "Y|N"
"#;

/// Temporary directory holding manifests and data files for one test.
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        TestWorkspace {
            dir: TempDir::new().expect("create workspace dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let target = self.dir.path().join(name);
        fs::write(&target, contents).unwrap_or_else(|err| panic!("writing {name}: {err}"));
        target
    }
}
