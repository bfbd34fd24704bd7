use digiurban::schema::{self, Outcome, Placement, SchemaError};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const SCHEMA: &str = r#"datasource db {
  provider = "postgresql"
  url      = env("DATABASE_URL")
}

model Family {
  id            String   @id @default(cuid())
  responsible   String
  monthlyIncome Decimal  @db.Decimal(10, 2)
  createdAt     DateTime @default(now())
  updatedAt     DateTime @updatedAt
}

model RuralProducer {
  id        String   @id @default(cuid())
  name      String
  createdAt DateTime @default(now())
}
"#;

const MANIFEST: &str = r#"{
  "fields": [
    { "model": "Family", "name": "visits", "type": "Json", "attributes": "@default(\"[]\")", "before": "createdAt" },
    { "model": "RuralProducer", "name": "harvests", "type": "Json", "attributes": "@default(\"[]\")", "before": "createdAt" },
    { "model": "RuralProducer", "name": "name", "type": "String" },
    { "model": "Athlete", "name": "medical", "type": "Json?" }
  ]
}"#;

struct Workspace {
    _dir: TempDir,
    schema: PathBuf,
    manifest: PathBuf,
}

fn workspace() -> Workspace {
    let dir = tempfile::tempdir().unwrap();
    let schema = dir.path().join("schema.prisma");
    let manifest = dir.path().join("field-additions.json");
    fs::write(&schema, SCHEMA).unwrap();
    fs::write(&manifest, MANIFEST).unwrap();
    Workspace {
        _dir: dir,
        schema,
        manifest,
    }
}

fn model_block<'a>(schema: &'a str, model: &str) -> &'a str {
    let start = schema.find(&format!("model {} {{", model)).unwrap();
    let end = start + schema[start..].find("\n}").unwrap();
    &schema[start..end]
}

fn run_cli(schema: &Path, manifest: &Path, extra: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_schema-patch"))
        .arg("--schema")
        .arg(schema)
        .arg("--manifest")
        .arg(manifest)
        .args(extra)
        .output()
        .unwrap()
}

#[test]
fn fields_are_inserted_before_the_anchor() {
    let ws = workspace();

    let report = schema::patch_file(&ws.schema, &ws.manifest, false).unwrap();

    let outcomes: Vec<_> = report.entries.iter().map(|e| e.outcome.clone()).collect();
    assert_eq!(
        outcomes,
        [
            Outcome::Added(Placement::Before("createdAt".to_string())),
            Outcome::Added(Placement::Before("createdAt".to_string())),
            Outcome::AlreadyPresent,
            Outcome::ModelMissing,
        ]
    );

    let patched = fs::read_to_string(&ws.schema).unwrap();
    let family = model_block(&patched, "Family");
    let visits = family.find("visits").unwrap();
    assert!(visits < family.find("createdAt").unwrap());
    assert!(visits > family.find("monthlyIncome").unwrap());
    assert!(family.contains(r#"@default("[]")"#));

    // Untouched sections keep their formatting
    assert!(patched.starts_with(&SCHEMA[..SCHEMA.find("model Family").unwrap()]));
}

#[test]
fn patching_twice_changes_nothing() {
    let ws = workspace();
    schema::patch_file(&ws.schema, &ws.manifest, false).unwrap();
    let once = fs::read_to_string(&ws.schema).unwrap();

    let report = schema::patch_file(&ws.schema, &ws.manifest, false).unwrap();

    assert!(!report.changed());
    assert_eq!(report.added().count(), 0);
    assert_eq!(fs::read_to_string(&ws.schema).unwrap(), once);
    assert_eq!(model_block(&once, "Family").matches("visits").count(), 1);
}

#[test]
fn dry_run_leaves_the_file_alone() {
    let ws = workspace();

    let report = schema::patch_file(&ws.schema, &ws.manifest, true).unwrap();

    assert!(report.changed());
    assert_eq!(fs::read_to_string(&ws.schema).unwrap(), SCHEMA);
}

#[test]
fn missing_schema_is_an_io_error() {
    let ws = workspace();
    let missing = ws.manifest.with_file_name("nope.prisma");

    let err = schema::patch_file(&missing, &ws.manifest, false).unwrap_err();

    assert!(matches!(err, SchemaError::Io { ref path, .. } if path == &missing));
}

#[test]
fn cli_reports_and_is_idempotent() {
    let ws = workspace();

    let first = run_cli(&ws.schema, &ws.manifest, &[]);
    assert!(first.status.success());
    let stdout = String::from_utf8_lossy(&first.stdout);
    assert!(stdout.contains("2 added, 2 skipped"), "{}", stdout);

    let second = run_cli(&ws.schema, &ws.manifest, &[]);
    assert!(second.status.success());
    let stdout = String::from_utf8_lossy(&second.stdout);
    assert!(stdout.contains("0 added, 4 skipped"), "{}", stdout);
}

#[test]
fn cli_fails_on_a_broken_manifest() {
    let ws = workspace();
    fs::write(&ws.manifest, "{ \"fields\": [").unwrap();

    let output = run_cli(&ws.schema, &ws.manifest, &["--dry-run"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("error:"));
    assert_eq!(fs::read_to_string(&ws.schema).unwrap(), SCHEMA);
}

#[test]
fn cli_defaults_patch_the_bundled_schema() {
    let bundled = Path::new(env!("CARGO_MANIFEST_DIR")).join("prisma");
    let dir = tempfile::tempdir().unwrap();
    let prisma = dir.path().join("prisma");
    fs::create_dir(&prisma).unwrap();
    for file in ["schema.prisma", "field-additions.json"] {
        fs::copy(bundled.join(file), prisma.join(file)).unwrap();
    }

    let output = Command::new(env!("CARGO_BIN_EXE_schema-patch"))
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("11 added, 1 skipped"), "{}", stdout);
    let patched = fs::read_to_string(prisma.join("schema.prisma")).unwrap();
    assert!(model_block(&patched, "Family").contains("visits"));
}
