use assert_cmd::cargo::cargo_bin_cmd;
use pdf_engine::testing::{build_pdf, with_encrypt_entry, PageSpec};
use pdf_engine::{default_engine, OpenSource, PdfEngine};
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
    pdf: PathBuf,
    config: PathBuf,
}

/// Three pages (400x500, 400x500, 300x500 pt) with a two-level outline and
/// a config rendering at 72 dpi, so one point is one pixel at 100%.
fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("temp dir should be created");

    let pages = [
        PageSpec::with_lines(400.0, 500.0, &["Chapter one", "The tax rules"]),
        PageSpec::with_lines(400.0, 500.0, &["Chapter two"]),
        PageSpec::with_lines(300.0, 500.0, &["Tax tables"]),
    ];
    let pdf = dir.path().join("report.pdf");
    fs::write(&pdf, build_pdf(&pages, &[(1, "Start", 0), (2, "Details", 1)]))
        .expect("fixture should be written");

    let config = dir.path().join("viewer.json");
    fs::write(&config, r#"{ "dpi": 72 }"#).expect("config should be written");

    Fixture { dir, pdf, config }
}

fn json_stdout(command: &str, args: &[&str], fixture: &Fixture) -> Value {
    let output = cargo_bin_cmd!("pdf-cutter")
        .arg("--config")
        .arg(&fixture.config)
        .arg(command)
        .arg(&fixture.pdf)
        .args(args)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    serde_json::from_slice(&output).expect("stdout should contain valid json")
}

#[test]
fn info_emits_stable_json_contract() {
    let fixture = fixture();
    let value = json_stdout("info", &[], &fixture);

    assert_eq!(value["title"], "report.pdf");
    assert_eq!(value["page_count"], 3);
    assert_eq!(value["first_page_size_pt"]["width"], 400.0);
    assert_eq!(value["first_page_size_pt"]["height"], 500.0);
    assert_eq!(value["outline_entries"], 2);
}

#[test]
fn toc_prints_nested_outline() {
    let fixture = fixture();
    let value = json_stdout("toc", &[], &fixture);

    insta::assert_json_snapshot!(value, @r#"
    [
      {
        "children": [
          {
            "children": [],
            "page": 1,
            "title": "Details"
          }
        ],
        "page": 0,
        "title": "Start"
      }
    ]
    "#);
}

#[test]
fn layout_stacks_pages_with_gaps() {
    let fixture = fixture();
    let value = json_stdout("layout", &[], &fixture);

    assert_eq!(value["zoom"], "100%");
    assert_eq!(value["canvas"]["width"], 420);
    assert_eq!(value["canvas"]["height"], 1540);

    let tops: Vec<i64> = value["pages"]
        .as_array()
        .expect("pages array")
        .iter()
        .map(|page| page["y"].as_i64().expect("integer y"))
        .collect();
    assert_eq!(tops, vec![10, 520, 1030]);
    assert_eq!(value["pages"][2]["x"], 60);
}

#[test]
fn layout_follows_zoom() {
    let fixture = fixture();
    let value = json_stdout("layout", &["--zoom", "50%"], &fixture);

    assert_eq!(value["zoom"], "50%");
    assert_eq!(value["canvas"]["width"], 220);
    assert_eq!(value["pages"][1]["y"], 270);
}

#[test]
fn page_at_uses_viewport_center() {
    let fixture = fixture();
    let value = json_stdout("page-at", &["--scroll", "400"], &fixture);

    assert_eq!(value["scroll_offset"], 400);
    assert_eq!(value["page"], 1);
    assert_eq!(value["label"], "Page 2 / 3");

    let clamped = json_stdout("page-at", &["--scroll", "99999"], &fixture);
    assert_eq!(clamped["scroll_offset"], 940);
    assert_eq!(clamped["page"], 2);
}

#[test]
fn search_reports_hits_per_page() {
    let fixture = fixture();
    let value = json_stdout("search", &["TAX", "--zoom", "100"], &fixture);

    assert_eq!(value["total"], 2);
    assert_eq!(value["status"], "Found 2 matches for \"TAX\"");
    assert_eq!(value["first_page"], 0);

    let pages: Vec<i64> = value["hits"]
        .as_array()
        .expect("hits array")
        .iter()
        .map(|hit| hit["page"].as_i64().expect("page index"))
        .collect();
    assert_eq!(pages, vec![0, 2]);
}

#[test]
fn search_rejects_blank_text() {
    let fixture = fixture();

    cargo_bin_cmd!("pdf-cutter")
        .arg("search")
        .arg(&fixture.pdf)
        .arg("   ")
        .assert()
        .failure()
        .stderr(predicate::str::contains("search text is empty"));
}

#[test]
fn text_copies_selection_from_first_page() {
    let fixture = fixture();

    cargo_bin_cmd!("pdf-cutter")
        .arg("--config")
        .arg(&fixture.config)
        .arg("text")
        .arg(&fixture.pdf)
        .args(["--from", "70,70", "--to", "300,86"])
        .assert()
        .success()
        .stdout("Chapter one\n");
}

#[test]
fn text_accepts_selection_at_integer_limits() {
    let fixture = fixture();

    cargo_bin_cmd!("pdf-cutter")
        .arg("--config")
        .arg(&fixture.config)
        .arg("text")
        .arg(&fixture.pdf)
        .args(["--from", "-2147483648,70", "--to", "2147483647,86"])
        .assert()
        .success()
        .stdout("Chapter one\n");
}

#[test]
fn tiny_selection_copies_nothing() {
    let fixture = fixture();

    cargo_bin_cmd!("pdf-cutter")
        .arg("--config")
        .arg(&fixture.config)
        .arg("text")
        .arg(&fixture.pdf)
        .args(["--from", "70,70", "--to", "72,86"])
        .assert()
        .success()
        .stdout("");
}

#[test]
fn export_writes_default_named_range() {
    let fixture = fixture();
    let value = json_stdout("export", &["--current-page", "2"], &fixture);

    let expected = fixture.dir.path().join("report_pages_2-3.pdf");
    assert_eq!(value["from"], 2);
    assert_eq!(value["to"], 3);
    assert_eq!(value["pages"], 2);
    assert_eq!(value["output"], expected.display().to_string());

    let mut engine = default_engine();
    let handle = engine.open(OpenSource::from(expected.as_path())).expect("export should reopen");
    assert_eq!(engine.page_count(handle).expect("page count"), 2);
    assert_eq!(engine.page_size(handle, 1).expect("page size").width_pt, 300.0);
}

#[test]
fn export_rejects_reversed_range() {
    let fixture = fixture();
    let output = fixture.dir.path().join("never.pdf");

    cargo_bin_cmd!("pdf-cutter")
        .arg("export")
        .arg(&fixture.pdf)
        .args(["--from", "3", "--to", "1", "--output"])
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("'From' must be <= 'To'"));

    assert!(!output.exists());
}

#[test]
fn render_writes_png_at_render_scale() {
    let fixture = fixture();
    let output_path = fixture.dir.path().join("page3.png");

    cargo_bin_cmd!("pdf-cutter")
        .arg("--config")
        .arg(&fixture.config)
        .arg("render")
        .arg(&fixture.pdf)
        .args(["--page", "3", "--highlight", "tax", "--output"])
        .arg(&output_path)
        .assert()
        .success();

    let image = image::open(&output_path).expect("render should be readable image");
    assert_eq!((image.width(), image.height()), (300, 500));
}

#[test]
fn render_thumbnail_writes_png_file() {
    let fixture = fixture();
    let output_path = fixture.dir.path().join("thumb.png");

    cargo_bin_cmd!("pdf-cutter")
        .arg("render")
        .arg(&fixture.pdf)
        .args(["--page", "2", "--thumbnail", "60x60", "--output"])
        .arg(&output_path)
        .assert()
        .success();

    assert!(output_path.exists(), "thumbnail output file should exist");

    let image = image::open(&output_path).expect("thumbnail should be readable image");
    assert!(image.width() > 0 && image.width() <= 60);
    assert!(image.height() > 0 && image.height() <= 60);
}

#[test]
fn info_fails_for_missing_file() {
    let fixture = fixture();

    cargo_bin_cmd!("pdf-cutter")
        .arg("info")
        .arg(fixture.dir.path().join("missing.pdf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("file does not exist"));
}

#[test]
fn info_fails_for_invalid_pdf() {
    let fixture = fixture();
    let invalid = fixture.dir.path().join("invalid.pdf");
    fs::write(&invalid, b"this is not a pdf").expect("write should succeed");

    cargo_bin_cmd!("pdf-cutter")
        .arg("info")
        .arg(&invalid)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to open PDF"));
}

#[test]
fn info_fails_for_encrypted_pdf() {
    let fixture = fixture();
    let encrypted = fixture.dir.path().join("encrypted.pdf");
    let bytes = fs::read(&fixture.pdf).expect("fixture should be readable");
    fs::write(&encrypted, with_encrypt_entry(&bytes)).expect("write should succeed");

    cargo_bin_cmd!("pdf-cutter")
        .arg("info")
        .arg(&encrypted)
        .assert()
        .failure()
        .stderr(predicate::str::contains("encrypted PDFs are not supported"));
}

#[test]
fn invalid_config_is_reported() {
    let fixture = fixture();
    fs::write(&fixture.config, r#"{ "dpi": 0 }"#).expect("write should succeed");

    cargo_bin_cmd!("pdf-cutter")
        .arg("--config")
        .arg(&fixture.config)
        .arg("layout")
        .arg(&fixture.pdf)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid config").and(predicate::str::contains("dpi")));
}

#[test]
fn version_prints_package_version() {
    cargo_bin_cmd!("pdf-cutter")
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
