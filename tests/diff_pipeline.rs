use image::{Rgba, RgbaImage};
use serde_json::Value;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn write_solid(path: &Path, width: u32, height: u32, color: [u8; 4]) {
    RgbaImage::from_pixel(width, height, Rgba(color))
        .save(path)
        .expect("write image");
}

fn run_diff_json(args: &[&str]) -> (Option<i32>, Value) {
    let output = Command::new(env!("CARGO_BIN_EXE_vrt"))
        .args(args)
        .output()
        .expect("run vrt");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: Value = serde_json::from_str(stdout.trim()).unwrap_or_else(|e| {
        panic!("stdout was not JSON ({e}): {stdout}");
    });
    (output.status.code(), json)
}

#[test]
fn diff_report_for_identical_images() {
    let dir = TempDir::new().expect("tempdir");
    let before = dir.path().join("before.png");
    let after = dir.path().join("after.png");
    let out = dir.path().join("diff.png");
    write_solid(&before, 16, 8, [40, 80, 120, 255]);
    write_solid(&after, 16, 8, [40, 80, 120, 255]);

    let (code, json) = run_diff_json(&[
        "diff",
        "--before",
        before.to_str().unwrap(),
        "--after",
        after.to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
        "--format",
        "json",
    ]);

    assert_eq!(code, Some(0));
    assert_eq!(json["kind"], "diff");
    assert_eq!(json["version"], "0.1.0");
    assert_eq!(json["diffPixels"], 0);
    assert_eq!(json["totalPixels"], 128);
    assert_eq!(json["diffRatio"], 0.0);
    assert_eq!(json["width"], 16);
    assert_eq!(json["height"], 8);
    assert!(json["passed"].is_null(), "no --max-ratio, no verdict");
    assert!(out.is_file(), "diff image is written even with zero changes");
}

#[test]
fn diff_report_for_changed_region_with_bound() {
    let dir = TempDir::new().expect("tempdir");
    let before = dir.path().join("before.png");
    let after = dir.path().join("after.png");
    let out = dir.path().join("diff.png");

    write_solid(&before, 10, 10, [255, 255, 255, 255]);
    let mut img = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 255]));
    for y in 0..5 {
        for x in 0..10 {
            img.put_pixel(x, y, Rgba([0, 0, 0, 255]));
        }
    }
    img.save(&after).expect("write image");

    let (code, json) = run_diff_json(&[
        "diff",
        "--before",
        before.to_str().unwrap(),
        "--after",
        after.to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
        "--max-ratio",
        "0.1",
    ]);

    assert_eq!(code, Some(1), "50% change must exceed a 10% bound");
    assert_eq!(json["diffPixels"], 50);
    assert_eq!(json["passed"], false);

    // Pixels that darkened are painted with the alternate diff color.
    let diff_img = image::open(&out).expect("decode diff").to_rgba8();
    assert_eq!(*diff_img.get_pixel(5, 2), Rgba([0, 255, 0, 255]));
}

#[test]
fn diff_composites_mismatched_dimensions_onto_max_canvas() {
    let dir = TempDir::new().expect("tempdir");
    let before = dir.path().join("before.png");
    let after = dir.path().join("after.png");
    let out = dir.path().join("diff.png");
    // Different page lengths, same white content: padding is white too, so
    // nothing should be flagged.
    write_solid(&before, 20, 30, [255, 255, 255, 255]);
    write_solid(&after, 25, 10, [255, 255, 255, 255]);

    let (code, json) = run_diff_json(&[
        "diff",
        "--before",
        before.to_str().unwrap(),
        "--after",
        after.to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
    ]);

    assert_eq!(code, Some(0));
    assert_eq!(json["width"], 25);
    assert_eq!(json["height"], 30);
    assert_eq!(json["totalPixels"], 750);
    assert_eq!(json["diffPixels"], 0);
}

#[test]
fn diff_allocates_output_in_store_when_out_is_omitted() {
    let dir = TempDir::new().expect("tempdir");
    let before = dir.path().join("before.png");
    let after = dir.path().join("after.png");
    let root = dir.path().join("store");
    write_solid(&before, 4, 4, [9, 9, 9, 255]);
    write_solid(&after, 4, 4, [9, 9, 9, 255]);

    let (code, json) = run_diff_json(&[
        "diff",
        "--before",
        before.to_str().unwrap(),
        "--after",
        after.to_str().unwrap(),
        "--root",
        root.to_str().unwrap(),
    ]);

    assert_eq!(code, Some(0));
    let diff_image = json["diffImage"].as_str().expect("diffImage path");
    assert!(diff_image.contains("diffs"), "got: {diff_image}");
    let name = Path::new(diff_image)
        .file_name()
        .and_then(|n| n.to_str())
        .expect("file name");
    assert!(name.starts_with("diff-") && name.ends_with(".png"));
    assert!(Path::new(diff_image).is_file());
}

#[test]
fn clean_reports_per_directory_counts() {
    let dir = TempDir::new().expect("tempdir");
    let root = dir.path();
    for sub in ["screenshots", "diffs", "uploads"] {
        std::fs::create_dir_all(root.join(sub)).expect("mkdir");
    }
    write_solid(&root.join("screenshots/a.png"), 2, 2, [0, 0, 0, 255]);
    write_solid(&root.join("screenshots/b.png"), 2, 2, [0, 0, 0, 255]);
    write_solid(&root.join("diffs/diff-a.png"), 2, 2, [0, 0, 0, 255]);
    std::fs::write(root.join("uploads/readme.txt"), "keep me").expect("write");

    let (code, json) = run_diff_json(&["clean", "--root", root.to_str().unwrap()]);

    assert_eq!(code, Some(0));
    assert_eq!(json["kind"], "clean");
    assert_eq!(json["screenshotsRemoved"], 2);
    assert_eq!(json["diffsRemoved"], 1);
    assert_eq!(json["uploadsRemoved"], 0);
    assert_eq!(json["totalRemoved"], 3);
    assert!(root.join("uploads/readme.txt").is_file());
}

#[test]
fn error_output_is_versioned_json_with_category() {
    let dir = TempDir::new().expect("tempdir");
    let output = Command::new(env!("CARGO_BIN_EXE_vrt"))
        .args([
            "diff",
            "--before",
            dir.path().join("missing.png").to_str().unwrap(),
            "--after",
            dir.path().join("also-missing.png").to_str().unwrap(),
            "--root",
            dir.path().join("store").to_str().unwrap(),
        ])
        .output()
        .expect("run vrt");

    assert_eq!(output.status.code(), Some(2));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: Value = serde_json::from_str(stdout.trim()).expect("error JSON");
    assert_eq!(json["kind"], "error");
    assert_eq!(json["version"], "0.1.0");
    assert_eq!(json["error"]["category"], "decode");
    assert!(json["error"]["remediation"].is_string());
}
