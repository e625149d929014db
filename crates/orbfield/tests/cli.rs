use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn orbfield(config_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_orbfield"))
        .env("ORBFIELD_CONFIG_DIR", config_dir)
        .env_remove("ORBFIELD_CONFIG")
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("failed to run orbfield")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn still_exports_png_at_capped_pixel_ratio() {
    let root = TempDir::new().unwrap();
    let target = root.path().join("out/still.png");
    let output = orbfield(
        root.path(),
        &[
            "still",
            "--size",
            "200x120",
            "--dpr",
            "3",
            "--seed",
            "7",
            "--time",
            "2s",
            "--output",
            target.to_str().unwrap(),
        ],
    );
    assert!(output.status.success(), "{output:?}");

    let image = image::open(&target).unwrap();
    // 1.75 is the default pixel ratio cap.
    assert_eq!((image.width(), image.height()), (350, 210));
}

#[test]
fn simulated_render_reports_json_summary() {
    let root = TempDir::new().unwrap();
    let last = root.path().join("last.png");
    let output = orbfield(
        root.path(),
        &[
            "render",
            "--size",
            "160x100",
            "--duration",
            "1s",
            "--fps",
            "30",
            "--seed",
            "3",
            "--json",
            "--output",
            last.to_str().unwrap(),
        ],
    );
    assert!(output.status.success(), "{output:?}");

    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let drawn = report["drawn"].as_u64().unwrap();
    assert!((25..=35).contains(&drawn), "drawn {drawn}");
    assert!(report["paced"].as_u64().unwrap() > 0);
    assert!(last.exists());
}

#[test]
fn config_file_is_discovered_and_shown() {
    let root = TempDir::new().unwrap();
    fs::write(
        root.path().join("config.toml"),
        "version = 1\n[field]\nhue = 42\n[pacing]\nfps_window = \"1s\"\n",
    )
    .unwrap();

    let shown = orbfield(root.path(), &["config", "show"]);
    assert!(shown.status.success(), "{shown:?}");
    let text = stdout(&shown);
    assert!(text.contains("hue = 42"));
    assert!(text.contains("fps_window = \"1s\""));

    let location = orbfield(root.path(), &["config", "where"]);
    assert!(location.status.success());
    assert!(stdout(&location).contains("config.toml"));
}

#[test]
fn invalid_config_is_rejected() {
    let root = TempDir::new().unwrap();
    let explicit = root.path().join("broken.toml");
    fs::write(&explicit, "version = 2\n").unwrap();

    let output = orbfield(
        root.path(),
        &["--config", explicit.to_str().unwrap(), "config", "show"],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("version"));
}

#[test]
fn assets_optimize_then_manifest_resolves_variants() {
    let root = TempDir::new().unwrap();
    let assets = root.path().join("assets");
    fs::create_dir_all(assets.join("covers")).unwrap();
    image::RgbImage::from_pixel(2400, 1200, image::Rgb([90, 40, 200]))
        .save(assets.join("covers/hero.png"))
        .unwrap();

    let optimized = orbfield(
        root.path(),
        &["assets", "optimize", "--root", assets.to_str().unwrap()],
    );
    assert!(optimized.status.success(), "{optimized:?}");
    assert!(stdout(&optimized)
        .contains("[optimize-images] done. inputs=1, converted=1, skipped=0, failed=0"));
    let webp = image::open(assets.join("covers/hero.webp")).unwrap();
    assert_eq!(webp.width(), 1600);

    let again = orbfield(
        root.path(),
        &["assets", "optimize", "--root", assets.to_str().unwrap()],
    );
    assert!(stdout(&again).contains("skipped=1"));

    let manifest = orbfield(
        root.path(),
        &[
            "assets",
            "manifest",
            "--root",
            assets.to_str().unwrap(),
            "--resolve",
            "covers/hero.png",
        ],
    );
    assert!(manifest.status.success(), "{manifest:?}");
    let resolved: serde_json::Value = serde_json::from_str(&stdout(&manifest)).unwrap();
    let variants = &resolved["covers/hero.png"];
    assert!(variants["webp"].as_str().unwrap().ends_with("hero.webp"));
    assert!(variants["original"].as_str().unwrap().ends_with("hero.png"));
    assert!(variants["avif"].is_null());
}

#[test]
fn manifest_resolves_under_custom_mount() {
    let root = TempDir::new().unwrap();
    let assets = root.path().join("img");
    fs::create_dir_all(assets.join("covers")).unwrap();
    fs::write(assets.join("covers/a.jpg"), b"x").unwrap();

    let output = orbfield(
        root.path(),
        &[
            "assets",
            "manifest",
            "--root",
            assets.to_str().unwrap(),
            "--mount",
            "/static/img",
            "--resolve",
            "covers/a.jpg",
        ],
    );
    assert!(output.status.success(), "{output:?}");
    let resolved: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(
        resolved["covers/a.jpg"]["original"].as_str().unwrap(),
        assets.join("covers/a.jpg").to_str().unwrap()
    );
}
