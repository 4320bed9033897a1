use approx::assert_relative_eq;
use floodmap::backend::DEFAULT_PROJECT;
use floodmap::backend::synthetic::demo_backend;
use floodmap::io::writers::metadata::{MANIFEST_FILE, read_manifest};
use floodmap::{
    ExportOptions, FloodParams, OutputFormat, build_flood_map, catalog_session, demo_session,
    export_flood_map, render_flood_map, save_catalog,
};

#[test]
fn saved_demo_catalog_renders_the_same_map() {
    let dir = tempfile::tempdir().unwrap();
    save_catalog(dir.path(), &demo_backend()).unwrap();

    let params = FloodParams::default();
    let demo = demo_session(DEFAULT_PROJECT).unwrap();
    let expected = render_flood_map(&demo, &build_flood_map(&demo, &params).unwrap()).unwrap();

    let session = catalog_session(dir.path(), DEFAULT_PROJECT).unwrap();
    let map = build_flood_map(&session, &params).unwrap();
    assert_eq!(map.baseline_scene_count, 3);
    assert_eq!(map.flood_scene_count, 3);
    let rendered = render_flood_map(&session, &map).unwrap();

    assert_eq!(rendered.view, expected.view);
    for (got, want) in rendered.layers.iter().zip(&expected.layers) {
        assert_eq!(got.name, want.name);
        assert_eq!(got.stats.valid_pixels, want.stats.valid_pixels, "{}", got.name);
        if let (Some(a), Some(b)) = (got.stats.mean, want.stats.mean) {
            assert_relative_eq!(a, b, max_relative = 1e-9);
        }
    }
}

#[test]
fn jpeg_export_writes_composite_and_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let session = demo_session(DEFAULT_PROJECT).unwrap();
    let map = build_flood_map(&session, &FloodParams::default()).unwrap();
    let rendered = render_flood_map(&session, &map).unwrap();

    let options = ExportOptions {
        format: OutputFormat::JPEG,
        size: Some(64),
        include_hidden: false,
    };
    let report = export_flood_map(&map, &rendered, dir.path(), &options).unwrap();
    assert!(report.composite.as_ref().is_some_and(|p| p.exists()));
    assert!(dir.path().join(MANIFEST_FILE).exists());
    assert!(report.written.iter().all(|p| p.extension().is_some_and(|e| e == "jpg")));

    let manifest = read_manifest(dir.path()).unwrap();
    assert_eq!(manifest.layers.len(), map.layers.len());
    assert_eq!(manifest.params, map.params);
    let dem = manifest.layers.iter().find(|l| l.name == "DEM").unwrap();
    assert!(!dem.shown);
    assert!(dem.file.is_none());
}

#[test]
fn unknown_catalog_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(catalog_session(&dir.path().join("missing"), DEFAULT_PROJECT).is_err());
}
