//! Tests d'intégration sur des shapefiles générés

mod fixtures;

use fixtures::{FixtureField, FixtureShape};
use geo::Geometry;
use shpread::Value;

#[test]
fn test_read_features_shapefile() {
    let dir = tempfile::tempdir().unwrap();
    let shp = fixtures::features_fixture(dir.path());

    let mut dataset = shpread::open(&shp).expect("open fixture");
    assert_eq!(dataset.name(), "features");
    assert_eq!(dataset.fields(), ["id_", "slug", "about"]);
    assert_eq!(dataset.record_count(), Some(2));
    assert!(dataset.crs().is_none());

    let features: Vec<_> = dataset
        .features()
        .collect::<Result<_, _>>()
        .expect("read features");
    assert_eq!(features.len(), 2);

    let uk = &features[0];
    assert_eq!(uk.id, 0);
    assert_eq!(uk.property("id_"), Some(&Value::Integer(123)));
    assert_eq!(uk.property("slug"), Some(&Value::Text("uk".to_string())));
    assert_eq!(
        uk.property("about"),
        Some(&Value::Text("Rough area around the UK".to_string()))
    );

    match &uk.geometry {
        Some(Geometry::Polygon(p)) => {
            assert_eq!(p.exterior().0.len(), 6);
            assert!(p.interiors().is_empty());
            let first = p.exterior().0[0];
            assert!((first.x - -8.0859375).abs() < 1e-9);
            assert!((first.y - 60.930432202923335).abs() < 1e-9);
        }
        other => panic!("Expected Polygon geometry, got {:?}", other),
    }

    let usa = &features[1];
    assert_eq!(usa.id, 1);
    assert_eq!(usa.property("slug").and_then(Value::as_str), Some("usa"));
}

#[test]
fn test_read_zipped_shapefile_with_prj() {
    let dir = tempfile::tempdir().unwrap();
    let shp = fixtures::features_fixture(dir.path());
    fixtures::write_prj(&shp, fixtures::WGS84_PRJ);
    let zip = fixtures::zip_fixture(&shp, Some("nested"));

    let mut dataset = shpread::open(&zip).expect("open zip");
    assert_eq!(dataset.name(), "features");
    assert!(dataset
        .crs()
        .map(|crs| crs.wkt.starts_with("GEOGCS"))
        .unwrap_or(false));

    let slugs: Vec<String> = dataset
        .features()
        .map(|f| f.unwrap().property("slug").unwrap().to_string())
        .collect();
    assert_eq!(slugs, ["uk", "usa"]);
}

#[test]
fn test_null_shapes_and_empty_attributes() {
    let dir = tempfile::tempdir().unwrap();
    let shp = fixtures::write_shapefile(
        dir.path(),
        "points",
        &[
            FixtureField::character("name", 10),
            FixtureField::numeric("height", 8, 2),
        ],
        &[
            (FixtureShape::Point(2.35, 48.85), vec!["paris", "35.50"]),
            (FixtureShape::Null, vec!["", ""]),
        ],
    );

    let mut dataset = shpread::open(&shp).unwrap();
    let features: Vec<_> = dataset.features().map(Result::unwrap).collect();

    assert!(matches!(features[0].geometry, Some(Geometry::Point(_))));
    assert_eq!(features[0].property("height"), Some(&Value::Real(35.5)));

    assert!(features[1].geometry.is_none());
    assert_eq!(features[1].property("name"), Some(&Value::Null));
    assert_eq!(features[1].property("height"), Some(&Value::Null));
}

#[test]
fn test_open_missing_file() {
    let result = shpread::open(std::path::Path::new("does/not/exist.shp"));
    assert!(result.is_err());
}

#[test]
fn test_zip_named_after_archive() {
    let dir = tempfile::tempdir().unwrap();
    let shp = fixtures::features_fixture(dir.path());
    let zip = fixtures::zip_fixture(&shp, None);
    let renamed = dir.path().join("Countries.zip");
    std::fs::rename(&zip, &renamed).unwrap();

    let dataset = shpread::open(&renamed).unwrap();
    assert_eq!(dataset.name(), "Countries");
}

fn latin1_fixture(dir: &std::path::Path) -> std::path::PathBuf {
    fixtures::write_shapefile_raw(
        dir,
        "cafes",
        &[FixtureField::character("name", 20)],
        &[(FixtureShape::Point(2.35, 48.85), vec![b"caf\xe9 cr\xe8me".as_slice()])],
    )
}

fn first_name(path: &std::path::Path) -> Option<Value> {
    let mut dataset = shpread::open(path).unwrap();
    let feature = dataset.features().next().unwrap().unwrap();
    feature.property("name").cloned()
}

#[test]
fn test_latin1_text_without_cpg() {
    let dir = tempfile::tempdir().unwrap();
    let shp = latin1_fixture(dir.path());

    assert_eq!(first_name(&shp), Some(Value::Text("café crème".to_string())));
}

#[test]
fn test_cpg_selects_encoding() {
    let dir = tempfile::tempdir().unwrap();
    let shp = fixtures::write_shapefile_raw(
        dir.path(),
        "cities",
        &[FixtureField::character("name", 20)],
        &[(FixtureShape::Point(37.6, 55.75), vec![b"\xcc\xee\xf1\xea\xe2\xe0".as_slice()])],
    );
    fixtures::write_cpg(&shp, "1251\n");

    assert_eq!(first_name(&shp), Some(Value::Text("Москва".to_string())));

    let zip = fixtures::zip_fixture(&shp, Some("data"));
    assert_eq!(first_name(&zip), Some(Value::Text("Москва".to_string())));
}

#[test]
fn test_cpg_overrides_header_code_page() {
    let dir = tempfile::tempdir().unwrap();
    let shp = latin1_fixture(dir.path());
    fixtures::set_ldid(&shp, 0xC9);

    // Sans .cpg, l'en-tête annonce du cyrillique
    assert_eq!(first_name(&shp), Some(Value::Text("cafй crиme".to_string())));

    fixtures::write_cpg(&shp, "ISO-8859-1");
    assert_eq!(first_name(&shp), Some(Value::Text("café crème".to_string())));
}

#[test]
fn test_unsupported_header_code_page_still_opens() {
    let dir = tempfile::tempdir().unwrap();
    let shp = fixtures::features_fixture(dir.path());
    fixtures::set_ldid(&shp, 0x7A);

    let mut dataset = shpread::open(&shp).unwrap();
    assert_eq!(dataset.features().count(), 2);
}

#[test]
fn test_numeric_with_decimals_stays_real() {
    let dir = tempfile::tempdir().unwrap();
    let shp = fixtures::write_shapefile(
        dir.path(),
        "heights",
        &[
            FixtureField::numeric("height", 8, 2),
            FixtureField::numeric("floors", 4, 0),
        ],
        &[(FixtureShape::Point(2.35, 48.85), vec!["35.00", "12"])],
    );

    let mut dataset = shpread::open(&shp).unwrap();
    let feature = dataset.features().next().unwrap().unwrap();
    assert_eq!(feature.property("height"), Some(&Value::Real(35.0)));
    assert_eq!(feature.property("floors"), Some(&Value::Integer(12)));
}
