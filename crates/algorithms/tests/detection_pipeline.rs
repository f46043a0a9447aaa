//! End-to-end detection on synthetic scenes.
//!
//! The scene is a uniformly vegetated 20x30 grid with a 5x7 patch that is
//! bare at the end date. Proxy values follow the fractional-cover product
//! convention of 100 + cover percent.

use clearsight_algorithms::change::{
    detect_clearing, Acquisition, ChangeClass, DetectionParams, DetectionRequest, MaskKind,
    MaskLayer, ProxyObservation,
};
use clearsight_algorithms::imagery::{vegetation_proxy, VegetationIndex};
use clearsight_algorithms::seasonal::{candidate_dates, CatalogEntry, DateTag, InMemoryCatalog};
use clearsight_algorithms::DetectError;
use clearsight_core::io::{read_geotiff, read_geotiff_stack};
use clearsight_core::{GeoTransform, Raster, RasterStack, CRS};
use clearsight_parallel::ProcessingMode;
use ndarray::Array2;

const ROWS: usize = 20;
const COLS: usize = 30;
const PATCH_ROWS: std::ops::Range<usize> = 5..10;
const PATCH_COLS: std::ops::Range<usize> = 5..12;

const VEGETATED: [f64; 6] = [0.03, 0.06, 0.04, 0.30, 0.15, 0.07];
const BARE: [f64; 6] = [0.09, 0.12, 0.18, 0.22, 0.35, 0.30];

fn transform() -> GeoTransform {
    GeoTransform::new(1_400_000.0, -3_900_000.0, 25.0, -25.0)
}

fn in_patch(row: usize, col: usize) -> bool {
    PATCH_ROWS.contains(&row) && PATCH_COLS.contains(&col)
}

fn tag(s: &str) -> DateTag {
    DateTag::parse(s).unwrap()
}

fn reflectance(rows: usize, cols: usize, cleared: bool) -> RasterStack<f64> {
    let bands = (0..6)
        .map(|b| {
            Array2::from_shape_fn((rows, cols), |(r, c)| {
                if cleared && in_patch(r, c) {
                    BARE[b]
                } else {
                    VEGETATED[b]
                }
            })
        })
        .collect();
    RasterStack::from_arrays(bands, transform(), Some(CRS::australian_albers())).unwrap()
}

fn proxy_raster(seed: usize, cleared: bool) -> Raster<f64> {
    let data = Array2::from_shape_fn((ROWS, COLS), |(r, c)| {
        if cleared && in_patch(r, c) {
            105.0
        } else {
            160.0 + ((r * 7 + c * 3 + seed * 5) % 11) as f64 - 5.0
        }
    });
    let mut raster = Raster::from_array(data);
    raster.set_transform(transform());
    raster.set_crs(Some(CRS::australian_albers()));
    raster
}

fn request() -> DetectionRequest {
    let mut proxies: Vec<ProxyObservation> = [
        "20160120", "20170118", "20180125", "20190122", "20200115",
    ]
    .iter()
    .enumerate()
    .map(|(i, d)| ProxyObservation::new(tag(d), proxy_raster(i, false)))
    .collect();
    // outside the seasonal window; never part of the baseline
    proxies.push(ProxyObservation::new(tag("20190705"), proxy_raster(9, false)));
    proxies.push(ProxyObservation::new(tag("20210125"), proxy_raster(5, true)));

    DetectionRequest::new(
        tag("20200115"),
        tag("20210125"),
        reflectance(ROWS, COLS, false),
        reflectance(ROWS, COLS, true),
        proxies,
    )
}

fn params() -> DetectionParams {
    DetectionParams {
        block_rows: 4,
        ..Default::default()
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn cleared_patch_is_classified_as_clearing() {
    init_tracing();
    let out = detect_clearing(&request(), &params()).unwrap();

    assert_eq!(out.baseline_dates.len(), 5);
    assert!(!out.baseline_fell_back);
    assert!(!out.baseline_dates.contains(&tag("20190705")));

    let classes = out.classification.data();
    for r in PATCH_ROWS {
        for c in PATCH_COLS {
            let class = ChangeClass::from_code(classes[[r, c]]);
            assert!(
                class.is_some_and(ChangeClass::is_clearing),
                "pixel ({r}, {c}) classed {:?}",
                classes[[r, c]]
            );
            assert!(out.indices.spectral.data()[[r, c]] < -1.0);
            assert!(out.indices.proxy_diff.data()[[r, c]] < 0.0);
        }
    }

    // clearing probability is high inside the patch
    let prob = out.interpretation.band(3).unwrap();
    assert!(prob[[7, 8]] > 50, "probability {}", prob[[7, 8]]);
    assert_eq!(out.classification.crs().and_then(|c| c.epsg()), Some(3577));
}

#[test]
fn runs_are_deterministic_across_modes() {
    let req = request();
    let sequential = DetectionParams {
        threads: Some(1),
        block_rows: 64,
        ..Default::default()
    };
    let parallel = DetectionParams {
        threads: Some(3),
        block_rows: 3,
        ..Default::default()
    };

    let a = detect_clearing(&req, &sequential).unwrap();
    let b = detect_clearing(&req, &parallel).unwrap();
    let c = detect_clearing(&req, &params()).unwrap();

    assert_eq!(a.classification.data(), b.classification.data());
    assert_eq!(a.classification.data(), c.classification.data());
    for band in 0..4 {
        assert_eq!(a.interpretation.band(band).unwrap(), b.interpretation.band(band).unwrap());
    }
    assert_eq!(a.indices.combined.data(), b.indices.combined.data());
}

#[test]
fn zero_reflectance_band_vetoes_pixel() {
    let mut req = request();
    let mut bands: Vec<Array2<f64>> = req.end_reflectance.bands().map(|b| b.to_owned()).collect();
    bands[4][[6, 6]] = 0.0;
    req.end_reflectance = RasterStack::from_arrays(bands, transform(), None).unwrap();

    let out = detect_clearing(&req, &params()).unwrap();
    assert_eq!(out.classification.data()[[6, 6]], ChangeClass::Null.code());
    assert!(out.classification.data()[[6, 7]] >= 34);
}

#[test]
fn low_start_proxy_resets_to_no_clearing() {
    let mut req = request();
    let start = req
        .proxies
        .iter_mut()
        .find(|p| p.date == tag("20200115"))
        .unwrap();
    start.raster.set(7, 8, 50.0).unwrap();

    let out = detect_clearing(&req, &params()).unwrap();
    assert_eq!(out.classification.data()[[7, 8]], ChangeClass::NoClearing.code());
    assert!(out.classification.data()[[7, 9]] >= 34);
}

#[test]
fn mask_layers_recode_and_can_be_ignored() {
    let mut cloud = Raster::filled(ROWS, COLS, 0u8);
    cloud.set_transform(transform());
    cloud.set(8, 8, 1).unwrap();
    let mut water = cloud.clone();
    water.set(8, 8, 0).unwrap();
    water.set(15, 20, 255).unwrap();

    let req = request().with_masks(vec![
        MaskLayer::new(MaskKind::Cloud, Acquisition::End, cloud),
        MaskLayer::new(MaskKind::Water, Acquisition::Start, water),
    ]);

    let out = detect_clearing(&req, &params()).unwrap();
    assert_eq!(out.classification.data()[[8, 8]], 104);
    assert_eq!(out.classification.data()[[15, 20]], 108);

    let diag = out.diagnostic_indices().unwrap();
    assert_eq!(diag.band(0).unwrap()[[8, 8]], -10000.0);

    let ignore_clouds = DetectionParams {
        omit_cloud_masks: true,
        ..params()
    };
    let out = detect_clearing(&req, &ignore_clouds).unwrap();
    assert!(out.classification.data()[[8, 8]] >= 34);
    assert_eq!(out.classification.data()[[15, 20]], 108);
}

#[test]
fn inputs_are_cropped_to_common_extent() {
    let mut req = request();
    req.end_reflectance = reflectance(ROWS + 3, COLS + 8, true);
    let mut footprint = Raster::filled(ROWS - 2, COLS, 1u8);
    // starts two rows further south
    footprint.set_transform(GeoTransform::new(1_400_000.0, -3_900_050.0, 25.0, -25.0));
    req = req.with_footprint(footprint);

    let out = detect_clearing(&req, &params()).unwrap();
    assert_eq!(out.classification.shape(), (ROWS - 2, COLS));
    assert_eq!(out.interpretation.shape(), (ROWS - 2, COLS));
    assert_eq!(out.classification.transform().origin_y, -3_900_050.0);
    // patch moved up two rows in the cropped grid
    assert!(out.classification.data()[[3, 5]] >= 34);
}

#[test]
fn disjoint_inputs_are_a_shape_mismatch() {
    let mut footprint = Raster::filled(ROWS, COLS, 1u8);
    footprint.set_transform(GeoTransform::new(0.0, 0.0, 25.0, -25.0));
    let req = request().with_footprint(footprint);
    assert!(matches!(
        detect_clearing(&req, &params()),
        Err(DetectError::ShapeMismatch(_))
    ));
}

#[test]
fn missing_bands_fail_without_output() {
    let mut req = request();
    let bands: Vec<Array2<f64>> =
        req.start_reflectance.bands().take(3).map(|b| b.to_owned()).collect();
    req.start_reflectance = RasterStack::from_arrays(bands, transform(), None).unwrap();

    let result = detect_clearing(&req, &params());
    assert!(matches!(result, Err(DetectError::InputResolution { image: "start", .. })));
}

#[test]
fn failed_interpretation_write_leaves_no_classification() {
    let out = detect_clearing(&request(), &params()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let class_path = dir.path().join("classification.tif");
    let interp_path = dir.path().join("missing").join("interpretation.tif");

    assert!(out.write(&class_path, &interp_path).is_err());
    assert!(!class_path.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn outputs_round_trip_through_geotiff() {
    let out = detect_clearing(&request(), &params()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let class_path = dir.path().join("classification.tif");
    let interp_path = dir.path().join("interpretation.tif");
    out.write(&class_path, &interp_path).unwrap();

    let classes = read_geotiff::<u8, _>(&class_path, None).unwrap();
    assert_eq!(classes.data(), out.classification.data());
    assert_eq!(classes.nodata(), Some(0));
    assert_eq!(classes.transform().origin_x, 1_400_000.0);
    assert_eq!(classes.crs().and_then(|c| c.epsg()), Some(3577));

    let interp = read_geotiff_stack::<u8, _>(&interp_path).unwrap();
    assert_eq!(interp.band_count(), 4);
    assert_eq!(interp.band(3).unwrap(), out.interpretation.band(3).unwrap());
}

#[test]
fn vegetation_index_proxies_from_catalog() {
    let mut catalog = InMemoryCatalog::new();
    let mut stacks = Vec::new();
    for (i, (d, cloud)) in [
        ("20170118", 10.0),
        ("20180125", 70.0),
        ("20180124", 5.0),
        ("20190122", 0.0),
        ("20200115", 20.0),
        ("20210125", 15.0),
    ]
    .iter()
    .enumerate()
    {
        catalog.insert(
            "p091r079",
            CatalogEntry {
                date: tag(d),
                cloud_fraction: *cloud,
            },
        );
        stacks.push((tag(d), reflectance(ROWS, COLS, i == 5)));
    }

    let dates = candidate_dates(&catalog, "p091r079", 40.0);
    assert_eq!(dates.len(), 5);

    let proxies: Vec<ProxyObservation> = stacks
        .iter()
        .filter(|(d, _)| dates.contains(d))
        .map(|(d, s)| {
            let raster =
                vegetation_proxy(s, VegetationIndex::Ndvi, ProcessingMode::Parallel, 8).unwrap();
            ProxyObservation::new(*d, raster)
        })
        .collect();

    let req = DetectionRequest::new(
        tag("20200115"),
        tag("20210125"),
        reflectance(ROWS, COLS, false),
        reflectance(ROWS, COLS, true),
        proxies,
    );
    let params = DetectionParams {
        omit_start_threshold: true,
        ..params()
    };
    let out = detect_clearing(&req, &params).unwrap();
    assert_eq!(out.baseline_dates.len(), 4);
    assert!(out.indices.proxy_diff.data()[[7, 8]] < 0.0);
}
