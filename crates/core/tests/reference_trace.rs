//! Initial column and boundary-layer state against the recorded reference trace
//!
//! The rural column starts isothermal at 297.85 K and 100900 Pa over 0.1 m
//! obstacles; the urban boundary layer covers a 1 km square.
use approx::assert_relative_eq;
use uwg_core::column::VerticalColumn;
use uwg_core::core_types::{Kelvin, Meters, Pascals};
use uwg_core::surface::SurfaceConfig;
use uwg_core::ubl::{UrbanBoundaryLayer, UrbanFootprint};
use uwg_core::validation::{compare_trace, reference_tolerance};
use uwg_core::{GeoParams, GridSpec, SiteConfig};

#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

const PRESSURE_TRACE: [f64; 17] = [
    1.009000000000000,
    1.008490604570617,
    1.007930481749694,
    1.007314603288614,
    1.006637447436641,
    1.005892951541777,
    1.005074460319214,
    1.004174669438980,
    1.003185564067109,
    1.002098351979773,
    1.000903390854001,
    0.999590109338784,
    0.998146921496037,
    0.996561134212841,
    0.994818847169896,
    0.992904845102566,
    0.990802481868362,
];

const DENSITY_FACE_TRACE: [f64; 18] = [
    1.180352339267655,
    1.180149676936383,
    1.179703870430437,
    1.179213600207828,
    1.178674444441198,
    1.178081544270841,
    1.177429561181760,
    1.176712630344852,
    1.175924309566055,
    1.175057523461647,
    1.174104502451500,
    1.173056716134468,
    1.171904800590439,
    1.170638479118457,
    1.169246475901031,
    1.167716422060640,
    1.166034753626033,
    1.165110236615915,
];

fn rural_column() -> VerticalColumn {
    VerticalColumn::new(
        &SiteConfig::default(),
        Meters::new(0.1),
        Kelvin::new(297.85),
        Pascals::new(100_900.0),
        &GeoParams::default(),
        &GridSpec::default(),
        SurfaceConfig::rural(),
    )
    .unwrap()
}

#[test]
fn test_grid_and_indices() {
    let column = rural_column();
    let indices = column.indices();

    assert_eq!(indices.nz0, 0);
    assert_eq!(indices.nzref, 16);
    assert_eq!(indices.nzfor, 12);
    assert_eq!(indices.nz10, 2);
    assert_eq!(indices.nzi, 34);

    assert_eq!(column.heights().len(), 55);
    assert_eq!(column.profile_heights().len(), indices.nzref + 1);
    assert_relative_eq!(column.heights()[1], 6.2, epsilon = 1e-12);
    assert_relative_eq!(column.thickness()[1], 4.4, epsilon = 1e-12);
    assert_relative_eq!(column.grid().top(), 7522.37, epsilon = 0.01);
}

#[test]
fn test_pressure_profile_matches_trace() {
    let column = rural_column();
    let scaled: Vec<f64> = column.pressure().iter().map(|p| p / 1.0e5).collect();
    if let Err(mismatch) = compare_trace(&PRESSURE_TRACE, &scaled, |_| 1e-10) {
        panic!("{mismatch}");
    }
}

#[test]
fn test_staggered_density_matches_trace() {
    let column = rural_column();
    assert_eq!(column.density_face().len(), DENSITY_FACE_TRACE.len());
    if let Err(mismatch) = compare_trace(&DENSITY_FACE_TRACE, column.density_face(), |_| 1e-10) {
        panic!("{mismatch}");
    }
}

#[test]
fn test_real_temperature_matches_trace() {
    let column = rural_column();
    let real = column.temperature_real();

    assert!(compare_trace(&[297.85], real, reference_tolerance).is_ok());
    assert_relative_eq!(column.temperature()[16], 297.85, epsilon = 1e-12);
    assert!(column.temperature().iter().all(|&theta| theta == 297.85));
    assert_relative_eq!(real[6], 297.518_290_248_964_15, epsilon = 1e-10);
    assert_relative_eq!(real[16], 296.304_448_067_897_2, epsilon = 1e-10);
}

#[test]
fn test_profiles_are_hydrostatic() {
    let column = rural_column();
    let c = GeoParams::default().constants;
    let kappa = c.kappa();
    let p = column.pressure();
    let theta = column.temperature();
    let dz = column.thickness();
    let reference = p[0].powf(kappa);

    for i in 1..p.len() {
        let drop = p[i - 1].powf(kappa) - p[i].powf(kappa);
        let weight = c.g / c.cp * reference * 0.5 * (1.0 / theta[i] + 1.0 / theta[i - 1]) * dz[i];
        assert_relative_eq!(drop, weight, epsilon = 1e-12);
    }
}

#[test]
fn test_boundary_layer_initial_state() {
    let ubl = UrbanBoundaryLayer::new(
        &UrbanFootprint::square(1000.0),
        0.0,
        Kelvin::new(297.85),
        &GeoParams::default(),
        &SiteConfig::default(),
    )
    .unwrap();
    let geometry = ubl.geometry();

    let expected = [1000.0, 4000.0, 1.0e6, 1000.0, 250.0, 297.85, 1191.4, 1000.0, 80.0];
    let actual = [
        geometry.characteristic_length,
        geometry.perimeter,
        geometry.area,
        geometry.orthogonal_length,
        geometry.segment_length,
        *ubl.temperature(),
        ubl.segment_sum(),
        ubl.day_height(),
        ubl.night_height(),
    ];
    if let Err(mismatch) = compare_trace(&expected, &actual, reference_tolerance) {
        panic!("{mismatch}");
    }
}
