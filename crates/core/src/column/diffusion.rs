//! Turbulent diffusion of potential temperature in the rural column
//!
//! K-theory closure: the diffusivity is `K = 0.4 l_k √e`, where the turbulent
//! kinetic energy `e` comes from surface-layer similarity velocity scales and
//! `l_k` is the smaller of the Bougeault-Lacarrère upward and downward
//! free-path lengths.
//!
//! # Scientific References
//!
//! - Bougeault, P., Lacarrère, P. (1989). "Parameterization of orography-induced
//!   turbulence in a mesobeta-scale model." Monthly Weather Review, 117, 1872-1890.
//! - Louis, J.F. (1979). "A parametric model of vertical eddy fluxes in the
//!   atmosphere." Boundary-Layer Meteorology, 17, 187-202.

use crate::config::GeoParams;
use crate::error::{ensure_finite, Result};
use crate::numerics::{is_near_zero, Tridiagonal};

/// Floor on the turbulent kinetic energy (m²/s²)
const MIN_TKE: f64 = 0.01;
/// Most unstable Obukhov length allowed (m)
const MIN_UNSTABLE_LENGTH: f64 = -50.0;
/// Least stable Obukhov length allowed (m)
const MIN_STABLE_LENGTH: f64 = 10.0;

/// Surface-layer state the closure is built from
#[derive(Debug, Clone, Copy)]
pub(crate) struct SurfaceLayer {
    /// Air density at the lowest cell (kg/m³)
    pub density: f64,
    /// Potential temperature at the lowest cell (K)
    pub theta: f64,
    /// Rural sensible heat flux (W/m²)
    pub sensible_heat: f64,
    /// Wind speed at the measurement height (m/s)
    pub wind_speed: f64,
    /// Displacement height (m)
    pub displacement: f64,
    /// Roughness length (m)
    pub roughness: f64,
}

/// Diffusivities at the `nz + 1` cell faces and the friction velocity
#[derive(Debug, Clone)]
pub(crate) struct Diffusivity {
    pub faces: Vec<f64>,
    pub friction_velocity: f64,
}

/// Neutral log-law friction velocity from the wind at `wind_height`
pub(crate) fn friction_velocity(layer: &SurfaceLayer, wind_height: f64, vk: f64) -> f64 {
    vk * layer.wind_speed / ((wind_height - layer.displacement) / layer.roughness).ln()
}

/// Obukhov length, bounded to [-50 m, 0) when unstable and at least 10 m when stable.
///
/// A vanishing heat flux is neutral and returns infinity.
pub(crate) fn obukhov_length(layer: &SurfaceLayer, ustar: f64, geo: &GeoParams) -> f64 {
    if is_near_zero(layer.sensible_heat) {
        return f64::INFINITY;
    }
    let c = &geo.constants;
    let length = (-layer.density * c.cp * ustar.powi(3) * layer.theta
        / (c.vk * c.g * layer.sensible_heat))
        .max(MIN_UNSTABLE_LENGTH);
    if length >= 0.0 {
        length.max(MIN_STABLE_LENGTH)
    } else {
        length
    }
}

/// Turbulent kinetic energy from similarity velocity scales, one value per cell
fn turbulent_energy(
    layer: &SurfaceLayer,
    ustar: f64,
    obukhov: f64,
    heights: &[f64],
    nz: usize,
    geo: &GeoParams,
) -> Vec<f64> {
    let c = &geo.constants;
    let mut te = vec![MIN_TKE; nz];

    if obukhov < 0.0 {
        let h = geo.day_bl_height;
        let wstar = (c.g * layer.sensible_heat * h / layer.density / c.cp / layer.theta).cbrt();
        let phi_m = (1.0 - 8.0 * 0.1 * h / obukhov).powf(-1.0 / 3.0);
        for (iz, e) in te.iter_mut().enumerate() {
            if heights[iz] < h {
                let ws = (ustar.powi(3) + phi_m * c.vk * wstar.powi(3) * heights[iz] / h).cbrt();
                *e = (ws * ws).max(MIN_TKE);
            }
        }
    } else {
        let h = geo.night_bl_height;
        for (iz, e) in te.iter_mut().enumerate() {
            if heights[iz] < h {
                let phi_m = 1.0 + 4.7 * heights[iz] / obukhov;
                let ws = ustar / phi_m;
                *e = (ws * ws).max(MIN_TKE);
            }
        }
    }
    te
}

/// Bougeault-Lacarrère upward and downward free-path lengths.
///
/// A parcel at level `iz` with kinetic energy `te[iz]` rises (sinks) until
/// the work against buoyancy exhausts its energy.
fn free_path_lengths(
    g: f64,
    nz: usize,
    z: &[f64],
    dz: &[f64],
    te: &[f64],
    theta: &[f64],
) -> (Vec<f64>, Vec<f64>) {
    let mut up = vec![0.0; nz];
    let mut down = vec![0.0; nz];

    for iz in 0..nz {
        let beta = g / theta[iz];

        let mut work = 0.0;
        let mut work_below = 0.0;
        let mut travelled = 0.0;
        up[iz] = z[nz] - z[iz] - dz[iz] / 2.0;
        for izz in iz..nz.saturating_sub(1) {
            let dzt = (dz[izz + 1] + dz[izz]) / 2.0;
            work -= beta * theta[iz] * dzt;
            work += beta * (theta[izz + 1] + theta[izz]) * dzt / 2.0;
            travelled += dzt;
            if te[iz] < work && te[iz] >= work_below {
                let gradient = (theta[izz + 1] - theta[izz]) / dzt;
                let excess = beta * (theta[izz] - theta[iz]);
                let partial = if is_near_zero(gradient) {
                    (!is_near_zero(excess)).then(|| (te[iz] - work_below) / excess)
                } else {
                    Some(
                        (-excess
                            + (excess.powi(2) + 2.0 * gradient * beta * (te[iz] - work_below))
                                .max(0.0)
                                .sqrt())
                            / gradient
                            / beta,
                    )
                };
                if let Some(tl) = partial {
                    up[iz] = (travelled - dzt + tl).max(1.0);
                }
            }
            work_below = work;
        }

        let mut work = 0.0;
        let mut work_above = 0.0;
        let mut travelled = 0.0;
        down[iz] = z[iz] + dz[iz] / 2.0;
        for izz in (1..=iz).rev() {
            let dzt = (dz[izz - 1] + dz[izz]) / 2.0;
            work += beta * theta[iz] * dzt;
            work -= beta * (theta[izz - 1] + theta[izz]) * dzt / 2.0;
            travelled += dzt;
            if te[iz] < work && te[iz] >= work_above {
                let gradient = (theta[izz] - theta[izz - 1]) / dzt;
                let excess = beta * (theta[izz] - theta[iz]);
                let partial = if is_near_zero(gradient) {
                    (!is_near_zero(excess)).then(|| (te[iz] - work_above) / excess)
                } else {
                    Some(
                        (excess
                            + (excess.powi(2) + 2.0 * gradient * beta * (te[iz] - work_above))
                                .max(0.0)
                                .sqrt())
                            / gradient
                            / beta,
                    )
                };
                if let Some(tl) = partial {
                    down[iz] = (travelled - dzt + tl).max(1.0);
                }
            }
            work_above = work;
        }
    }

    (up, down)
}

/// Diffusivity profile for the lowest `nz` cells of the column.
///
/// `heights` and `dz` must cover at least `nz + 1` cells, `theta` at least `nz`.
pub(crate) fn diffusivity(
    layer: &SurfaceLayer,
    heights: &[f64],
    dz: &[f64],
    theta: &[f64],
    nz: usize,
    geo: &GeoParams,
) -> Result<Diffusivity> {
    let c = &geo.constants;
    let ustar = ensure_finite(
        "friction velocity",
        friction_velocity(layer, geo.wind_height, c.vk),
    )?;
    let obukhov = obukhov_length(layer, ustar, geo);
    let te = turbulent_energy(layer, ustar, obukhov, heights, nz, geo);
    let (up, down) = free_path_lengths(c.g, nz, heights, dz, &te, theta);

    let mut faces = vec![0.0; nz + 1];
    for iz in 0..nz {
        let geometric_limit = (heights[iz] + heights[iz + 1]) / 2.0;
        let length = up[iz].min(down[iz].min(geometric_limit));
        faces[iz] = 0.4 * length * te[iz].sqrt();
    }
    faces[nz] = faces[nz - 1];

    Ok(Diffusivity {
        faces,
        friction_velocity: ustar,
    })
}

/// Implicit diffusion of `values` over the lowest `nz` cells.
///
/// `cell_density` weights the storage term, `face_density` and `diffusivity`
/// the exchange across faces. The bottom cell is held at its current value
/// and the top cell copies its neighbour (zero gradient).
///
/// # Errors
/// `NumericalError` when the solve produces a non-finite value.
pub(crate) fn implicit_diffusion(
    nz: usize,
    dt: f64,
    values: &[f64],
    cell_density: &[f64],
    face_density: &[f64],
    diffusivity: &[f64],
    dz: &[f64],
) -> Result<Vec<f64>> {
    let mut exchange = vec![0.0; nz + 1];
    exchange[0] = face_density[0] * diffusivity[0] / dz[0];
    for iz in 1..=nz {
        exchange[iz] = 2.0 * face_density[iz] * diffusivity[iz] / (dz[iz] + dz[iz - 1]);
    }

    let mut system = Tridiagonal::zeros(nz);
    system.diag[0] = 1.0;
    system.rhs[0] = values[0];
    for iz in 1..nz - 1 {
        let scale = dt / dz[iz] / cell_density[iz];
        system.lower[iz] = -exchange[iz] * scale;
        system.diag[iz] = 1.0 + (exchange[iz] + exchange[iz + 1]) * scale;
        system.upper[iz] = -exchange[iz + 1] * scale;
        system.rhs[iz] = values[iz];
    }
    if nz > 1 {
        system.lower[nz - 1] = -1.0;
        system.diag[nz - 1] = 1.0;
        system.rhs[nz - 1] = 0.0;
    }
    system.solve()
}
