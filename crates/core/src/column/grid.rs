//! Vertical discretization of the atmospheric column

use crate::config::{GeoParams, GridSpec};
use crate::error::{Result, UwgError};

/// Cell faces, centres and thicknesses of a stretched vertical grid.
///
/// Cell `i` spans `faces[i]..faces[i + 1]`; its centre is `heights[i]` and
/// its thickness `thickness[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct VerticalGrid {
    faces: Vec<f64>,
    heights: Vec<f64>,
    thickness: Vec<f64>,
}

impl VerticalGrid {
    /// Geometrically stretched grid: each cell is `growth_ratio` times thicker
    /// than the one below it.
    ///
    /// # Errors
    /// `ConfigurationError` for fewer than two faces or any non-positive
    /// thickness.
    pub fn geometric(grid_spec: &GridSpec) -> Result<Self> {
        if grid_spec.faces < 2 {
            return Err(UwgError::configuration(
                "grid.faces",
                format!("need at least two faces, got {}", grid_spec.faces),
            ));
        }
        let cells = grid_spec.faces - 1;
        let mut thickness = Vec::with_capacity(cells);
        let mut dz = grid_spec.first_thickness;
        for _ in 0..cells {
            thickness.push(dz);
            dz *= grid_spec.growth_ratio;
        }
        Self::from_thickness(thickness)
    }

    /// Grid from explicit cell thicknesses, bottom first.
    ///
    /// # Errors
    /// `ConfigurationError` when a thickness is not finite and positive.
    pub fn from_thickness(thickness: Vec<f64>) -> Result<Self> {
        if thickness.is_empty() {
            return Err(UwgError::configuration("grid", "grid has no cells"));
        }
        if let Some(&bad) = thickness.iter().find(|dz| !(dz.is_finite() && **dz > 0.0)) {
            return Err(UwgError::configuration(
                "grid",
                format!("degenerate grid: layer thickness {bad}"),
            ));
        }

        let mut faces = Vec::with_capacity(thickness.len() + 1);
        faces.push(0.0);
        for dz in &thickness {
            let top = faces[faces.len() - 1] + dz;
            faces.push(top);
        }
        let heights = faces.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect();

        Ok(Self {
            faces,
            heights,
            thickness,
        })
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.thickness.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thickness.is_empty()
    }

    pub fn faces(&self) -> &[f64] {
        &self.faces
    }

    /// Cell-centre heights (m)
    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    /// Cell thicknesses (m)
    pub fn thickness(&self) -> &[f64] {
        &self.thickness
    }

    /// Height of the top face (m)
    pub fn top(&self) -> f64 {
        self.faces[self.faces.len() - 1]
    }

    /// Index of the first cell whose centre lies strictly above `height`.
    ///
    /// # Errors
    /// `ConfigurationError` naming `parameter` when the grid does not reach
    /// that high.
    pub fn first_above(&self, parameter: &'static str, height: f64) -> Result<usize> {
        self.heights
            .iter()
            .position(|&z| z > height)
            .ok_or_else(|| {
                UwgError::configuration(
                    parameter,
                    format!("{height}m is above the highest cell centre {:.1}m", self.heights[self.len() - 1]),
                )
            })
    }
}

/// Marker levels of the column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndices {
    /// Roughness height (displacement + roughness length)
    pub nz0: usize,
    /// Reference height; the profiles cover cells `0..=nzref`
    pub nzref: usize,
    /// Top of the nocturnal forcing layer
    pub nzfor: usize,
    /// Wind measurement level (10 m)
    pub nz10: usize,
    /// Daytime inversion
    pub nzi: usize,
}

impl ColumnIndices {
    /// # Errors
    /// `ConfigurationError` when a marker height lies above the grid or the
    /// forcing layer is empty.
    pub fn locate(grid: &VerticalGrid, geo: &GeoParams, roughness_height: f64) -> Result<Self> {
        let indices = Self {
            nz0: grid.first_above("obstacle_height", roughness_height)?,
            nzref: grid.first_above("geo.ref_height", geo.ref_height)?,
            nzfor: grid.first_above("geo.night_bl_height", geo.night_bl_height)?,
            nz10: grid.first_above("geo.wind_height", geo.wind_height)?,
            nzi: grid.first_above("geo.day_bl_height", geo.day_bl_height)?,
        };
        if indices.nzref == 0 || indices.nzfor == 0 {
            return Err(UwgError::configuration(
                "geo.ref_height",
                "reference and forcing layers must span at least one cell",
            ));
        }
        if indices.nzfor > indices.nzref {
            return Err(UwgError::configuration(
                "geo.night_bl_height",
                "nocturnal forcing layer extends above the reference height",
            ));
        }
        Ok(indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_grid_spacing() {
        let grid = VerticalGrid::geometric(&GridSpec::default()).unwrap();
        assert_eq!(grid.faces().len(), 56);
        assert_eq!(grid.len(), 55);
        assert_relative_eq!(grid.thickness()[1], 4.4, epsilon = 1e-12);
        assert_relative_eq!(grid.heights()[1], 6.2, epsilon = 1e-12);
        assert_relative_eq!(grid.top(), 7522.37, epsilon = 0.01);
        let sum: f64 = grid.thickness().iter().sum();
        assert_relative_eq!(sum, grid.top(), max_relative = 1e-12);
    }

    #[test]
    fn test_reference_indices() {
        let grid = VerticalGrid::geometric(&GridSpec::default()).unwrap();
        let idx = ColumnIndices::locate(&grid, &GeoParams::default(), 0.06).unwrap();
        assert_eq!(
            idx,
            ColumnIndices {
                nz0: 0,
                nzref: 16,
                nzfor: 12,
                nz10: 2,
                nzi: 34
            }
        );
    }

    #[test]
    fn test_degenerate_grid_rejected() {
        let grid_spec = GridSpec {
            growth_ratio: 0.0,
            ..GridSpec::default()
        };
        assert!(VerticalGrid::geometric(&grid_spec).unwrap_err().is_configuration());
        assert!(VerticalGrid::from_thickness(vec![1.0, f64::NAN]).is_err());
    }

    #[test]
    fn test_shallow_grid_cannot_reach_inversion() {
        let grid_spec = GridSpec {
            faces: 20,
            ..GridSpec::default()
        };
        let grid = VerticalGrid::geometric(&grid_spec).unwrap();
        let err = ColumnIndices::locate(&grid, &GeoParams::default(), 0.06).unwrap_err();
        assert!(err.to_string().contains("day_bl_height"));
    }
}
