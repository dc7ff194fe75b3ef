//! Plain-text 4x4 matrix files, as written by FLIRT and MCFLIRT.
//!
//! A matrix file holds four whitespace-separated rows of four numbers. A
//! motion-correction run writes one file per volume into a directory
//! (`MAT_0000`, `MAT_0001`, ...); files there are read in name order.

use anyhow::{Context, Result};
use regtrix_core::geometry::{self, Matrix4};
use regtrix_core::{Affine, AffineSeries, Convention, VoxelGrid};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Parse a 4x4 matrix from text.
pub fn parse_matrix(text: &str) -> Result<Matrix4> {
    let rows = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.split_whitespace()
                .map(|v| v.parse::<f64>().with_context(|| format!("Invalid matrix entry '{}'", v)))
                .collect::<Result<Vec<f64>>>()
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(geometry::matrix_from_rows(&rows)?)
}

/// Read a 4x4 matrix file.
pub fn read_matrix<P: AsRef<Path>>(path: P) -> Result<Matrix4> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read matrix {}", path.display()))?;
    parse_matrix(&text).with_context(|| format!("Malformed matrix file {}", path.display()))
}

/// Write a 4x4 matrix file.
pub fn write_matrix<P: AsRef<Path>>(path: P, matrix: &Matrix4) -> Result<()> {
    let path = path.as_ref();
    let mut file = fs::File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    for r in 0..4 {
        let row: Vec<String> = (0..4).map(|c| format!("{:.18e}", matrix[(r, c)])).collect();
        writeln!(file, "{}", row.join("  "))?;
    }
    Ok(())
}

fn matrix_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = fs::read_dir(dir)
        .with_context(|| format!("Failed to list matrix directory {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect::<Vec<_>>();
    files.sort();
    if files.is_empty() {
        anyhow::bail!("No matrix files found in {}", dir.display());
    }
    Ok(files)
}

/// Read every matrix file in a directory, in file name order.
pub fn read_matrix_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<Matrix4>> {
    let files = matrix_files(dir.as_ref())?;
    tracing::debug!(dir = %dir.as_ref().display(), count = files.len(), "reading matrix directory");
    files.iter().map(read_matrix).collect()
}

/// Read a single affine from a matrix file.
pub fn read_affine<P: AsRef<Path>>(
    path: P,
    source: Option<VoxelGrid>,
    reference: Option<VoxelGrid>,
    convention: Option<Convention>,
) -> Result<Affine> {
    let matrix = read_matrix(path)?;
    Ok(Affine::new(matrix, source, reference, convention)?)
}

/// Read an affine series from a directory of per-volume matrix files.
pub fn read_affine_series<P: AsRef<Path>>(
    dir: P,
    source: Option<VoxelGrid>,
    reference: Option<VoxelGrid>,
    convention: Option<Convention>,
) -> Result<AffineSeries> {
    let matrices = read_matrix_dir(dir)?;
    Ok(AffineSeries::new(matrices, source, reference, convention)?)
}

/// Write one matrix file per element, named `{prefix}{index:04}`.
///
/// FSL output needs both series grids.
pub fn write_affine_series<P: AsRef<Path>>(
    dir: P,
    series: &AffineSeries,
    prefix: &str,
    convention: Convention,
) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let matrices = match convention {
        Convention::World => series.matrices(),
        Convention::Fsl => {
            let (source, reference) = series
                .source_grid()
                .zip(series.reference_grid())
                .context("Writing FSL matrices requires source and reference grids")?;
            series.to_legacy(source, reference)
        }
    };

    let mut written = Vec::with_capacity(matrices.len());
    for (i, matrix) in matrices.iter().enumerate() {
        let path = dir.join(format!("{}{:04}", prefix, i));
        write_matrix(&path, matrix)?;
        written.push(path);
    }
    tracing::debug!(dir = %dir.display(), count = written.len(), %convention, "wrote affine series");
    Ok(written)
}
