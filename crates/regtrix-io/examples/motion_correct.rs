//! End-to-end motion correction on a synthetic acquisition.
//!
//! Writes a drifting 4D series and MCFLIRT-style matrices to a scratch
//! directory, reads them back and resamples every volume onto the first.
//!
//! ```text
//! RUST_LOG=debug cargo run -p regtrix-io --example motion_correct
//! ```

use anyhow::Result;
use burn::tensor::{Shape, TensorData};
use burn_ndarray::NdArray;
use regtrix_core::geometry::{Direction3, Matrix4, Point3, Vector3d};
use regtrix_core::{apply, AffineSeries, Convention, ImageData, ResampleConfig, Transform, VoxelGrid};
use regtrix_io::{read_affine_series, read_image, write_affine_series, write_image};
use tracing::info;

type Backend = NdArray<f32>;

const SHAPE: [usize; 3] = [32, 32, 20];
const VOLUMES: usize = 6;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let scratch = tempfile::tempdir()?;
    let device = Default::default();
    let grid = VoxelGrid::from_spacing(
        SHAPE,
        Point3::new(-48.0, -48.0, -30.0),
        Vector3d::new(3.0, 3.0, 3.0),
        Direction3::identity(),
    )?;

    // Blob drifting along x by half a voxel per volume
    let [nx, ny, nz] = SHAPE;
    let mut values = Vec::with_capacity(nx * ny * nz * VOLUMES);
    for i in 0..nx {
        for j in 0..ny {
            for k in 0..nz {
                for t in 0..VOLUMES {
                    let x = i as f32 - 16.0 - 0.5 * t as f32;
                    let y = j as f32 - 16.0;
                    let z = k as f32 - 10.0;
                    values.push(100.0 * (-(x * x + y * y + z * z) / 40.0).exp());
                }
            }
        }
    }
    let bold = ImageData::<Backend>::from_data(TensorData::new(values, Shape::new([nx, ny, nz, VOLUMES])), &device)?;
    let bold_path = scratch.path().join("bold.nii.gz");
    write_image(&bold_path, &bold, &grid)?;

    let drift: Vec<Matrix4> = (0..VOLUMES)
        .map(|t| Matrix4::new_translation(&Vector3d::new(-1.5 * t as f64, 0.0, 0.0)))
        .collect();
    let mats = scratch.path().join("bold_mcf.mat");
    let series = AffineSeries::new(drift, Some(grid), Some(grid), Some(Convention::World))?;
    write_affine_series(&mats, &series, "MAT_", Convention::Fsl)?;

    let (data, source) = read_image::<Backend, _>(&bold_path, &device)?;
    let transform: Transform<Backend> = read_affine_series(&mats, Some(source), None, Some(Convention::Fsl))?.into();
    info!("Read {} volumes and {} matrices", data.volume_count(), transform.len());

    let config = ResampleConfig::new().with_workers(VOLUMES.min(4));
    let corrected = apply(&data, &transform, &source, &source, &config)?;

    let output = scratch.path().join("bold_mc.nii.gz");
    write_image(&output, &corrected, &source)?;
    let (min, max) = corrected.value_range();
    info!("Wrote {} with values in [{:.3}, {:.3}]", output.display(), min, max);
    Ok(())
}
