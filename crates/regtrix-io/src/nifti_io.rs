use anyhow::{Context, Result};
use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use regtrix_core::geometry::Matrix4;
use regtrix_core::{DisplacementField, ImageData, VoxelGrid};
use std::path::Path;

/// Voxel-to-world matrix from a NIfTI header: sform, else qform, else pixdim.
pub fn header_affine(header: &NiftiHeader) -> Matrix4 {
    let affine = if header.sform_code > 0 {
        [
            header.srow_x,
            header.srow_y,
            header.srow_z,
            [0.0, 0.0, 0.0, 1.0]
        ]
    } else if header.qform_code > 0 {
        // Quaternion form, NIfTI-1 standard
        let b = header.quatern_b;
        let c = header.quatern_c;
        let d = header.quatern_d;
        let a = (1.0 - (b*b + c*c + d*d).min(1.0)).sqrt();

        let qfac = if header.pixdim[0] == 0.0 { 1.0 } else { header.pixdim[0] };

        let r11 = a*a + b*b - c*c - d*d;
        let r12 = 2.0*b*c - 2.0*a*d;
        let r13 = 2.0*b*d + 2.0*a*c;

        let r21 = 2.0*b*c + 2.0*a*d;
        let r22 = a*a + c*c - b*b - d*d;
        let r23 = 2.0*c*d - 2.0*a*b;

        let r31 = 2.0*b*d - 2.0*a*c;
        let r32 = 2.0*c*d + 2.0*a*b;
        let r33 = a*a + d*d - c*c - b*b;

        let dx = header.pixdim[1];
        let dy = header.pixdim[2];
        let dz = header.pixdim[3] * qfac;

        [
            [r11*dx, r12*dy, r13*dz, header.quatern_x],
            [r21*dx, r22*dy, r23*dz, header.quatern_y],
            [r31*dx, r32*dy, r33*dz, header.quatern_z],
            [0.0, 0.0, 0.0, 1.0]
        ]
    } else {
        // Fallback: use pixdim scaling only
        let dx = header.pixdim[1];
        let dy = header.pixdim[2];
        let dz = header.pixdim[3];
        [
            [dx, 0.0, 0.0, 0.0],
            [0.0, dy, 0.0, 0.0],
            [0.0, 0.0, dz, 0.0],
            [0.0, 0.0, 0.0, 1.0]
        ]
    };

    let mut m = Matrix4::identity();
    for (r, row) in affine.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            m[(r, c)] = *value as f64;
        }
    }
    m
}

fn header_shape(header: &NiftiHeader) -> Result<[usize; 3]> {
    let ndim = header.dim[0] as usize;
    if ndim < 3 {
        anyhow::bail!("Expected at least 3 dimensions, header declares {}", ndim);
    }
    Ok([header.dim[1] as usize, header.dim[2] as usize, header.dim[3] as usize])
}

fn grid_from_header(header: &NiftiHeader) -> Result<VoxelGrid> {
    let shape = header_shape(header)?;
    VoxelGrid::new(shape, header_affine(header)).context("Invalid voxel grid in NIfTI header")
}

/// Read only the grid of a NIfTI file.
pub fn read_grid<P: AsRef<Path>>(path: P) -> Result<VoxelGrid> {
    let path = path.as_ref();
    let header = NiftiHeader::from_file(path)
        .with_context(|| format!("Failed to read NIfTI header {}", path.display()))?;
    grid_from_header(&header)
}

/// Voxel values in logical `[x, y, z, ...]` row-major order, with trailing
/// singleton axes past the fourth dropped.
fn read_values<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, Vec<usize>, NiftiHeader)> {
    let path = path.as_ref();
    let obj = ReaderOptions::new()
        .read_file(path)
        .with_context(|| format!("Failed to read NIfTI file {}", path.display()))?;
    let header = obj.header().clone();
    let array = obj
        .into_volume()
        .into_ndarray::<f32>()
        .context("Failed to convert volume to ndarray")?;

    let mut shape = array.shape().to_vec();
    // Iterate logically: on-disk NIfTI data is column-major
    let values: Vec<f32> = array.iter().copied().collect();

    // Vector fields are often stored as [x, y, z, 1, c]
    if shape.len() == 5 && shape[3] == 1 {
        shape.remove(3);
    }
    while shape.len() > 4 && shape.last() == Some(&1) {
        shape.pop();
    }
    Ok((values, shape, header))
}

/// Read a 3D or 4D NIfTI image and its grid.
pub fn read_image<B: Backend, P: AsRef<Path>>(path: P, device: &B::Device) -> Result<(ImageData<B>, VoxelGrid)> {
    let path = path.as_ref();
    let (values, shape, header) = read_values(path)?;
    let grid = grid_from_header(&header)?;
    let data = match shape[..] {
        [nx, ny, nz] => ImageData::from_data(TensorData::new(values, Shape::new([nx, ny, nz])), device)?,
        [nx, ny, nz, nt] => ImageData::from_data(TensorData::new(values, Shape::new([nx, ny, nz, nt])), device)?,
        _ => anyhow::bail!("Expected 3D or 4D NIfTI file, found {} dimensions", shape.len()),
    };
    tracing::debug!(path = %path.display(), shape = ?grid.shape(), volumes = data.volume_count(), "read image");
    Ok((data, grid))
}

/// Read a relative displacement field `[x, y, z, 3]` in millimetres.
///
/// The field is defined on the file's grid; `source_grid` is the grid the
/// displaced points land in.
pub fn read_displacement_field<B: Backend, P: AsRef<Path>>(
    path: P,
    source_grid: VoxelGrid,
    device: &B::Device,
) -> Result<DisplacementField<B>> {
    let path = path.as_ref();
    let (values, shape, header) = read_values(path)?;
    if shape.len() != 4 || shape[3] != 3 {
        anyhow::bail!(
            "Expected displacement field of shape [x, y, z, 3], found {:?}",
            shape
        );
    }
    let grid = grid_from_header(&header)?;
    let displacement = Tensor::<B, 4>::from_data(
        TensorData::new(values, Shape::new([shape[0], shape[1], shape[2], 3])),
        device,
    );
    DisplacementField::new(displacement, grid, source_grid)
        .with_context(|| format!("Invalid displacement field {}", path.display()))
}

fn header_for(grid: &VoxelGrid) -> NiftiHeader {
    let m = grid.vox2world();
    let spacing = grid.spacing();
    let row = |r: usize| [m[(r, 0)] as f32, m[(r, 1)] as f32, m[(r, 2)] as f32, m[(r, 3)] as f32];

    let mut header = NiftiHeader::default();
    header.sform_code = 1;
    header.qform_code = 0;
    header.srow_x = row(0);
    header.srow_y = row(1);
    header.srow_z = row(2);
    header.pixdim[0] = 1.0;
    header.pixdim[1] = spacing.x as f32;
    header.pixdim[2] = spacing.y as f32;
    header.pixdim[3] = spacing.z as f32;
    header
}

/// Write image data with its grid stored in the sform.
pub fn write_image<B: Backend, P: AsRef<Path>>(path: P, data: &ImageData<B>, grid: &VoxelGrid) -> Result<()> {
    use ndarray::{ArrayD, IxDyn};

    if data.spatial_shape() != grid.shape() {
        anyhow::bail!(
            "Data shape {:?} does not match grid shape {:?}",
            data.spatial_shape(),
            grid.shape()
        );
    }
    let mut shape = grid.shape().to_vec();
    if data.is_series() {
        shape.push(data.volume_count());
    }
    let values = data.to_vec()?;
    let array = ArrayD::from_shape_vec(IxDyn(&shape), values)
        .map_err(|e| anyhow::anyhow!("Failed to create ndarray: {}", e))?;

    let path = path.as_ref();
    let header = header_for(grid);
    WriterOptions::new(path)
        .reference_header(&header)
        .write_nifti(&array)
        .with_context(|| format!("Failed to write NIfTI file {}", path.display()))?;
    tracing::debug!(path = %path.display(), shape = ?shape, "wrote image");
    Ok(())
}

/// Write a displacement field on its own grid.
pub fn write_displacement_field<B: Backend, P: AsRef<Path>>(path: P, field: &DisplacementField<B>) -> Result<()> {
    write_image(path, &ImageData::Series(field.displacement().clone()), field.grid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use regtrix_core::geometry::{Direction3, Point3, Vector3d};
    use tempfile::tempdir;

    type TestBackend = NdArray<f32>;

    fn grid(shape: [usize; 3]) -> VoxelGrid {
        VoxelGrid::from_spacing(
            shape,
            Point3::new(-12.0, 4.5, 30.0),
            Vector3d::new(2.0, 2.5, 3.0),
            Direction3::identity(),
        )
        .unwrap()
    }

    #[test]
    fn test_image_roundtrip_keeps_values_and_grid() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("image.nii");
        let device = Default::default();

        let g = grid([3, 4, 5]);
        let values: Vec<f32> = (0..3 * 4 * 5).map(|x| x as f32).collect();
        let data = ImageData::<TestBackend>::from_data(TensorData::new(values.clone(), Shape::new([3, 4, 5])), &device)?;
        write_image(&file_path, &data, &g)?;

        let (read, read_grid_) = read_image::<TestBackend, _>(&file_path, &device)?;
        assert_eq!(read.spatial_shape(), [3, 4, 5]);
        assert_eq!(read.to_vec()?, values);
        assert!((read_grid_.vox2world() - g.vox2world()).abs().max() < 1e-5);
        assert_eq!(read_grid(&file_path)?.shape(), [3, 4, 5]);
        Ok(())
    }

    #[test]
    fn test_series_roundtrip() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("series.nii.gz");
        let device = Default::default();

        let g = grid([2, 3, 4]);
        let values: Vec<f32> = (0..2 * 3 * 4 * 3).map(|x| x as f32 * 0.5).collect();
        let data =
            ImageData::<TestBackend>::from_data(TensorData::new(values.clone(), Shape::new([2, 3, 4, 3])), &device)?;
        write_image(&file_path, &data, &g)?;

        let (read, _) = read_image::<TestBackend, _>(&file_path, &device)?;
        assert!(read.is_series());
        assert_eq!(read.volume_count(), 3);
        assert_eq!(read.to_vec()?, values);
        Ok(())
    }

    #[test]
    fn test_displacement_field_roundtrip() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("warp.nii.gz");
        let device = Default::default();

        let g = grid([4, 4, 4]);
        let values: Vec<f32> = (0..4 * 4 * 4 * 3).map(|x| (x % 7) as f32).collect();
        let displacement =
            Tensor::<TestBackend, 4>::from_data(TensorData::new(values.clone(), Shape::new([4, 4, 4, 3])), &device);
        let field = DisplacementField::new(displacement, g, g)?;
        write_displacement_field(&file_path, &field)?;

        let read = read_displacement_field::<TestBackend, _>(&file_path, g, &device)?;
        assert_eq!(read.grid().shape(), [4, 4, 4]);
        let read_values = read.displacement().to_data().to_vec::<f32>().map_err(|e| anyhow::anyhow!("{:?}", e))?;
        assert_eq!(read_values, values);
        Ok(())
    }

    #[test]
    fn test_field_with_wrong_components_rejected() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("bad.nii");
        let device = Default::default();

        let g = grid([2, 2, 2]);
        let data = ImageData::<TestBackend>::Series(Tensor::zeros([2, 2, 2, 2], &device));
        write_image(&file_path, &data, &g)?;
        assert!(read_displacement_field::<TestBackend, _>(&file_path, g, &device).is_err());
        Ok(())
    }
}
