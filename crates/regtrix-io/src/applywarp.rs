//! FSL `applywarp` as an external warp resampler.

use anyhow::{Context, Result};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use regtrix_core::{ImageData, InterpolationOrder, WarpRequest, WarpResampler};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::matrix_io::write_matrix;
use crate::nifti_io::{read_image, write_displacement_field, write_image};

/// Runs FSL `applywarp` once per volume in a scratch directory.
///
/// The field is passed as a relative warp (`--rel`) in millimetres, with the
/// conditioning matrices as `--premat`/`--postmat`.
#[derive(Debug, Clone)]
pub struct FslApplyWarp {
    program: PathBuf,
    interpolation: Option<InterpolationOrder>,
}

impl Default for FslApplyWarp {
    fn default() -> Self {
        Self {
            program: PathBuf::from("applywarp"),
            interpolation: None,
        }
    }
}

impl FslApplyWarp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific `applywarp` executable.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Pass `--interp`; the tool default (trilinear) applies otherwise.
    pub fn with_interpolation(mut self, order: InterpolationOrder) -> Self {
        self.interpolation = Some(order);
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Command-line arguments for one invocation inside `dir`.
    pub fn arguments(&self, dir: &Path) -> Vec<String> {
        let path = |name: &str| dir.join(name).display().to_string();
        let mut args = vec![
            format!("--in={}", path("in.nii.gz")),
            format!("--ref={}", path("ref.nii.gz")),
            format!("--out={}", path("out.nii.gz")),
            format!("--warp={}", path("warp.nii.gz")),
            format!("--premat={}", path("premat.mat")),
            format!("--postmat={}", path("postmat.mat")),
            "--rel".to_string(),
        ];
        if let Some(order) = self.interpolation {
            let name = match order {
                InterpolationOrder::Nearest => "nn",
                InterpolationOrder::Linear => "trilinear",
            };
            args.push(format!("--interp={}", name));
        }
        args
    }

    fn stage<B: Backend>(&self, dir: &Path, request: &WarpRequest<'_, B>) -> Result<()> {
        let device = request.volume.device();
        write_image(dir.join("in.nii.gz"), &ImageData::Volume(request.volume.clone()), request.source)?;
        write_image(
            dir.join("ref.nii.gz"),
            &ImageData::<B>::Volume(Tensor::zeros(request.reference.shape(), &device)),
            request.reference,
        )?;
        write_displacement_field(dir.join("warp.nii.gz"), request.field)?;
        write_matrix(dir.join("premat.mat"), &request.premat)?;
        write_matrix(dir.join("postmat.mat"), &request.postmat)?;
        Ok(())
    }
}

impl<B: Backend> WarpResampler<B> for FslApplyWarp {
    type Error = anyhow::Error;

    fn resample(&self, request: WarpRequest<'_, B>) -> Result<Tensor<B, 3>> {
        let scratch = tempfile::tempdir().context("Failed to create scratch directory")?;
        let dir = scratch.path();
        self.stage(dir, &request)?;

        let args = self.arguments(dir);
        tracing::debug!(volume = request.index, program = %self.program.display(), ?args, "running applywarp");
        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .with_context(|| format!("Failed to launch {}", self.program.display()))?;
        if !output.status.success() {
            anyhow::bail!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let out_path = dir.join("out.nii.gz");
        if !out_path.exists() {
            anyhow::bail!("{} produced no output", self.program.display());
        }
        let (data, _) = read_image::<B, _>(&out_path, &request.volume.device())?;
        data.volumes()
            .into_iter()
            .next()
            .context("applywarp output contains no volumes")
    }
}
