//! Built-in mods: pure transformations of a GridDataset.
//!
//! Every mod takes the input dataset by reference and an argument list and
//! returns a new dataset; the input is never touched.

use thiserror::Error;

use super::filters;
use crate::data::{DataError, GridDataset};

/// One mod argument. Mods read floats leniently (an `Int` is accepted where
/// a float is expected), booleans and integers strictly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModArg {
    Float(f64),
    Int(i64),
    Bool(bool),
}

impl std::fmt::Display for ModArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // Debug keeps a decimal point or exponent so the value reads back as a float
            ModArg::Float(v) => write!(f, "{:?}", v),
            ModArg::Int(v) => write!(f, "{}", v),
            ModArg::Bool(true) => write!(f, "True"),
            ModArg::Bool(false) => write!(f, "False"),
        }
    }
}

impl From<f64> for ModArg {
    fn from(v: f64) -> Self {
        ModArg::Float(v)
    }
}

impl From<i64> for ModArg {
    fn from(v: i64) -> Self {
        ModArg::Int(v)
    }
}

impl From<bool> for ModArg {
    fn from(v: bool) -> Self {
        ModArg::Bool(v)
    }
}

/// Render an argument list as a tuple literal: `()`, `(2.0,)`, `(1.0, 2.0)`.
pub fn args_literal(args: &[ModArg]) -> String {
    match args {
        [] => "()".to_string(),
        [only] => format!("({},)", only),
        _ => {
            let parts: Vec<String> = args.iter().map(|a| a.to_string()).collect();
            format!("({})", parts.join(", "))
        }
    }
}

/// Why a single mod application failed.
#[derive(Error, Debug)]
pub enum ApplyError {
    #[error("expected {expected} argument(s), got {got}")]
    Arity { expected: usize, got: usize },
    #[error("argument {index} must be {expected}, got {got}")]
    ArgType {
        index: usize,
        expected: &'static str,
        got: ModArg,
    },
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Data(#[from] DataError),
}

fn expect_arity(args: &[ModArg], expected: usize) -> Result<(), ApplyError> {
    if args.len() != expected {
        return Err(ApplyError::Arity {
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

fn float_arg(args: &[ModArg], index: usize) -> Result<f64, ApplyError> {
    match args[index] {
        ModArg::Float(v) => Ok(v),
        ModArg::Int(v) => Ok(v as f64),
        got => Err(ApplyError::ArgType {
            index,
            expected: "a number",
            got,
        }),
    }
}

fn int_arg(args: &[ModArg], index: usize) -> Result<i64, ApplyError> {
    match args[index] {
        ModArg::Int(v) => Ok(v),
        ModArg::Float(v) if v.fract() == 0.0 && v.is_finite() => Ok(v as i64),
        got => Err(ApplyError::ArgType {
            index,
            expected: "an integer",
            got,
        }),
    }
}

fn bool_arg(args: &[ModArg], index: usize) -> Result<bool, ApplyError> {
    match args[index] {
        ModArg::Bool(v) => Ok(v),
        ModArg::Int(0) => Ok(false),
        ModArg::Int(1) => Ok(true),
        got => Err(ApplyError::ArgType {
            index,
            expected: "a boolean",
            got,
        }),
    }
}

/// The closed set of mods shipped with the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModKind {
    Crop,
    Rotate,
    Flip,
    Absolute,
    Log,
    Derive,
    Scale,
    Median,
    Smooth,
    AdaptiveThreshold,
}

impl ModKind {
    pub const ALL: [ModKind; 10] = [
        ModKind::Crop,
        ModKind::Rotate,
        ModKind::Flip,
        ModKind::Absolute,
        ModKind::Log,
        ModKind::Derive,
        ModKind::Scale,
        ModKind::Median,
        ModKind::Smooth,
        ModKind::AdaptiveThreshold,
    ];

    /// Name used in the registry and in the textual pipeline form.
    pub fn name(&self) -> &'static str {
        match self {
            ModKind::Crop => "Crop",
            ModKind::Rotate => "Rotate",
            ModKind::Flip => "Flip",
            ModKind::Absolute => "Absolute",
            ModKind::Log => "Log",
            ModKind::Derive => "Derive",
            ModKind::Scale => "Scale",
            ModKind::Median => "Median",
            ModKind::Smooth => "Smooth",
            ModKind::AdaptiveThreshold => "AdaptiveThreshold",
        }
    }

    pub fn from_name(name: &str) -> Option<ModKind> {
        ModKind::ALL.iter().copied().find(|k| k.name() == name)
    }

    /// Arguments used when a mod is added without any.
    pub fn default_args(&self) -> Vec<ModArg> {
        match self {
            // no arguments means "full extent", i.e. a no-op crop
            ModKind::Crop | ModKind::Absolute | ModKind::Log | ModKind::Derive => vec![],
            ModKind::Rotate | ModKind::Flip => vec![ModArg::Bool(true)],
            ModKind::Scale => vec![ModArg::Float(1.0)],
            ModKind::Median => vec![ModArg::Float(3.0), ModArg::Float(3.0)],
            ModKind::Smooth => vec![ModArg::Float(1.0), ModArg::Float(1.0)],
            ModKind::AdaptiveThreshold => vec![ModArg::Int(5), ModArg::Float(0.0)],
        }
    }

    pub fn apply_fn(&self) -> ApplyFn {
        match self {
            ModKind::Crop => apply_crop,
            ModKind::Rotate => apply_rotate,
            ModKind::Flip => apply_flip,
            ModKind::Absolute => apply_absolute,
            ModKind::Log => apply_log,
            ModKind::Derive => apply_derive,
            ModKind::Scale => apply_scale,
            ModKind::Median => apply_median,
            ModKind::Smooth => apply_smooth,
            ModKind::AdaptiveThreshold => apply_adaptive_threshold,
        }
    }

    pub fn apply(&self, data: &GridDataset, args: &[ModArg]) -> Result<GridDataset, ApplyError> {
        (self.apply_fn())(data, args)
    }
}

impl std::fmt::Display for ModKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Signature shared by every mod implementation.
pub type ApplyFn = fn(&GridDataset, &[ModArg]) -> Result<GridDataset, ApplyError>;

// =========================================================================
//  Geometric mods
// =========================================================================

fn apply_crop(data: &GridDataset, args: &[ModArg]) -> Result<GridDataset, ApplyError> {
    if args.is_empty() {
        return Ok(data.deep_copy());
    }
    expect_arity(args, 4)?;
    let xleft = float_arg(args, 0)?;
    let xright = float_arg(args, 1)?;
    let ybottom = float_arg(args, 2)?;
    let ytop = float_arg(args, 3)?;
    Ok(data.crop(xleft, xright, ybottom, ytop))
}

fn apply_rotate(data: &GridDataset, args: &[ModArg]) -> Result<GridDataset, ApplyError> {
    expect_arity(args, 1)?;
    if bool_arg(args, 0)? {
        Ok(data.rotate_cw())
    } else {
        Ok(data.rotate_ccw())
    }
}

fn apply_flip(data: &GridDataset, args: &[ModArg]) -> Result<GridDataset, ApplyError> {
    expect_arity(args, 1)?;
    if bool_arg(args, 0)? {
        Ok(data.flip_lr())
    } else {
        Ok(data.flip_ud())
    }
}

// =========================================================================
//  Elementwise mods
// =========================================================================

fn apply_absolute(data: &GridDataset, args: &[ModArg]) -> Result<GridDataset, ApplyError> {
    expect_arity(args, 0)?;
    Ok(data.map_values(f64::abs))
}

fn apply_log(data: &GridDataset, args: &[ModArg]) -> Result<GridDataset, ApplyError> {
    expect_arity(args, 0)?;
    let clamped = data.grid().iter().filter(|&&v| v <= 0.0).count();
    if clamped > 0 {
        log::warn!(
            "Log: {} non-positive sample(s) clamped to 1.0 before taking the log",
            clamped
        );
    }
    Ok(data.map_values(|v| if v <= 0.0 { 0.0 } else { v.ln() }))
}

fn apply_scale(data: &GridDataset, args: &[ModArg]) -> Result<GridDataset, ApplyError> {
    expect_arity(args, 1)?;
    let factor = float_arg(args, 0)?;
    Ok(data.map_values(|v| v * factor))
}

/// First difference along y. The result has one row fewer, placed at the
/// midpoints of consecutive y values.
fn apply_derive(data: &GridDataset, args: &[ModArg]) -> Result<GridDataset, ApplyError> {
    expect_arity(args, 0)?;
    let (ny, nx) = data.shape();
    if ny < 2 {
        return Err(ApplyError::Invalid(format!(
            "derivative along y needs at least 2 rows, dataset has {}",
            ny
        )));
    }
    let grid = data.grid();
    let diff = ndarray::Array2::from_shape_fn((ny - 1, nx), |(j, i)| {
        grid[[j + 1, i]] - grid[[j, i]]
    });
    let y = data.yrange();
    let ymid = ndarray::Array1::from_shape_fn(ny - 1, |j| 0.5 * (y[j] + y[j + 1]));
    Ok(GridDataset::new(diff, data.xrange().clone(), ymid)?)
}

// =========================================================================
//  Filters
// =========================================================================

fn apply_median(data: &GridDataset, args: &[ModArg]) -> Result<GridDataset, ApplyError> {
    expect_arity(args, 2)?;
    let xwidth = window_size(float_arg(args, 0)?, 0)?;
    let ywidth = window_size(float_arg(args, 1)?, 1)?;
    let (ny, nx) = data.shape();
    if xwidth > nx || ywidth > ny {
        return Err(ApplyError::Invalid(format!(
            "median window {}x{} exceeds the {}x{} grid",
            ywidth, xwidth, ny, nx
        )));
    }
    let out = filters::median_filter(data.grid(), ywidth, xwidth);
    Ok(data.with_grid(out)?)
}

fn window_size(width: f64, index: usize) -> Result<usize, ApplyError> {
    let rounded = width.round();
    if !rounded.is_finite() || rounded < 1.0 {
        return Err(ApplyError::Invalid(format!(
            "window width (argument {}) must be at least 1, got {}",
            index, width
        )));
    }
    Ok(rounded as usize)
}

fn apply_smooth(data: &GridDataset, args: &[ModArg]) -> Result<GridDataset, ApplyError> {
    expect_arity(args, 2)?;
    let xsigma = float_arg(args, 0)?;
    let ysigma = float_arg(args, 1)?;
    if !(xsigma >= 0.0 && ysigma >= 0.0) || !xsigma.is_finite() || !ysigma.is_finite() {
        return Err(ApplyError::Invalid(format!(
            "smoothing widths must be finite and non-negative, got ({}, {})",
            xsigma, ysigma
        )));
    }
    let out = filters::gaussian_filter(data.grid(), ysigma, xsigma);
    Ok(data.with_grid(out)?)
}

fn apply_adaptive_threshold(data: &GridDataset, args: &[ModArg]) -> Result<GridDataset, ApplyError> {
    expect_arity(args, 2)?;
    let blocksize = int_arg(args, 0)?;
    let offset = float_arg(args, 1)?;
    if blocksize < 1 || blocksize % 2 == 0 {
        return Err(ApplyError::Invalid(format!(
            "block size must be a positive odd integer, got {}",
            blocksize
        )));
    }
    let (ny, nx) = data.shape();
    let limit = ny.max(nx);
    if blocksize as u64 > limit as u64 {
        return Err(ApplyError::Invalid(format!(
            "block size {} exceeds the {}x{} grid",
            blocksize, ny, nx
        )));
    }
    match filters::adaptive_threshold(data.grid(), blocksize as usize, offset) {
        Some(out) => Ok(data.with_grid(out)?),
        None => {
            log::warn!(
                "AdaptiveThreshold({}, {}) yields a constant grid; keeping the input",
                blocksize,
                offset
            );
            Ok(data.deep_copy())
        }
    }
}
