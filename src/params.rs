//! Filter identifiers and range-validated parameter sets.
//!
//! Each [`FilterId`] declares its knobs as a static table of [`ParamSpec`]s.
//! [`FilterParameters`] always holds one value per declared knob, and every
//! write goes through [`ParamSpec::clamp`], so a filter never sees a value
//! outside its declared range.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Single-input filters driven by the preview loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterId {
    Brightness,
    Contrast,
    GaussianBlur,
    BoxBlur,
    Sharpen,
    Pixelate,
    Halftone,
    Glitch,
    LensDistortion,
    NoiseAdd,
    NoiseRemove,
    RedEye,
    MirrorLeft,
    MirrorRight,
}

/// How a knob's value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Float,
    /// Rounded to the nearest integer.
    Integer,
    /// Snapped to 0.0 or 1.0.
    Toggle,
}

/// Declared range of one knob.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub key: &'static str,
    pub min: f32,
    pub max: f32,
    pub default: f32,
    pub kind: ParamKind,
}

const fn float(key: &'static str, min: f32, max: f32, default: f32) -> ParamSpec {
    ParamSpec { key, min, max, default, kind: ParamKind::Float }
}

const fn integer(key: &'static str, min: f32, max: f32, default: f32) -> ParamSpec {
    ParamSpec { key, min, max, default, kind: ParamKind::Integer }
}

const fn toggle(key: &'static str, default: f32) -> ParamSpec {
    ParamSpec { key, min: 0.0, max: 1.0, default, kind: ParamKind::Toggle }
}

const BRIGHTNESS: &[ParamSpec] = &[float("percent", 0.0, 200.0, 100.0)];
const CONTRAST: &[ParamSpec] = &[float("percent", 0.0, 200.0, 100.0)];
const GAUSSIAN_BLUR: &[ParamSpec] = &[float("radius", 0.0, 50.0, 0.0)];
const BOX_BLUR: &[ParamSpec] = &[integer("radius", 0.0, 50.0, 0.0)];
const SHARPEN: &[ParamSpec] = &[
    float("amount", 0.0, 5.0, 1.0),
    float("radius", 0.5, 10.0, 1.0),
    integer("threshold", 0.0, 255.0, 0.0),
];
const PIXELATE: &[ParamSpec] = &[integer("block_size", 1.0, 200.0, 10.0)];
const HALFTONE: &[ParamSpec] = &[integer("dot_size", 2.0, 64.0, 8.0), toggle("dark", 0.0)];
const GLITCH: &[ParamSpec] = &[integer("intensity", 1.0, 40.0, 10.0)];
const LENS: &[ParamSpec] = &[
    float("strength", 0.0, 1.0, 0.5),
    float("center_x", 0.0, 1.0, 0.5),
    float("center_y", 0.0, 1.0, 0.5),
];
const NOISE_ADD: &[ParamSpec] = &[float("amount", 0.0, 255.0, 50.0)];
const NOISE_REMOVE: &[ParamSpec] = &[float("amount", 0.0, 100.0, 0.0)];
const NONE: &[ParamSpec] = &[];

impl FilterId {
    pub const ALL: [FilterId; 14] = [
        FilterId::Brightness,
        FilterId::Contrast,
        FilterId::GaussianBlur,
        FilterId::BoxBlur,
        FilterId::Sharpen,
        FilterId::Pixelate,
        FilterId::Halftone,
        FilterId::Glitch,
        FilterId::LensDistortion,
        FilterId::NoiseAdd,
        FilterId::NoiseRemove,
        FilterId::RedEye,
        FilterId::MirrorLeft,
        FilterId::MirrorRight,
    ];

    /// Declared knobs, in display order.
    pub fn specs(self) -> &'static [ParamSpec] {
        match self {
            FilterId::Brightness => BRIGHTNESS,
            FilterId::Contrast => CONTRAST,
            FilterId::GaussianBlur => GAUSSIAN_BLUR,
            FilterId::BoxBlur => BOX_BLUR,
            FilterId::Sharpen => SHARPEN,
            FilterId::Pixelate => PIXELATE,
            FilterId::Halftone => HALFTONE,
            FilterId::Glitch => GLITCH,
            FilterId::LensDistortion => LENS,
            FilterId::NoiseAdd => NOISE_ADD,
            FilterId::NoiseRemove => NOISE_REMOVE,
            FilterId::RedEye | FilterId::MirrorLeft | FilterId::MirrorRight => NONE,
        }
    }

    pub fn spec(self, key: &str) -> Option<&'static ParamSpec> {
        self.specs().iter().find(|s| s.key == key)
    }

    /// True for filters whose output depends on the random generator.
    pub fn is_randomized(self) -> bool {
        matches!(self, FilterId::Glitch | FilterId::NoiseAdd)
    }
}

impl ParamSpec {
    /// Bring `value` into range.
    ///
    /// # Errors
    /// `InvalidInput` for NaN, the only value that cannot be clamped.
    pub fn clamp(&self, value: f32) -> Result<f32> {
        if value.is_nan() {
            return Err(Error::InvalidInput(format!("{} must be a number", self.key)));
        }
        let v = value.clamp(self.min, self.max);
        Ok(match self.kind {
            ParamKind::Float => v,
            ParamKind::Integer => v.round(),
            ParamKind::Toggle => {
                if v >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
        })
    }
}

/// Current knob values for one filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterParameters {
    filter: FilterId,
    values: BTreeMap<String, f32>,
}

impl FilterParameters {
    /// Every knob at its declared default.
    pub fn defaults(filter: FilterId) -> Self {
        let values = filter
            .specs()
            .iter()
            .map(|s| (s.key.to_string(), s.default))
            .collect();
        Self { filter, values }
    }

    /// Start from defaults and apply `values`, clamping each.
    pub fn from_values<'a, I>(filter: FilterId, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, f32)>,
    {
        let mut params = Self::defaults(filter);
        for (key, value) in values {
            params.set(key, value)?;
        }
        Ok(params)
    }

    pub fn filter(&self) -> FilterId {
        self.filter
    }

    /// Value of `key`, or 0.0 for a key this filter does not declare.
    pub fn get(&self, key: &str) -> f32 {
        self.values.get(key).copied().unwrap_or(0.0)
    }

    /// Validate, clamp and store; returns the stored value.
    ///
    /// # Errors
    /// `InvalidInput` for an undeclared key or NaN. Nothing is stored.
    pub fn set(&mut self, key: &str, value: f32) -> Result<f32> {
        let spec = self.filter.spec(key).ok_or_else(|| {
            Error::InvalidInput(format!("{:?} has no parameter named {key:?}", self.filter))
        })?;
        let clamped = spec.clamp(value)?;
        self.values.insert(key.to_string(), clamped);
        Ok(clamped)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
