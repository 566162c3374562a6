use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use ndarray::{Array2, Array4};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ValidationError;

/// Named numeric inputs in the order the paired scaler was fitted with.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    fields: Vec<(String, f64)>,
}

impl FeatureVector {
    pub fn new(fields: Vec<(String, f64)>) -> Self {
        Self { fields }
    }

    /// Builds a vector holding exactly `required`, in that order, from a raw
    /// JSON object. Numbers and numeric strings are accepted; every missing or
    /// malformed field is reported, nothing is defaulted.
    pub fn from_raw(raw: &Map<String, Value>, required: &[&str]) -> Result<Self, ValidationError> {
        let mut errors = Vec::new();
        let mut fields = Vec::with_capacity(required.len());

        for name in required {
            let value = raw
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value);
            match value {
                None | Some(Value::Null) => errors.push(format!("Missing required field: {}", name)),
                Some(value) => match parse_number(value) {
                    Some(number) => fields.push((name.to_string(), number)),
                    None => errors.push(format!("Invalid value for {}: must be a number", name)),
                },
            }
        }

        if errors.is_empty() {
            Ok(Self { fields })
        } else {
            Err(ValidationError::Fields(errors))
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| *value)
    }

    /// `name:value` pairs, used as the stored input summary.
    pub fn describe(&self) -> String {
        self.fields
            .iter()
            .map(|(name, value)| format!("{}:{}", name, value))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn parse_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// Lays the vector out as a single-row matrix following `expected_order`.
/// Fields are matched by name, so a caller's ordering never leaks through.
pub fn prepare_numeric<S: AsRef<str>>(
    fields: &FeatureVector,
    expected_order: &[S],
) -> Result<Array2<f64>, ValidationError> {
    let mut errors = Vec::new();
    let mut row = Vec::with_capacity(expected_order.len());

    for name in expected_order {
        match fields.get(name.as_ref()) {
            Some(value) if value.is_finite() => row.push(value),
            Some(_) => errors.push(format!(
                "Invalid value for {}: must be a number",
                name.as_ref()
            )),
            None => errors.push(format!("Missing required field: {}", name.as_ref())),
        }
    }

    if !errors.is_empty() {
        return Err(ValidationError::Fields(errors));
    }
    let width = row.len();
    Array2::from_shape_vec((1, width), row)
        .map_err(|e| ValidationError::Fields(vec![e.to_string()]))
}

/// A decoded upload of arbitrary size and channel depth.
#[derive(Debug, Clone)]
pub struct ImageSample {
    image: DynamicImage,
}

impl ImageSample {
    pub fn new(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ValidationError> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| ValidationError::Image(format!("could not decode image: {}", e)))?;
        Ok(Self { image })
    }

    pub fn channels(&self) -> u8 {
        self.image.color().channel_count()
    }

    pub fn check_channels(&self) -> Result<(), ValidationError> {
        match self.channels() {
            3 | 4 => Ok(()),
            n => Err(ValidationError::Image(format!(
                "expected 3 or 4 channels, got {}",
                n
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeMethod {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl ResizeMethod {
    fn filter(self) -> FilterType {
        match self {
            ResizeMethod::Nearest => FilterType::Nearest,
            ResizeMethod::Triangle => FilterType::Triangle,
            ResizeMethod::CatmullRom => FilterType::CatmullRom,
            ResizeMethod::Gaussian => FilterType::Gaussian,
            ResizeMethod::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ImageTransform {
    pub target_size: (u32, u32),
    pub channel_order: ChannelOrder,
    pub resize_method: ResizeMethod,
}

impl From<&super::config::ImageConfig> for ImageTransform {
    fn from(config: &super::config::ImageConfig) -> Self {
        Self {
            target_size: config.target_size(),
            channel_order: config.channel_order,
            resize_method: config.resize_method,
        }
    }
}

/// Channel reorder, resize, scale to [0, 1], then add the batch axis.
/// Output shape is `[1, height, width, 3]`.
pub fn prepare_image(raw: &ImageSample, transform: &ImageTransform) -> Result<Array4<f32>, ValidationError> {
    raw.check_channels()?;
    let (width, height) = transform.target_size;
    if width == 0 || height == 0 {
        return Err(ValidationError::Image(format!(
            "invalid target size {}x{}",
            width, height
        )));
    }

    let mut rgb: RgbImage = raw.image.to_rgb8();
    if transform.channel_order == ChannelOrder::Bgr {
        for pixel in rgb.pixels_mut() {
            pixel.0.swap(0, 2);
        }
    }

    let resized = imageops::resize(&rgb, width, height, transform.resize_method.filter());

    let mut tensor = Array4::<f32>::zeros((1, height as usize, width as usize, 3));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for (c, value) in pixel.0.iter().enumerate() {
            tensor[[0, y as usize, x as usize, c]] = f32::from(*value) / 255.0;
        }
    }
    Ok(tensor)
}
