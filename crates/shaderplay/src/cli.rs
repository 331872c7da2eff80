use std::path::PathBuf;

use clap::Parser;
use renderer::{ColorSpaceMode, GpuPowerPreference, RenderPolicy, TextureFormat};

#[derive(Parser, Debug)]
#[command(
    name = "shaderplay",
    author,
    version,
    about = "Preview the ray-light effect in a desktop window"
)]
pub struct Cli {
    /// Background photograph composited under the rays.
    #[arg(long, value_name = "PATH")]
    pub photo: Option<PathBuf>,

    /// Alternative mask bitmap (defaults to the embedded 4x4 point mask).
    #[arg(long, value_name = "PATH")]
    pub mask: Option<PathBuf>,

    /// Initial window size in logical points.
    #[arg(
        long,
        value_name = "WIDTHxHEIGHT",
        value_parser = parse_size,
        default_value = "450x600"
    )]
    pub size: (u32, u32),

    /// Output color space handling: `auto`, `gamma`, or `linear`.
    #[arg(
        long,
        value_name = "MODE",
        value_parser = parse_color_space,
        default_value = "auto"
    )]
    pub color_space: ColorSpaceMode,

    /// Adapter preference: `low` (integrated) or `high` (discrete).
    #[arg(
        long,
        value_name = "PREFERENCE",
        value_parser = parse_gpu_power,
        default_value = "low"
    )]
    pub gpu_power: GpuPowerPreference,

    /// Preferred swapchain format; ignored when the surface cannot present it.
    #[arg(long, value_name = "FORMAT", value_parser = parse_surface_format)]
    pub surface_format: Option<TextureFormat>,

    /// Freeze the animation at the given time (seconds).
    #[arg(long, value_name = "SECONDS", value_parser = parse_still_time)]
    pub still_time: Option<f32>,
}

impl Cli {
    pub fn policy(&self) -> RenderPolicy {
        match self.still_time {
            Some(time) => RenderPolicy::Still { time },
            None => RenderPolicy::Animate,
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("invalid size '{value}'; expected WIDTHxHEIGHT"))?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid width '{}'", w.trim()))?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid height '{}'", h.trim()))?;
    if width == 0 || height == 0 {
        return Err("size must be non-zero".to_string());
    }
    Ok((width, height))
}

pub fn parse_color_space(value: &str) -> Result<ColorSpaceMode, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("color space must not be empty".to_string());
    }

    let normalized = trimmed.to_ascii_lowercase();
    match normalized.as_str() {
        "auto" => Ok(ColorSpaceMode::Auto),
        "gamma" | "srgb-off" => Ok(ColorSpaceMode::Gamma),
        "linear" | "srgb" => Ok(ColorSpaceMode::Linear),
        other => Err(format!(
            "unknown color space '{other}'; expected auto, gamma, or linear"
        )),
    }
}

pub fn parse_gpu_power(value: &str) -> Result<GpuPowerPreference, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "low" | "low-power" | "integrated" => Ok(GpuPowerPreference::Low),
        "high" | "high-performance" | "discrete" => Ok(GpuPowerPreference::High),
        other => Err(format!("unknown GPU power preference '{other}'; expected low or high")),
    }
}

pub fn parse_surface_format(value: &str) -> Result<TextureFormat, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "bgra8unorm" => Ok(TextureFormat::Bgra8Unorm),
        "rgba8unorm" => Ok(TextureFormat::Rgba8Unorm),
        "bgra8unorm-srgb" => Ok(TextureFormat::Bgra8UnormSrgb),
        "rgba8unorm-srgb" => Ok(TextureFormat::Rgba8UnormSrgb),
        other => Err(format!(
            "unsupported surface format '{other}'; expected bgra8unorm, rgba8unorm, bgra8unorm-srgb, or rgba8unorm-srgb"
        )),
    }
}

pub fn parse_still_time(value: &str) -> Result<f32, String> {
    let time = value
        .trim()
        .parse::<f32>()
        .map_err(|_| format!("invalid still time '{value}'; expected seconds"))?;
    if !time.is_finite() || time < 0.0 {
        return Err("still time must be a finite, non-negative number of seconds".to_string());
    }
    Ok(time)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_half_scale_reference() {
        let cli = Cli::try_parse_from(["shaderplay"]).expect("parse");
        assert_eq!(cli.size, (450, 600));
        assert_eq!(cli.color_space, ColorSpaceMode::Auto);
        assert_eq!(cli.gpu_power, GpuPowerPreference::Low);
        assert!(cli.photo.is_none());
        assert!(cli.surface_format.is_none());
        assert_eq!(cli.policy(), RenderPolicy::Animate);
    }

    #[test]
    fn flags_round_out_the_config() {
        let cli = Cli::try_parse_from([
            "shaderplay",
            "--photo",
            "beach.jpg",
            "--size",
            "900X1200",
            "--color-space",
            "linear",
            "--gpu-power",
            "high",
            "--surface-format",
            "rgba8unorm-srgb",
            "--still-time",
            "1.5",
        ])
        .expect("parse");
        assert_eq!(cli.photo, Some(PathBuf::from("beach.jpg")));
        assert_eq!(cli.size, (900, 1200));
        assert_eq!(cli.color_space, ColorSpaceMode::Linear);
        assert_eq!(cli.gpu_power, GpuPowerPreference::High);
        assert_eq!(cli.surface_format, Some(TextureFormat::Rgba8UnormSrgb));
        assert_eq!(cli.policy(), RenderPolicy::Still { time: 1.5 });
    }

    #[test]
    fn size_rejects_malformed_values() {
        assert!(parse_size("800").is_err());
        assert!(parse_size("0x600").is_err());
        assert!(parse_size("wide x tall").is_err());
        assert_eq!(parse_size(" 640 x 480 "), Ok((640, 480)));
    }

    #[test]
    fn still_time_must_be_non_negative() {
        assert!(parse_still_time("-1").is_err());
        assert!(parse_still_time("NaN").is_err());
        assert_eq!(parse_still_time("2"), Ok(2.0));
    }

    #[test]
    fn unknown_enum_values_are_rejected() {
        assert!(parse_color_space("").is_err());
        assert!(parse_color_space("hdr").is_err());
        assert!(parse_gpu_power("medium").is_err());
        assert!(parse_surface_format("rgba16float").is_err());
    }
}
