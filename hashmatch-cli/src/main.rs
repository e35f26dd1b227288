use clap::Parser;
use hashmatch::image::io::{load_color, load_depth};
use hashmatch::{
    Detector, DetectorConfig, FeatureConfig, Group, HashConfig, HsvNormalization, Match,
    ObjectnessConfig, Rect, Scene, TemplateSource, TestKind, VerifyConfig, VoteTieBreak,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "HashMatch CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum TieBreakConfig {
    FirstVote,
    TemplateId,
}

impl From<TieBreakConfig> for VoteTieBreak {
    fn from(value: TieBreakConfig) -> Self {
        match value {
            TieBreakConfig::FirstVote => VoteTieBreak::FirstVote,
            TieBreakConfig::TemplateId => VoteTieBreak::TemplateId,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum TestKindConfig {
    ObjectSize,
    SurfaceNormal,
    Gradient,
    Depth,
    Color,
}

impl From<TestKindConfig> for TestKind {
    fn from(value: TestKindConfig) -> Self {
        match value {
            TestKindConfig::ObjectSize => TestKind::ObjectSize,
            TestKindConfig::SurfaceNormal => TestKind::SurfaceNormal,
            TestKindConfig::Gradient => TestKind::Gradient,
            TestKindConfig::Depth => TestKind::Depth,
            TestKindConfig::Color => TestKind::Color,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FeatureConfigJson {
    feature_point_count: usize,
    canny_low: f32,
    canny_high: f32,
    sobel_max: u8,
    grayscale_min: u8,
    min_gradient_magnitude: f32,
    seed: u64,
}

impl Default for FeatureConfigJson {
    fn default() -> Self {
        let cfg = FeatureConfig::default();
        Self {
            feature_point_count: cfg.feature_point_count,
            canny_low: cfg.canny_low,
            canny_high: cfg.canny_high,
            sobel_max: cfg.sobel_max,
            grayscale_min: cfg.grayscale_min,
            min_gradient_magnitude: cfg.min_gradient_magnitude,
            seed: cfg.seed,
        }
    }
}

impl From<FeatureConfigJson> for FeatureConfig {
    fn from(value: FeatureConfigJson) -> Self {
        Self {
            feature_point_count: value.feature_point_count,
            canny_low: value.canny_low,
            canny_high: value.canny_high,
            sobel_max: value.sobel_max,
            grayscale_min: value.grayscale_min,
            min_gradient_magnitude: value.min_gradient_magnitude,
            seed: value.seed,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ObjectnessConfigJson {
    window_step: usize,
    t_min: f32,
    t_max: f32,
    edgel_factor: f32,
    depth_scale: f32,
}

impl Default for ObjectnessConfigJson {
    fn default() -> Self {
        let cfg = ObjectnessConfig::default();
        Self {
            window_step: cfg.window_step,
            t_min: cfg.t_min,
            t_max: cfg.t_max,
            edgel_factor: cfg.edgel_factor,
            depth_scale: cfg.depth_scale,
        }
    }
}

impl From<ObjectnessConfigJson> for ObjectnessConfig {
    fn from(value: ObjectnessConfigJson) -> Self {
        Self {
            window_step: value.window_step,
            t_min: value.t_min,
            t_max: value.t_max,
            edgel_factor: value.edgel_factor,
            depth_scale: value.depth_scale,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct HashConfigJson {
    reference_grid: [u16; 2],
    hash_table_count: usize,
    histogram_bin_count: usize,
    min_votes_per_template: u32,
    max_triplet_distance: u16,
    tie_break: TieBreakConfig,
    seed: u64,
}

impl Default for HashConfigJson {
    fn default() -> Self {
        let cfg = HashConfig::default();
        Self {
            reference_grid: [cfg.grid_width, cfg.grid_height],
            hash_table_count: cfg.hash_table_count,
            histogram_bin_count: cfg.histogram_bin_count,
            min_votes_per_template: cfg.min_votes_per_template,
            max_triplet_distance: cfg.max_triplet_distance,
            tie_break: TieBreakConfig::FirstVote,
            seed: cfg.seed,
        }
    }
}

impl From<HashConfigJson> for HashConfig {
    fn from(value: HashConfigJson) -> Self {
        Self {
            grid_width: value.reference_grid[0],
            grid_height: value.reference_grid[1],
            hash_table_count: value.hash_table_count,
            histogram_bin_count: value.histogram_bin_count,
            min_votes_per_template: value.min_votes_per_template,
            max_triplet_distance: value.max_triplet_distance,
            tie_break: value.tie_break.into(),
            seed: value.seed,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct HsvNormalizationJson {
    dark_value: u8,
    gray_saturation: u8,
    dark_hue: u8,
    gray_hue: u8,
}

impl Default for HsvNormalizationJson {
    fn default() -> Self {
        let norm = HsvNormalization::default();
        Self {
            dark_value: norm.dark_value,
            gray_saturation: norm.gray_saturation,
            dark_hue: norm.dark_hue,
            gray_hue: norm.gray_hue,
        }
    }
}

impl From<HsvNormalizationJson> for HsvNormalization {
    fn from(value: HsvNormalizationJson) -> Self {
        Self {
            dark_value: value.dark_value,
            gray_saturation: value.gray_saturation,
            dark_hue: value.dark_hue,
            gray_hue: value.gray_hue,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct VerifyConfigJson {
    t_match: f32,
    overlap_threshold: f32,
    neighbourhood_radius: usize,
    object_size_tolerance: f32,
    normal_bin_tolerance: u8,
    gradient_bin_tolerance: u8,
    depth_tolerance: f32,
    color_tolerance: [u8; 3],
    color_normalization: HsvNormalizationJson,
    cascade: Vec<TestKindConfig>,
}

impl Default for VerifyConfigJson {
    fn default() -> Self {
        let cfg = VerifyConfig::default();
        Self {
            t_match: cfg.t_match,
            overlap_threshold: cfg.overlap_threshold,
            neighbourhood_radius: cfg.neighbourhood_radius,
            object_size_tolerance: cfg.object_size_tolerance,
            normal_bin_tolerance: cfg.normal_bin_tolerance,
            gradient_bin_tolerance: cfg.gradient_bin_tolerance,
            depth_tolerance: cfg.depth_tolerance,
            color_tolerance: cfg.color_tolerance,
            color_normalization: HsvNormalizationJson::default(),
            cascade: vec![
                TestKindConfig::ObjectSize,
                TestKindConfig::SurfaceNormal,
                TestKindConfig::Gradient,
                TestKindConfig::Depth,
                TestKindConfig::Color,
            ],
        }
    }
}

impl From<VerifyConfigJson> for VerifyConfig {
    fn from(value: VerifyConfigJson) -> Self {
        Self {
            t_match: value.t_match,
            overlap_threshold: value.overlap_threshold,
            neighbourhood_radius: value.neighbourhood_radius,
            object_size_tolerance: value.object_size_tolerance,
            normal_bin_tolerance: value.normal_bin_tolerance,
            gradient_bin_tolerance: value.gradient_bin_tolerance,
            depth_tolerance: value.depth_tolerance,
            color_tolerance: value.color_tolerance,
            color_normalization: value.color_normalization.into(),
            cascade: value.cascade.into_iter().map(TestKind::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SceneJson {
    rgb_path: String,
    depth_path: String,
}

#[derive(Debug, Deserialize)]
struct TemplateJson {
    obj_id: u32,
    rgb_path: String,
    depth_path: String,
    /// `[x, y, width, height]` inside the rendered images.
    bbox: [usize; 4],
    diameter: f32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    scene: Option<SceneJson>,
    templates: Vec<TemplateJson>,
    output_path: Option<String>,
    parallel: bool,
    features: FeatureConfigJson,
    objectness: ObjectnessConfigJson,
    hashing: HashConfigJson,
    verify: VerifyConfigJson,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scene: None,
            templates: Vec::new(),
            output_path: None,
            parallel: false,
            features: FeatureConfigJson::default(),
            objectness: ObjectnessConfigJson::default(),
            hashing: HashConfigJson::default(),
            verify: VerifyConfigJson::default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct MatchRecord {
    obj_id: u32,
    template: usize,
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    score: f32,
    votes: u32,
}

impl From<Match> for MatchRecord {
    fn from(value: Match) -> Self {
        Self {
            obj_id: value.obj_id,
            template: value.template.0,
            x: value.bbox.x,
            y: value.bbox.y,
            width: value.bbox.width,
            height: value.bbox.height,
            score: value.score,
            votes: value.votes,
        }
    }
}

#[derive(Debug, Serialize)]
struct Output {
    windows: usize,
    matches: Vec<MatchRecord>,
}

fn load_groups(templates: &[TemplateJson]) -> Result<Vec<Group>, Box<dyn std::error::Error>> {
    let mut by_object: BTreeMap<u32, Vec<TemplateSource>> = BTreeMap::new();
    for entry in templates {
        let color = load_color(&entry.rgb_path)?;
        let depth = load_depth(&entry.depth_path)?;
        let [x, y, width, height] = entry.bbox;
        let source = TemplateSource::new(
            entry.obj_id,
            Rect::new(x, y, width, height),
            entry.diameter,
            color.gray,
            color.hsv,
            depth,
        )?;
        by_object.entry(entry.obj_id).or_default().push(source);
    }
    Ok(by_object
        .into_iter()
        .map(|(obj_id, sources)| Group::new(obj_id, sources))
        .collect())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("hashmatch=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    let Some(scene_paths) = config.scene else {
        return Err("scene.rgb_path and scene.depth_path must be set in the config".into());
    };
    if config.templates.is_empty() {
        return Err("templates must list at least one template".into());
    }

    let detector_cfg = DetectorConfig {
        features: config.features.into(),
        objectness: config.objectness.into(),
        hashing: config.hashing.into(),
        verify: config.verify.into(),
        parallel: config.parallel,
    };
    let depth_scale = detector_cfg.objectness.depth_scale;

    let groups = load_groups(&config.templates)?;
    let detector = Detector::train(groups, detector_cfg)?;

    let color = load_color(&scene_paths.rgb_path)?;
    let depth = load_depth(&scene_paths.depth_path)?;
    let scene = Scene::from_raw_depth(color.hsv, color.gray, depth, depth_scale)?;

    let detection = detector.detect(&scene)?;
    let output = Output {
        windows: detection.windows.len(),
        matches: detection.matches.into_iter().map(MatchRecord::from).collect(),
    };
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
