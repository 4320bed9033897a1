use crate::api::RenderedMap;
use crate::backend::DEFAULT_PROJECT;
use crate::core::params::FloodParams;
use crate::core::processing::FloodMap;
use crate::gui::logging::{GuiLogLayer, LogEntry};
use crate::gui::processing::GuiError;
use crate::{DespeckleMode, OutputFormat, Region};
use eframe::egui::TextureHandle;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use sysinfo;
use tracing::Level;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry};

pub const APP_TITLE: &str = "Flood Hazard Mapping using Sentinel-1 SAR Data";
pub const APP_DESCRIPTION: &str = "This app shows the analysis of flood hazard mapping for the region of Assam based on Sentinel-1 SAR data.";
const PRESET_EXTENSION: &str = "floodmap";

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub enum SizeMode {
    Original,
    Predefined(usize),
    Custom,
}

static LOGGING_INIT: OnceCell<()> = OnceCell::new();

pub fn init_gui_logging() {
    LOGGING_INIT.get_or_init(|| {
        let gui_layer = GuiLogLayer::new();

        // eframe and winit are chatty at trace level
        let filter = EnvFilter::new("trace,eframe=info,winit=info,egui_glow=info");

        let subscriber = Registry::default().with(gui_layer).with(filter);
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// Result of one background run.
pub struct RunOutcome {
    pub map: FloodMap,
    pub rendered: RenderedMap,
    pub exported: Option<usize>,
}

/// The configuration part of the GUI state that presets carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloodPreset {
    /// Flattened so the CLI's `--config` reads the same file
    #[serde(flatten)]
    pub params: FloodParams,
    pub project: String,
    #[serde(default)]
    pub catalog_dir: Option<PathBuf>,
    pub output_format: OutputFormat,
    pub size_mode: SizeMode,
    #[serde(default)]
    pub custom_size: String,
    pub min_log_level: String,
}

/// Preset file text: a `//` comment header followed by the JSON body.
pub fn preset_content(preset: &FloodPreset) -> Result<String, GuiError> {
    let mut content = String::new();
    content.push_str("// ==========================================\n");
    content.push_str("// floodmap Configuration Preset\n");
    content.push_str("// ==========================================\n");
    content.push_str(&format!("// Program: {}\n", APP_TITLE));
    content.push_str(&format!("// Version: {}\n", env!("CARGO_PKG_VERSION")));
    content.push_str(&format!("// Generated: {}\n", chrono::Utc::now().to_rfc3339()));
    content.push_str("// Note: output paths are not included in presets\n");
    content.push_str("// ==========================================\n\n");
    content.push_str(&serde_json::to_string_pretty(preset).map_err(crate::Error::from)?);
    Ok(content)
}

pub fn parse_preset(content: &str) -> Result<FloodPreset, GuiError> {
    let json_start = content.find('{').ok_or(GuiError::InvalidPreset)?;
    serde_json::from_str(&content[json_start..]).map_err(|e| GuiError::Flood(e.into()))
}

pub fn level_name(level: Level) -> &'static str {
    match level {
        Level::ERROR => "ERROR",
        Level::WARN => "WARN",
        Level::INFO => "INFO",
        Level::DEBUG => "DEBUG",
        Level::TRACE => "TRACE",
    }
}

fn parse_level(name: &str) -> Level {
    match name {
        "ERROR" => Level::ERROR,
        "WARN" => Level::WARN,
        "DEBUG" => Level::DEBUG,
        "TRACE" => Level::TRACE,
        _ => Level::INFO,
    }
}

pub struct FloodGui {
    // Pipeline parameters
    pub params: FloodParams,
    pub project: String,
    /// Catalog directory; the synthetic dataset is used when unset
    pub catalog_dir: Option<PathBuf>,

    // Export parameters
    pub output_dir_path: Option<PathBuf>,
    pub output_format: OutputFormat,
    pub size_mode: SizeMode,
    pub custom_size: String,

    // Map state
    pub rendered: Option<RenderedMap>,
    pub layer_visible: Vec<bool>,
    pub map_texture: Option<TextureHandle>,
    pub texture_dirty: bool,
    pub scene_counts: Option<(usize, usize)>,

    // Options
    /// Re-run the pipeline whenever an input changes
    pub auto_update: bool,
    pub last_run_params: Option<FloodParams>,
    pub last_run_project: Option<String>,
    pub min_log_level: Level,

    // Status
    pub status_message: String,
    pub is_processing: bool,
    pub processing_start_time: Option<Instant>,
    pub last_processing_duration: Option<Duration>,

    // Log messages for the right panel - now thread-safe
    pub log_messages: Arc<Mutex<Vec<LogEntry>>>,

    // Receiver for completion notification from background processing
    pub completion_receiver: Option<Receiver<Result<RunOutcome, String>>>,

    // System monitoring
    pub cpu_usage: f32,
    pub memory_usage_mb: f64,
    pub total_memory_mb: f64,
    pub system_monitor: Option<sysinfo::System>,
    pub last_system_update: Option<Instant>,
}

impl Default for FloodGui {
    fn default() -> Self {
        Self {
            params: FloodParams::default(),
            project: DEFAULT_PROJECT.to_string(),
            catalog_dir: None,
            output_dir_path: None,
            output_format: OutputFormat::TIFF,
            size_mode: SizeMode::Original,
            custom_size: String::new(),
            rendered: None,
            layer_visible: Vec::new(),
            map_texture: None,
            texture_dirty: false,
            scene_counts: None,
            auto_update: true,
            last_run_params: None,
            last_run_project: None,
            min_log_level: Level::INFO,
            status_message: "Ready".to_string(),
            is_processing: false,
            processing_start_time: None,
            last_processing_duration: None,
            log_messages: Arc::new(Mutex::new(Vec::new())),
            completion_receiver: None,
            cpu_usage: 0.0,
            memory_usage_mb: 0.0,
            total_memory_mb: 0.0,
            system_monitor: None,
            last_system_update: None,
        }
    }
}

impl FloodGui {
    pub fn preset(&self) -> FloodPreset {
        FloodPreset {
            params: self.params.clone(),
            project: self.project.clone(),
            catalog_dir: self.catalog_dir.clone(),
            output_format: self.output_format,
            size_mode: self.size_mode,
            custom_size: self.custom_size.clone(),
            min_log_level: level_name(self.min_log_level).to_string(),
        }
    }

    pub fn apply_preset(&mut self, preset: FloodPreset) {
        self.params = preset.params;
        self.project = preset.project;
        self.catalog_dir = preset.catalog_dir;
        self.output_format = preset.output_format;
        self.size_mode = preset.size_mode;
        self.custom_size = preset.custom_size;
        self.min_log_level = parse_level(&preset.min_log_level);
    }

    pub fn save_logs_to_file(&self) -> Result<(), GuiError> {
        let logs = self.log_messages.lock().map_err(|_| GuiError::LogsUnavailable)?;

        let filtered_logs: Vec<&LogEntry> = logs
            .iter()
            .filter(|entry| {
                self.min_log_level == Level::TRACE || entry.level == self.min_log_level
            })
            .collect();
        if filtered_logs.is_empty() {
            return Err(GuiError::NothingToSave("logs"));
        }

        let Some(save_path) = rfd::FileDialog::new()
            .add_filter("floodmap log files", &["log"])
            .set_file_name("floodmap.log")
            .save_file()
        else {
            return Err(GuiError::NoPathSelected);
        };

        let mut log_content = String::new();
        log_content.push_str("=== floodmap Log File ===\n");
        log_content.push_str(&format!("Generated: {}\n", chrono::Utc::now().to_rfc3339()));
        log_content.push_str(&format!(
            "Filter Level: {}\n",
            if self.min_log_level == Level::TRACE {
                "ALL"
            } else {
                level_name(self.min_log_level)
            }
        ));
        log_content.push_str(&format!("Total Logs: {}\n", filtered_logs.len()));
        log_content.push_str("=====================\n\n");
        for entry in &filtered_logs {
            log_content.push_str(&format!(
                "[{}] {} {}: {}\n",
                entry.timestamp,
                level_name(entry.level),
                entry.target,
                entry.message
            ));
        }
        fs::write(&save_path, log_content)?;

        tracing::info!(
            "Filtered logs saved to: {:?} ({} entries)",
            save_path,
            filtered_logs.len()
        );
        Ok(())
    }

    pub fn save_preset(&self) -> Result<(), GuiError> {
        let Some(save_path) = rfd::FileDialog::new()
            .add_filter("floodmap preset files", &[PRESET_EXTENSION])
            .set_file_name(format!("flood_preset.{}", PRESET_EXTENSION))
            .save_file()
        else {
            return Err(GuiError::NoPathSelected);
        };
        fs::write(&save_path, preset_content(&self.preset())?)?;
        tracing::info!("Preset saved to: {:?}", save_path);
        Ok(())
    }

    pub fn load_preset(&mut self) -> Result<(), GuiError> {
        let Some(load_path) = rfd::FileDialog::new()
            .add_filter("floodmap preset files", &[PRESET_EXTENSION, "json"])
            .pick_file()
        else {
            return Err(GuiError::NoPathSelected);
        };
        let content = fs::read_to_string(&load_path)?;
        let preset = parse_preset(&content)?;
        self.apply_preset(preset);
        tracing::info!("Preset loaded from: {:?}", load_path);
        Ok(())
    }

    pub fn get_size_string(&self) -> String {
        match self.size_mode {
            SizeMode::Original => "original".to_string(),
            SizeMode::Predefined(size) => size.to_string(),
            SizeMode::Custom => self.custom_size.clone(),
        }
    }

    pub fn generate_cli_command(&self) -> String {
        let p = &self.params;
        let mut cmd = String::from("cargo run --release --bin floodmap --");

        let region = match p.region {
            Region::Assam => "assam",
            Region::OtherLocation => "other-location",
        };
        cmd.push_str(&format!(" --region {}", region));
        cmd.push_str(&format!(" --good-date {}", p.baseline.start));
        cmd.push_str(&format!(" --flood-date {}", p.baseline.end));
        cmd.push_str(&format!(" --flood-start {}", p.flood.start));
        cmd.push_str(&format!(" --flood-end {}", p.flood.end));
        cmd.push_str(&format!(" --threshold {}", p.threshold_db));
        let despeckle = match p.despeckle {
            DespeckleMode::Lee => "lee",
            DespeckleMode::PassThrough => "pass-through",
        };
        cmd.push_str(&format!(" --despeckle {}", despeckle));
        cmd.push_str(&format!(" --project {}", self.project));

        match &self.catalog_dir {
            Some(dir) => cmd.push_str(&format!(" --catalog {:?}", dir)),
            None => cmd.push_str(" --demo"),
        }
        if let Some(output_dir) = &self.output_dir_path {
            cmd.push_str(&format!(" --output-dir {:?}", output_dir));
            cmd.push_str(&format!(" --format {:?}", self.output_format).to_lowercase());
            cmd.push_str(&format!(" --size {}", self.get_size_string()));
        }
        // we always want to log
        cmd.push_str(" --log");

        cmd
    }

    /// Update system statistics (CPU and memory usage)
    pub fn update_system_stats(&mut self) {
        // Only update every 2 seconds to avoid excessive system calls
        let now = Instant::now();
        if let Some(last_update) = self.last_system_update {
            if now.duration_since(last_update).as_secs() < 2 {
                return;
            }
        }

        if self.system_monitor.is_none() {
            self.system_monitor = Some(sysinfo::System::new_all());
        }

        if let Some(ref mut sys) = self.system_monitor {
            sys.refresh_all();
            self.cpu_usage = sys.global_cpu_usage();
            self.memory_usage_mb = sys.used_memory() as f64 / 1024.0 / 1024.0;
            self.total_memory_mb = sys.total_memory() as f64 / 1024.0 / 1024.0;
        }

        self.last_system_update = Some(now);
    }
}
