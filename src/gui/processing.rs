use super::models::{FloodGui, RunOutcome};
use crate::api::{
    build_flood_map, catalog_session, demo_session, export_flood_map, render_flood_map,
};
use crate::core::params::FloodParams;
use crate::gui::logging::LogEntry;
use crate::gui::models::init_gui_logging;
use crate::io::ExportOptions;
use crate::OutputFormat;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, trace};

/// GUI-specific errors
#[derive(Debug, Error)]
pub enum GuiError {
    #[error("Invalid size parameter: {size}. Must be a positive integer or 'original'")]
    InvalidSize { size: String },

    #[error("Size must be greater than 0, got: {size}")]
    ZeroSize { size: usize },

    #[error("Error creating output directory: {0}")]
    OutputDirError(String),

    #[error("Preset does not contain a JSON body")]
    InvalidPreset,

    #[error("No {0} to save")]
    NothingToSave(&'static str),

    #[error("No file selected")]
    NoPathSelected,

    #[error("Log buffer is unavailable")]
    LogsUnavailable,

    #[error("Image encoding error: {0}")]
    Image(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Flood(#[from] crate::Error),
}

/// Inputs of one background run, detached from the GUI state.
#[derive(Debug, Clone)]
pub struct RunJob {
    pub params: FloodParams,
    pub project: String,
    pub catalog_dir: Option<PathBuf>,
    pub export: Option<(PathBuf, ExportOptions)>,
}

/// Opens the session, builds and renders the map, and exports it when an
/// output directory is configured.
pub fn run_job(job: &RunJob) -> Result<RunOutcome, GuiError> {
    job.params.validate()?;
    let session = match &job.catalog_dir {
        Some(dir) => {
            debug!("Opening catalog {:?}", dir);
            catalog_session(dir, &job.project)?
        }
        None => demo_session(&job.project)?,
    };
    let map = build_flood_map(&session, &job.params)?;
    let rendered = render_flood_map(&session, &map)?;

    let exported = match &job.export {
        Some((dir, options)) => {
            if let Err(e) = fs::create_dir_all(dir) {
                error!("Error creating output directory: {}", e);
                return Err(GuiError::OutputDirError(e.to_string()));
            }
            let report = export_flood_map(&map, &rendered, dir, options)?;
            info!("Written: {}", report.written.len());
            info!("Skipped: {}", report.skipped);
            Some(report.written.len())
        }
        None => None,
    };

    session.close();
    Ok(RunOutcome {
        map,
        rendered,
        exported,
    })
}

impl FloodGui {
    pub fn select_catalog_directory(&mut self) {
        if let Some(path) = rfd::FileDialog::new().pick_folder() {
            info!("Selected catalog directory: {:?}", path);
            self.catalog_dir = Some(path);
            self.last_run_params = None;
        }
    }

    /// True when the parameters or the project differ from the last run.
    /// Picking another catalog clears the snapshot.
    pub fn inputs_changed(&self) -> bool {
        self.last_run_params.as_ref() != Some(&self.params)
            || self.last_run_project.as_ref() != Some(&self.project)
    }

    pub fn select_output_directory(&mut self) {
        if let Some(path) = rfd::FileDialog::new().pick_folder() {
            info!("Selected output directory: {:?}", path);
            self.output_dir_path = Some(path);
        }
    }

    pub fn size_option(&self) -> Result<Option<usize>, GuiError> {
        let size = self.get_size_string();
        if size == "original" {
            return Ok(None);
        }
        let parsed_size = size
            .trim()
            .parse::<usize>()
            .map_err(|_| GuiError::InvalidSize { size: size.clone() })?;
        if parsed_size == 0 {
            return Err(GuiError::ZeroSize { size: parsed_size });
        }
        Ok(Some(parsed_size))
    }

    fn job(&self, with_export: bool) -> Result<RunJob, GuiError> {
        let export = match (&self.output_dir_path, with_export) {
            (Some(dir), true) => Some((
                dir.clone(),
                ExportOptions {
                    format: self.output_format,
                    size: match self.output_format {
                        OutputFormat::JPEG => self.size_option()?,
                        OutputFormat::TIFF => None,
                    },
                    include_hidden: true,
                },
            )),
            _ => None,
        };
        Ok(RunJob {
            params: self.params.clone(),
            project: self.project.clone(),
            catalog_dir: self.catalog_dir.clone(),
            export,
        })
    }

    /// Starts a background run. `with_export` also writes the layers to the
    /// output directory.
    pub fn start_run(&mut self, with_export: bool) {
        if self.is_processing {
            debug!("Processing already in progress, ignoring request");
            return;
        }

        // Always initialize logging for error messages to appear in GUI
        init_gui_logging();

        let job = match self.job(with_export) {
            Ok(job) => job,
            Err(e) => {
                error!("{}", e);
                self.status_message = format!("Error: {}", e);
                return;
            }
        };
        // the reactive loop compares against this snapshot
        self.last_run_params = Some(self.params.clone());
        self.last_run_project = Some(self.project.clone());

        if let Ok(mut logs) = self.log_messages.lock() {
            logs.push(LogEntry::new(
                tracing::Level::INFO,
                "--- Processing Started ---".to_string(),
                "gui".to_string(),
            ));
        }
        debug!("Background run parameters: {:?}", job);

        self.is_processing = true;
        self.processing_start_time = Some(Instant::now());
        self.last_processing_duration = None;
        self.status_message = "Processing...".to_string();

        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            trace!("Background processing thread started");
            let result = run_job(&job).map_err(|e| {
                error!("Processing cancelled: {}", e);
                e.to_string()
            });
            let _ = tx.send(result);
        });
        self.completion_receiver = Some(rx);
        info!("Processing started in background thread");
    }

    /// Picks up a finished background run, if any.
    pub fn poll_completion(&mut self) {
        let Some(rx) = &self.completion_receiver else {
            return;
        };
        let Ok(result) = rx.try_recv() else {
            return;
        };
        self.completion_receiver = None;
        self.is_processing = false;
        if let Some(start) = self.processing_start_time.take() {
            self.last_processing_duration = Some(start.elapsed());
        }

        match result {
            Ok(outcome) => {
                let shown: Vec<bool> = outcome.rendered.layers.iter().map(|l| l.shown).collect();
                // keep the user's toggles while the layer stack is unchanged
                if self.layer_visible.len() != shown.len() {
                    self.layer_visible = shown;
                }
                self.scene_counts = Some((
                    outcome.map.baseline_scene_count,
                    outcome.map.flood_scene_count,
                ));
                self.status_message = match outcome.exported {
                    Some(n) => format!("Map updated, {} layers exported", n),
                    None => "Map updated".to_string(),
                };
                self.rendered = Some(outcome.rendered);
                self.texture_dirty = true;
            }
            Err(msg) => {
                self.status_message = format!("Error: {}", msg);
            }
        }
    }

    /// Saves the currently displayed composite as a PNG.
    pub fn save_map_image(&self) -> Result<(), GuiError> {
        let Some(rendered) = &self.rendered else {
            return Err(GuiError::NothingToSave("map"));
        };
        let Some(rgba) = rendered.composite(Some(&self.layer_visible))? else {
            return Err(GuiError::NothingToSave("map"));
        };
        let Some(path) = rfd::FileDialog::new()
            .add_filter("PNG image", &["png"])
            .set_file_name("flood_map.png")
            .save_file()
        else {
            return Err(GuiError::NoPathSelected);
        };
        let image = image::RgbaImage::from_raw(rgba.width as u32, rgba.height as u32, rgba.pixels)
            .ok_or_else(|| GuiError::Image("buffer does not match dimensions".to_string()))?;
        image
            .save(&path)
            .map_err(|e| GuiError::Image(e.to_string()))?;
        info!("Map image saved to: {:?}", path);
        Ok(())
    }

    pub fn reset(&mut self) {
        let log_messages = self.log_messages.clone();
        *self = FloodGui {
            log_messages,
            ..FloodGui::default()
        };
        info!("Settings reset to defaults");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gui::models::SizeMode;
    use crate::backend::DEFAULT_PROJECT;
    use crate::core::processing::pipeline::HAZARD_LAYER;

    fn demo_job() -> RunJob {
        RunJob {
            params: FloodParams::default(),
            project: DEFAULT_PROJECT.to_string(),
            catalog_dir: None,
            export: None,
        }
    }

    #[test]
    fn demo_job_renders_every_layer() {
        let outcome = run_job(&demo_job()).unwrap();
        assert_eq!(outcome.rendered.layers.len(), outcome.map.layers.len());
        assert!(outcome.rendered.layer(HAZARD_LAYER).is_some());
        assert!(outcome.exported.is_none());
    }

    #[test]
    fn job_exports_into_new_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("out");
        let mut job = demo_job();
        job.export = Some((out.clone(), ExportOptions::default()));
        let outcome = run_job(&job).unwrap();
        assert!(outcome.exported.unwrap() > 0);
        assert!(out.is_dir());
    }

    #[test]
    fn editing_the_project_marks_inputs_changed() {
        let mut gui = FloodGui::default();
        assert!(gui.inputs_changed());
        gui.start_run(false);
        assert!(!gui.inputs_changed());

        gui.project.push_str("-copy");
        assert!(gui.inputs_changed());
        gui.project = DEFAULT_PROJECT.to_string();
        assert!(!gui.inputs_changed());

        gui.params.threshold_db -= 1.0;
        assert!(gui.inputs_changed());
    }

    #[test]
    fn inverted_window_is_reported() {
        let mut job = demo_job();
        std::mem::swap(&mut job.params.flood.start, &mut job.params.flood.end);
        assert!(matches!(run_job(&job), Err(GuiError::Flood(_))));
    }

    #[test]
    fn custom_size_must_be_positive() {
        let mut gui = FloodGui::default();
        gui.size_mode = SizeMode::Custom;
        gui.custom_size = "0".to_string();
        assert!(matches!(gui.size_option(), Err(GuiError::ZeroSize { size: 0 })));
        gui.custom_size = "abc".to_string();
        assert!(matches!(gui.size_option(), Err(GuiError::InvalidSize { .. })));
        gui.size_mode = SizeMode::Predefined(512);
        assert_eq!(gui.size_option().unwrap(), Some(512));
    }
}
