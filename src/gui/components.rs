use super::models::{FloodGui, SizeMode};
use crate::render::palette::Palette;
use crate::{DespeckleMode, OutputFormat, Region};
use eframe::egui::{
    self, Align, Color32, ComboBox, DragValue, Frame, Layout, RichText, Slider, TextureOptions, Ui,
};
use egui_extras::DatePickerButton;

const COMPONENT_HEIGHT: f32 = 80.0;
const COMPONENT_WIDTH: f32 = 120.0;
const PATH_COLOR: Color32 = Color32::from_rgb(255, 165, 0);
const HINT_COLOR: Color32 = Color32::from_gray(120);

fn hint(ui: &mut Ui, text: &str) {
    ui.label(RichText::new(text).color(HINT_COLOR).size(11.0));
}

fn to_color32(rgb: crate::render::palette::Rgb) -> Color32 {
    Color32::from_rgb(rgb.r, rgb.g, rgb.b)
}

pub struct RegionComponent;

impl RegionComponent {
    pub fn render(ui: &mut Ui, app: &mut FloodGui) {
        ui.heading("Region");

        Frame::NONE.inner_margin(0.0).show(ui, |ui| {
            ui.set_min_width(COMPONENT_WIDTH);
            ui.horizontal(|ui| {
                ui.label("Select a region:");
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    ComboBox::from_id_salt("region")
                        .selected_text(app.params.region.shape_name())
                        .show_ui(ui, |ui| {
                            for region in Region::ALL {
                                ui.selectable_value(
                                    &mut app.params.region,
                                    region,
                                    region.shape_name(),
                                );
                            }
                        });
                });
            });
        });
    }
}

pub struct DatesComponent;

impl DatesComponent {
    fn date_row(ui: &mut Ui, label: &str, id: &str, date: &mut chrono::NaiveDate) {
        ui.horizontal(|ui| {
            ui.label(label);
            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                ui.add(DatePickerButton::new(date).id_salt(id));
            });
        });
    }

    pub fn render(ui: &mut Ui, app: &mut FloodGui) {
        ui.heading("Dates");

        Frame::NONE.inner_margin(0.0).show(ui, |ui| {
            ui.set_min_height(COMPONENT_HEIGHT);
            ui.set_min_width(COMPONENT_WIDTH);

            Self::date_row(ui, "Good Date:", "good_date", &mut app.params.baseline.start);
            Self::date_row(ui, "Flood Date:", "flood_date", &mut app.params.baseline.end);
            hint(ui, "Dry-season baseline, from Good Date up to Flood Date.");

            ui.add_space(6.0);

            Self::date_row(ui, "Flood Start:", "flood_start", &mut app.params.flood.start);
            Self::date_row(ui, "Flood End:", "flood_end", &mut app.params.flood.end);
            hint(ui, "Window expected to contain the flood.");

            if let Err(e) = app.params.validate() {
                ui.add_space(4.0);
                ui.label(RichText::new(e.to_string()).color(Color32::from_rgb(255, 100, 100)));
            }
        });
    }
}

pub struct ClassificationComponent;

impl ClassificationComponent {
    pub fn render(ui: &mut Ui, app: &mut FloodGui) {
        ui.heading("Classification");

        Frame::NONE.inner_margin(0.0).show(ui, |ui| {
            ui.set_min_width(COMPONENT_WIDTH);

            ui.horizontal(|ui| {
                ui.label("Water threshold:");
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    ui.add(
                        Slider::new(&mut app.params.threshold_db, -30.0..=-10.0)
                            .suffix(" dB")
                            .step_by(0.5),
                    );
                });
            });
            hint(ui, "VH backscatter below the threshold is classified as water.");

            ui.add_space(6.0);

            ui.horizontal(|ui| {
                ui.label("Despeckle:");
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    ComboBox::from_id_salt("despeckle")
                        .selected_text(app.params.despeckle.to_string())
                        .show_ui(ui, |ui| {
                            ui.selectable_value(
                                &mut app.params.despeckle,
                                DespeckleMode::Lee,
                                "Lee",
                            );
                            ui.selectable_value(
                                &mut app.params.despeckle,
                                DespeckleMode::PassThrough,
                                "Pass-through",
                            );
                        });
                });
            });

            ui.add_space(6.0);

            ui.horizontal(|ui| {
                ui.label("Distance neighborhood:");
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    ui.add(
                        DragValue::new(&mut app.params.distance_neighborhood)
                            .range(1..=4096)
                            .suffix(" px"),
                    );
                });
            });
        });
    }
}

pub struct DatasetComponent;

impl DatasetComponent {
    pub fn render(ui: &mut Ui, app: &mut FloodGui) {
        ui.heading("Dataset");

        Frame::NONE.inner_margin(0.0).show(ui, |ui| {
            ui.set_min_width(COMPONENT_WIDTH);

            ui.horizontal(|ui| {
                ui.label("Project:");
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    ui.text_edit_singleline(&mut app.project);
                });
            });

            ui.horizontal(|ui| {
                ui.label("Catalog Directory:");
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    if ui.button("Browse").clicked() {
                        app.select_catalog_directory();
                    }
                    if app.catalog_dir.is_some() && ui.button("Demo").clicked() {
                        app.catalog_dir = None;
                        app.last_run_params = None;
                    }
                });
            });

            match &app.catalog_dir {
                Some(path) => {
                    ui.label(RichText::new(path.to_string_lossy()).color(PATH_COLOR));
                }
                None => hint(ui, "None selected, using the synthetic dataset"),
            }
        });
    }
}

pub struct ExportComponent;

impl ExportComponent {
    pub fn render(ui: &mut Ui, app: &mut FloodGui) {
        ui.heading("Export");

        Frame::NONE.inner_margin(0.0).show(ui, |ui| {
            ui.set_min_width(COMPONENT_WIDTH);

            ui.horizontal(|ui| {
                ui.label("Output Directory:");
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    if ui.button("Browse").clicked() {
                        app.select_output_directory();
                    }
                });
            });
            match &app.output_dir_path {
                Some(path) => {
                    ui.label(RichText::new(path.to_string_lossy()).color(PATH_COLOR));
                }
                None => {
                    ui.label(RichText::new("None selected").color(HINT_COLOR));
                }
            }

            ui.add_space(6.0);

            ui.horizontal(|ui| {
                ui.label("Format:");
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    ComboBox::from_id_salt("output_format")
                        .selected_text(format!("{:?}", app.output_format))
                        .show_ui(ui, |ui| {
                            ui.selectable_value(&mut app.output_format, OutputFormat::TIFF, "TIFF");
                            ui.selectable_value(&mut app.output_format, OutputFormat::JPEG, "JPEG");
                        });
                });
            });

            if app.output_format == OutputFormat::JPEG {
                ui.horizontal(|ui| {
                    ui.label("Size:");
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        let selected = match app.size_mode {
                            SizeMode::Original => "Original".to_string(),
                            SizeMode::Predefined(size) => size.to_string(),
                            SizeMode::Custom => "Custom".to_string(),
                        };
                        ComboBox::from_id_salt("output_size")
                            .selected_text(selected)
                            .show_ui(ui, |ui| {
                                ui.selectable_value(
                                    &mut app.size_mode,
                                    SizeMode::Original,
                                    "Original",
                                );
                                for size in [512, 1024, 2048] {
                                    ui.selectable_value(
                                        &mut app.size_mode,
                                        SizeMode::Predefined(size),
                                        size.to_string(),
                                    );
                                }
                                ui.selectable_value(&mut app.size_mode, SizeMode::Custom, "Custom");
                            });
                    });
                });
                if app.size_mode == SizeMode::Custom {
                    ui.horizontal(|ui| {
                        ui.label("Custom size:");
                        ui.text_edit_singleline(&mut app.custom_size);
                    });
                }
                hint(ui, "Long side of the JPEG outputs. GeoTIFF layers keep native resolution.");
            }

            ui.add_space(6.0);

            let can_export = app.output_dir_path.is_some() && !app.is_processing;
            if ui
                .add_enabled(can_export, egui::Button::new("Export Layers"))
                .clicked()
            {
                app.start_run(true);
            }
        });
    }
}

pub struct LayersComponent;

impl LayersComponent {
    pub fn render(ui: &mut Ui, app: &mut FloodGui) {
        ui.heading("Layers");

        let Some(rendered) = &app.rendered else {
            hint(ui, "No map yet");
            return;
        };

        for (i, layer) in rendered.layers.iter().enumerate() {
            let Some(visible) = app.layer_visible.get_mut(i) else {
                continue;
            };
            ui.horizontal(|ui| {
                if ui.checkbox(visible, layer.name.as_str()).changed() {
                    app.texture_dirty = true;
                }
                if let Ok(palette) = Palette::parse(layer.vis.palette.as_slice()) {
                    for color in palette.colors() {
                        let (rect, _) =
                            ui.allocate_exact_size(egui::vec2(10.0, 10.0), egui::Sense::hover());
                        ui.painter().rect_filled(rect, 1.0, to_color32(*color));
                    }
                }
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    let range = match (layer.stats.min, layer.stats.max) {
                        (Some(min), Some(max)) => format!("{:.1} .. {:.1}", min, max),
                        _ => "empty".to_string(),
                    };
                    ui.label(RichText::new(range).color(HINT_COLOR).size(11.0));
                });
            });
        }
    }
}

pub struct MapComponent;

impl MapComponent {
    fn refresh_texture(ui: &mut Ui, app: &mut FloodGui) {
        app.texture_dirty = false;
        let Some(rendered) = &app.rendered else {
            app.map_texture = None;
            return;
        };
        match rendered.composite(Some(&app.layer_visible)) {
            Ok(Some(rgba)) => {
                let image = egui::ColorImage::from_rgba_unmultiplied(
                    [rgba.width, rgba.height],
                    &rgba.pixels,
                );
                app.map_texture = Some(ui.ctx().load_texture(
                    "flood_map",
                    image,
                    TextureOptions::NEAREST,
                ));
            }
            Ok(None) => app.map_texture = None,
            Err(e) => {
                tracing::error!("Failed to composite map: {}", e);
                app.map_texture = None;
            }
        }
    }

    pub fn render(ui: &mut Ui, app: &mut FloodGui) {
        if app.texture_dirty {
            Self::refresh_texture(ui, app);
        }

        if let Some(rendered) = &app.rendered {
            ui.horizontal(|ui| {
                ui.label(
                    RichText::new(format!(
                        "{}  centre ({:.4}, {:.4})  zoom {}",
                        app.params.region.shape_name(),
                        rendered.view.center.0,
                        rendered.view.center.1,
                        rendered.view.zoom
                    ))
                    .color(HINT_COLOR),
                );
                if let Some((baseline, flood)) = app.scene_counts {
                    ui.separator();
                    ui.label(
                        RichText::new(format!("scenes: baseline {}, flood {}", baseline, flood))
                            .color(HINT_COLOR),
                    );
                }
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    if ui.button("Save Map").clicked() {
                        if let Err(e) = app.save_map_image() {
                            tracing::error!("Failed to save map: {}", e);
                        }
                    }
                });
            });
        }

        match &app.map_texture {
            Some(texture) => {
                let [w, h] = texture.size();
                let available = ui.available_size();
                let scale = (available.x / w as f32).min(available.y / h as f32).max(0.1);
                ui.centered_and_justified(|ui| {
                    ui.add(egui::Image::from_texture(egui::load::SizedTexture::new(
                        texture.id(),
                        egui::vec2(w as f32 * scale, h as f32 * scale),
                    )));
                });
            }
            None => {
                ui.centered_and_justified(|ui| {
                    let text = if app.is_processing {
                        "Computing map..."
                    } else {
                        "No visible layers"
                    };
                    ui.label(RichText::new(text).color(HINT_COLOR).size(16.0));
                });
            }
        }
    }
}

pub struct FooterComponent;

impl FooterComponent {
    pub fn render(ui: &mut Ui, app: &mut FloodGui) {
        app.update_system_stats();

        ui.horizontal(|ui| {
            let status_color = if app.is_processing {
                Color32::from_rgb(255, 165, 0)
            } else {
                Color32::from_rgb(100, 200, 100)
            };

            let timing_text = if app.is_processing {
                match app.processing_start_time {
                    Some(start_time) => format!("Processing: {:.2?}", start_time.elapsed()),
                    None => "Processing...".to_string(),
                }
            } else if let Some(duration) = app.last_processing_duration {
                format!("Last run: {:.2?}", duration)
            } else {
                app.status_message.clone()
            };

            ui.label(RichText::new(timing_text).color(status_color).size(14.0));

            ui.separator();

            let cpu_color = if app.cpu_usage > 80.0 {
                Color32::from_rgb(255, 100, 100)
            } else if app.cpu_usage > 50.0 {
                Color32::from_rgb(255, 165, 0)
            } else {
                Color32::from_rgb(100, 200, 100)
            };
            ui.label(
                RichText::new(format!("CPU: {:.1}%", app.cpu_usage))
                    .color(cpu_color)
                    .size(12.0),
            );

            ui.separator();

            let memory_percent = if app.total_memory_mb > 0.0 {
                (app.memory_usage_mb / app.total_memory_mb) * 100.0
            } else {
                0.0
            };
            let memory_color = if memory_percent > 80.0 {
                Color32::from_rgb(255, 100, 100)
            } else if memory_percent > 60.0 {
                Color32::from_rgb(255, 165, 0)
            } else {
                Color32::from_rgb(100, 200, 100)
            };
            ui.label(
                RichText::new(format!(
                    "RAM: {:.1} GB / {:.1} GB ({:.1}%)",
                    app.memory_usage_mb / 1024.0,
                    app.total_memory_mb / 1024.0,
                    memory_percent
                ))
                .color(memory_color)
                .size(12.0),
            );

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                if ui.button("To CLI").clicked() {
                    let cli_entry = crate::gui::logging::LogEntry::new(
                        tracing::Level::INFO,
                        format!("CLI Command: {}", app.generate_cli_command()),
                        "cli".to_string(),
                    );
                    if let Ok(mut logs) = app.log_messages.lock() {
                        logs.push(cli_entry);
                    }
                }

                if ui.button("Save Preset").clicked() {
                    if let Err(e) = app.save_preset() {
                        tracing::error!("Failed to save preset: {}", e);
                    }
                }

                if ui.button("Load Preset").clicked() {
                    if let Err(e) = app.load_preset() {
                        tracing::error!("Failed to load preset: {}", e);
                    }
                }

                if ui.button("Save Logs").clicked() {
                    if let Err(e) = app.save_logs_to_file() {
                        tracing::error!("Failed to save logs: {}", e);
                    }
                }

                if ui.button("Clear").clicked() {
                    if let Ok(mut logs) = app.log_messages.lock() {
                        logs.clear();
                    }
                }

                if ui.button("Reset").clicked() {
                    app.reset();
                }
            });
        });
    }
}
