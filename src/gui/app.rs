use super::components::*;
use super::models::{APP_DESCRIPTION, APP_TITLE, FloodGui};
use crate::gui::logging::{LogEntry, get_log_buffer};
use eframe::egui;
use egui_extras::install_image_loaders;
use tracing::Level;

fn format_log_entry(entry: &LogEntry) -> egui::RichText {
    // Separator entries
    if entry.message.starts_with("---") {
        return egui::RichText::new(&entry.message)
            .color(egui::Color32::from_rgb(255, 165, 0))
            .monospace()
            .strong();
    }

    if entry.target == "cli" {
        return egui::RichText::new(&entry.message)
            .color(egui::Color32::from_rgb(100, 255, 100))
            .monospace()
            .strong();
    }

    let (color, icon) = match entry.level {
        Level::ERROR => (egui::Color32::from_rgb(255, 100, 100), "❌"),
        Level::WARN => (egui::Color32::from_rgb(255, 200, 100), "⚠️"),
        Level::INFO => (egui::Color32::from_rgb(100, 200, 255), "ℹ️"),
        Level::DEBUG => (egui::Color32::from_rgb(150, 150, 150), "🔍"),
        Level::TRACE => (egui::Color32::from_rgb(100, 100, 100), "🔎"),
    };

    let formatted_text = format!(
        "[{}] {} {}: {}",
        entry.timestamp, icon, entry.level, entry.message
    );

    egui::RichText::new(formatted_text).color(color).monospace()
}

impl FloodGui {
    fn drain_log_buffer(&mut self) -> bool {
        let mut new_messages = Vec::new();
        if let Ok(mut buf) = get_log_buffer().lock() {
            new_messages.extend(buf.drain(..));
        }
        if new_messages.is_empty() {
            return false;
        }
        if let Ok(mut logs) = self.log_messages.lock() {
            logs.extend(new_messages);
            let len = logs.len();
            if len > 1000 {
                logs.drain(0..(len - 1000));
            }
        }
        true
    }

    /// Re-runs the pipeline when an input changed since the last run.
    fn maybe_rerun(&mut self) {
        if !self.auto_update || self.is_processing {
            return;
        }
        if !self.inputs_changed() {
            return;
        }
        if self.params.validate().is_err() {
            return;
        }
        self.start_run(false);
    }

    fn log_console(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Log Output");

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.selectable_value(&mut self.min_log_level, Level::ERROR, "ERROR");
                ui.selectable_value(&mut self.min_log_level, Level::WARN, "WARN");
                ui.selectable_value(&mut self.min_log_level, Level::INFO, "INFO");
                ui.selectable_value(&mut self.min_log_level, Level::DEBUG, "DEBUG");
                ui.selectable_value(&mut self.min_log_level, Level::TRACE, "ALL");
            });

            if let Ok(logs) = self.log_messages.lock() {
                let total_logs = logs.len();
                let visible_logs = logs
                    .iter()
                    .filter(|entry| {
                        self.min_log_level == Level::TRACE || entry.level == self.min_log_level
                    })
                    .count();
                if total_logs > 0 {
                    ui.label(format!("({} visible / {} total)", visible_logs, total_logs));
                }
            }
        });

        ui.add_space(5.0);

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                let Ok(logs) = self.log_messages.lock() else {
                    return;
                };
                if logs.is_empty() {
                    ui.centered_and_justified(|ui| {
                        ui.label(
                            egui::RichText::new("No log messages")
                                .color(egui::Color32::from_gray(120)),
                        );
                    });
                    return;
                }
                for entry in logs.iter() {
                    // ALL shows everything, any other level only itself
                    if self.min_log_level == Level::TRACE || entry.level == self.min_log_level {
                        ui.label(format_log_entry(entry));
                    }
                }
            });
    }
}

impl eframe::App for FloodGui {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        static INIT: std::sync::Once = std::sync::Once::new();
        INIT.call_once(|| {
            crate::gui::models::init_gui_logging();
            install_image_loaders(ctx);
        });

        let mut style = (*ctx.style()).clone();
        style.visuals.override_text_color = Some(egui::Color32::from_gray(220));
        style.visuals.widgets.noninteractive.bg_fill = egui::Color32::from_rgb(40, 40, 40);
        style.visuals.widgets.inactive.bg_fill = egui::Color32::from_rgb(50, 50, 50);
        style.visuals.widgets.hovered.bg_fill = egui::Color32::from_rgb(60, 60, 60);
        style.visuals.widgets.active.bg_fill = egui::Color32::from_rgb(70, 70, 70);
        style.visuals.panel_fill = egui::Color32::from_rgb(30, 30, 30);
        style.visuals.window_fill = egui::Color32::from_rgb(25, 25, 25);
        style.visuals.faint_bg_color = egui::Color32::from_rgb(45, 45, 45);
        style.visuals.extreme_bg_color = egui::Color32::from_rgb(20, 20, 20);
        ctx.set_style(style);

        let has_new_logs = self.drain_log_buffer();
        self.poll_completion();
        self.maybe_rerun();
        if has_new_logs || self.is_processing {
            ctx.request_repaint();
        }

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    ui.horizontal(|ui| {
                        ui.label(
                            egui::RichText::new(APP_TITLE)
                                .size(24.0)
                                .color(egui::Color32::from_gray(220))
                                .strong(),
                        );
                        ui.label(
                            egui::RichText::new(format!("v{}", env!("CARGO_PKG_VERSION")))
                                .size(10.0)
                                .color(egui::Color32::from_gray(150)),
                        );
                    });
                    ui.label(
                        egui::RichText::new(APP_DESCRIPTION)
                            .size(12.0)
                            .color(egui::Color32::from_gray(180)),
                    );
                });
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.add_enabled_ui(!self.is_processing, |ui| {
                        if ui
                            .button(
                                egui::RichText::new("Update Map")
                                    .size(16.0)
                                    .color(egui::Color32::WHITE),
                            )
                            .clicked()
                        {
                            self.start_run(false);
                        }
                    });
                    ui.checkbox(&mut self.auto_update, "Auto update");
                });
            });
        });

        egui::TopBottomPanel::bottom("footer").show(ctx, |ui| {
            FooterComponent::render(ui, self);
        });

        egui::TopBottomPanel::bottom("log_panel")
            .resizable(true)
            .default_height(160.0)
            .show(ctx, |ui| {
                self.log_console(ui);
            });

        egui::SidePanel::left("left_panel")
            .resizable(false)
            .default_width(260.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .scroll_bar_visibility(egui::scroll_area::ScrollBarVisibility::AlwaysHidden)
                    .show(ui, |ui| {
                        ui.add_space(10.0);
                        RegionComponent::render(ui, self);
                        ui.separator();
                        DatesComponent::render(ui, self);
                        ui.separator();
                        ClassificationComponent::render(ui, self);
                        ui.separator();
                        DatasetComponent::render(ui, self);
                        ui.separator();
                        ExportComponent::render(ui, self);
                        ui.add_space(20.0);
                    });
            });

        egui::SidePanel::right("layers_panel")
            .resizable(true)
            .default_width(280.0)
            .show(ctx, |ui| {
                ui.add_space(10.0);
                LayersComponent::render(ui, self);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            MapComponent::render(ui, self);
        });
    }
}
