use egui::Context as EguiContext;
use glam::Vec3;
use glint_common::Color;
use glint_input::CAMERA_HELP;
use glint_settings::settings::{MODEL_SCALE_MIN, MODEL_SCALE_SLIDER_MAX};
use glint_settings::{
    EnvironmentType, HDR_OPTIONS, PANORAMA_OPTIONS, PanoramaType, SHADOW_COLOR_PRESETS, Setting,
    StudioPreset, hdr_label,
};

use crate::state::{Tab, Viewer};

/// Draw the cog button, the settings window and the drop zone.
pub fn draw(viewer: &mut Viewer, ctx: &EguiContext) {
    if viewer.scene().cursor_visible && !ctx.is_pointer_over_area() {
        ctx.set_cursor_icon(egui::CursorIcon::PointingHand);
    }

    egui::Area::new(egui::Id::new("settings_cog"))
        .anchor(egui::Align2::RIGHT_TOP, [-12.0, 12.0])
        .show(ctx, |ui| {
            if ui.button("⚙").on_hover_text("Settings (Tab)").clicked() {
                viewer.panel_open = !viewer.panel_open;
            }
        });

    if viewer.panel_open {
        let mut open = true;
        egui::Window::new("Settings")
            .open(&mut open)
            .anchor(egui::Align2::RIGHT_TOP, [-12.0, 48.0])
            .default_width(300.0)
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    for tab in Tab::ALL {
                        ui.selectable_value(&mut viewer.tab, tab, tab.label());
                    }
                });
                ui.separator();
                match viewer.tab {
                    Tab::Model => model_tab(viewer, ui),
                    Tab::Environment => environment_tab(viewer, ui),
                    Tab::Lighting => lighting_tab(viewer, ui),
                    Tab::Effects => effects_tab(viewer, ui),
                    Tab::Camera => camera_tab(viewer, ui),
                }
                ui.separator();
                let path = viewer.settings_path().display().to_string();
                if ui
                    .button("Save Settings (Ctrl+S)")
                    .on_hover_text(path)
                    .clicked()
                {
                    viewer.save_settings();
                }
            });
        viewer.panel_open = open;
    }

    if viewer.model().is_none() || viewer.hovering_file {
        drop_zone(viewer, ctx);
    }
}

fn toggle(viewer: &mut Viewer, ui: &mut egui::Ui, setting: Setting) {
    let mut value = viewer.settings.get(setting);
    if ui.checkbox(&mut value, setting.label()).changed() {
        viewer.settings.set(setting, value);
    }
}

fn color_row(ui: &mut egui::Ui, label: &str, color: Color) -> Option<Color> {
    ui.horizontal(|ui| {
        ui.label(label);
        let mut rgb = color.to_rgb8();
        let changed = ui.color_edit_button_srgb(&mut rgb).changed();
        ui.monospace(color.to_hex());
        changed.then(|| Color::from_rgb8(rgb[0], rgb[1], rgb[2]))
    })
    .inner
}

fn model_tab(viewer: &mut Viewer, ui: &mut egui::Ui) {
    ui.label("Model Scale");
    ui.horizontal(|ui| {
        let mut scale = viewer.settings.model_scale;
        let slider = egui::Slider::new(&mut scale, MODEL_SCALE_MIN..=MODEL_SCALE_SLIDER_MAX)
            .show_value(false);
        if ui.add(slider).changed() {
            viewer.settings.set_model_scale(scale);
        }
        let response =
            ui.add(egui::TextEdit::singleline(&mut viewer.scale_text).desired_width(56.0));
        if response.lost_focus() {
            let text = viewer.scale_text.clone();
            if !viewer.settings.set_model_scale_str(&text) {
                viewer.scale_text = format!("{:.2}", viewer.settings.model_scale);
            }
        }
    });
    toggle(viewer, ui, Setting::Cursor);

    let Some(position) = viewer.model().map(|m| m.position) else {
        ui.weak("Drop a .glb file to load a model");
        return;
    };
    if viewer.settings.enable_cursor {
        let mut pos = position.to_array();
        ui.label("Position:");
        ui.horizontal(|ui| {
            ui.add(egui::DragValue::new(&mut pos[0]).prefix("X: ").speed(0.1));
            ui.add(egui::DragValue::new(&mut pos[1]).prefix("Y: ").speed(0.1));
            ui.add(egui::DragValue::new(&mut pos[2]).prefix("Z: ").speed(0.1));
        });
        viewer.set_model_position(Vec3::from_array(pos));
    }
    if let Some(model) = viewer.model() {
        let summary = model.asset.summary();
        ui.separator();
        ui.label(format!("{} ({} triangles)", summary.name, summary.triangles));
        if let Some(clip) = summary.animations.first() {
            ui.small(format!("Playing: {clip}"));
        }
    }
}

fn environment_tab(viewer: &mut Viewer, ui: &mut egui::Ui) {
    toggle(viewer, ui, Setting::Environment);
    ui.add_enabled_ui(viewer.settings.ground_projection_available(), |ui| {
        toggle(viewer, ui, Setting::GroundProjection);
    });

    let panorama = viewer.settings.enable_panorama;
    ui.add_enabled_ui(!panorama, |ui| {
        ui.horizontal(|ui| {
            let current = viewer.settings.environment_type;
            for (ty, label) in [(EnvironmentType::Hdr, "HDR"), (EnvironmentType::Studio, "Studio")] {
                if ui.selectable_label(current == ty, label).clicked() {
                    viewer.settings.set_environment_type(ty);
                }
            }
        });
        match viewer.settings.environment_type {
            EnvironmentType::Hdr => {
                let selected = viewer.settings.selected_hdr.clone();
                egui::ComboBox::from_label("HDR")
                    .selected_text(hdr_label(&selected))
                    .show_ui(ui, |ui| {
                        for file in HDR_OPTIONS {
                            if ui.selectable_label(selected == *file, hdr_label(file)).clicked() {
                                if let Err(e) = viewer.settings.select_hdr(file) {
                                    tracing::warn!("{e}");
                                }
                            }
                        }
                    });
            }
            EnvironmentType::Studio => {
                let current = viewer.settings.studio_preset;
                egui::ComboBox::from_label("Preset")
                    .selected_text(current.label())
                    .show_ui(ui, |ui| {
                        for preset in StudioPreset::ALL {
                            if ui.selectable_label(current == preset, preset.label()).clicked() {
                                viewer.settings.set_studio_preset(preset);
                            }
                        }
                    });
            }
        }
    });

    ui.separator();
    toggle(viewer, ui, Setting::Panorama);
    if panorama {
        ui.horizontal(|ui| {
            let current = viewer.settings.panorama_type;
            for (ty, label) in [
                (PanoramaType::Environment, "Environment"),
                (PanoramaType::Sphere, "Sphere"),
            ] {
                if ui.selectable_label(current == ty, label).clicked() {
                    viewer.settings.set_panorama_type(ty);
                }
            }
        });
        let selected = viewer.settings.selected_panorama.clone();
        egui::ComboBox::from_label("Image")
            .selected_text(selected.as_str())
            .show_ui(ui, |ui| {
                for file in PANORAMA_OPTIONS {
                    if ui.selectable_label(selected == *file, *file).clicked() {
                        if let Err(e) = viewer.settings.select_panorama(file) {
                            tracing::warn!("{e}");
                        }
                    }
                }
            });
    }

    ui.separator();
    if let Some(color) = color_row(ui, "Background", viewer.settings.background_color) {
        viewer.settings.set_background_color(color);
    }
}

fn lighting_tab(viewer: &mut Viewer, ui: &mut egui::Ui) {
    toggle(viewer, ui, Setting::Lighting);
    if viewer.settings.enable_lighting {
        if let Some(color) = color_row(ui, "Light Color", viewer.settings.light_color) {
            viewer.settings.set_light_color(color);
        }
        let mut intensity = viewer.settings.light_intensity;
        if ui
            .add(egui::Slider::new(&mut intensity, 0.0..=20.0).text("Intensity"))
            .changed()
        {
            viewer.settings.set_light_intensity(intensity);
        }
    }

    ui.separator();
    toggle(viewer, ui, Setting::AccumulativeShadows);
    if viewer.settings.enable_accumulative_shadows {
        if let Some(color) = color_row(ui, "Shadow Color", viewer.settings.shadow_color) {
            if let Err(e) = viewer.settings.set_shadow_color(&color.to_hex()) {
                tracing::warn!("{e}");
            }
        }
        ui.horizontal(|ui| {
            ui.label("Hex");
            let response =
                ui.add(egui::TextEdit::singleline(&mut viewer.shadow_hex).desired_width(72.0));
            if response.lost_focus() {
                viewer.commit_shadow_hex();
            }
        });
        ui.horizontal_wrapped(|ui| {
            for (index, preset) in SHADOW_COLOR_PRESETS.iter().enumerate() {
                let [r, g, b] = preset.color().to_rgb8();
                let swatch = egui::Button::new(
                    egui::RichText::new(preset.name).color(egui::Color32::WHITE),
                )
                .fill(egui::Color32::from_rgb(r, g, b));
                if ui.add(swatch).clicked() {
                    if let Err(e) = viewer.settings.apply_shadow_preset(index) {
                        tracing::warn!("{e}");
                    }
                }
            }
        });
    }
}

fn effects_tab(viewer: &mut Viewer, ui: &mut egui::Ui) {
    for setting in [
        Setting::PostProcessing,
        Setting::Ssr,
        Setting::Rings,
        Setting::Bloom,
        Setting::StandardFloor,
        Setting::ReflectiveFloor,
    ] {
        toggle(viewer, ui, setting);
    }
}

fn camera_tab(viewer: &mut Viewer, ui: &mut egui::Ui) {
    toggle(viewer, ui, Setting::FirstPersonCamera);
    ui.separator();
    for line in CAMERA_HELP {
        ui.small(line);
    }
    if ui.button("Reset Camera (R)").clicked() {
        viewer.reset_camera();
    }
}

fn drop_zone(viewer: &Viewer, ctx: &EguiContext) {
    egui::Area::new(egui::Id::new("drop_zone"))
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .interactable(false)
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                ui.set_min_width(320.0);
                ui.vertical_centered(|ui| {
                    if viewer.hovering_file {
                        ui.heading("Release to load");
                    } else {
                        ui.heading("Drop a .glb file here");
                    }
                    if let Some(status) = &viewer.status {
                        ui.colored_label(egui::Color32::LIGHT_RED, status);
                    }
                });
            });
        });
}
