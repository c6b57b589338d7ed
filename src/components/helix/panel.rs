//! On-screen controls drawn with egui.
//!
//! Three small areas around the canvas: a speed slider along the bottom, a
//! complexity toggle in the top-right corner and a `?` badge on the right
//! edge whose hover card lists every control.

use super::{Complexity, KEY_HELP, SLIDER_MAX_SPEED, SLIDER_STEP};

/// What the user changed this pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PanelActions {
    pub speed: Option<f32>,
    pub toggle_complexity: bool,
}

pub fn show(ctx: &egui::Context, speed: f32, complexity: Complexity) -> PanelActions {
    let mut actions = PanelActions::default();

    egui::Area::new(egui::Id::new("helix_speed"))
        .anchor(egui::Align2::CENTER_BOTTOM, [0.0, -16.0])
        .show(ctx, |ui| {
            let mut value = speed;
            // Faster-than-slider speeds set from the keyboard stay untouched
            let slider = egui::Slider::new(&mut value, 0.0..=SLIDER_MAX_SPEED)
                .step_by(SLIDER_STEP as f64)
                .clamping(egui::SliderClamping::Edits)
                .show_value(false);
            if ui.add(slider).on_hover_text("Rotation speed").changed() {
                actions.speed = Some(value);
            }
        });

    egui::Area::new(egui::Id::new("helix_complexity"))
        .anchor(egui::Align2::RIGHT_TOP, [-16.0, 16.0])
        .show(ctx, |ui| {
            let (glyph, hint) = match complexity {
                Complexity::High => ("●", "Switch to Simple"),
                Complexity::Low => ("○", "Switch to Complex"),
            };
            if ui.button(glyph).on_hover_text(hint).clicked() {
                actions.toggle_complexity = true;
            }
        });

    egui::Area::new(egui::Id::new("helix_help"))
        .anchor(egui::Align2::RIGHT_CENTER, [-32.0, 0.0])
        .show(ctx, |ui| {
            let badge = egui::Label::new(egui::RichText::new("?").strong())
                .sense(egui::Sense::hover());
            ui.add(badge).on_hover_ui(|ui| {
                ui.strong("Controls");
                egui::Grid::new("helix_help_grid").striped(true).show(ui, |ui| {
                    for (input, action) in KEY_HELP {
                        ui.monospace(*input);
                        ui.label(*action);
                        ui.end_row();
                    }
                });
            });
        });

    actions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(speed: f32, complexity: Complexity) -> PanelActions {
        let ctx = egui::Context::default();
        let mut actions = PanelActions::default();
        // Two passes so areas have a measured size
        for _ in 0..2 {
            let _ = ctx.run(egui::RawInput::default(), |ctx| {
                actions = show(ctx, speed, complexity);
            });
        }
        actions
    }

    #[test]
    fn test_idle_panel_changes_nothing() {
        assert_eq!(run(0.5, Complexity::High), PanelActions::default());
        // A keyboard speed past the slider's range is left alone
        assert_eq!(run(3.0, Complexity::Low), PanelActions::default());
    }
}
