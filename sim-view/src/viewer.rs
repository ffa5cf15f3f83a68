//! Interactive gravity-well particle viewer built with eframe/egui.
//!
//! This module defines [`Viewer`], which owns a [`Simulation`] and
//! implements [`eframe::App`] to drive it once per frame, feed pointer and
//! keyboard input into it, and draw its particles and wells.

use eframe::App;
use glam::Vec2;
use sim_core::{SimConfig, SimError, Simulation, TickReport};

/// Main application state for the interactive viewer.
///
/// [`Viewer`] glues together:
/// - The simulation core: [`Simulation`] and the [`SimConfig`] being edited.
/// - View state (pan/zoom, run/pause).
/// - eframe/egui callbacks for drawing and user interaction.
///
/// The typical per-frame update is:
/// 1. Handle UI interactions / input (spawning, anchor toggle, panning).
/// 2. If `running` is `true`, call [`Viewer::step_once`] with the elapsed
///    frame time.
/// 3. Render the particle trails and wells.
///
/// ### Fields
/// - `sim` - The simulation being displayed.
/// - `cfg_edit` - Configuration edited in the side panel; applied on demand.
/// - `cfg_error` - Message from the last rejected configuration, if any.
///
/// - `running` - Whether the simulation advances every frame.
/// - `zoom` - Zoom factor for world-to-screen coordinate mapping.
/// - `pan` - Screen-space pan offset in pixels.
///
/// - `last_report` - Report of the most recent tick (for the status bar).
/// - `total_absorbed` - Particles absorbed since the last reset.
/// - `last_frame_time` - egui time of the previous frame, for `dt`.
pub struct Viewer {
    sim: Simulation,
    cfg_edit: SimConfig,
    cfg_error: Option<String>,

    running: bool,
    zoom: f32,
    pan: egui::Vec2,

    last_report: TickReport,
    total_absorbed: u64,
    last_frame_time: f64,
}

impl Viewer {
    /// Creates a running viewer around a freshly seeded simulation.
    ///
    /// ### Returns
    /// `Err(SimError::InvalidConfig)` if `cfg` cannot be simulated.
    pub fn new(cfg: SimConfig) -> Result<Self, SimError> {
        let sim = Simulation::new(cfg.clone())?;
        Ok(Self {
            sim,
            cfg_edit: cfg,
            cfg_error: None,
            running: true,
            zoom: 1.0,
            pan: egui::vec2(0.0, 0.0),
            last_report: TickReport::default(),
            total_absorbed: 0,
            last_frame_time: 0.0,
        })
    }

    /// Clears all particles and re-seeds the wells, keeping the configuration.
    fn reset(&mut self) {
        self.sim.reset();
        self.last_report = TickReport::default();
        self.total_absorbed = 0;
    }

    /// Removes every particle but leaves the wells where they are.
    fn clear(&mut self) {
        self.sim.clear_particles();
    }

    /// Rebuilds the simulation from a preset configuration.
    fn load_preset(&mut self, cfg: SimConfig) {
        match Simulation::new(cfg.clone()) {
            Ok(sim) => {
                self.sim = sim;
                self.cfg_edit = cfg;
                self.cfg_error = None;
                self.last_report = TickReport::default();
                self.total_absorbed = 0;
            }
            Err(e) => self.reject_config(e),
        }
    }

    /// Pushes the edited configuration into the running simulation.
    fn apply_config(&mut self) {
        match self.sim.update_config(self.cfg_edit.clone()) {
            Ok(()) => self.cfg_error = None,
            Err(e) => self.reject_config(e),
        }
    }

    fn reject_config(&mut self, e: SimError) {
        log::warn!("configuration rejected: {e}");
        self.cfg_error = Some(e.to_string());
    }

    /// Advances the simulation by a single tick of `dt` frames.
    fn step_once(&mut self, dt: f32) {
        let report = self.sim.step(dt);
        self.total_absorbed += report.absorbed as u64;
        self.last_report = report;
    }

    /// Queues one tick's worth of spawn requests at `world`.
    fn spawn_at(&mut self, world: Vec2) {
        for _ in 0..self.sim.config().spawn_rate {
            if !self.sim.request_spawn(world) {
                break;
            }
        }
    }

    /// Converts a world-space position to screen-space.
    ///
    /// The viewport centre maps to the centre of `rect`; world coordinates
    /// are scaled by `zoom` and offset by `pan`. Both spaces are y-down.
    fn world_to_screen(&self, p: Vec2, rect: egui::Rect) -> egui::Pos2 {
        let center = rect.center();
        let rel = (p - self.sim.config().viewport * 0.5) * self.zoom;
        egui::pos2(center.x + rel.x + self.pan.x, center.y + rel.y + self.pan.y)
    }

    /// Converts a screen-space position back to world-space.
    ///
    /// This is the inverse of [`Viewer::world_to_screen`] (up to floating
    /// point rounding).
    fn screen_to_world(&self, p: egui::Pos2, rect: egui::Rect) -> Vec2 {
        let center = rect.center();
        let rel = Vec2::new(p.x - center.x - self.pan.x, p.y - center.y - self.pan.y) / self.zoom;
        rel + self.sim.config().viewport * 0.5
    }

    /// Helper to draw a labeled `usize` [`egui::DragValue`].
    fn labeled_drag_usize(
        ui: &mut egui::Ui,
        label: &str,
        value: &mut usize,
        range: std::ops::RangeInclusive<usize>,
        speed: f64,
    ) {
        ui.horizontal(|ui| {
            ui.label(label);
            ui.add(egui::DragValue::new(value).range(range).speed(speed));
        });
    }

    /// Helper to draw a labeled `f32` [`egui::DragValue`].
    fn labeled_drag_f32(
        ui: &mut egui::Ui,
        label: &str,
        value: &mut f32,
        range: std::ops::RangeInclusive<f32>,
        speed: f64,
    ) {
        ui.horizontal(|ui| {
            ui.label(label);
            ui.add(egui::DragValue::new(value).range(range).speed(speed));
        });
    }

    /// Builds the top panel UI (run controls, stepping, presets, zoom).
    fn ui_top_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui
                    .button(if self.running { "⏸ Pause" } else { "▶ Run" })
                    .clicked()
                {
                    self.running = !self.running;
                }

                if ui.button("Step").clicked() {
                    self.step_once(1.0);
                }

                if ui.button("Reset").clicked() {
                    self.reset();
                }

                if ui.button("Clear").clicked() {
                    self.clear();
                }

                ui.separator();
                if ui.button("Multi-well").clicked() {
                    self.load_preset(SimConfig::multi_well());
                }
                if ui.button("Single well").clicked() {
                    self.load_preset(SimConfig::single_well());
                }

                ui.separator();
                ui.add(egui::Slider::new(&mut self.zoom, 0.1..=10.0).text("Zoom"));
            });
        });
    }

    /// Builds the bottom status bar (particles, wells, last tick).
    fn ui_status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let r = &self.last_report;
                ui.label(format!("tick = {}", self.sim.tick_count()));
                ui.separator();
                ui.label(format!(
                    "last tick: +{} spawned, -{} absorbed, -{} culled, {} dropped",
                    r.spawned,
                    r.absorbed,
                    r.culled,
                    r.dropped + r.rejected
                ));
                ui.separator();
                ui.label(format!("absorbed = {}", self.total_absorbed));
                ui.label(format!("wells alive = {}", self.sim.wells().alive_count()));
                ui.label(format!(
                    "particles = {} / {}",
                    self.sim.particles().len(),
                    self.sim.particles().capacity()
                ));
            });
        });
    }

    /// Builds the right-hand configuration panel for simulation parameters.
    fn ui_config_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("config_panel")
            .resizable(true)
            .default_width(240.0)
            .show(ctx, |ui| {
                ui.heading("Config");

                ui.separator();
                ui.label("Particles");
                Self::labeled_drag_usize(
                    ui,
                    "max_particles:",
                    &mut self.cfg_edit.max_particles,
                    1..=1_000_000,
                    1000.0,
                );
                Self::labeled_drag_usize(
                    ui,
                    "spawn_rate:",
                    &mut self.cfg_edit.spawn_rate,
                    0..=1000,
                    1.0,
                );
                Self::labeled_drag_f32(
                    ui,
                    "max_speed:",
                    &mut self.cfg_edit.max_speed,
                    0.0..=100.0,
                    0.1,
                );
                Self::labeled_drag_f32(
                    ui,
                    "spawn_jitter:",
                    &mut self.cfg_edit.spawn_jitter,
                    0.0..=50.0,
                    0.1,
                );

                ui.separator();
                ui.label("Wells");
                Self::labeled_drag_f32(
                    ui,
                    "base_force:",
                    &mut self.cfg_edit.base_force,
                    0.0..=100.0,
                    0.1,
                );
                Self::labeled_drag_f32(
                    ui,
                    "base_min_range:",
                    &mut self.cfg_edit.base_min_range,
                    0.5..=200.0,
                    0.5,
                );
                Self::labeled_drag_f32(
                    ui,
                    "mass_increment:",
                    &mut self.cfg_edit.mass_increment,
                    0.0..=0.1,
                    0.0001,
                );
                Self::labeled_drag_usize(
                    ui,
                    "consumer_count:",
                    &mut self.cfg_edit.consumer_count,
                    0..=16,
                    1.0,
                );
                Self::labeled_drag_f32(
                    ui,
                    "well_max_speed:",
                    &mut self.cfg_edit.well_max_speed,
                    0.0..=50.0,
                    0.1,
                );
                Self::labeled_drag_f32(
                    ui,
                    "max_center_force:",
                    &mut self.cfg_edit.max_center_force,
                    0.0..=10.0,
                    0.01,
                );
                ui.checkbox(&mut self.cfg_edit.anchor_captures, "anchor captures particles");

                ui.separator();
                if ui.button("Apply").clicked() {
                    self.apply_config();
                }
                if ui.button("Revert").clicked() {
                    self.cfg_edit = self.sim.config().clone();
                    self.cfg_error = None;
                }
                if let Some(msg) = &self.cfg_error {
                    ui.colored_label(egui::Color32::LIGHT_RED, msg);
                }

                ui.separator();
                ui.label("Hold left button: spawn");
                ui.label("Right drag: pan, wheel: zoom");
                ui.label("T: toggle anchor target");
            });
    }

    /// Builds the central panel where particles and wells are drawn and interacted with.
    fn ui_central_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default()
            .frame(egui::Frame::new().fill(egui::Color32::BLACK))
            .show(ctx, |ui| {
                let response =
                    ui.allocate_response(ui.available_size(), egui::Sense::click_and_drag());
                let rect = response.rect;
                let painter = ui.painter_at(rect);

                // Pan with secondary drag.
                if response.dragged_by(egui::PointerButton::Secondary) {
                    self.pan += response.drag_delta();
                }

                let hover_world = response.hover_pos().map(|p| self.screen_to_world(p, rect));

                // Spawn while the primary button is held over the canvas.
                let primary_down = ctx.input(|i| i.pointer.primary_down());
                if primary_down && let Some(world) = hover_world {
                    self.spawn_at(world);
                }

                if ctx.input(|i| i.key_pressed(egui::Key::T))
                    && let Some(world) = hover_world
                {
                    self.sim.toggle_anchor_target(world);
                }

                // Zoom around the mouse cursor.
                let scroll = ui.ctx().input(|i| i.raw_scroll_delta.y);
                if scroll != 0.0 {
                    let pointer_screen = response.hover_pos().unwrap_or(rect.center());
                    let world_before = self.screen_to_world(pointer_screen, rect);

                    let factor = (1.0 + scroll * 0.001).clamp(0.5, 2.0);
                    self.zoom = (self.zoom * factor).clamp(0.1, 10.0);

                    let screen_after = self.world_to_screen(world_before, rect);
                    self.pan += pointer_screen - screen_after;
                }

                // Auto-run simulation if requested; dt in 60 Hz frames.
                let now = ctx.input(|i| i.time);
                if self.running {
                    let dt = if self.last_frame_time > 0.0 {
                        ((now - self.last_frame_time) * 60.0) as f32
                    } else {
                        1.0
                    };
                    self.step_once(dt);
                    ctx.request_repaint();
                }
                self.last_frame_time = now;

                // Particle trails: one segment from previous to current position.
                let stroke = egui::Stroke::new(1.0, egui::Color32::from_white_alpha(110));
                let shapes: Vec<egui::Shape> = self
                    .sim
                    .segments()
                    .map(|s| {
                        let a = self.world_to_screen(s.prev, rect);
                        let b = self.world_to_screen(s.pos, rect);
                        egui::Shape::line_segment([a, b], stroke)
                    })
                    .collect();
                painter.extend(shapes);

                // Wells, drawn at their absorption radius.
                for w in self.sim.wells().alive() {
                    let p = self.world_to_screen(w.pos, rect);
                    let r = (w.min_range * self.zoom).max(2.0);
                    let color = if w.is_anchor() {
                        egui::Color32::from_rgb(120, 160, 255)
                    } else {
                        egui::Color32::from_rgb(255, 120, 80)
                    };
                    painter.circle_stroke(p, r, egui::Stroke::new(1.5, color));
                }
            });
    }
}

impl App for Viewer {
    /// eframe callback that builds all UI panels for each frame.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ui_top_panel(ctx);
        self.ui_status_bar(ctx);
        self.ui_config_panel(ctx);
        self.ui_central_panel(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn test_rect() -> egui::Rect {
        egui::Rect::from_min_size(egui::Pos2::new(0.0, 0.0), egui::vec2(800.0, 600.0))
    }

    fn test_viewer() -> Viewer {
        Viewer::new(SimConfig {
            seed: Some(3),
            ..SimConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn world_to_screen_and_back_is_roundtrip() {
        let mut viewer = test_viewer();
        // Use non-trivial zoom and pan to exercise the math.
        viewer.zoom = 2.0;
        viewer.pan = egui::vec2(15.0, -7.0);
        let rect = test_rect();

        let world_points = [
            Vec2::new(0.0, 0.0),
            Vec2::new(800.0, 450.0),
            Vec2::new(-3.5, 1208.25),
        ];

        let eps = 1e-3;

        for p in world_points {
            let screen = viewer.world_to_screen(p, rect);
            let back = viewer.screen_to_world(screen, rect);

            assert!(
                (back.x - p.x).abs() < eps && (back.y - p.y).abs() < eps,
                "roundtrip mismatch: p={:?}, back={:?}",
                p,
                back
            );
        }
    }

    #[test]
    fn viewport_centre_maps_to_rect_centre() {
        let viewer = test_viewer();
        let rect = test_rect();
        let screen = viewer.world_to_screen(Vec2::new(800.0, 450.0), rect);
        assert_eq!(screen, rect.center());
    }

    #[test]
    fn new_rejects_invalid_config() {
        let cfg = SimConfig {
            max_particles: 0,
            ..SimConfig::default()
        };
        assert!(Viewer::new(cfg).is_err());
    }

    #[test]
    fn spawn_at_queues_one_tick_of_requests() {
        let mut viewer = test_viewer();
        viewer.spawn_at(Vec2::new(400.0, 300.0));
        assert_eq!(viewer.sim.pending_spawns(), viewer.sim.config().spawn_rate);

        viewer.step_once(1.0);

        assert_eq!(viewer.sim.pending_spawns(), 0);
        assert_eq!(viewer.last_report.spawned, viewer.sim.config().spawn_rate);
        assert_eq!(viewer.sim.particles().len(), viewer.sim.config().spawn_rate);
    }

    #[test]
    fn reset_restores_basic_state() {
        let mut viewer = test_viewer();
        viewer.spawn_at(Vec2::new(400.0, 300.0));
        viewer.step_once(1.0);
        viewer.total_absorbed = 12;

        viewer.reset();

        assert!(viewer.sim.particles().is_empty());
        assert_eq!(viewer.sim.tick_count(), 0);
        assert_eq!(viewer.total_absorbed, 0);
        assert_eq!(viewer.last_report, TickReport::default());
        assert_eq!(
            viewer.sim.wells().alive_count(),
            1 + viewer.sim.config().consumer_count
        );
    }

    #[test]
    fn clear_removes_particles_but_keeps_wells() {
        let mut viewer = test_viewer();
        viewer.spawn_at(Vec2::new(400.0, 300.0));
        viewer.step_once(1.0);
        assert!(!viewer.sim.particles().is_empty());
        let wells_before = viewer.sim.wells().wells.len();

        viewer.clear();

        assert!(viewer.sim.particles().is_empty());
        assert_eq!(viewer.sim.wells().wells.len(), wells_before);
    }

    #[test]
    fn apply_config_reports_invalid_values() {
        let mut viewer = test_viewer();
        viewer.cfg_edit.base_min_range = -1.0;

        viewer.apply_config();

        assert!(viewer.cfg_error.is_some());
        assert_eq!(viewer.sim.config().base_min_range, 15.0);

        viewer.cfg_edit.base_min_range = 20.0;
        viewer.apply_config();
        assert!(viewer.cfg_error.is_none());
        assert_eq!(viewer.sim.config().base_min_range, 20.0);
    }

    #[test]
    fn single_well_preset_replaces_simulation() {
        let mut viewer = test_viewer();
        viewer.load_preset(SimConfig::single_well());

        assert!(viewer.sim.config().anchor_captures);
        assert_eq!(viewer.sim.wells().alive_count(), 1);
        assert_eq!(viewer.cfg_edit, SimConfig::single_well());
    }
}
