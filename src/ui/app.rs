// Main window - Stands in for the song form that hosts the metronome

use crate::audio::AudioEngine;
use crate::audio::clock::SampleClock;
use crate::audio::parameters::{AtomicBackendStatus, AtomicF32, BackendStatus};
use crate::messaging::channels::NotificationConsumer;
use crate::messaging::notification::{Notification, NotificationCategory, NotificationLevel};
use crate::metronome::{Metronome, TickDriver};
use crate::sequencer::tempo::{BeatsPerCycle, Subdivision};
use crate::sound::SoundStatus;
use crate::sound::source::ClickOutput;
use eframe::egui;
use ringbuf::traits::Consumer;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub type SharedMetronome = Arc<Mutex<Metronome<SampleClock, ClickOutput>>>;

const BPM_STEPS: [i32; 4] = [1, 2, 5, 10];

pub struct MetronomeApp {
    metronome: SharedMetronome,
    driver: TickDriver,
    // Keeps the output stream alive
    _engine: Option<AudioEngine>,
    volume_atomic: AtomicF32,
    volume_ui: f32,
    backend_status: AtomicBackendStatus,
    bpm_text: String,
    // Time base for taps
    opened_at: Instant,
    notification_rx: NotificationConsumer,
    notification_queue: VecDeque<Notification>,
    max_notifications: usize,
    driver_failure_reported: bool,
}

impl MetronomeApp {
    pub fn new(
        metronome: SharedMetronome,
        driver: TickDriver,
        engine: Option<AudioEngine>,
        volume_atomic: AtomicF32,
        backend_status: AtomicBackendStatus,
        notification_rx: NotificationConsumer,
    ) -> Self {
        let bpm_text = metronome
            .lock()
            .map(|m| m.bpm().get().to_string())
            .unwrap_or_default();

        Self {
            metronome,
            driver,
            _engine: engine,
            volume_ui: volume_atomic.get(),
            volume_atomic,
            backend_status,
            bpm_text,
            opened_at: Instant::now(),
            notification_rx,
            notification_queue: VecDeque::new(),
            max_notifications: 10,
            driver_failure_reported: false,
        }
    }

    fn notify(&mut self, notification: Notification) {
        self.notification_queue.push_back(notification);
        if self.notification_queue.len() > self.max_notifications {
            self.notification_queue.pop_front();
        }
    }

    fn update_notifications(&mut self) {
        while let Some(notification) = self.notification_rx.try_pop() {
            self.notify(notification);
        }
    }

    fn recent_notifications(&self) -> Vec<&Notification> {
        self.notification_queue
            .iter()
            .rev()
            .filter(|n| n.is_recent(5000))
            .take(3)
            .collect()
    }

    fn now_ms(&self) -> f64 {
        self.opened_at.elapsed().as_secs_f64() * 1000.0
    }

    fn tap(&mut self, metronome: &mut Metronome<SampleClock, ClickOutput>) {
        if let Some(bpm) = metronome.register_tap(self.now_ms()) {
            self.bpm_text = bpm.get().to_string();
        }
    }

    fn draw_transport(&mut self, ui: &mut egui::Ui, metronome: &mut Metronome<SampleClock, ClickOutput>) {
        ui.horizontal(|ui| {
            let running = metronome.is_running();
            let label = if running { "■ Stop" } else { "▶ Start" };
            if ui
                .add(egui::Button::new(label).min_size(egui::vec2(90.0, 32.0)))
                .clicked()
            {
                if running {
                    metronome.stop();
                } else if !metronome.start() {
                    self.notify(Notification::warning(
                        NotificationCategory::Audio,
                        "Audio output not ready yet, press Start again".to_string(),
                    ));
                }
            }

            if ui
                .add(egui::Button::new("Tap").min_size(egui::vec2(90.0, 32.0)))
                .on_hover_text("Space bar")
                .clicked()
            {
                self.tap(metronome);
            }

            if let Some(estimate) = metronome.last_tap_estimate() {
                ui.label(format!("Tapped: {}", estimate));
            }
        });
    }

    fn draw_tempo(&mut self, ui: &mut egui::Ui, metronome: &mut Metronome<SampleClock, ClickOutput>) {
        ui.horizontal(|ui| {
            ui.label("BPM:");

            for step in BPM_STEPS.iter().rev() {
                if ui.button(format!("-{}", step)).clicked() {
                    self.bpm_text = metronome.adjust_bpm(-step).get().to_string();
                }
            }

            let response = ui.add(egui::TextEdit::singleline(&mut self.bpm_text).desired_width(48.0));
            if response.lost_focus() {
                match metronome.set_bpm_text(&self.bpm_text) {
                    Some(bpm) => self.bpm_text = bpm.get().to_string(),
                    None => {
                        self.notify(Notification::warning(
                            NotificationCategory::Tempo,
                            format!("\"{}\" is not a tempo", self.bpm_text.trim()),
                        ));
                        self.bpm_text = metronome.bpm().get().to_string();
                    }
                }
            }

            for step in BPM_STEPS {
                if ui.button(format!("+{}", step)).clicked() {
                    self.bpm_text = metronome.adjust_bpm(step).get().to_string();
                }
            }
        });

        let tempo = metronome.tempo();
        ui.horizontal(|ui| {
            ui.label("Time signature:");

            let mut beats = tempo.beats_per_cycle.get();
            let mut subdivision = tempo.subdivision;

            egui::ComboBox::from_id_salt("beats_per_cycle")
                .selected_text(beats.to_string())
                .width(48.0)
                .show_ui(ui, |ui| {
                    for value in BeatsPerCycle::MIN..=BeatsPerCycle::MAX {
                        ui.selectable_value(&mut beats, value, value.to_string());
                    }
                });
            ui.label("/");
            egui::ComboBox::from_id_salt("subdivision")
                .selected_text(subdivision.value().to_string())
                .width(48.0)
                .show_ui(ui, |ui| {
                    for value in Subdivision::ALL {
                        ui.selectable_value(&mut subdivision, value, value.value().to_string());
                    }
                });

            if beats != tempo.beats_per_cycle.get() || subdivision != tempo.subdivision {
                metronome.set_time_signature(beats as i64, subdivision);
            }
        });

        ui.horizontal(|ui| {
            let mut accent = tempo.accent_first_beat;
            if ui.checkbox(&mut accent, "Accent first beat").changed() {
                metronome.set_accent_first_beat(accent);
            }

            let mut muted = tempo.muted;
            if ui.checkbox(&mut muted, "Mute").changed() {
                metronome.set_muted(muted);
            }
        });

        ui.horizontal(|ui| {
            ui.label("Volume:");
            if ui.add(egui::Slider::new(&mut self.volume_ui, 0.0..=1.0)).changed() {
                self.volume_atomic.set(self.volume_ui);
            }
        });
    }

    fn draw_pulse_lamps(ui: &mut egui::Ui, metronome: &mut Metronome<SampleClock, ClickOutput>) {
        let beats = metronome.tempo().beats_per_cycle.get();
        let pulse = metronome.pulse();

        ui.horizontal(|ui| {
            for index in 0..beats {
                let (rect, _) = ui.allocate_exact_size(egui::vec2(28.0, 28.0), egui::Sense::hover());
                let lit = pulse.filter(|p| p.beat_index == index);
                let color = match lit {
                    Some(p) if p.accented => egui::Color32::from_rgb(255, 140, 0),
                    Some(_) => egui::Color32::from_rgb(80, 200, 120),
                    None => egui::Color32::from_gray(60),
                };
                ui.painter().circle_filled(rect.center(), 11.0, color);
            }
        });
    }

    fn draw_status_bar(&self, ui: &mut egui::Ui, sound_status: &SoundStatus) {
        ui.separator();
        ui.horizontal(|ui| {
            let (status_text, status_color) = match self.backend_status.get() {
                BackendStatus::Running => ("●", egui::Color32::GREEN),
                BackendStatus::Starting => ("●", egui::Color32::YELLOW),
                BackendStatus::Unavailable => ("○", egui::Color32::GRAY),
                BackendStatus::Error => ("●", egui::Color32::RED),
            };
            ui.colored_label(status_color, status_text);
            ui.label(sound_status.label());
            ui.add_space(10.0);

            let recent = self.recent_notifications();
            if recent.is_empty() {
                ui.label("Ready");
            }
            for notification in recent {
                let (icon, color) = match notification.level {
                    NotificationLevel::Info => ("ℹ", egui::Color32::from_rgb(100, 150, 255)),
                    NotificationLevel::Warning => ("⚠", egui::Color32::from_rgb(255, 165, 0)),
                    NotificationLevel::Error => ("✖", egui::Color32::RED),
                };
                ui.colored_label(color, icon);
                ui.colored_label(color, &notification.message);
                ui.add_space(10.0);
            }
        });
    }
}

impl eframe::App for MetronomeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Lamps need redraws at pulse resolution
        ctx.request_repaint_after(Duration::from_millis(16));
        self.update_notifications();

        let metronome = Arc::clone(&self.metronome);
        let Ok(mut metronome) = metronome.lock() else {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.colored_label(egui::Color32::RED, "Metronome state is corrupted, restart the app");
            });
            return;
        };

        let now_ms = self.now_ms();
        metronome.expire_taps(now_ms);

        let space_tap = !ctx.wants_keyboard_input() && ctx.input(|i| i.key_pressed(egui::Key::Space));
        if space_tap {
            self.tap(&mut metronome);
        }

        if !self.driver.is_running() && !self.driver_failure_reported {
            self.driver_failure_reported = true;
            self.notify(Notification::error(
                NotificationCategory::Generic,
                "Tick driver stopped".to_string(),
            ));
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Band Metronome");
            ui.label(metronome.tempo().signature_label());
            ui.separator();

            self.draw_transport(ui, &mut metronome);
            ui.add_space(10.0);
            self.draw_tempo(ui, &mut metronome);
            ui.add_space(10.0);
            Self::draw_pulse_lamps(ui, &mut metronome);

            ui.add_space(10.0);
            let sound_status = metronome.sound_status().clone();
            self.draw_status_bar(ui, &sound_status);
        });
    }
}
