use ratatui::Frame;

use crate::{
    app::{App, AppState},
    ui::{render_exercise, render_settings, render_watching},
};

/// A UI screen boundary: responsible for rendering one app state
pub trait Screen {
    fn render(&self, app: &App, f: &mut Frame);
}

/// The video with its progress, countdown and key legend
pub struct WatchingScreen;

impl Screen for WatchingScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        render_watching(app, f.area(), f.buffer_mut());
    }
}

/// Modal dialog over the paused video
pub struct ExerciseScreen;

impl Screen for ExerciseScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        render_exercise(app, f.area(), f.buffer_mut());
    }
}

pub struct SettingsScreen;

impl Screen for SettingsScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        render_settings(app, f.area(), f.buffer_mut());
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: AppState) -> Box<dyn Screen> {
    match state {
        AppState::Watching => Box::new(WatchingScreen),
        AppState::Exercise => Box::new(ExerciseScreen),
        AppState::Settings => Box::new(SettingsScreen),
    }
}
