use eframe::egui;

use crate::config::Config;
use crate::state::{AppState, Tab};
use crate::ui::{panels, plot, table};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct WowApp {
    pub state: AppState,
}

impl WowApp {
    pub fn new(config: &Config) -> Self {
        Self {
            state: AppState::new(config),
        }
    }
}

impl eframe::App for WowApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: challenge and parameters ----
        egui::SidePanel::left("param_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: chart or derived table ----
        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(evaluation) = &self.state.evaluation else {
                ui.centered_and_justified(|ui| {
                    ui.heading("No result – see the message above");
                });
                return;
            };
            match self.state.tab {
                Tab::Chart => plot::chart(ui, &evaluation.chart),
                Tab::Data => table::derived_table(ui, &evaluation.table),
            }
        });
    }
}
