use chrono::NaiveDate;
use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::data::calendar::month_name;
use crate::pipeline::{ParamKind, ParamSpec, ParamValue};
use crate::state::{AppState, Tab};

// ---------------------------------------------------------------------------
// Left side panel – challenge selector and parameter widgets
// ---------------------------------------------------------------------------

/// Render the left panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Challenge");
    ui.separator();

    let entries: Vec<(String, String, String)> = state
        .gallery
        .pipelines()
        .iter()
        .map(|p| (p.id().to_string(), p.title().to_string(), p.source_url().to_string()))
        .collect();
    let current = entries
        .iter()
        .find(|(id, _, _)| *id == state.selected)
        .cloned()
        .unwrap_or_default();

    let mut chosen = None;
    egui::ComboBox::from_id_salt("challenge")
        .width(ui.available_width())
        .selected_text(&current.0)
        .show_ui(ui, |ui: &mut Ui| {
            for (id, title, _) in &entries {
                if ui
                    .selectable_label(*id == state.selected, format!("{id}  {title}"))
                    .clicked()
                {
                    chosen = Some(id.clone());
                }
            }
        });
    if let Some(id) = chosen {
        state.select(&id);
    }
    ui.label(RichText::new(&current.1).strong());
    ui.hyperlink_to("Challenge write-up", &current.2);

    ui.add_space(8.0);
    ui.heading("Parameters");
    ui.separator();

    let specs = state.param_specs();
    if specs.is_empty() {
        ui.label("This challenge has no parameters.");
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for spec in &specs {
                let mut value = state.param_value(spec);
                ui.strong(spec.label);
                if param_widget(ui, spec, &mut value) {
                    state.set_param(spec.name, value);
                }
                ui.add_space(4.0);
            }
        });
}

/// Draw the widget for one parameter; `true` once an edit is committed.
fn param_widget(ui: &mut Ui, spec: &ParamSpec, value: &mut ParamValue) -> bool {
    match (&spec.kind, value) {
        (ParamKind::Month, ParamValue::Int(month)) => {
            let before = *month;
            egui::ComboBox::from_id_salt(spec.name)
                .selected_text(month_name(*month as u32, true))
                .show_ui(ui, |ui: &mut Ui| {
                    for m in 1..=12 {
                        ui.selectable_value(month, m, month_name(m as u32, true));
                    }
                });
            *month != before
        }
        (ParamKind::Count, ParamValue::Int(n)) => ui
            .add(egui::DragValue::new(n).range(1..=52))
            .changed(),
        (ParamKind::Year(options), ParamValue::Int(year)) => {
            let before = *year;
            egui::ComboBox::from_id_salt(spec.name)
                .selected_text(year.to_string())
                .show_ui(ui, |ui: &mut Ui| {
                    for &option in options {
                        ui.selectable_value(year, option, option.to_string());
                    }
                });
            *year != before
        }
        (ParamKind::Years(options), ParamValue::IntSet(selected)) => {
            let mut changed = false;
            ui.horizontal_wrapped(|ui: &mut Ui| {
                for &option in options {
                    let mut checked = selected.contains(&option);
                    if ui.checkbox(&mut checked, option.to_string()).changed() {
                        toggle(selected, option, checked);
                        changed = true;
                    }
                }
            });
            changed
        }
        (ParamKind::Labels(options), ParamValue::TextSet(selected)) => {
            let mut changed = false;
            for option in options {
                let mut checked = selected.contains(option);
                if ui.checkbox(&mut checked, option).changed() {
                    toggle(selected, option.clone(), checked);
                    changed = true;
                }
            }
            changed
        }
        (ParamKind::Text, ParamValue::Text(text)) => {
            let response = ui.text_edit_singleline(text);
            response.lost_focus()
        }
        (ParamKind::Date { min, max }, ParamValue::Date(date)) => {
            let before = *date;
            ui.add(DatePickerButton::new(date).id_salt(spec.name));
            *date = clamp_date(*date, *min, *max);
            ui.label(RichText::new(format!("{min} to {max}")).small().weak());
            *date != before
        }
        (ParamKind::Choice(options), ParamValue::Text(choice)) => {
            let before = choice.clone();
            egui::ComboBox::from_id_salt(spec.name)
                .selected_text(choice.as_str())
                .show_ui(ui, |ui: &mut Ui| {
                    for option in options {
                        ui.selectable_value(choice, option.clone(), option);
                    }
                });
            *choice != before
        }
        (_, value) => {
            ui.label(RichText::new(value.to_string()).weak());
            false
        }
    }
}

fn toggle<T: Ord>(set: &mut std::collections::BTreeSet<T>, item: T, on: bool) {
    if on {
        set.insert(item);
    } else {
        set.remove(&item);
    }
}

fn clamp_date(date: NaiveDate, min: NaiveDate, max: NaiveDate) -> NaiveDate {
    date.clamp(min, max.max(min))
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open data folder…").clicked() {
                open_folder_dialog(state);
                ui.close_menu();
            }
            if ui.button("Reload this challenge's data").clicked() {
                state.reload_selected();
                ui.close_menu();
            }
            if ui.button("Reload all datasets").clicked() {
                state.reload();
                ui.close_menu();
            }
        });

        ui.separator();
        ui.selectable_value(&mut state.tab, Tab::Chart, "Chart");
        ui.selectable_value(&mut state.tab, Tab::Data, "Data");
        ui.separator();

        let datasets = state.gallery.datasets();
        ui.label(format!("Data: {}", datasets.data_dir().display()));
        if !datasets.is_empty() {
            ui.label(format!("({} loaded)", datasets.len()));
        }
        if let Some(evaluation) = &state.evaluation {
            ui.separator();
            ui.label(format!("{} derived rows", evaluation.table.len()));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Folder dialog
// ---------------------------------------------------------------------------

pub fn open_folder_dialog(state: &mut AppState) {
    let folder = rfd::FileDialog::new()
        .set_title("Open challenge data folder")
        .set_directory(state.gallery.datasets().data_dir())
        .pick_folder();

    if let Some(path) = folder {
        log::info!("Switching data folder to {}", path.display());
        state.set_data_dir(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_are_kept_inside_their_bounds() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert_eq!(clamp_date(d(2013, 5, 1), d(2014, 2, 1), d(2017, 12, 30)), d(2014, 2, 1));
        assert_eq!(clamp_date(d(2018, 5, 1), d(2014, 2, 1), d(2017, 12, 30)), d(2017, 12, 30));
        assert_eq!(clamp_date(d(2016, 5, 1), d(2014, 2, 1), d(2017, 12, 30)), d(2016, 5, 1));
    }

    #[test]
    fn toggling_adds_and_removes() {
        let mut set = std::collections::BTreeSet::from([2014, 2015]);
        toggle(&mut set, 2016, true);
        toggle(&mut set, 2014, false);
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![2015, 2016]);
    }
}
