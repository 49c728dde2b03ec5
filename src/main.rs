mod gui;

use gui::frontend::TagMapApp;
use log::warn;
use tag_map::graph_utils::scene::GraphScene;
use tag_map::persistence::notes::NoteStore;
use tag_map::persistence::persist;
use tag_map::persistence::settings::AppSettings;

use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let settings = AppSettings::load().unwrap_or_else(|e| {
        warn!("could not load settings, using defaults: {}", e);
        AppSettings::default()
    });
    let tags = match NoteStore::load(&settings.notes_path()) {
        Ok(store) => store.tag_set(),
        Err(e) => {
            warn!("could not read notes from {}: {}", settings.notes_path().display(), e);
            Default::default()
        }
    };
    let layout = persist::load_layout(&settings.layout_path());
    let mut scene = GraphScene::new().with_drag_threshold(settings.drag_threshold);
    scene.reconcile(tags, &layout);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Tag Map")
            .with_inner_size([1000.0, 700.0])
            .with_min_inner_size([800.0, 600.0])
            .with_resizable(true),
        ..Default::default()
    };
    eframe::run_native(
        "Tag-Map",
        options,
        Box::new(move |_cc| Ok(Box::new(TagMapApp::new(scene, settings)) as Box<dyn eframe::App>)),
    )
}
