mod api;
mod camera;
mod config;
mod data;
mod features;
mod hit_test;
mod map_view;
mod narrative;
mod panel_view;
mod resolver;
mod selection;

use geo::Coord;
use gtk::prelude::*;
use gtk::{glib, Application, Label, ListBox, Orientation, ScrolledWindow};
use libadwaita::{prelude::*, ApplicationWindow, ColorScheme, HeaderBar, StyleManager, ToolbarView};
use log::{error, info};
use std::cell::RefCell;
use std::rc::Rc;

use crate::api::{cache_summary, ApiClient};
use crate::camera::Camera;
use crate::config::Config;
use crate::data::{APP_ID, NO_COUNTRY};
use crate::features::CountryFeature;
use crate::map_view::{connect_pointer, create_map_view, load_feature_store, HighlightLayer, MapCamera};
use crate::narrative::NarrativePanel;
use crate::panel_view::ListPanelView;
use crate::resolver::CountryResolver;
use crate::selection::{SelectionEffects, SelectionMachine};

type Panel = NarrativePanel<ApiClient, ListPanelView>;

fn main() -> glib::ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // reqwest needs a Tokio reactor; futures themselves run on the GTK main context.
    let rt = tokio::runtime::Runtime::new().expect("failed to start Tokio runtime");
    let _guard = rt.enter();

    let config = Rc::new(Config::load());
    info!("Using article backend at {}", config.api_base_url);

    let app = Application::builder()
        .application_id(APP_ID)
        .build();

    app.connect_activate(move |app| build_ui(app, &config));

    app.run()
}

/// Selection side effects routed to the panel and the map camera.
#[derive(Clone)]
struct ShellEffects {
    panel: Rc<Panel>,
    camera: Rc<MapCamera>,
}

impl SelectionEffects for ShellEffects {
    fn load_narratives(&mut self, country_code: &str) {
        spawn_load(&self.panel, country_code.to_string());
    }

    fn clear_narratives(&mut self) {
        self.panel.clear();
    }

    fn fly_to(&mut self, feature: &CountryFeature) {
        match feature.bounds() {
            Some(bounds) => self.camera.fly_to(bounds),
            None => error!("{} has no bounds to fly to", feature.display_name()),
        }
    }

    fn fly_out(&mut self) {
        self.camera.fly_out();
    }
}

/// Starts a load now so a clear issued before the future first runs still wins.
fn spawn_load(panel: &Rc<Panel>, country_code: String) {
    let Some(pending) = panel.begin(&country_code) else {
        return;
    };
    let panel = panel.clone();
    glib::spawn_future_local(async move {
        panel.finish(pending).await;
    });
}

fn build_ui(app: &Application, config: &Config) {
    let style_manager = StyleManager::default();
    style_manager.set_color_scheme(ColorScheme::PreferDark);

    let country_label = Label::builder()
        .label(NO_COUNTRY)
        .build();
    country_label.add_css_class("country-display");

    let refresh_button = gtk::Button::builder()
        .icon_name("view-refresh-symbolic")
        .tooltip_text("Refresh articles")
        .build();

    let header_bar = HeaderBar::builder()
        .build();
    header_bar.pack_start(&refresh_button);
    header_bar.set_title_widget(Some(&country_label));

    let results_list = ListBox::builder()
        .selection_mode(gtk::SelectionMode::None)
        .build();
    results_list.add_css_class("boxed-list");

    let scrolled_window = ScrolledWindow::builder()
        .vexpand(false)
        .hexpand(true)
        .build();

    let scrollbox_content = gtk::Box::builder()
        .orientation(Orientation::Vertical)
        .spacing(12)
        .margin_top(12)
        .margin_bottom(12)
        .margin_start(12)
        .margin_end(12)
        .build();
    scrollbox_content.append(&results_list);
    scrolled_window.set_child(Some(&scrollbox_content));

    let client = ApiClient::new(&config.api_base_url);
    let panel: Rc<Panel> = Rc::new(NarrativePanel::new(
        client.clone(),
        ListPanelView::new(results_list),
        config.article_limit,
    ));

    let store = Rc::new(RefCell::new(load_feature_store(config)));
    info!("Loaded {} countries", store.borrow().len());

    let selection = Rc::new(RefCell::new(SelectionMachine::new(
        CountryResolver::with_overrides(&config.country_codes),
    )));

    // Retry always targets whatever country is displayed when the button is pressed.
    let panel_weak = Rc::downgrade(&panel);
    let selection_for_retry = selection.clone();
    panel.view().set_retry_handler(move || {
        let Some(panel) = panel_weak.upgrade() else {
            return;
        };
        let code = selection_for_retry.borrow().reload_code();
        if let Some(code) = code {
            spawn_load(&panel, code);
        }
    });

    let map_widget: gtk::Widget = match create_map_view(config) {
        Some(view) => {
            let camera = Rc::new(MapCamera::new(&view, config));
            let highlight = Rc::new(HighlightLayer::new(&view));
            let effects = ShellEffects {
                panel: panel.clone(),
                camera,
            };

            let store_for_move = store.clone();
            let selection_for_move = selection.clone();
            let highlight_for_move = highlight.clone();
            let on_move = move |coord: Coord<f64>| {
                let mut store = store_for_move.borrow_mut();
                let mut selection = selection_for_move.borrow_mut();
                selection.pointer_moved(&mut store, coord);
                highlight_for_move.restyle(&store, &selection);
            };

            let store_for_click = store.clone();
            let selection_for_click = selection.clone();
            let country_label_for_click = country_label.clone();
            let on_click = move |coord: Coord<f64>| {
                let mut store = store_for_click.borrow_mut();
                let mut selection = selection_for_click.borrow_mut();
                selection.clicked(&mut store, coord, &mut effects.clone());
                highlight.restyle(&store, &selection);
                country_label_for_click.set_label(selection.state().displayed_label());
            };

            connect_pointer(&view, on_move, on_click);
            view.widget.upcast()
        }
        None => {
            error!("Map widget has no viewport; country selection is unavailable");
            Label::builder()
                .label("Map unavailable")
                .vexpand(true)
                .hexpand(true)
                .build()
                .upcast()
        }
    };

    let selection_for_refresh = selection.clone();
    let panel_for_refresh = panel.clone();
    refresh_button.connect_clicked(move |_| {
        let code = selection_for_refresh.borrow().reload_code();
        let Some(code) = code else {
            info!("Nothing to refresh");
            return;
        };
        let panel = panel_for_refresh.clone();
        glib::spawn_future_local(async move {
            panel.refresh(&code).await;
        });
    });

    let refresh_button_for_status = refresh_button.clone();
    glib::spawn_future_local(async move {
        match client.cache_status().await {
            Ok(status) => {
                let summary = cache_summary(&status);
                info!("{}", summary);
                refresh_button_for_status.set_tooltip_text(Some(format!("Refresh articles\n{}", summary).as_str()));
            }
            Err(e) => error!("Could not read cache status: {}", e),
        }
    });

    let paned = gtk::Paned::builder()
        .orientation(Orientation::Vertical)
        .wide_handle(true)
        .build();

    paned.set_start_child(Some(&scrolled_window));
    paned.set_resize_start_child(false);
    paned.set_shrink_start_child(false);

    paned.set_end_child(Some(&map_widget));
    paned.set_resize_end_child(true);
    paned.set_shrink_end_child(false);

    paned.set_position(200);

    // Side by side on wide windows, stacked otherwise.
    let paned_weak = paned.downgrade();
    paned.add_tick_callback(move |_widget, _clock| {
        if let Some(paned) = paned_weak.upgrade() {
            let width = paned.width();
            let height = paned.height();

            if width > 0 && height > 0 {
                let should_be_horizontal = width > height;
                let is_horizontal = paned.orientation() == Orientation::Horizontal;

                if should_be_horizontal != is_horizontal {
                    if should_be_horizontal {
                        paned.set_orientation(Orientation::Horizontal);
                        paned.set_position(420);
                    } else {
                        paned.set_orientation(Orientation::Vertical);
                        paned.set_position(200);
                    }
                }
            }
        }
        glib::ControlFlow::Continue
    });

    let toolbar_view = ToolbarView::builder()
        .build();

    toolbar_view.add_top_bar(&header_bar);
    toolbar_view.set_content(Some(&paned));

    let window = ApplicationWindow::builder()
        .application(app)
        .title("Narrative Map")
        .default_width(1100)
        .default_height(700)
        .build();

    let css_provider = gtk::CssProvider::new();
    css_provider.load_from_data(
        ".country-display {
            font-size: 13px;
            font-weight: 600;
            padding: 4px 12px;
            background-color: alpha(@accent_bg_color, 0.15);
            border-radius: 6px;
        }
        .news-article-card {
            background-color: @card_bg_color;
            border-radius: 12px;
            overflow: hidden;
            border: 1px solid alpha(@borders, 0.2);
            transition: all 200ms cubic-bezier(0.4, 0, 0.2, 1);
        }
        .news-article-card:hover {
            border-color: alpha(@accent_bg_color, 0.3);
            box-shadow: 0 4px 12px alpha(black, 0.12);
        }
        .narrative-error-card {
            background-color: alpha(@error_bg_color, 0.12);
            border-radius: 12px;
            border: 1px solid alpha(@error_bg_color, 0.35);
        }
        .article-title {
            font-size: 14px;
            font-weight: 600;
            line-height: 1.35;
            color: @window_fg_color;
        }
        .article-excerpt {
            font-size: 12px;
            line-height: 1.4;
            color: alpha(@window_fg_color, 0.75);
        }
        .article-link {
            font-size: 12px;
            color: @accent_color;
        }
        .badge {
            background-color: alpha(@accent_bg_color, 0.15);
            border-radius: 6px;
            padding: 3px 8px;
            font-size: 10px;
            font-weight: 600;
            min-height: 0;
            text-transform: uppercase;
            letter-spacing: 0.5px;
        }
        .badge-source {
            background-color: alpha(@accent_bg_color, 0.25);
            color: @accent_fg_color;
        }
        .badge-time {
            background-color: alpha(@window_fg_color, 0.08);
            color: alpha(@window_fg_color, 0.7);
        }"
    );

    gtk::style_context_add_provider_for_display(
        &gtk::prelude::WidgetExt::display(&window),
        &css_provider,
        gtk::STYLE_PROVIDER_PRIORITY_APPLICATION,
    );

    window.set_content(Some(&toolbar_view));
    window.present();
}
