use gtk::prelude::*;
use gtk::{Label, ListBox, Orientation};
use log::error;
use std::cell::RefCell;
use std::rc::Rc;

use crate::narrative::{NarrativeCard, PanelState, PanelView};

/// Renders panel states into the sidebar list.
pub struct ListPanelView {
    list: ListBox,
    on_retry: RefCell<Option<Rc<dyn Fn()>>>,
}

impl ListPanelView {
    pub fn new(list: ListBox) -> Self {
        Self {
            list,
            on_retry: RefCell::new(None),
        }
    }

    pub fn set_retry_handler(&self, handler: impl Fn() + 'static) {
        *self.on_retry.borrow_mut() = Some(Rc::new(handler));
    }

    fn clear(&self) {
        while let Some(child) = self.list.first_child() {
            self.list.remove(&child);
        }
    }

    fn append_message(&self, text: &str) {
        let label = Label::builder()
            .label(text)
            .wrap(true)
            .margin_top(12)
            .margin_bottom(12)
            .build();
        self.list.append(&label);
    }

    fn append_error(&self, message: &str, retryable: bool) {
        let card = gtk::Box::builder()
            .orientation(Orientation::Vertical)
            .spacing(8)
            .margin_top(4)
            .margin_bottom(4)
            .margin_start(6)
            .margin_end(6)
            .build();
        card.add_css_class("narrative-error-card");

        let message_label = Label::builder()
            .label(message)
            .wrap(true)
            .xalign(0.0)
            .margin_top(8)
            .margin_start(10)
            .margin_end(10)
            .build();
        card.append(&message_label);

        let actions = gtk::Box::builder()
            .orientation(Orientation::Horizontal)
            .spacing(6)
            .halign(gtk::Align::End)
            .margin_bottom(8)
            .margin_end(10)
            .build();

        if retryable {
            if let Some(on_retry) = self.on_retry.borrow().clone() {
                let retry_button = gtk::Button::builder().label("Try again").build();
                retry_button.add_css_class("suggested-action");
                retry_button.connect_clicked(move |_| on_retry());
                actions.append(&retry_button);
            }
        }

        let dismiss_button = gtk::Button::builder()
            .icon_name("window-close-symbolic")
            .tooltip_text("Dismiss")
            .build();
        dismiss_button.add_css_class("flat");
        let list = self.list.clone();
        let card_weak = card.downgrade();
        dismiss_button.connect_clicked(move |_| {
            if let Some(card) = card_weak.upgrade() {
                // ListBox wraps children in a row.
                if let Some(row) = card.parent() {
                    list.remove(&row);
                }
            }
        });
        actions.append(&dismiss_button);

        card.append(&actions);
        self.list.append(&card);
    }
}

impl PanelView for ListPanelView {
    fn render(&self, state: &PanelState) {
        self.clear();

        match state {
            PanelState::Empty => {}
            PanelState::Loading => {
                self.append_message("Loading...");
            }
            PanelState::Populated(articles) => {
                for article in articles {
                    let card = create_narrative_card(&NarrativeCard::from_article(article));
                    self.list.append(&card);
                }
            }
            PanelState::Error { message, retryable } => {
                self.append_error(message, *retryable);
            }
        }
    }
}

fn create_narrative_card(narrative: &NarrativeCard) -> gtk::Box {
    let card = gtk::Box::builder()
        .orientation(Orientation::Vertical)
        .spacing(0)
        .margin_top(4)
        .margin_bottom(4)
        .margin_start(6)
        .margin_end(6)
        .build();
    card.add_css_class("news-article-card");

    let content_box = gtk::Box::builder()
        .orientation(Orientation::Vertical)
        .spacing(6)
        .margin_top(8)
        .margin_bottom(8)
        .margin_start(10)
        .margin_end(10)
        .build();

    let title_label = Label::builder()
        .label(&narrative.title)
        .wrap(true)
        .wrap_mode(gtk::pango::WrapMode::Word)
        .xalign(0.0)
        .lines(2)
        .ellipsize(gtk::pango::EllipsizeMode::End)
        .build();
    title_label.add_css_class("article-title");
    content_box.append(&title_label);

    let badges_box = gtk::Box::builder()
        .orientation(Orientation::Horizontal)
        .spacing(4)
        .build();

    let source_badge = Label::builder().label(&narrative.source).build();
    source_badge.add_css_class("badge");
    source_badge.add_css_class("badge-source");
    badges_box.append(&source_badge);

    if !narrative.date.is_empty() {
        let date_badge = Label::builder().label(&narrative.date).build();
        date_badge.add_css_class("badge");
        date_badge.add_css_class("badge-time");
        badges_box.append(&date_badge);
    }

    content_box.append(&badges_box);

    if !narrative.excerpt.is_empty() {
        let excerpt_label = Label::builder()
            .label(&narrative.excerpt)
            .wrap(true)
            .wrap_mode(gtk::pango::WrapMode::WordChar)
            .xalign(0.0)
            .build();
        excerpt_label.add_css_class("article-excerpt");
        content_box.append(&excerpt_label);
    }

    if !narrative.url.is_empty() {
        let read_button = gtk::Button::builder()
            .label("Read full article")
            .halign(gtk::Align::Start)
            .build();
        read_button.add_css_class("flat");
        read_button.add_css_class("article-link");

        let url = narrative.url.clone();
        read_button.connect_clicked(move |_| {
            if let Err(e) = open::that(&url) {
                error!("Failed to open URL {}: {}", url, e);
            }
        });
        content_box.append(&read_button);
    }

    card.append(&content_box);
    card
}
