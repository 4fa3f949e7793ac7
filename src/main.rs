use iced::widget::{button, column, container, row, scrollable, text, text_input, Column};
use iced::{Alignment, Element, Length, Task, Theme};
use iced_aw::Wrap;
use std::collections::BTreeMap;
use std::sync::Arc;

mod commerce;
mod config;
mod dom;
mod state;
mod ui;

use commerce::{submit_quick_add, AnalyticsSink, CartService, CartSummary, LogAnalytics};
use config::StorefrontConfig;
use dom::Document;
use state::cart::CartStore;
use state::catalog::Catalog;
use state::data::Product;
use ui::images;
use ui::modal::{self, Modal, Transition};
use ui::product_card::{self, Action, CardProps, ProductCard};

/// Identifies a mounted product card
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct CardId(u64);

/// The search dialog: a modal holding a query box and result cards
struct SearchOverlay {
    modal: Modal,
    query: String,
    results: Vec<CardId>,
}

/// Main application state
struct Storefront {
    config: StorefrontConfig,
    /// Product records from disk
    catalog: Catalog,
    cart: Arc<dyn CartService>,
    analytics: Arc<dyn AnalyticsSink>,
    /// Render tree used for modal event targeting
    document: Document,
    /// Every mounted card, featured grid and search results alike
    cards: BTreeMap<CardId, ProductCard<Message>>,
    featured: Vec<CardId>,
    search: Option<SearchOverlay>,
    next_card: u64,
    /// Current location (e.g., "/" or "/products/linen-shirt")
    route: String,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// Something happened on a card
    Card(CardId, product_card::Message),
    /// Something happened on the search dialog
    Modal(modal::Event),
    OpenSearch,
    SearchChanged(String),
    CloseSearch,
    /// Background cart write finished
    CartUpdated(Result<CartSummary, String>),
}

impl Storefront {
    /// Create a new instance of the application
    fn new(config: StorefrontConfig, catalog: Catalog, cart: CartStore) -> (Self, Task<Message>) {
        let mut status = if catalog.is_empty() {
            format!(
                "No products yet. Add product JSON files to {}",
                config.catalog_dir.display()
            )
        } else {
            format!("{} products in catalog.", catalog.len())
        };
        if catalog.skipped_files() > 0 {
            status.push_str(&format!(
                " {} catalog file(s) could not be read.",
                catalog.skipped_files()
            ));
        }

        let mut storefront = Storefront {
            config,
            catalog,
            cart: Arc::new(cart),
            analytics: Arc::new(LogAnalytics),
            document: Document::new(),
            cards: BTreeMap::new(),
            featured: Vec::new(),
            search: None,
            next_card: 0,
            route: "/".to_string(),
            status,
        };

        let featured = storefront.catalog.featured(storefront.config.featured_limit);
        let props = storefront.card_props(None);
        let (ids, task) = storefront.mount_cards(featured, props);
        storefront.featured = ids;

        log::info!("Storefront ready with {} featured cards", storefront.featured.len());

        (storefront, task)
    }

    fn card_props(&self, on_click: Option<Message>) -> CardProps<Message> {
        CardProps {
            label: None,
            loading: self.config.loading,
            quick_add: self.config.quick_add,
            on_click,
            new_arrival_window: self.config.new_arrival_window(),
        }
    }

    /// Mount one card per product; products that can't be shown are skipped
    fn mount_cards(
        &mut self,
        products: Vec<Product>,
        props: CardProps<Message>,
    ) -> (Vec<CardId>, Task<Message>) {
        let mut ids = Vec::new();
        let mut tasks = Vec::new();

        for product in products {
            let handle = product.handle.clone();
            let Some(card) = ProductCard::new(Some(product), props.clone()) else {
                log::warn!("Product {} has no variants, not shown", handle);
                continue;
            };

            let id = CardId(self.next_card);
            self.next_card += 1;

            let action = card.mount();
            self.cards.insert(id, card);
            tasks.push(self.perform(id, action));
            ids.push(id);
        }

        (ids, Task::batch(tasks))
    }

    /// Drop cards; late image loads for them become no-ops
    fn unmount_cards(&mut self, ids: &[CardId]) {
        for id in ids {
            self.cards.remove(id);
        }
    }

    fn navigate(&mut self, path: String) {
        log::info!("Navigate: {} -> {}", self.route, path);
        self.route = path;
    }

    fn close_search(&mut self) {
        if let Some(mut search) = self.search.take() {
            search.modal.close();
            self.unmount_cards(&search.results);
            search.modal.unmount();
        }
    }

    /// Carry out a side effect requested by a card
    fn perform(&mut self, id: CardId, action: Action<Message>) -> Task<Message> {
        match action {
            Action::None => Task::none(),
            Action::Navigate { path, then } => {
                self.navigate(path);
                match then {
                    Some(message) => self.update(message),
                    None => Task::none(),
                }
            }
            Action::LoadImage { slot, path } => Task::perform(images::load(path), move |result| {
                Message::Card(id, product_card::Message::ImageLoaded(slot, result))
            }),
            Action::QuickAdd(request) => Task::perform(
                submit_quick_add(request, self.cart.clone(), self.analytics.clone()),
                |result| Message::CartUpdated(result.map_err(|e| e.to_string())),
            ),
        }
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Card(id, message) => {
                let Some(card) = self.cards.get_mut(&id) else {
                    log::debug!("Dropping {:?} for unmounted card", message);
                    return Task::none();
                };
                log::trace!("Card {}: {:?}", card.product().handle, message);
                let action = card.update(message);
                self.perform(id, action)
            }
            Message::Modal(modal::Event::PointerDown(target)) => {
                let transition = self
                    .search
                    .as_mut()
                    .map(|search| search.modal.dispatch_pointer_down(target));
                if transition == Some(Transition::Closed) {
                    self.close_search();
                }
                Task::none()
            }
            Message::Modal(modal::Event::CloseRequested) => {
                let cancel = self
                    .search
                    .as_mut()
                    .and_then(|search| search.modal.activate_close());
                if let Some(link) = cancel {
                    self.close_search();
                    self.navigate(link);
                }
                Task::none()
            }
            Message::OpenSearch => {
                if self.search.is_none() {
                    let root = self.document.root();
                    let modal = Modal::mount(&self.document, root, self.route.clone());
                    self.search = Some(SearchOverlay {
                        modal,
                        query: String::new(),
                        results: Vec::new(),
                    });
                }
                Task::none()
            }
            Message::SearchChanged(query) => {
                let Some(search) = self.search.as_mut() else {
                    return Task::none();
                };
                let previous = std::mem::take(&mut search.results);
                self.unmount_cards(&previous);

                let products = self.catalog.search(&query);
                let props = self.card_props(Some(Message::CloseSearch));
                let (ids, task) = self.mount_cards(products, props);

                if let Some(search) = self.search.as_mut() {
                    search.query = query;
                    search.results = ids;
                }
                task
            }
            Message::CloseSearch => {
                self.close_search();
                Task::none()
            }
            Message::CartUpdated(Ok(summary)) => {
                let added = summary
                    .updated
                    .iter()
                    .map(|line| format!("{} (now {})", line.merchandise_id, line.quantity))
                    .collect::<Vec<_>>()
                    .join(", ");
                self.status = format!(
                    "Added {}. {} item(s) across {} line(s) in cart.",
                    added, summary.total_quantity, summary.line_count
                );
                Task::none()
            }
            Message::CartUpdated(Err(e)) => {
                log::error!("Cart update failed: {}", e);
                self.status = format!("Could not add to cart: {}", e);
                Task::none()
            }
        }
    }

    fn grid<'a>(&'a self, ids: &[CardId]) -> Element<'a, Message> {
        let cards = ids
            .iter()
            .filter_map(|id| {
                let id = *id;
                self.cards
                    .get(&id)
                    .map(|card| card.view().map(move |message| Message::Card(id, message)))
            })
            .collect();

        Wrap::with_elements(cards).spacing(16.0).line_spacing(16.0).into()
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let header = row![
            text("Storefront").size(32),
            container(text(&self.route).size(14)).width(Length::Fill),
            button("Search").on_press(Message::OpenSearch).padding(10),
        ]
        .spacing(20)
        .align_y(Alignment::Center);

        let page: Column<Message> = column![
            header,
            text(&self.status).size(16),
            scrollable(self.grid(&self.featured)).height(Length::Fill),
        ]
        .spacing(20)
        .padding(40);

        let Some(search) = &self.search else {
            return page.into();
        };

        let results = column![
            text_input("Search products", &search.query)
                .on_input(Message::SearchChanged)
                .padding(10),
            scrollable(self.grid(&search.results)).height(Length::Fixed(480.0)),
        ]
        .spacing(16);

        search.modal.view(page, results, Message::Modal)
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn main() -> iced::Result {
    let config = StorefrontConfig::load();
    let filter = config
        .as_ref()
        .map(|c| c.log_filter.clone())
        .unwrap_or_else(|_| "info".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let config = config.unwrap_or_else(|e| {
        log::warn!("{}; using defaults", e);
        StorefrontConfig::default()
    });

    let catalog = Catalog::load_dir(&config.catalog_dir).unwrap_or_else(|e| {
        log::warn!("{}", e);
        Catalog::default()
    });

    // The app can still browse without a persistent cart
    let cart = CartStore::open(&config.database_path)
        .or_else(|e| {
            log::warn!("Cart database unavailable ({}), using an in-memory cart", e);
            CartStore::open_in_memory()
        })
        .expect("Failed to initialize cart database");

    iced::application("Storefront", Storefront::update, Storefront::view)
        .theme(Storefront::theme)
        .centered()
        .run_with(move || Storefront::new(config, catalog, cart))
}
