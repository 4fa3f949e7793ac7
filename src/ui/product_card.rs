/// Hover preview card for a single product
///
/// The card shows the representative variant's photo, title, price and a
/// merchandising label. Hovering swaps in the product's alternate photo,
/// which is decoded in the background the first time it is needed and then
/// kept for the lifetime of the card.
use chrono::{DateTime, Duration, Utc};
use iced::alignment::Horizontal;
use iced::widget::image::Handle;
use iced::widget::{
    button, center, column, container, image, mouse_area, row, stack, text, Space,
};
use iced::{Element, Length, Theme};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::images::ImageLoadError;
use crate::commerce::{AddToCartEvent, AnalyticsProduct, CartLine, QuickAddRequest};
use crate::state::data::{ImageRef, Money, Product, Variant};
use crate::state::placeholder::product_placeholder;

/// Products published within this many days count as new arrivals
pub const DEFAULT_NEW_ARRIVAL_DAYS: i64 = 30;

/// Index of the alternate photo in a product's image list
const SECONDARY_IMAGE_INDEX: usize = 2;

pub const LOADING_TEXT: &str = "Loading...";
pub const FAILED_TEXT: &str = "Image unavailable";

const CARD_WIDTH: f32 = 240.0;
const IMAGE_HEIGHT: f32 = 300.0;

/// How eagerly the primary photo is decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadingHint {
    /// Decode in the background as soon as the card mounts
    Eager,
    /// Let the renderer decode the file on first draw
    #[default]
    Lazy,
}

/// Label shown in the corner of the photo
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardLabel {
    Explicit(String),
    Sale,
    New,
}

impl CardLabel {
    pub fn as_str(&self) -> &str {
        match self {
            CardLabel::Explicit(label) => label,
            CardLabel::Sale => "Sale",
            CardLabel::New => "New",
        }
    }
}

pub fn is_discounted(price: &Money, compare_at_price: Option<&Money>) -> bool {
    compare_at_price.is_some_and(|compare_at| price.amount < compare_at.amount)
}

pub fn is_new_arrival(published_at: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    published_at > now - window
}

/// Pick the card label; the first rule that matches wins:
/// explicit label, discount, new arrival.
pub fn derive_label(
    explicit: Option<&str>,
    product: &Product,
    variant: &Variant,
    now: DateTime<Utc>,
    window: Duration,
) -> Option<CardLabel> {
    if let Some(label) = explicit.filter(|label| !label.is_empty()) {
        Some(CardLabel::Explicit(label.to_string()))
    } else if is_discounted(&variant.price, variant.compare_at_price.as_ref()) {
        Some(CardLabel::Sale)
    } else if is_new_arrival(product.published_at, now, window) {
        Some(CardLabel::New)
    } else {
        None
    }
}

/// Caller-supplied options
#[derive(Debug, Clone)]
pub struct CardProps<M> {
    /// Overrides the derived label when non-empty
    pub label: Option<String>,
    pub loading: LoadingHint,
    pub quick_add: bool,
    /// Emitted after navigation when the card is activated
    pub on_click: Option<M>,
    pub new_arrival_window: Duration,
}

impl<M> Default for CardProps<M> {
    fn default() -> Self {
        Self {
            label: None,
            loading: LoadingHint::default(),
            quick_add: false,
            on_click: None,
            new_arrival_window: Duration::days(DEFAULT_NEW_ARRIVAL_DAYS),
        }
    }
}

/// What the card is showing with respect to the pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hover {
    /// Pointer is elsewhere; primary photo
    NotHovered,
    /// Hovered, alternate photo still decoding
    Loading,
    /// Hovered, alternate photo on screen (primary if there is none)
    Showing,
    /// Hovered, alternate photo could not be loaded
    Failed,
}

/// Per-mount memory of the alternate photo
#[derive(Debug, Clone)]
enum SecondaryImage {
    Unavailable,
    NotRequested,
    InFlight,
    Ready(Handle),
    Failed,
}

#[derive(Debug, Clone)]
enum PrimaryImage {
    Missing,
    Pending,
    Ready(Handle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    Primary,
    Secondary,
}

#[derive(Debug, Clone)]
pub enum Message {
    PointerEntered,
    PointerLeft,
    ImageLoaded(ImageSlot, Result<Handle, ImageLoadError>),
    Activated,
    QuickAdd,
}

/// Side effects requested by the card, carried out by the caller
#[derive(Debug, Clone)]
pub enum Action<M> {
    None,
    Navigate { path: String, then: Option<M> },
    LoadImage { slot: ImageSlot, path: PathBuf },
    QuickAdd(QuickAddRequest),
}

#[derive(Debug)]
pub struct ProductCard<M> {
    product: Product,
    variant: Variant,
    label: Option<CardLabel>,
    props: CardProps<M>,
    hover: Hover,
    primary: PrimaryImage,
    secondary_ref: Option<ImageRef>,
    secondary: SecondaryImage,
}

impl<M: Clone> ProductCard<M> {
    /// Build a card, or `None` when there is nothing purchasable to show.
    ///
    /// A record without a variant list is swapped for the placeholder
    /// product before the check.
    pub fn new(product: Option<Product>, props: CardProps<M>) -> Option<Self> {
        Self::new_at(product, props, Utc::now())
    }

    /// Same as [`ProductCard::new`] with an explicit clock for label derivation
    pub fn new_at(
        product: Option<Product>,
        props: CardProps<M>,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        let product = match product {
            Some(product) if product.variants.is_some() => product,
            _ => product_placeholder(),
        };
        let variant = product.first_variant()?.clone();

        let explicit = props
            .label
            .as_deref()
            .filter(|label| !label.is_empty())
            .or(product.label.as_deref());
        let label = derive_label(explicit, &product, &variant, now, props.new_arrival_window);

        let primary = match (&variant.image, props.loading) {
            (None, _) => PrimaryImage::Missing,
            (Some(_), LoadingHint::Eager) => PrimaryImage::Pending,
            (Some(image), LoadingHint::Lazy) => PrimaryImage::Ready(Handle::from_path(&image.url)),
        };

        let secondary_ref = product
            .images
            .get(SECONDARY_IMAGE_INDEX)
            .or_else(|| product.images.get(1))
            .cloned();
        let secondary = if secondary_ref.is_some() {
            SecondaryImage::NotRequested
        } else {
            SecondaryImage::Unavailable
        };

        Some(Self {
            product,
            variant,
            label,
            props,
            hover: Hover::NotHovered,
            primary,
            secondary_ref,
            secondary,
        })
    }

    /// Work to start once the card is on screen
    pub fn mount(&self) -> Action<M> {
        match (&self.primary, &self.variant.image) {
            (PrimaryImage::Pending, Some(image)) => Action::LoadImage {
                slot: ImageSlot::Primary,
                path: PathBuf::from(&image.url),
            },
            _ => Action::None,
        }
    }

    pub fn update(&mut self, message: Message) -> Action<M> {
        match message {
            Message::PointerEntered => self.pointer_entered(),
            Message::PointerLeft => {
                // Back to the primary photo whatever the load state
                self.hover = Hover::NotHovered;
                Action::None
            }
            Message::ImageLoaded(ImageSlot::Primary, result) => {
                self.primary_loaded(result);
                Action::None
            }
            Message::ImageLoaded(ImageSlot::Secondary, result) => {
                self.secondary_loaded(result);
                Action::None
            }
            Message::Activated => Action::Navigate {
                path: self.product.url(),
                then: self.props.on_click.clone(),
            },
            Message::QuickAdd if self.props.quick_add => {
                Action::QuickAdd(self.quick_add_request())
            }
            Message::QuickAdd => Action::None,
        }
    }

    fn pointer_entered(&mut self) -> Action<M> {
        let (hover, action) = match &self.secondary {
            SecondaryImage::Unavailable | SecondaryImage::Ready(_) => {
                (Hover::Showing, Action::None)
            }
            SecondaryImage::InFlight => (Hover::Loading, Action::None),
            SecondaryImage::Failed => (Hover::Failed, Action::None),
            SecondaryImage::NotRequested => match &self.secondary_ref {
                Some(image) => {
                    self.secondary = SecondaryImage::InFlight;
                    (
                        Hover::Loading,
                        Action::LoadImage {
                            slot: ImageSlot::Secondary,
                            path: PathBuf::from(&image.url),
                        },
                    )
                }
                None => (Hover::Showing, Action::None),
            },
        };

        self.hover = hover;
        action
    }

    fn primary_loaded(&mut self, result: Result<Handle, ImageLoadError>) {
        let PrimaryImage::Pending = self.primary else {
            return;
        };

        self.primary = match result {
            Ok(handle) => PrimaryImage::Ready(handle),
            Err(e) => {
                log::warn!("Eager decode failed, deferring to renderer: {}", e);
                match &self.variant.image {
                    Some(image) => PrimaryImage::Ready(Handle::from_path(&image.url)),
                    None => PrimaryImage::Missing,
                }
            }
        };
    }

    fn secondary_loaded(&mut self, result: Result<Handle, ImageLoadError>) {
        // Only the request this card issued can complete
        let SecondaryImage::InFlight = self.secondary else {
            return;
        };

        match result {
            Ok(handle) => {
                self.secondary = SecondaryImage::Ready(handle);
                if self.hover == Hover::Loading {
                    self.hover = Hover::Showing;
                }
            }
            Err(e) => {
                log::warn!("Alternate photo for {} failed: {}", self.product.handle, e);
                self.secondary = SecondaryImage::Failed;
                if self.hover == Hover::Loading {
                    self.hover = Hover::Failed;
                }
            }
        }
    }

    /// One unit of the representative variant, plus its analytics payload
    pub fn quick_add_request(&self) -> QuickAddRequest {
        let analytics_product = AnalyticsProduct {
            product_gid: self.product.id.clone(),
            variant_gid: self.variant.id.clone(),
            name: self.product.title.clone(),
            variant_name: self.variant.title.clone(),
            brand: self.product.vendor.clone(),
            price: self.variant.price.amount,
            quantity: 1,
        };

        QuickAddRequest {
            lines: vec![CartLine {
                quantity: 1,
                merchandise_id: self.variant.id.clone(),
            }],
            analytics: AddToCartEvent::new(vec![analytics_product]),
        }
    }
}

impl<M> ProductCard<M> {
    pub fn product(&self) -> &Product {
        &self.product
    }

    pub fn label(&self) -> Option<&CardLabel> {
        self.label.as_ref()
    }

    pub fn hover(&self) -> Hover {
        self.hover
    }

    pub fn is_hovered(&self) -> bool {
        self.hover != Hover::NotHovered
    }

    /// Is the loading indicator over the alternate photo visible?
    pub fn is_secondary_loading(&self) -> bool {
        self.hover == Hover::Loading
    }

    /// Is the alternate photo the one on screen?
    pub fn shows_secondary(&self) -> bool {
        self.hover == Hover::Showing && matches!(self.secondary, SecondaryImage::Ready(_))
    }

    fn alt_text(&self, image: Option<&ImageRef>) -> String {
        image
            .and_then(|image| image.alt_text.clone())
            .unwrap_or_else(|| format!("Picture of {}", self.product.title))
    }

    /// Accessible label of the alternate photo
    pub fn secondary_alt(&self) -> String {
        if self.is_secondary_loading() {
            LOADING_TEXT.to_string()
        } else {
            self.alt_text(self.secondary_ref.as_ref())
        }
    }

    /// Text drawn over the photo area.
    ///
    /// Alt text is only shown while no photo is on screen: during a load,
    /// after a failure, or before the primary photo has decoded.
    pub fn cover_text(&self) -> Option<String> {
        match self.hover() {
            Hover::Loading => Some(self.secondary_alt()),
            Hover::Failed => Some(format!(
                "{}: {}",
                FAILED_TEXT,
                self.alt_text(self.secondary_ref.as_ref())
            )),
            _ if self.shows_secondary() => None,
            _ => match self.primary {
                PrimaryImage::Ready(_) => None,
                PrimaryImage::Pending | PrimaryImage::Missing => {
                    Some(self.alt_text(self.variant.image.as_ref()))
                }
            },
        }
    }

    pub fn view(&self) -> Element<'_, Message> {
        let mut media = stack![self.primary_view()];

        // The primary photo stays in the tree underneath; hovering only covers it
        if let (Hover::Showing, SecondaryImage::Ready(handle)) = (self.hover, &self.secondary) {
            media = media.push(photo(handle.clone()));
        }
        if let Some(status) = self.cover_text() {
            media = media.push(cover(status));
        }

        if let Some(label) = self.label() {
            media = media.push(
                container(text(label.as_str()).size(12))
                    .width(Length::Fill)
                    .align_x(Horizontal::Right)
                    .padding(12),
            );
        }

        let mut price = row![text(self.variant.price.display()).size(14)].spacing(12);
        if let Some(compare_at) = self
            .variant
            .compare_at_price
            .as_ref()
            .filter(|compare_at| is_discounted(&self.variant.price, Some(*compare_at)))
        {
            price = price.push(text(compare_at.display()).size(14).style(|theme: &Theme| {
                text::Style {
                    color: Some(theme.extended_palette().background.strong.color),
                }
            }));
        }

        let body = column![media, text(self.product.title.as_str()).size(16), price].spacing(8);

        let mut card = column![button(body)
            .on_press(Message::Activated)
            .padding(0)
            .style(button::text)]
        .spacing(8)
        .width(Length::Fixed(CARD_WIDTH));

        if self.props.quick_add {
            card = card.push(
                button(center(text("Add to Cart").size(14)).height(Length::Shrink))
                    .on_press(Message::QuickAdd)
                    .width(Length::Fill)
                    .style(button::secondary),
            );
        }

        // Outline the card under the pointer
        let hovered = self.is_hovered();
        let card = container(card).padding(4).style(move |theme: &Theme| {
            if hovered {
                container::bordered_box(theme)
            } else {
                container::Style::default()
            }
        });

        mouse_area(card)
            .on_enter(Message::PointerEntered)
            .on_exit(Message::PointerLeft)
            .into()
    }

    fn primary_view(&self) -> Element<'_, Message> {
        match &self.primary {
            PrimaryImage::Ready(handle) => photo(handle.clone()),
            PrimaryImage::Pending | PrimaryImage::Missing => {
                Space::new(Length::Fill, Length::Fixed(IMAGE_HEIGHT)).into()
            }
        }
    }
}

fn photo<'a>(handle: Handle) -> Element<'a, Message> {
    image::Image::<Handle>::new(handle)
        .width(Length::Fill)
        .height(Length::Fixed(IMAGE_HEIGHT))
        .content_fit(iced::ContentFit::Cover)
        .into()
}

/// Opaque panel with a status line, drawn over the primary photo
fn cover<'a>(status: String) -> Element<'a, Message> {
    container(text(status).size(14))
        .center_x(Length::Fill)
        .center_y(Length::Fixed(IMAGE_HEIGHT))
        .style(container::rounded_box)
        .into()
}
