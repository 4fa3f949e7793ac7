/// User interface components
///
/// - Modal overlay with outside-click dismissal (modal.rs)
/// - Hover preview product card (product_card.rs)
/// - Background image decoding shared by the cards (images.rs)

pub mod images;
pub mod modal;
pub mod product_card;
