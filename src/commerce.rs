/// Cart and analytics collaborators
///
/// Cards never talk to a backend directly. They build a `QuickAddRequest`
/// and hand it to `submit_quick_add`, which forwards the lines to a
/// `CartService` and reports the analytics payload to an `AnalyticsSink`.
/// Both traits are `Send + Sync` so many cards can share one instance.
///
/// Both collaborators may block (SQLite, network), so each call runs on
/// tokio's blocking pool. The analytics report is detached from the cart
/// write and never delays it.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// A single cart mutation line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub quantity: u32,
    pub merchandise_id: String,
}

/// Product entry of an add-to-cart analytics payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsProduct {
    pub product_gid: String,
    pub variant_gid: String,
    pub name: String,
    pub variant_name: String,
    pub brand: String,
    pub price: f64,
    pub quantity: u32,
}

/// Add-to-cart analytics payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartEvent {
    pub products: Vec<AnalyticsProduct>,
    pub total_value: f64,
}

impl AddToCartEvent {
    pub fn new(products: Vec<AnalyticsProduct>) -> Self {
        let total_value = products
            .iter()
            .map(|p| p.price * f64::from(p.quantity))
            .sum();
        Self {
            products,
            total_value,
        }
    }
}

/// Everything a quick-add activation asks for
#[derive(Debug, Clone, PartialEq)]
pub struct QuickAddRequest {
    pub lines: Vec<CartLine>,
    pub analytics: AddToCartEvent,
}

/// Cart state right after a write
#[derive(Debug, Clone, PartialEq)]
pub struct CartSummary {
    /// The lines just added, with the quantity each variant now has
    pub updated: Vec<CartLine>,
    /// Distinct lines in the cart
    pub line_count: i64,
    /// Units across all lines
    pub total_quantity: i64,
}

#[derive(Debug, Error)]
pub enum CartError {
    #[error("cart database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("cart is unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("failed to encode analytics payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Receives cart-line additions
pub trait CartService: Send + Sync {
    /// Add the lines and report the resulting cart state
    fn add_lines(&self, lines: &[CartLine]) -> Result<CartSummary, CartError>;
}

/// Receives commerce analytics events
pub trait AnalyticsSink: Send + Sync {
    fn add_to_cart(&self, event: &AddToCartEvent) -> Result<(), AnalyticsError>;
}

/// Analytics sink that writes events as JSON log records
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAnalytics;

impl AnalyticsSink for LogAnalytics {
    fn add_to_cart(&self, event: &AddToCartEvent) -> Result<(), AnalyticsError> {
        let payload = serde_json::to_string(event)?;
        log::info!(target: "analytics", "add_to_cart {}", payload);
        Ok(())
    }
}

/// Submit a quick-add.
///
/// The analytics report is spawned and left to finish on its own; a
/// failing sink is logged and never prevents the cart mutation. The cart
/// write is awaited and its summary returned.
pub async fn submit_quick_add(
    request: QuickAddRequest,
    cart: Arc<dyn CartService>,
    analytics: Arc<dyn AnalyticsSink>,
) -> Result<CartSummary, CartError> {
    let QuickAddRequest {
        lines,
        analytics: event,
    } = request;

    tokio::task::spawn_blocking(move || report(&event, analytics.as_ref()));

    let summary = tokio::task::spawn_blocking(move || cart.add_lines(&lines))
        .await
        .map_err(|e| CartError::Unavailable(e.to_string()))??;

    log::info!("Added {} line(s) to cart", summary.updated.len());
    Ok(summary)
}

fn report(event: &AddToCartEvent, analytics: &dyn AnalyticsSink) {
    if let Err(e) = analytics.add_to_cart(event) {
        log::warn!("Analytics report failed: {}", e);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::future::Future;
    use std::sync::Mutex;

    use super::*;

    /// Records every call, optionally failing
    #[derive(Default)]
    pub struct Recorder {
        pub lines: Mutex<Vec<Vec<CartLine>>>,
        pub events: Mutex<Vec<AddToCartEvent>>,
        pub fail_cart: bool,
        pub fail_analytics: bool,
    }

    impl CartService for Recorder {
        fn add_lines(&self, lines: &[CartLine]) -> Result<CartSummary, CartError> {
            if self.fail_cart {
                return Err(CartError::Unavailable("offline".to_string()));
            }
            let mut recorded = self.lines.lock().unwrap();
            recorded.push(lines.to_vec());
            let total_quantity = recorded.iter().flatten().map(|l| i64::from(l.quantity)).sum();
            Ok(CartSummary {
                updated: lines.to_vec(),
                line_count: recorded.iter().map(Vec::len).sum::<usize>() as i64,
                total_quantity,
            })
        }
    }

    impl AnalyticsSink for Recorder {
        fn add_to_cart(&self, event: &AddToCartEvent) -> Result<(), AnalyticsError> {
            if self.fail_analytics {
                let invalid = serde_json::from_str::<u8>("blocked").unwrap_err();
                return Err(AnalyticsError::Encode(invalid));
            }
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    /// Run a future to completion.
    ///
    /// The runtime is dropped before returning, which waits for detached
    /// blocking work such as analytics reports.
    pub fn block_on<F: Future>(future: F) -> F::Output {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let output = runtime.block_on(future);
        drop(runtime);
        output
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{block_on, Recorder};
    use super::*;

    fn request() -> QuickAddRequest {
        let product = AnalyticsProduct {
            product_gid: "P1".to_string(),
            variant_gid: "V1".to_string(),
            name: "Linen Shirt".to_string(),
            variant_name: "M".to_string(),
            brand: "Aroma".to_string(),
            price: 25.0,
            quantity: 1,
        };
        QuickAddRequest {
            lines: vec![CartLine {
                quantity: 1,
                merchandise_id: "V1".to_string(),
            }],
            analytics: AddToCartEvent::new(vec![product]),
        }
    }

    /// A sink that holds the report until told to let go
    struct Gate {
        open: std::sync::Mutex<std::sync::mpsc::Receiver<()>>,
        reported: std::sync::atomic::AtomicBool,
    }

    impl AnalyticsSink for Gate {
        fn add_to_cart(&self, _event: &AddToCartEvent) -> Result<(), AnalyticsError> {
            let _ = self.open.lock().unwrap().recv();
            self.reported
                .store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_total_value_is_price_times_quantity() {
        assert_eq!(request().analytics.total_value, 25.0);
    }

    #[test]
    fn test_submit_reaches_both_collaborators() {
        let recorder = Arc::new(Recorder::default());
        let summary =
            block_on(submit_quick_add(request(), recorder.clone(), recorder.clone())).unwrap();

        assert_eq!(summary.updated.len(), 1);
        assert_eq!(summary.total_quantity, 1);
        assert_eq!(recorder.lines.lock().unwrap().len(), 1);
        assert_eq!(recorder.events.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_analytics_failure_does_not_block_cart() {
        let cart = Arc::new(Recorder::default());
        let analytics = Arc::new(Recorder {
            fail_analytics: true,
            ..Recorder::default()
        });

        assert!(block_on(submit_quick_add(request(), cart.clone(), analytics)).is_ok());
        assert_eq!(cart.lines.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_slow_analytics_does_not_delay_cart() {
        let (release, open) = std::sync::mpsc::channel();
        let gate = Arc::new(Gate {
            open: std::sync::Mutex::new(open),
            reported: std::sync::atomic::AtomicBool::new(false),
        });
        let cart = Arc::new(Recorder::default());

        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let summary = runtime
            .block_on(submit_quick_add(request(), cart.clone(), gate.clone()))
            .unwrap();

        // The cart write finished while the report is still held
        assert_eq!(summary.total_quantity, 1);
        assert!(!gate.reported.load(std::sync::atomic::Ordering::SeqCst));

        release.send(()).unwrap();
        drop(runtime);
        assert!(gate.reported.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn test_cart_failure_is_reported() {
        let cart = Arc::new(Recorder {
            fail_cart: true,
            ..Recorder::default()
        });
        let analytics = Arc::new(Recorder::default());

        assert!(block_on(submit_quick_add(request(), cart, analytics.clone())).is_err());
        // The report went out regardless
        assert_eq!(analytics.events.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_payload_uses_camel_case() {
        let json = serde_json::to_value(&request().analytics).unwrap();
        assert_eq!(json["totalValue"], 25.0);
        assert_eq!(json["products"][0]["variantGid"], "V1");
        assert!(LogAnalytics.add_to_cart(&request().analytics).is_ok());
    }
}
