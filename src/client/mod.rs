//! Client side of the scrape service: a controller that submits one form,
//! follows the result through the deployment's delivery strategy and renders
//! it into a view.

pub mod api;
pub mod content;
pub mod controller;
pub mod delivery;
pub mod form;
pub mod sse;
pub mod terminal;
pub mod tree;
pub mod view;

pub use api::{HttpScrapeApi, ScrapeApi, UpdateStream};
pub use content::{ContentView, DownloadOffer};
pub use controller::{ScrapeController, SubmitOutcome};
pub use delivery::{DeliveryEvent, FinalResult, ResultDelivery};
pub use form::ScrapeForm;
pub use terminal::TerminalView;
pub use tree::TreeView;
pub use view::{ScrapeView, StatusTone};
