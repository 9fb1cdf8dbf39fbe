// Outbound provider clients
//
// Each client implements one socialspot-core trait:
// - MailjetMailer: Mailer
// - StripeGateway: PaymentGateway
// - PusherBroadcaster: Broadcaster
// - R2ObjectStore: ObjectStore
// - WebhookBuildHook: BuildHook

pub mod build_hook;
pub mod error;
pub mod mailjet;
pub mod pusher;
pub mod r2;
pub mod stripe;

pub use build_hook::WebhookBuildHook;
pub use error::ProviderError;
pub use mailjet::{MailjetConfig, MailjetMailer};
pub use pusher::{PusherBroadcaster, PusherConfig};
pub use r2::{R2Config, R2ObjectStore};
pub use stripe::{StripeConfig, StripeGateway};
