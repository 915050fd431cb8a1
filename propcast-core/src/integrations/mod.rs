pub mod mailer;
pub mod notion;
pub mod stripe;
pub mod templates;

pub use mailer::{HttpMailer, LogMailer, Mailer};
pub use notion::NotionClient;
pub use stripe::{PaymentIntent, PaymentIntentRequest, StripeClient, WebhookEvent};
