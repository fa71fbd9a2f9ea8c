mod notifier;
mod stripe;

pub use notifier::notification_hooks;
pub use stripe::StripeGateway;
