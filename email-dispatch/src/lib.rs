pub mod config;
pub mod dispatcher;
pub mod smtp;

pub use config::{parse_recipients, DispatchConfig, SmtpConfig, SmtpSecurity};
pub use dispatcher::{
    subject_line, DeliveryReceipt, DeliveryStatus, MailTransport, NewsletterDispatcher,
    OutgoingEmail,
};
pub use smtp::SmtpMailTransport;
