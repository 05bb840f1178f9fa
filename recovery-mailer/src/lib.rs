//! Email delivery for one-time password-reset codes.
//!
//! A [`Mailer`] sends a fully built [`Email`]; transports exist for SMTP, a local
//! directory (development) and the system `sendmail` binary. [`MailerConfig::from_env`]
//! picks one from the environment.

pub mod config;
pub mod email;
pub mod email_types;
pub mod error;
pub mod mailer;
pub mod templates;
pub mod transports;

pub use config::{MailerConfig, TransportConfig};
pub use email::{Email, EmailBuilder};
pub use email_types::ResetOtpEmail;
pub use error::MailerError;
pub use mailer::Mailer;
pub use templates::{AskamaTemplateEngine, TemplateContext, TemplateData, TemplateEngine};
pub use transports::{FileTransport, SendmailTransport, SmtpTransport};

pub mod prelude {
    pub use crate::{
        AskamaTemplateEngine, Email, EmailBuilder, FileTransport, Mailer, MailerConfig,
        MailerError, ResetOtpEmail, SendmailTransport, SmtpTransport, TemplateContext,
        TemplateEngine,
    };
}
