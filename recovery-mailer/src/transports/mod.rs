mod file;
mod sendmail;
pub mod smtp;

pub use file::FileTransport;
pub use sendmail::SendmailTransport;
pub use smtp::{SmtpTransport, TlsConfig};

use crate::{Email, MailerError};
use lettre::Message;
use lettre::message::{MultiPart, SinglePart};

/// Converts an [`Email`] into a lettre [`Message`], preferring a multipart
/// alternative body when both renderings are present.
pub(crate) fn build_message(email: Email) -> Result<Message, MailerError> {
    let mut message_builder = Message::builder()
        .from(email.from.parse()?)
        .subject(email.subject);

    for to in email.to {
        message_builder = message_builder.to(to.parse()?);
    }

    if let Some(reply_to) = email.reply_to {
        message_builder = message_builder.reply_to(reply_to.parse()?);
    }

    let message = match (email.html_body, email.text_body) {
        (Some(html), Some(text)) => message_builder.multipart(
            MultiPart::alternative()
                .singlepart(SinglePart::plain(text))
                .singlepart(SinglePart::html(html)),
        )?,
        (Some(html), None) => message_builder.singlepart(SinglePart::html(html))?,
        (None, Some(text)) => message_builder.singlepart(SinglePart::plain(text))?,
        (None, None) => {
            return Err(MailerError::Builder("No email body provided".to_string()));
        }
    };

    Ok(message)
}

#[cfg(test)]
pub(crate) fn sample_email() -> Email {
    Email {
        to: vec!["player@example.com".to_string()],
        from: "Miner Ranger <no-reply@minerranger.local>".to_string(),
        reply_to: None,
        subject: "Your Miner Ranger OTP Code".to_string(),
        html_body: Some("<p>Your one-time password is <strong>X7K2P9</strong>.</p>".to_string()),
        text_body: Some("Your one-time password is X7K2P9.".to_string()),
    }
}
