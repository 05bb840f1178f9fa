use async_trait::async_trait;
use chrono::Duration;

use crate::Error;

#[cfg(feature = "mailer")]
pub use self::mailer_impl::*;

/// Delivers a freshly issued reset code to an account holder.
#[async_trait]
pub trait OtpSender: Send + Sync {
    async fn send_reset_otp(&self, to: &str, otp: &str, expires_in: Duration)
    -> Result<(), Error>;
}

#[cfg(feature = "mailer")]
mod mailer_impl {
    use super::OtpSender;
    use crate::Error;
    use crate::error::DeliveryError;
    use async_trait::async_trait;
    use chrono::Duration;
    use recovery_mailer::prelude::*;

    /// [`OtpSender`] that renders the reset email and hands it to a mail transport.
    pub struct MailerOtpSender {
        transport: Box<dyn Mailer>,
        engine: AskamaTemplateEngine,
        config: MailerConfig,
    }

    impl MailerOtpSender {
        pub fn new(config: MailerConfig) -> Result<Self, Error> {
            let transport = config.build_transport().map_err(|e| {
                tracing::error!(error = %e, "Failed to build mail transport");
                Error::Delivery(DeliveryError::Transport(e.to_string()))
            })?;

            Ok(Self::with_transport(config, transport))
        }

        pub fn with_transport(config: MailerConfig, transport: Box<dyn Mailer>) -> Self {
            Self {
                transport,
                engine: AskamaTemplateEngine::new(),
                config,
            }
        }

        pub fn from_env() -> Result<Self, Error> {
            let config = MailerConfig::from_env().map_err(|e| {
                tracing::error!(error = %e, "Invalid mailer configuration");
                Error::Delivery(DeliveryError::Transport(e.to_string()))
            })?;
            Self::new(config)
        }
    }

    #[async_trait]
    impl OtpSender for MailerOtpSender {
        async fn send_reset_otp(
            &self,
            to: &str,
            otp: &str,
            expires_in: Duration,
        ) -> Result<(), Error> {
            let context = TemplateContext {
                app_name: self.config.app_name.clone(),
                user_name: None,
            };
            let minutes = expires_in.num_minutes().max(1) as u64;

            let email = ResetOtpEmail::build(
                &self.engine,
                &self.config.get_from_address(),
                to,
                otp,
                minutes,
                context,
            )
            .await
            .map_err(|e| Error::Delivery(DeliveryError::Build(e.to_string())))?;

            self.transport
                .send_email(email)
                .await
                .map_err(|e| Error::Delivery(DeliveryError::Transport(e.to_string())))?;

            tracing::debug!(to, "Password reset OTP email sent");
            Ok(())
        }
    }

}
