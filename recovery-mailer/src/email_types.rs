use crate::{
    Email, MailerError,
    templates::{TemplateContext, TemplateData, TemplateEngine, engine::RESET_OTP_TEMPLATE},
};

/// The message carrying a password-reset one-time code.
pub struct ResetOtpEmail;

impl ResetOtpEmail {
    pub async fn build<T: TemplateEngine + ?Sized>(
        engine: &T,
        from: &str,
        to: &str,
        otp: &str,
        expires_in_minutes: u64,
        context: TemplateContext,
    ) -> Result<Email, MailerError> {
        let template_data = TemplateData::new()
            .insert("context", &context)?
            .insert("otp", otp)?
            .insert("expires_in_minutes", expires_in_minutes)?;

        let html_body = engine
            .render_html(RESET_OTP_TEMPLATE, template_data.clone())
            .await?;
        let text_body = engine.render_text(RESET_OTP_TEMPLATE, template_data).await?;

        Email::builder()
            .from(from)
            .to(to)
            .subject(format!("Your {} OTP Code", context.app_name))
            .html_body(html_body)
            .text_body(text_body)
            .build()
    }
}
