use crate::{
    MailerError,
    templates::{ResetOtpHtmlTemplate, ResetOtpTextTemplate, TemplateData},
};
use askama::Template;
use async_trait::async_trait;

pub const RESET_OTP_TEMPLATE: &str = "reset_otp";

#[async_trait]
pub trait TemplateEngine: Send + Sync {
    async fn render_html(
        &self,
        template_name: &str,
        data: TemplateData,
    ) -> Result<String, MailerError>;

    async fn render_text(
        &self,
        template_name: &str,
        data: TemplateData,
    ) -> Result<String, MailerError>;
}

/// Renders the compiled-in askama templates.
#[derive(Debug, Clone, Default)]
pub struct AskamaTemplateEngine;

impl AskamaTemplateEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TemplateEngine for AskamaTemplateEngine {
    async fn render_html(
        &self,
        template_name: &str,
        data: TemplateData,
    ) -> Result<String, MailerError> {
        match template_name {
            RESET_OTP_TEMPLATE => Ok(ResetOtpHtmlTemplate::from_data(&data)?.render()?),
            other => Err(MailerError::UnknownTemplate(other.to_string())),
        }
    }

    async fn render_text(
        &self,
        template_name: &str,
        data: TemplateData,
    ) -> Result<String, MailerError> {
        match template_name {
            RESET_OTP_TEMPLATE => Ok(ResetOtpTextTemplate::from_data(&data)?.render()?),
            other => Err(MailerError::UnknownTemplate(other.to_string())),
        }
    }
}
