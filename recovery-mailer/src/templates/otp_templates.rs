use crate::{MailerError, templates::TemplateData};
use askama::Template;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateContext {
    pub app_name: String,
    pub user_name: Option<String>,
}

impl Default for TemplateContext {
    fn default() -> Self {
        Self {
            app_name: "Miner Ranger".to_string(),
            user_name: None,
        }
    }
}

/// Fields shared by the HTML and plain-text renderings of the reset code.
struct ResetOtpFields {
    app_name: String,
    user_name: Option<String>,
    otp: String,
    expires_in_minutes: u64,
}

impl ResetOtpFields {
    fn from_data(data: &TemplateData) -> Result<Self, MailerError> {
        let context: TemplateContext = data
            .get("context")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();

        Ok(Self {
            app_name: context.app_name,
            user_name: context.user_name,
            otp: data.require_str("otp")?,
            expires_in_minutes: data.require_u64("expires_in_minutes")?,
        })
    }
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Password reset code - {{ app_name }}</title>
    <style>
        body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; margin: 0; padding: 20px; background-color: #f4f4f4; }
        .container { max-width: 600px; margin: 0 auto; background: white; padding: 30px; border-radius: 8px; }
        .code { font-family: monospace; font-size: 28px; letter-spacing: 6px; text-align: center; background: #f8f9fa; padding: 12px; border-radius: 4px; }
        .footer { margin-top: 30px; padding-top: 20px; border-top: 1px solid #eee; font-size: 12px; color: #666; }
    </style>
</head>
<body>
    <div class="container">
        <h1>{{ app_name }}</h1>
        <p>{% if let Some(name) = user_name %}Hello {{ name }},{% else %}Hello,{% endif %}</p>
        <p>Your one-time password is:</p>
        <p class="code"><strong>{{ otp }}</strong></p>
        <p>It will expire in {{ expires_in_minutes }} minutes. If you did not request this, please ignore this email.</p>
        <div class="footer">
            <p>This email was sent by {{ app_name }}.</p>
        </div>
    </div>
</body>
</html>
"#,
    ext = "html"
)]
pub struct ResetOtpHtmlTemplate {
    pub app_name: String,
    pub user_name: Option<String>,
    pub otp: String,
    pub expires_in_minutes: u64,
}

impl ResetOtpHtmlTemplate {
    pub fn from_data(data: &TemplateData) -> Result<Self, MailerError> {
        let fields = ResetOtpFields::from_data(data)?;
        Ok(Self {
            app_name: fields.app_name,
            user_name: fields.user_name,
            otp: fields.otp,
            expires_in_minutes: fields.expires_in_minutes,
        })
    }
}

#[derive(Template)]
#[template(
    source = r#"{% if let Some(name) = user_name %}Hello {{ name }},{% else %}Hello,{% endif %}

Your {{ app_name }} one-time password is {{ otp }}.

It will expire in {{ expires_in_minutes }} minutes. If you did not request this, please ignore this email.
"#,
    ext = "txt"
)]
pub struct ResetOtpTextTemplate {
    pub app_name: String,
    pub user_name: Option<String>,
    pub otp: String,
    pub expires_in_minutes: u64,
}

impl ResetOtpTextTemplate {
    pub fn from_data(data: &TemplateData) -> Result<Self, MailerError> {
        let fields = ResetOtpFields::from_data(data)?;
        Ok(Self {
            app_name: fields.app_name,
            user_name: fields.user_name,
            otp: fields.otp,
            expires_in_minutes: fields.expires_in_minutes,
        })
    }
}
