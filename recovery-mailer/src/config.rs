use crate::transports::TlsConfig;
use crate::{FileTransport, Mailer, MailerError, SendmailTransport, SmtpTransport};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_FROM_ADDRESS: &str = "no-reply@minerranger.local";
const DEFAULT_APP_NAME: &str = "Miner Ranger";
const DEFAULT_OUTPUT_DIR: &str = "./emails";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailerConfig {
    pub transport: TransportConfig,
    pub from_address: String,
    pub from_name: Option<String>,
    pub app_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportConfig {
    Smtp {
        host: String,
        port: u16,
        username: String,
        password: String,
        /// Implicit TLS when true, STARTTLS otherwise.
        secure: bool,
    },
    File {
        output_dir: PathBuf,
    },
    Sendmail {
        command: Option<String>,
    },
}

/// Raw environment lookups, injectable for tests.
trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

impl MailerConfig {
    /// Reads `SMTP_HOST`, `SMTP_PORT`, `SMTP_USER`, `SMTP_PASS`, `SMTP_SECURE`,
    /// `SMTP_FROM`, `MAILER_FILE_OUTPUT_DIR`, `MAILER_SENDMAIL` and `MAILER_APP_NAME`.
    ///
    /// With complete SMTP settings the SMTP transport is used. Otherwise the file
    /// transport is used, unless `APP_ENV=production`, where incomplete SMTP settings
    /// are an error.
    pub fn from_env() -> Result<Self, MailerError> {
        Self::from_source(&ProcessEnv)
    }

    fn from_source(env: &impl EnvSource) -> Result<Self, MailerError> {
        let production = env
            .var("APP_ENV")
            .is_some_and(|v| v.eq_ignore_ascii_case("production"));

        let smtp = (
            env.var("SMTP_HOST"),
            env.var("SMTP_PORT"),
            env.var("SMTP_USER"),
            env.var("SMTP_PASS"),
        );

        let transport = match smtp {
            (Some(host), Some(port), Some(username), Some(password)) => {
                let port = port.trim().parse().map_err(|_| {
                    MailerError::Config(format!("SMTP_PORT is not a valid port: {port}"))
                })?;
                let secure = env
                    .var("SMTP_SECURE")
                    .is_some_and(|v| v.eq_ignore_ascii_case("true"));

                TransportConfig::Smtp {
                    host,
                    port,
                    username,
                    password,
                    secure,
                }
            }
            _ if production => {
                return Err(MailerError::Config(
                    "SMTP configuration is incomplete. Please set SMTP_HOST, SMTP_PORT, SMTP_USER, and SMTP_PASS."
                        .to_string(),
                ));
            }
            _ => {
                if let Some(output_dir) = env.var("MAILER_FILE_OUTPUT_DIR") {
                    TransportConfig::File {
                        output_dir: PathBuf::from(output_dir),
                    }
                } else if let Some(sendmail) = env.var("MAILER_SENDMAIL") {
                    // "true" selects the default sendmail binary, anything else is a path
                    let command = (!sendmail.eq_ignore_ascii_case("true")).then_some(sendmail);
                    TransportConfig::Sendmail { command }
                } else {
                    tracing::warn!(
                        output_dir = DEFAULT_OUTPUT_DIR,
                        "SMTP configuration is incomplete; OTP emails will be written to disk instead of delivered"
                    );
                    TransportConfig::File {
                        output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
                    }
                }
            }
        };

        let from_address = env
            .var("SMTP_FROM")
            .or_else(|| env.var("SMTP_USER"))
            .unwrap_or_else(|| DEFAULT_FROM_ADDRESS.to_string());

        Ok(Self {
            transport,
            from_address,
            from_name: env.var("MAILER_FROM_NAME"),
            app_name: env
                .var("MAILER_APP_NAME")
                .unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
        })
    }

    pub fn build_transport(&self) -> Result<Box<dyn Mailer>, MailerError> {
        match &self.transport {
            TransportConfig::Smtp {
                host,
                port,
                username,
                password,
                secure,
            } => {
                let tls = if *secure {
                    TlsConfig::Tls
                } else {
                    TlsConfig::StartTls
                };
                let transport = SmtpTransport::builder(host)
                    .port(*port)
                    .credentials(username, password)
                    .tls(tls)
                    .build()?;
                Ok(Box::new(transport))
            }
            TransportConfig::File { output_dir } => Ok(Box::new(FileTransport::new(output_dir)?)),
            TransportConfig::Sendmail { command } => match command {
                Some(command) => Ok(Box::new(SendmailTransport::with_command(command))),
                None => Ok(Box::new(SendmailTransport::new())),
            },
        }
    }

    pub fn get_from_address(&self) -> String {
        match &self.from_name {
            Some(name) => format!("{} <{}>", name, self.from_address),
            None => self.from_address.clone(),
        }
    }
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::File {
                output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            },
            from_address: DEFAULT_FROM_ADDRESS.to_string(),
            from_name: None,
            app_name: DEFAULT_APP_NAME.to_string(),
        }
    }
}
