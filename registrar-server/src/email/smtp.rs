//! SMTP-based email sender for production

use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};

use super::EmailSender;

/// Configuration for SMTP email sending
#[derive(Clone)]
pub struct SmtpConfig {
    /// SMTP server host (e.g., "smtp.gmail.com")
    pub host: String,
    /// SMTP server port (typically 465 for TLS, 587 for STARTTLS)
    pub port: u16,
    /// SMTP username
    pub username: String,
    /// SMTP password (or app password / API key)
    pub password: String,
    /// From email address
    pub from_email: String,
    /// From name (optional)
    pub from_name: Option<String>,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("from_email", &self.from_email)
            .field("from_name", &self.from_name)
            .finish()
    }
}

impl SmtpConfig {
    /// Create config from a key lookup that returns `None` for unset keys
    ///
    /// Required:
    /// - SMTP_HOST
    /// - SMTP_USERNAME
    /// - SMTP_PASSWORD
    /// - SMTP_FROM_EMAIL
    ///
    /// Optional:
    /// - SMTP_PORT (default: 465)
    /// - SMTP_FROM_NAME
    pub fn from_lookup<G>(get: &G) -> Option<Self>
    where
        G: Fn(&str) -> Option<String>,
    {
        let host = get("SMTP_HOST")?;
        let username = get("SMTP_USERNAME")?;
        let password = get("SMTP_PASSWORD")?;
        let from_email = get("SMTP_FROM_EMAIL")?;

        let port = get("SMTP_PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(465);

        let from_name = get("SMTP_FROM_NAME");

        Some(Self {
            host,
            port,
            username,
            password,
            from_email,
            from_name,
        })
    }
}

/// SMTP email sender for production use
pub struct SmtpEmailSender {
    transport: SmtpTransport,
    from_email: String,
    from_name: Option<String>,
}

impl SmtpEmailSender {
    /// Create a new SMTP email sender
    pub fn new(config: SmtpConfig) -> Result<Self, String> {
        let creds = Credentials::new(config.username, config.password);

        let transport = SmtpTransport::relay(&config.host)
            .map_err(|e| format!("Failed to create SMTP transport: {}", e))?
            .port(config.port)
            .credentials(creds)
            .build();

        // Test the connection
        transport
            .test_connection()
            .map_err(|e| format!("SMTP connection test failed: {}", e))?;

        tracing::info!(host = %config.host, port = config.port, "SMTP connection established");

        Ok(Self {
            transport,
            from_email: config.from_email,
            from_name: config.from_name,
        })
    }

    fn from_address(&self) -> String {
        match &self.from_name {
            Some(name) => format!("{} <{}>", name, self.from_email),
            None => self.from_email.clone(),
        }
    }

    fn send_email(&self, to: &str, subject: &str, body: String) -> Result<(), String> {
        let from = self
            .from_address()
            .parse()
            .map_err(|e| format!("Invalid from address: {}", e))?;

        let to_addr = to
            .parse()
            .map_err(|e| format!("Invalid to address: {}", e))?;

        let email = Message::builder()
            .from(from)
            .to(to_addr)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| format!("Failed to build email: {}", e))?;

        self.transport
            .send(&email)
            .map_err(|e| format!("Failed to send email: {}", e))?;

        Ok(())
    }
}

/// Plain-text body of the verification message
pub fn verification_body(full_name: &str, code: &str) -> String {
    format!(
        "Hello {},\n\n\
         Your verification code is: {}\n\n\
         Enter this code in the student portal to activate your account.\n\
         The code expires in a few minutes.\n\n\
         If you didn't request this, you can safely ignore this email.",
        full_name, code
    )
}

impl EmailSender for SmtpEmailSender {
    fn send_verification(&self, email: &str, full_name: &str, code: &str) -> Result<(), String> {
        let subject = "Verification code - Student Portal";

        self.send_email(email, subject, verification_body(full_name, code))?;
        tracing::info!(email = %email, "Verification email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_lookup_requires_credentials() {
        let get = |key: &str| match key {
            "SMTP_HOST" => Some("smtp.example.com".to_string()),
            _ => None,
        };
        assert!(SmtpConfig::from_lookup(&get).is_none());
    }

    #[test]
    fn test_from_lookup_defaults_port() {
        let get = |key: &str| match key {
            "SMTP_HOST" => Some("smtp.example.com".to_string()),
            "SMTP_USERNAME" => Some("portal".to_string()),
            "SMTP_PASSWORD" => Some("hunter2".to_string()),
            "SMTP_FROM_EMAIL" => Some("no-reply@miumg.edu.gt".to_string()),
            _ => None,
        };
        let config = SmtpConfig::from_lookup(&get).unwrap();
        assert_eq!(config.port, 465);
        assert!(config.from_name.is_none());
        assert!(!format!("{:?}", config).contains("hunter2"));
    }

    #[test]
    fn test_verification_body_contains_code() {
        let body = verification_body("Ana Ruiz", "482913");
        assert!(body.contains("Ana Ruiz"));
        assert!(body.contains("482913"));
    }
}
