//! Verification code dispatch

pub mod console;
pub mod smtp;

pub use console::ConsoleEmailSender;
pub use smtp::{SmtpConfig, SmtpEmailSender};

/// Trait for sending verification emails
pub trait EmailSender: Send + Sync {
    /// Send a verification code to an applicant
    ///
    /// `full_name` is only used to personalize the greeting.
    fn send_verification(&self, email: &str, full_name: &str, code: &str) -> Result<(), String>;
}

/// Allow using Box<dyn EmailSender> as an EmailSender
impl EmailSender for Box<dyn EmailSender> {
    fn send_verification(&self, email: &str, full_name: &str, code: &str) -> Result<(), String> {
        (**self).send_verification(email, full_name, code)
    }
}
