mod html;
mod smtp;

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    Message,
};
use log::{debug, error, info, warn};

pub use html::to_html;
pub use smtp::{smtp_transport, Delivery, SendError};

use crate::config::Config;

pub struct Mailer {
    from: Mailbox,
    bcc: Option<Mailbox>,
    resume: Option<ResumeFile>,
    delivery: Box<dyn Delivery>,
}

/// Resume pdf attached to every email
#[derive(Debug, Clone)]
pub struct ResumeFile {
    pub path: PathBuf,
    /// Name the recipient sees
    pub filename: String,
}

impl ResumeFile {
    pub fn new(path: PathBuf, candidate_name: &str) -> Self {
        Self {
            path,
            filename: format!("{}_Resume.pdf", candidate_name.trim().replace(' ', "_")),
        }
    }
}

impl Mailer {
    pub fn new(
        config: &Config,
        resume: Option<ResumeFile>,
        delivery: Box<dyn Delivery>,
    ) -> anyhow::Result<Self> {
        let from = config
            .email_address
            .parse::<Mailbox>()
            .with_context(|| format!("Invalid email_address {:?}", config.email_address))?;
        let bcc = config
            .bcc()
            .map(|bcc| {
                bcc.parse::<Mailbox>()
                    .with_context(|| format!("Invalid bcc_email {bcc:?}"))
            })
            .transpose()?;
        match &resume {
            Some(resume) => info!("Attaching resume {:?} as {:?}", resume.path, resume.filename),
            None => warn!("No resume found, emails will be sent without attachment"),
        }
        Ok(Self {
            from,
            bcc,
            resume,
            delivery,
        })
    }

    /// Sends and reports only success, errors are logged
    pub fn send(&self, to_address: &str, subject: &str, body: &str) -> bool {
        match self.try_send(to_address, subject, body) {
            Ok(()) => true,
            Err(e) => {
                log_send_error(&e);
                false
            }
        }
    }

    pub fn try_send(&self, to_address: &str, subject: &str, body: &str) -> Result<(), SendError> {
        let message = self.build_message(to_address, subject, body)?;
        debug!("Delivering {subject:?} to {to_address}");
        self.delivery.deliver(&message)
    }

    fn build_message(&self, to_address: &str, subject: &str, body: &str) -> Result<Message, SendError> {
        let to = to_address
            .parse::<Mailbox>()
            .map_err(|e| SendError::InvalidAddress {
                address: to_address.to_string(),
                reason: e.to_string(),
            })?;
        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject);
        if let Some(bcc) = &self.bcc {
            builder = builder.bcc(bcc.clone());
        }

        let mut parts = MultiPart::mixed().singlepart(SinglePart::html(to_html(body)));
        if let Some(attachment) = self.resume.as_ref().and_then(attachment_part) {
            parts = parts.singlepart(attachment);
        }
        builder
            .multipart(parts)
            .map_err(|e| SendError::Build(e.to_string()))
    }
}

/// Failing to attach is not a reason to skip the email
fn attachment_part(resume: &ResumeFile) -> Option<SinglePart> {
    let content = match fs::read(&resume.path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Could not attach resume {:?}: {e}", resume.path);
            return None;
        }
    };
    let content_type = match ContentType::parse("application/pdf") {
        Ok(content_type) => content_type,
        Err(e) => {
            warn!("Could not attach resume {:?}: {e}", resume.path);
            return None;
        }
    };
    Some(Attachment::new(resume.filename.clone()).body(content, content_type))
}

pub fn log_send_error(err: &SendError) {
    if err.is_authentication() {
        error!("AUTHENTICATION FAILED! Check email_address and app_password in the config. {err}");
    } else {
        error!("Failed to send: {err}");
    }
}

/// First pdf (by name) in `dir`, if any
pub fn find_resume(dir: &Path) -> Option<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Unable to read {dir:?} looking for a resume: {e}");
            return None;
        }
    };
    let mut pdfs: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("pdf"))
                .unwrap_or(false)
        })
        .collect();
    pdfs.sort();
    pdfs.into_iter().next()
}
