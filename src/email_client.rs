use std::path::PathBuf;

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, FileTransport, Message, Tokio1Executor, Transport,
    message::{Attachment as MailAttachment, Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use secrecy::ExposeSecret;

use crate::{
    attachment::Attachment,
    configuration::{SmtpSettings, TlsMode, TransportKind},
    domain::RecipientAddress,
};

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("SMTP credentials are not configured")]
    MissingCredentials,
    #[error("could not connect to the mail server: {0}")]
    Connect(String),
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("could not build the message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("file transport error: {0}")]
    File(#[from] lettre::transport::file::Error),
    #[error("{0}")]
    Other(String),
}

/// One message for one recipient.
pub struct OutgoingEmail<'a> {
    pub to: &'a RecipientAddress,
    pub subject: &'a str,
    pub html_body: &'a str,
    pub attachment: &'a Attachment,
}

/// An open, verified connection to a mail provider.
///
/// Dropping the value releases the connection.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send_email(&self, email: OutgoingEmail<'_>) -> Result<(), TransportError>;
}

/// Builds the transport described by `settings` and checks that it is usable.
#[tracing::instrument(
    name = "Connecting to the mail transport",
    skip(settings),
    fields(transport = ?settings.transport, host = %settings.host, port = settings.port)
)]
pub async fn connect(settings: &SmtpSettings) -> Result<Box<dyn MailTransport>, TransportError> {
    let (username, password) = settings
        .credentials()
        .ok_or(TransportError::MissingCredentials)?;
    let sender = Mailbox::new(Some(settings.sender_name.clone()), username.parse()?);

    let transport: Box<dyn MailTransport> = match settings.transport {
        TransportKind::Smtp => {
            let mut builder = match settings.tls {
                TlsMode::None => {
                    AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
                }
                TlsMode::StartTls => {
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
                }
                TlsMode::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)?,
            };
            builder = builder
                .port(settings.port)
                .timeout(Some(settings.timeout()))
                .credentials(Credentials::new(
                    username.to_owned(),
                    password.expose_secret().to_owned(),
                ));
            let client = SmtpEmailClient {
                transport: builder.build(),
                sender,
            };
            client.verify().await?;
            Box::new(client)
        }
        TransportKind::File => {
            let client = FileEmailClient::new(settings.file_output_dir.clone(), sender)?;
            Box::new(client)
        }
    };

    tracing::info!("Mail transport connected");
    Ok(transport)
}

fn build_message(sender: &Mailbox, email: OutgoingEmail<'_>) -> Result<Message, TransportError> {
    let content_type = ContentType::parse(email.attachment.content_type)
        .map_err(|e| TransportError::Other(format!("invalid attachment content type: {}", e)))?;

    let message = Message::builder()
        .from(sender.clone())
        .to(Mailbox::new(None, email.to.as_ref().parse()?))
        .subject(email.subject)
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::html(email.html_body.to_owned()))
                .singlepart(
                    MailAttachment::new(email.attachment.filename.clone())
                        .body(email.attachment.content.clone(), content_type),
                ),
        )?;
    Ok(message)
}

pub struct SmtpEmailClient {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpEmailClient {
    async fn verify(&self) -> Result<(), TransportError> {
        match self.transport.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(TransportError::Connect(
                "the server did not accept the connection".into(),
            )),
            Err(e) => Err(TransportError::Connect(e.to_string())),
        }
    }
}

#[async_trait]
impl MailTransport for SmtpEmailClient {
    async fn send_email(&self, email: OutgoingEmail<'_>) -> Result<(), TransportError> {
        let message = build_message(&self.sender, email)?;
        self.transport.send(message).await?;
        Ok(())
    }
}

impl Drop for SmtpEmailClient {
    fn drop(&mut self) {
        tracing::info!("SMTP connection closed");
    }
}

pub struct FileEmailClient {
    transport: FileTransport,
    sender: Mailbox,
}

impl FileEmailClient {
    pub fn new(output_dir: PathBuf, sender: Mailbox) -> Result<Self, TransportError> {
        std::fs::create_dir_all(&output_dir).map_err(|e| {
            TransportError::Connect(format!(
                "could not create {}: {}",
                output_dir.display(),
                e
            ))
        })?;
        Ok(Self {
            transport: FileTransport::new(&output_dir),
            sender,
        })
    }
}

#[async_trait]
impl MailTransport for FileEmailClient {
    async fn send_email(&self, email: OutgoingEmail<'_>) -> Result<(), TransportError> {
        let message = build_message(&self.sender, email)?;

        // lettre's FileTransport is blocking
        let transport = self.transport.clone();
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| TransportError::Other(format!("the file writer stopped: {}", e)))??;
        Ok(())
    }
}
