use std::time::Duration;

use async_trait::async_trait;

use crate::{
    attachment::Attachment,
    domain::{BatchConfig, DispatchRun, EmailTemplate, RecipientAddress, SendResult},
    email_client::{MailTransport, OutgoingEmail, TransportError},
};

/// Where the dispatcher waits between sends and between batches.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

pub struct Dispatcher<C> {
    clock: C,
}

impl<C: Clock> Dispatcher<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    /// Sends one message per recipient, batch by batch.
    ///
    /// Results are appended to `run` as they happen, so whatever was sent
    /// before the future is dropped stays visible to the caller. A send in
    /// progress is marked on `run` until it reports back, see
    /// [`DispatchRun::interrupt`]. A failed send is recorded and never retried.
    #[tracing::instrument(
        name = "Dispatching the batch",
        skip_all,
        fields(
            recipients = recipients.len(),
            batch_size = config.batch_size.get(),
            batches = config.batch_count(recipients.len())
        )
    )]
    pub async fn dispatch(
        &self,
        transport: &dyn MailTransport,
        recipients: &[RecipientAddress],
        attachment: &Attachment,
        template: &EmailTemplate,
        config: &BatchConfig,
        run: &mut DispatchRun,
    ) {
        let total = recipients.len();
        let batch_count = config.batch_count(total);
        let mut sent = 0;

        for (batch_index, batch) in recipients.chunks(config.batch_size.get()).enumerate() {
            tracing::info!(
                batch = batch_index + 1,
                of = batch_count,
                size = batch.len(),
                "Starting batch"
            );

            for (position, recipient) in batch.iter().enumerate() {
                sent += 1;
                let progress = (sent * 100) / total;
                tracing::info!(%recipient, progress, "Sending email {}/{}", sent, total);

                run.begin(recipient);
                let result = match send_one(transport, recipient, attachment, template).await {
                    Ok(()) => {
                        tracing::info!(%recipient, "Email sent");
                        SendResult::succeeded(recipient)
                    }
                    Err(e) => {
                        tracing::error!(%recipient, error = %e, "Failed to send email");
                        SendResult::failed(recipient, e.to_string())
                    }
                };
                run.record(result);

                if position + 1 < batch.len() {
                    self.clock.sleep(config.pause_between_sends).await;
                }
            }

            if batch_index + 1 < batch_count {
                tracing::info!(
                    pause = ?config.pause_between_batches,
                    "Batch complete, pausing before the next one"
                );
                self.clock.sleep(config.pause_between_batches).await;
            }
        }

        let stats = run.stats();
        tracing::info!(
            succeeded = stats.succeeded,
            failed = stats.failed,
            total = stats.total,
            "Dispatch finished"
        );
    }
}

async fn send_one(
    transport: &dyn MailTransport,
    recipient: &RecipientAddress,
    attachment: &Attachment,
    template: &EmailTemplate,
) -> Result<(), TransportError> {
    let html_body = template
        .render_html()
        .map_err(|e| TransportError::Other(e.to_string()))?;
    transport
        .send_email(OutgoingEmail {
            to: recipient,
            subject: template.subject(),
            html_body: &html_body,
            attachment,
        })
        .await
}
