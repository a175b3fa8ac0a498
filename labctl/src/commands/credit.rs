use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::{Form, Query},
    response::Html,
    Router,
};
use lab47_common::models::credit::CreditAddRequest;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::args::CreditAddArgs;
use crate::commands::required;
use crate::error::UsageError;
use crate::Labctl;

/// How long to wait for the payment page to report back
const PAYMENT_TIMEOUT: Duration = Duration::from_secs(120);

const WINDOW_CLOSE: &str = r#"<html>
<body>
<script>
	window.close()
</script>
	<h4>
	You may now close this window.
	</h4>
</body>
</html>
"#;

/// What the payment page sends to the local listener. Both fields are empty
/// when nothing arrived before the timeout.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentCallback {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub balance: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    TimedOut,
    Success { balance: String },
    Canceled,
    /// A status this client does not know about
    Unknown(String),
}

impl From<PaymentCallback> for PaymentOutcome {
    fn from(callback: PaymentCallback) -> Self {
        match callback.status.as_str() {
            "" => PaymentOutcome::TimedOut,
            "success" => PaymentOutcome::Success {
                balance: callback.balance,
            },
            "cancel" => PaymentOutcome::Canceled,
            _ => PaymentOutcome::Unknown(callback.status),
        }
    }
}

impl PaymentOutcome {
    pub fn message(&self) -> String {
        match self {
            PaymentOutcome::TimedOut => "Timed out waiting for signal of successful payment.\n\
                 Credits may by added anyway, check `labctl namespaces`."
                .to_string(),
            PaymentOutcome::Success { balance } => {
                format!("Credits added! Current balance: {balance}")
            }
            PaymentOutcome::Canceled => "Payment canceled, no credits added.".to_string(),
            PaymentOutcome::Unknown(status) => {
                format!("Payment finished with status '{status}', check `labctl namespaces`.")
            }
        }
    }
}

/// Serve `listener` until the first callback request arrives or `timeout`
/// passes, then shut the listener down. The caller's browser gets a page that
/// closes itself.
pub async fn wait_for_payment_callback(
    listener: TcpListener,
    timeout: Duration,
) -> Result<PaymentCallback> {
    let (callback_tx, mut callback_rx) = mpsc::channel::<PaymentCallback>(1);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let app = Router::new().fallback(
        move |Query(query): Query<PaymentCallback>, form: Option<Form<PaymentCallback>>| {
            let callback_tx = callback_tx.clone();
            async move {
                // a form body wins over the query string
                let callback = match form {
                    Some(Form(form)) if !form.status.is_empty() => form,
                    _ => query,
                };
                debug!(status = %callback.status, "payment callback received");
                // only the first one counts
                let _ = callback_tx.try_send(callback);
                Html(WINDOW_CLOSE)
            }
        },
    );

    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop_rx.await;
            })
            .await
    });

    let callback = match tokio::time::timeout(timeout, callback_rx.recv()).await {
        Ok(Some(callback)) => callback,
        Ok(None) | Err(_) => PaymentCallback::default(),
    };

    let _ = stop_tx.send(());
    match tokio::time::timeout(Duration::from_secs(5), server).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(error))) => warn!(%error, "payment callback listener failed"),
        Ok(Err(error)) => warn!(%error, "payment callback listener panicked"),
        Err(_) => warn!("payment callback listener did not shut down in time"),
    }

    Ok(callback)
}

impl Labctl {
    pub(crate) async fn credit_add(&self, args: CreditAddArgs) -> Result<()> {
        let token = self.ctx.token()?;
        let namespace = required(args.namespace, "name of namespace (-n)")?;
        if args.dollars == 0 {
            return Err(UsageError::MissingCredit.into());
        }

        println!(
            "Requesting ${} USD to namespace {}...",
            args.dollars, namespace
        );

        // Without a listener the purchase still works, we just can't report back
        let listener = match TcpListener::bind(("127.0.0.1", 0)).await {
            Ok(listener) => Some(listener),
            Err(error) => {
                warn!(%error, "could not bind a local payment callback listener");
                None
            }
        };
        let local_port = match &listener {
            Some(listener) => Some(
                listener
                    .local_addr()
                    .context("error reading listener address")?
                    .port(),
            ),
            None => None,
        };

        let resp = self
            .ctx
            .make_api_client()?
            .add_credit(
                &token,
                &CreditAddRequest {
                    namespace,
                    credits: args.dollars,
                    local_port,
                },
            )
            .await
            .context("error requesting credit")?
            .into_inner();

        println!("Opening browser to enter payment information!");

        if let Err(error) = webbrowser::open(&resp.url) {
            debug!(%error, "failed to open browser");
            println!("Error opening browser. Please go to:\n{}", resp.url);
            return Ok(());
        }

        let Some(listener) = listener else {
            println!(
                "Use payment screen to complete payment and credits will be added to account."
            );
            return Ok(());
        };

        println!("Waiting for payment to complete...");

        let callback = wait_for_payment_callback(listener, PAYMENT_TIMEOUT).await?;
        println!("{}", PaymentOutcome::from(callback).message());

        Ok(())
    }
}
