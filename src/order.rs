use crate::cart::CartLine;
use crate::config::FormFields;
use derive_more::{Display, Error};
use itertools::Itertools;
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    pub name: String,
    pub mobile: String,
    pub address: String,
}

#[derive(Debug, Display, Error)]
pub enum SubmitError {
    #[display("Order submission failed: {_0}")]
    Transport(reqwest_middleware::Error),
}

impl From<reqwest_middleware::Error> for SubmitError {
    fn from(err: reqwest_middleware::Error) -> Self {
        SubmitError::Transport(err)
    }
}

/// Human-readable multi-line order text: one line per cart position plus a
/// grand total. This blob is what the form endpoint receives.
pub fn order_summary(lines: &[CartLine]) -> String {
    let details = lines
        .iter()
        .map(|line| {
            let variant = [line.size.as_deref(), line.color.as_deref()]
                .into_iter()
                .flatten()
                .join(", ");
            format!(
                "{} ({variant}) × {} = ₹{:.2}",
                line.name,
                line.quantity,
                line.line_total()
            )
        })
        .join("\n");
    let total: Decimal = lines.iter().map(CartLine::line_total).sum();
    format!("{details}\n\nTotal: ₹{total:.2}")
}

/// Posts the serialized order to the configured external form endpoint.
/// The endpoint is cross-origin and form-style: the response body is never
/// inspected, only transport failures are reported.
pub struct OrderSubmitter {
    client: reqwest_middleware::ClientWithMiddleware,
    form_url: Option<String>,
    fields: FormFields,
}

impl OrderSubmitter {
    pub fn new(
        client: reqwest_middleware::ClientWithMiddleware,
        form_url: Option<String>,
        fields: FormFields,
    ) -> Self {
        Self {
            client,
            form_url,
            fields,
        }
    }

    pub async fn submit(
        &self,
        lines: &[CartLine],
        customer: &Customer,
    ) -> Result<(), SubmitError> {
        let summary = order_summary(lines);
        let Some(url) = &self.form_url else {
            // No endpoint configured: keep a local trace of the order.
            log::info!(
                "Order from {} ({}, {}):\n{summary}",
                customer.name,
                customer.mobile,
                customer.address
            );
            return Ok(());
        };
        let form = reqwest::multipart::Form::new()
            .text(self.fields.product_details.clone(), summary)
            .text(self.fields.customer_name.clone(), customer.name.clone())
            .text(self.fields.customer_mobile.clone(), customer.mobile.clone())
            .text(
                self.fields.delivery_address.clone(),
                customer.address.clone(),
            );
        self.client.post(url).multipart(form).send().await?;
        Ok(())
    }
}
