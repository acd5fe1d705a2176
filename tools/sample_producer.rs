//! Sample Customer Producer
//!
//! Generates randomized customer records and publishes them as prediction
//! requests for local testing of the churn inference service.

use rand::Rng;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

/// Customer record in the shape the service accepts
#[derive(Debug, Clone, Serialize)]
struct Customer {
    customer_id: String,
    gender: String,
    #[serde(rename = "SeniorCitizen")]
    senior_citizen: u8,
    #[serde(rename = "Partner")]
    partner: String,
    #[serde(rename = "Dependents")]
    dependents: String,
    tenure: u32,
    #[serde(rename = "PhoneService")]
    phone_service: String,
    #[serde(rename = "MultipleLines")]
    multiple_lines: String,
    #[serde(rename = "InternetService")]
    internet_service: String,
    #[serde(rename = "TechSupport")]
    tech_support: String,
    #[serde(rename = "Contract")]
    contract: String,
    #[serde(rename = "PaperlessBilling")]
    paperless_billing: String,
    #[serde(rename = "PaymentMethod")]
    payment_method: String,
    #[serde(rename = "MonthlyCharges")]
    monthly_charges: f64,
    #[serde(rename = "TotalCharges")]
    total_charges: f64,
}

#[derive(Debug, Serialize)]
struct BatchRequest {
    customers: Vec<Customer>,
}

/// Customer generator for testing
struct CustomerGenerator {
    rng: rand::rngs::ThreadRng,
    customer_counter: u64,
}

impl CustomerGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            customer_counter: 0,
        }
    }

    fn next_id(&mut self) -> String {
        self.customer_counter += 1;
        format!("{:04}-SMPL{}", self.customer_counter, self.rng.gen_range(0..10))
    }

    /// Long-tenure customer on a term contract
    fn generate_loyal(&mut self) -> Customer {
        let tenure = self.rng.gen_range(24..=72);
        let monthly_charges = self.rng.gen_range(20.0..80.0);
        let phone_service = self.yes_no(0.9);
        let multiple_lines = if phone_service == "Yes" {
            self.yes_no(0.4)
        } else {
            "No phone service".to_string()
        };

        Customer {
            customer_id: self.next_id(),
            gender: self.random_choice(&["Male", "Female"]).to_string(),
            senior_citizen: self.rng.gen_bool(0.1) as u8,
            partner: self.yes_no(0.6),
            dependents: self.yes_no(0.4),
            tenure,
            phone_service,
            multiple_lines,
            internet_service: self.random_choice(&["DSL", "No", "Fiber optic"]).to_string(),
            tech_support: self.yes_no(0.6),
            contract: self.random_choice(&["One year", "Two year"]).to_string(),
            paperless_billing: self.yes_no(0.4),
            payment_method: self
                .random_choice(&[
                    "Bank transfer (automatic)",
                    "Credit card (automatic)",
                    "Mailed check",
                ])
                .to_string(),
            monthly_charges,
            total_charges: monthly_charges * tenure as f64,
        }
    }

    /// New month-to-month fiber customer paying by electronic check
    fn generate_at_risk(&mut self) -> Customer {
        let tenure = self.rng.gen_range(0..=12);
        let monthly_charges = self.rng.gen_range(70.0..120.0);

        Customer {
            customer_id: self.next_id(),
            gender: self.random_choice(&["Male", "Female"]).to_string(),
            senior_citizen: self.rng.gen_bool(0.35) as u8,
            partner: self.yes_no(0.3),
            dependents: self.yes_no(0.15),
            tenure,
            phone_service: "Yes".to_string(),
            multiple_lines: self.yes_no(0.5),
            internet_service: "Fiber optic".to_string(),
            tech_support: "No".to_string(),
            contract: "Month-to-month".to_string(),
            paperless_billing: "Yes".to_string(),
            payment_method: "Electronic check".to_string(),
            monthly_charges,
            total_charges: monthly_charges * tenure.max(1) as f64,
        }
    }

    fn yes_no(&mut self, p_yes: f64) -> String {
        let answer = if self.rng.gen_bool(p_yes) { "Yes" } else { "No" };
        answer.to_string()
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }

    fn generate(&mut self, at_risk_rate: f64) -> (Customer, bool) {
        if self.rng.gen_bool(at_risk_rate) {
            (self.generate_at_risk(), true)
        } else {
            (self.generate_loyal(), false)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sample_producer=info".parse()?),
        )
        .init();

    info!("Starting Sample Customer Producer");

    // Positional: url, subject, count, at-risk rate, delay ms, batch size
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("churn.predict");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let at_risk_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.25);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);
    let batch_size: usize = args.get(6).and_then(|s| s.parse().ok()).unwrap_or(1).max(1);
    let at_risk_rate = at_risk_rate.clamp(0.0, 1.0);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        at_risk_rate = at_risk_rate,
        delay_ms = delay_ms,
        batch_size = batch_size,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, at_risk_rate, delay_ms).await;
        }
    };

    let mut generator = CustomerGenerator::new();
    let mut loyal_count = 0;
    let mut at_risk_count = 0;
    let mut sent = 0u64;

    info!("Starting to publish {} customers...", count);

    while sent < count {
        let size = (batch_size as u64).min(count - sent) as usize;
        let mut customers = Vec::with_capacity(size);
        for _ in 0..size {
            let (customer, at_risk) = generator.generate(at_risk_rate);
            if at_risk {
                at_risk_count += 1;
            } else {
                loyal_count += 1;
            }
            customers.push(customer);
        }

        let payload = if batch_size == 1 {
            serde_json::to_vec(&customers[0])?
        } else {
            serde_json::to_vec(&BatchRequest { customers })?
        };
        client.publish(subject.to_string(), payload.into()).await?;
        sent += size as u64;

        if sent % 10 == 0 || sent == count {
            info!(
                "Published {}/{} customers ({} loyal, {} at risk)",
                sent, count, loyal_count, at_risk_count
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    client.flush().await?;
    info!(
        "Completed! Published {} customers ({} loyal, {} at risk)",
        count, loyal_count, at_risk_count
    );

    Ok(())
}

async fn run_dry_mode(count: u64, at_risk_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = CustomerGenerator::new();

    for i in 0..count {
        let (customer, _) = generator.generate(at_risk_rate);
        let json = serde_json::to_string_pretty(&customer)?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample customer {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
